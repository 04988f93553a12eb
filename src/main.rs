use clap::{Parser, ValueEnum};
use conlang_gen::{Cycle, Flat, GrammarConfig, Lexicon, Natural, RandomSource, Word};
use log::info;
use std::path::PathBuf;

/// Generates words of an invented language
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the definition file
    #[arg(help = "Path to the definition file")]
    definitions: PathBuf,

    /// Number of words to generate (list mode defaults to all of them)
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// How words are produced
    #[arg(long, value_enum, default_value_t = Mode::Choose)]
    mode: Mode,

    /// Random number generator
    #[arg(long, value_enum, default_value_t = Source::Flat)]
    random: Source,

    /// Seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,

    /// Replay these comma-separated values in [0, 1] instead of random numbers
    #[arg(long, value_delimiter = ',', conflicts_with = "seed")]
    replay: Option<Vec<f64>>,

    /// Give up sampling after this many rejected words
    #[arg(long)]
    max_attempts: Option<usize>,

    /// JSON file with parser and filter options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the words as a JSON array
    #[arg(long)]
    json: bool,

    /// Fail if non-terminals refer to themselves
    #[arg(long)]
    check_cycles: bool,

    /// Log level, overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Sample words by weight
    Choose,
    /// Pick random indices and look them up
    Index,
    /// Enumerate words in index order
    List,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    /// Uniformly distributed numbers
    Flat,
    /// Low indices are more likely
    Natural,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if let Some(level) = &cli.log_level {
        logger.parse_filters(level);
    }
    logger.init();

    let config = match &cli.config {
        Some(path) => GrammarConfig::from_json_file(path)?,
        None => GrammarConfig::default(),
    };

    info!("Loading definitions from {}", cli.definitions.display());
    let lexicon = Lexicon::from_file_with_config(&cli.definitions, &config)?;
    if cli.check_cycles {
        lexicon.check_acyclic()?;
    }

    let mut rnd = random_source(&cli);
    let words = match cli.mode {
        Mode::Choose => {
            let n = cli.count.unwrap_or(10);
            let mut words = Vec::with_capacity(n);
            for _ in 0..n {
                let word = match cli.max_attempts {
                    Some(max) => lexicon.choose_bounded(rnd.as_mut(), max)?,
                    None => lexicon.choose(rnd.as_mut()),
                };
                words.push(word);
            }
            words
        }
        Mode::Index => {
            let total = lexicon.count()?;
            info!("The definitions have {} expansions", total);
            let n = cli.count.unwrap_or(10);
            let mut words = Vec::with_capacity(n);
            for _ in 0..n {
                let word = lexicon.get(rnd.index(total))?;
                if !word.is_rejected() {
                    words.push(word);
                }
            }
            words
        }
        Mode::List => {
            let total = lexicon.count()?;
            info!("The definitions have {} expansions", total);
            let limit = cli.count.map_or(total, |n| total.min(n as u128));
            let mut words = Vec::new();
            for i in 0..limit {
                let word = lexicon.get(i)?;
                if !word.is_rejected() {
                    words.push(word);
                }
            }
            words
        }
    };

    print_words(&words, cli.json)
}

fn random_source(cli: &Cli) -> Box<dyn RandomSource> {
    if let Some(values) = &cli.replay {
        return Box::new(Cycle::new(values.clone()));
    }
    match (cli.random, cli.seed) {
        (Source::Flat, Some(seed)) => Box::new(Flat::new(seed)),
        (Source::Flat, None) => Box::new(Flat::from_entropy()),
        (Source::Natural, Some(seed)) => Box::new(Natural::new(seed)),
        (Source::Natural, None) => Box::new(Natural::from_entropy()),
    }
}

fn print_words(words: &[Word], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(words)?);
    } else {
        for word in words {
            println!("{}", word);
        }
    }
    Ok(())
}
