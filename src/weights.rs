//! Weights of alternatives and expansion of optional (`?`) characters.

use crate::random::rank_weight;
use crate::utils::ParseErrorKind;

/// One concrete alternative with the probability of choosing it
#[derive(Debug, Clone, PartialEq)]
pub struct Weighted {
    pub text: String,
    pub weight: f64,
}

impl Weighted {
    pub fn new(text: impl Into<String>, weight: f64) -> Self {
        Weighted {
            text: text.into(),
            weight,
        }
    }
}

/// Splits `name:weight` tokens and assigns every alternative a weight.
///
/// Either all tokens carry an explicit weight or none do. Without explicit
/// weights, earlier tokens are favoured by [`rank_weight`]. The result is
/// normalized to sum to 1.
pub fn calc_weights(tokens: &[&str]) -> Result<Vec<Weighted>, ParseErrorKind> {
    if tokens.is_empty() {
        return Err(ParseErrorKind::NoAlternatives);
    }

    let n = tokens.len() as u64;
    let explicit = tokens[0].contains(':');
    let mut weighted = Vec::with_capacity(tokens.len());

    for (i, token) in tokens.iter().enumerate() {
        let parts: Vec<&str> = token.split(':').collect();
        match (explicit, parts.as_slice()) {
            (false, [text]) => weighted.push(Weighted::new(*text, rank_weight(i as u64, n))),
            (true, [text, weight]) => {
                let weight: f64 = weight
                    .parse()
                    .map_err(|_| ParseErrorKind::InvalidWeight(token.to_string()))?;
                if !weight.is_finite() || weight < 0.0 {
                    return Err(ParseErrorKind::InvalidWeight(token.to_string()));
                }
                weighted.push(Weighted::new(*text, weight));
            }
            (_, [_]) | (false, [_, _]) => return Err(ParseErrorKind::MixedWeights),
            _ => return Err(ParseErrorKind::InvalidWeight(token.to_string())),
        }
    }

    let sum: f64 = weighted.iter().map(|w| w.weight).sum();
    if sum <= 0.0 {
        return Err(ParseErrorKind::ZeroWeightSum);
    }
    for w in &mut weighted {
        w.weight /= sum;
    }

    Ok(weighted)
}

/// Expands every `?` in `token` into the variants with and without the
/// character preceding it.
///
/// The variant keeping the character stays in place and gets `rate` of the
/// weight, the one dropping it is appended with `1 - rate`. Without `?` the
/// token is returned unchanged.
pub fn expand_optional(token: &str, weight: f64, rate: f64) -> Vec<Weighted> {
    let mut variants = vec![Weighted::new(String::new(), weight)];

    for c in token.chars() {
        if c == '?' {
            let n = variants.len();
            for i in 0..n {
                let mut dropped = variants[i].text.clone();
                dropped.pop();
                let weight = variants[i].weight;
                variants.push(Weighted::new(dropped, weight * (1.0 - rate)));
                variants[i].weight = weight * rate;
            }
        } else {
            for v in &mut variants {
                v.text.push(c);
            }
        }
    }

    variants
}
