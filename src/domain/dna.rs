//! Hyperparameter DNA codec.
//!
//! Two schemes share this module:
//!
//! - **padded**: every value zero-padded to the widest value's decimal width,
//!   concatenated, then one trailing digit holding that width. Reversible.
//! - **charmap**: every value rescaled from its declared range into the
//!   ordinal range `[40, 119]` and emitted as one character. Lossy and
//!   one-way; there is no decoder for it.
//!
//! Either form can be wrapped in an RFC 4648 base32 tag (upper-case letters,
//! digits 2-7 and `=` padding), which survives case-folding file systems and
//! shell quoting. The tag decodes back to the exact DNA string.

use crate::domain::hyperparams::{HyperparameterSet, HyperparameterSpec};
use data_encoding::BASE32;

pub const CHARMAP_MIN_ORD: u32 = 40;
pub const CHARMAP_MAX_ORD: u32 = 119;

/// The footer is a single decimal digit.
pub const MAX_PADDED_WIDTH: usize = 9;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DnaError {
    #[error("value width {width} does not fit a single-digit footer (max {MAX_PADDED_WIDTH})")]
    Encoding { width: usize },

    #[error("padded DNA supports non-negative integers only: {name} = {value}")]
    UnsupportedValue { name: String, value: f64 },

    #[error("malformed DNA string '{dna}': {reason}")]
    Decoding { dna: String, reason: String },

    #[error("{name} = {value} lies outside [{min}, {max}]")]
    Range {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid range for {name}: min {min} must be below max {max}")]
    InvalidRange { name: String, min: f64, max: f64 },

    #[error("no range declared for {name}")]
    MissingRange { name: String },
}

/// Encode `hp` with the padded scheme.
pub fn encode_padded(hp: &HyperparameterSet) -> Result<String, DnaError> {
    let mut rendered = Vec::with_capacity(hp.len());
    for (name, value) in hp.iter() {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return Err(DnaError::UnsupportedValue {
                name: name.to_string(),
                value,
            });
        }
        rendered.push((value as u64).to_string());
    }

    let width = rendered.iter().map(String::len).max().unwrap_or(0);
    if width > MAX_PADDED_WIDTH {
        return Err(DnaError::Encoding { width });
    }

    let mut seq = String::with_capacity(width * rendered.len() + 1);
    for value in &rendered {
        seq.push_str(&format!("{:0>width$}", value, width = width));
    }
    seq.push_str(&width.to_string());
    Ok(seq)
}

/// Split a padded DNA string into its raw fixed-width chunks.
pub fn decode_padded(seq: &str) -> Result<Vec<String>, DnaError> {
    let decoding = |reason: String| DnaError::Decoding {
        dna: seq.to_string(),
        reason,
    };

    let footer = seq
        .chars()
        .last()
        .ok_or_else(|| decoding("empty string".into()))?;
    let width = footer
        .to_digit(10)
        .ok_or_else(|| decoding(format!("footer '{}' is not a digit", footer)))?
        as usize;

    let body = &seq[..seq.len() - footer.len_utf8()];
    if let Some(bad) = body.chars().find(|c| !c.is_ascii_digit()) {
        return Err(decoding(format!("non-digit character '{}' in body", bad)));
    }

    if width == 0 {
        if body.is_empty() {
            return Ok(Vec::new());
        }
        return Err(decoding("zero width with non-empty body".into()));
    }
    if body.len() % width != 0 {
        return Err(decoding(format!(
            "body length {} is not a multiple of width {}",
            body.len(),
            width
        )));
    }

    Ok(body
        .as_bytes()
        .chunks(width)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect())
}

/// Decode a padded DNA string to numbers: leading zeros are dropped and
/// each chunk is read as an unsigned integer.
pub fn decode_padded_values(seq: &str) -> Result<Vec<u64>, DnaError> {
    decode_padded(seq)?
        .iter()
        .map(|chunk| {
            let digits = chunk.trim_start_matches('0');
            if digits.is_empty() {
                return Ok(0);
            }
            digits.parse::<u64>().map_err(|e| DnaError::Decoding {
                dna: seq.to_string(),
                reason: format!("chunk '{}': {}", chunk, e),
            })
        })
        .collect()
}

/// Decode a padded DNA string and re-attach parameter names in order.
pub fn decode_padded_into(names: &[&str], seq: &str) -> Result<HyperparameterSet, DnaError> {
    let values = decode_padded_values(seq)?;
    if values.len() != names.len() {
        return Err(DnaError::Decoding {
            dna: seq.to_string(),
            reason: format!(
                "{} values for {} parameter names",
                values.len(),
                names.len()
            ),
        });
    }
    Ok(names
        .iter()
        .zip(values)
        .map(|(name, value)| (*name, value as f64))
        .collect())
}

/// Encode `hp` with the charmap scheme using the ranges declared in `spec`.
pub fn encode_charmap(hp: &HyperparameterSet, spec: &HyperparameterSpec) -> Result<String, DnaError> {
    let mut dna = String::with_capacity(hp.len());

    for (name, value) in hp.iter() {
        let range = spec.range(name).ok_or_else(|| DnaError::MissingRange {
            name: name.to_string(),
        })?;
        if !(range.min < range.max) {
            return Err(DnaError::InvalidRange {
                name: name.to_string(),
                min: range.min,
                max: range.max,
            });
        }
        if !(value >= range.min && value <= range.max) {
            return Err(DnaError::Range {
                name: name.to_string(),
                value,
                min: range.min,
                max: range.max,
            });
        }

        let ordinal = rescale(
            value,
            range.min,
            range.max,
            CHARMAP_MIN_ORD as f64,
            CHARMAP_MAX_ORD as f64,
        )
        .round_ties_even() as u32;
        let ordinal = ordinal.clamp(CHARMAP_MIN_ORD, CHARMAP_MAX_ORD);
        // Every ordinal in [40, 119] is printable ASCII.
        dna.push(char::from(ordinal as u8));
    }

    Ok(dna)
}

/// Wrap an ASCII DNA string in a base32 tag.
pub fn encode_base32(dna: &str) -> Result<String, DnaError> {
    if let Some(bad) = dna.chars().find(|c| !c.is_ascii()) {
        return Err(DnaError::Decoding {
            dna: dna.to_string(),
            reason: format!("non-ASCII character '{}'", bad),
        });
    }
    Ok(BASE32.encode(dna.as_bytes()))
}

/// Recover the DNA string from a base32 tag.
pub fn decode_base32(tag: &str) -> Result<String, DnaError> {
    let decoding = |reason: String| DnaError::Decoding {
        dna: tag.to_string(),
        reason,
    };

    let bytes = BASE32
        .decode(tag.trim().as_bytes())
        .map_err(|e| decoding(format!("invalid base32: {}", e)))?;
    if !bytes.is_ascii() {
        return Err(decoding("tag does not hold an ASCII DNA string".into()));
    }
    String::from_utf8(bytes).map_err(|e| decoding(e.to_string()))
}

fn rescale(value: f64, old_min: f64, old_max: f64, new_min: f64, new_max: f64) -> f64 {
    (value - old_min) * (new_max - new_min) / (old_max - old_min) + new_min
}
