//! Configuration validation.
//!
//! Checks the `[report]` and `[score]` sections before any file is touched.

use crate::domain::error::BtscanError;
use crate::domain::metrics_record::Field;
use crate::ports::config_port::ConfigPort;

pub fn validate_report_config(config: &dyn ConfigPort) -> Result<(), BtscanError> {
    validate_delimiter(config)?;
    validate_sort_key(config)?;
    validate_positive(config, "report", "top_n")?;
    validate_filter(config)?;
    Ok(())
}

pub fn validate_score_config(config: &dyn ConfigPort) -> Result<(), BtscanError> {
    validate_columns(config)?;
    validate_positive(config, "score", "top_n")?;
    validate_threshold(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BtscanError {
    BtscanError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Parse a configured delimiter: exactly one ASCII character that is not the
/// quote character or a line break. `tab` and `semicolon` name the two
/// characters an INI file cannot hold as a bare value.
pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    let value = match value {
        "\\t" | "tab" => "\t",
        "semicolon" => ";",
        other => other,
    };
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() && !matches!(c, '\'' | '\n' | '\r') => Ok(c as u8),
        _ => Err(format!(
            "delimiter must be a single ASCII character other than a quote or newline, found '{}'",
            value
        )),
    }
}

fn validate_delimiter(config: &dyn ConfigPort) -> Result<(), BtscanError> {
    if let Some(value) = config.get_string("report", "delimiter") {
        parse_delimiter(&value).map_err(|reason| invalid("report", "delimiter", reason))?;
    }
    Ok(())
}

fn validate_field_name(config: &dyn ConfigPort, key: &str) -> Result<(), BtscanError> {
    if let Some(value) = config.get_string("report", key) {
        value
            .parse::<Field>()
            .map_err(|reason| invalid("report", key, reason))?;
    }
    Ok(())
}

fn validate_sort_key(config: &dyn ConfigPort) -> Result<(), BtscanError> {
    validate_field_name(config, "sort_key")
}

fn validate_positive(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), BtscanError> {
    if config.get_string(section, key).is_none() {
        return Ok(());
    }
    let value = config.get_int(section, key, 0);
    if value < 1 {
        return Err(invalid(section, key, format!("{} must be at least 1", key)));
    }
    Ok(())
}

fn validate_filter(config: &dyn ConfigPort) -> Result<(), BtscanError> {
    validate_field_name(config, "filter_key")?;

    let has_key = config.get_string("report", "filter_key").is_some();
    let min = config.get_string("report", "filter_min");
    match (has_key, min) {
        (true, None) => Err(BtscanError::ConfigMissing {
            section: "report".to_string(),
            key: "filter_min".to_string(),
        }),
        (false, Some(_)) => Err(BtscanError::ConfigMissing {
            section: "report".to_string(),
            key: "filter_key".to_string(),
        }),
        (true, Some(raw)) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(()),
            _ => Err(invalid("report", "filter_min", "filter_min must be a number")),
        },
        (false, None) => Ok(()),
    }
}

fn validate_columns(config: &dyn ConfigPort) -> Result<(), BtscanError> {
    let key_column = config.get_int("score", "key_column", 2);
    let value_column = config.get_int("score", "value_column", 11);

    if key_column < 0 {
        return Err(invalid("score", "key_column", "key_column must be non-negative"));
    }
    if value_column < 0 {
        return Err(invalid("score", "value_column", "value_column must be non-negative"));
    }
    if key_column == value_column {
        return Err(invalid(
            "score",
            "value_column",
            "value_column must differ from key_column",
        ));
    }
    Ok(())
}

fn validate_threshold(config: &dyn ConfigPort) -> Result<(), BtscanError> {
    if let Some(raw) = config.get_string("score", "threshold") {
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => {}
            _ => return Err(invalid("score", "threshold", "threshold must be a number")),
        }
    }
    Ok(())
}
