//! Two-pass scoring over a folder of result tables.
//!
//! Pass one sums a value column per key across every row of every file and
//! ranks the keys. Pass two reads the files again and recovers the full rows
//! of the top keys whose value clears the threshold.

use crate::domain::error::BtscanError;
use crate::ports::results_port::ResultsPort;
use std::collections::HashMap;
use tracing::{debug, info};

pub const DEFAULT_KEY_COLUMN: usize = 2;
pub const DEFAULT_VALUE_COLUMN: usize = 11;
pub const DEFAULT_TOP_N: usize = 20;
pub const DEFAULT_THRESHOLD: f64 = 2.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOptions {
    pub key_column: usize,
    pub value_column: usize,
    pub top_n: usize,
    pub threshold: f64,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN,
            value_column: DEFAULT_VALUE_COLUMN,
            top_n: DEFAULT_TOP_N,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyTotal {
    pub key: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub file: String,
    pub row: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopEntry {
    pub key: String,
    pub total: f64,
    pub details: Vec<DetailRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreResult {
    pub files: Vec<String>,
    /// Every key in first-seen order.
    pub totals: Vec<KeyTotal>,
    /// Highest totals first.
    pub top: Vec<TopEntry>,
}

pub fn score(source: &dyn ResultsPort, options: &ScoreOptions) -> Result<ScoreResult, BtscanError> {
    let files = source.list_files()?;
    info!(files = files.len(), "scoring result files");

    let totals = sum_by_key(source, &files, options)?;

    let mut ranked = totals.clone();
    ranked.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(options.top_n);

    let top = collect_details(source, &files, ranked, options)?;

    Ok(ScoreResult { files, totals, top })
}

fn sum_by_key(
    source: &dyn ResultsPort,
    files: &[String],
    options: &ScoreOptions,
) -> Result<Vec<KeyTotal>, BtscanError> {
    let mut totals: Vec<KeyTotal> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for file in files {
        for (row_no, row) in source.read_rows(file)?.iter().enumerate() {
            let Some((key, value)) = key_and_value(file, row_no, row, options)? else {
                continue;
            };
            match index.get(key) {
                Some(&i) => totals[i].total += value,
                None => {
                    index.insert(key.to_string(), totals.len());
                    totals.push(KeyTotal {
                        key: key.to_string(),
                        total: value,
                    });
                }
            }
        }
    }

    Ok(totals)
}

fn collect_details(
    source: &dyn ResultsPort,
    files: &[String],
    ranked: Vec<KeyTotal>,
    options: &ScoreOptions,
) -> Result<Vec<TopEntry>, BtscanError> {
    let slots: HashMap<String, usize> = ranked
        .iter()
        .enumerate()
        .map(|(i, t)| (t.key.clone(), i))
        .collect();
    let mut top: Vec<TopEntry> = ranked
        .into_iter()
        .map(|t| TopEntry {
            key: t.key,
            total: t.total,
            details: Vec::new(),
        })
        .collect();

    for file in files {
        for (row_no, row) in source.read_rows(file)?.iter().enumerate() {
            let Some((key, value)) = key_and_value(file, row_no, row, options)? else {
                continue;
            };
            if value <= options.threshold {
                continue;
            }
            if let Some(&slot) = slots.get(key) {
                top[slot].details.push(DetailRow {
                    file: file.clone(),
                    row: row.clone(),
                });
            }
        }
    }

    Ok(top)
}

/// Key and value cells of one row, or `None` when the value cell is empty.
fn key_and_value<'a>(
    file: &str,
    row_no: usize,
    row: &'a [String],
    options: &ScoreOptions,
) -> Result<Option<(&'a str, f64)>, BtscanError> {
    let needed = options.key_column.max(options.value_column) + 1;
    if row.len() < needed {
        return Err(BtscanError::ResultsData {
            file: file.to_string(),
            reason: format!(
                "row {} has {} columns, need at least {}",
                row_no + 1,
                row.len(),
                needed
            ),
        });
    }

    let raw = row[options.value_column].trim();
    if raw.is_empty() {
        debug!(file, row = row_no + 1, "empty value cell skipped");
        return Ok(None);
    }
    let value: f64 = raw.parse().map_err(|_| BtscanError::ResultsData {
        file: file.to_string(),
        reason: format!(
            "row {} column {}: '{}' is not a number",
            row_no + 1,
            options.value_column,
            raw
        ),
    })?;

    Ok(Some((row[options.key_column].as_str(), value)))
}
