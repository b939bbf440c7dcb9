#![allow(dead_code)]

use btscan::domain::error::BtscanError;
use btscan::ports::results_port::ResultsPort;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Saved output of one completed backtest run.
pub const COMPLETE_REPORT: &str = r#"
 loading candles...
 exchange        | symbol   | timeframe   | strategy    | DNA
-----------------+----------+-------------+-------------+-------
 Binance Futures | BTC-USDT | 2h          | TrendSwing  | (w,;A

 starting-ending date | 2021-01-01 => 2021-03-01

 Total Closed Trades            | 42
 Total Net Profit               | 5,320.45 (53.2045%)
 Starting => Finishing Balance  | 10,000 => 15,320.45
 Total Paid Fees                | 310.5
 Max Drawdown                   | -12.43%
 Annual Return                  | 57.21%
 Percent Profitable             | 55%
 Serenity Index                 | 1.6
 Sharpe Ratio                   | 2.45
 Calmar Ratio                   | 4.6
 Sortino Ratio                  | 3.1
 Smart Sharpe                   | 2.31
 Smart Sortino                  | 3.07
 Winning Streak                 | 5
 Losing Streak                  | 3
 Longs | Shorts                 | 60% | 40%
 Largest Winning Trade          | 1,015.22
 Largest Losing Trade           | -432.10
 Total Winning Trades           | 23
 Total Losing Trades            | 19
 Market Change                  | 45.7%
 Max. Margin Ratio              | 23.456
 Minimum Margin                 | 1500.6
"#;

pub const NO_TRADES_REPORT: &str = r#"
 exchange        | symbol   | timeframe   | strategy    | DNA
-----------------+----------+-------------+-------------+-------
 Binance Futures | ETH-USDT | 4h          | TrendSwing  | 0034203

 starting-ending date | 2021-01-01 => 2021-03-01
 No trades were made
 Total Closed Trades            | 0
"#;

pub const ABORTED_REPORT: &str = r#"
 exchange        | symbol   | timeframe   | strategy    | DNA
-----------------+----------+-------------+-------------+-------
 Binance Futures | ETH-USDT | 4h          | TrendSwing  | 0034203
 Uncaught Exception: ValueError: hp value must be within the range
"#;

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Result tables held in memory, keyed by file name.
pub struct MockResultsPort {
    pub files: Vec<(String, Vec<Vec<String>>)>,
    pub errors: HashMap<String, String>,
}

impl MockResultsPort {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_file(mut self, name: &str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        self.files.push((name.to_string(), rows));
        self
    }

    pub fn with_error(mut self, name: &str, reason: &str) -> Self {
        self.files.push((name.to_string(), Vec::new()));
        self.errors.insert(name.to_string(), reason.to_string());
        self
    }
}

impl ResultsPort for MockResultsPort {
    fn list_files(&self) -> Result<Vec<String>, BtscanError> {
        Ok(self.files.iter().map(|(name, _)| name.clone()).collect())
    }

    fn read_rows(&self, file: &str) -> Result<Vec<Vec<String>>, BtscanError> {
        if let Some(reason) = self.errors.get(file) {
            return Err(BtscanError::ResultsData {
                file: file.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .files
            .iter()
            .find(|(name, _)| name == file)
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}

/// A row in the report layout: key in column 2, value in column 11.
pub fn score_row(key: &str, value: &str) -> Vec<String> {
    let mut row = vec![String::new(); 12];
    row[0] = "BTC-USDT".into();
    row[2] = key.into();
    row[11] = value.into();
    row
}
