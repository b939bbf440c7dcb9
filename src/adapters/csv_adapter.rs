//! CSV result folder adapter.
//!
//! Reads every `*.csv` file directly inside a folder. Files are comma
//! delimited, quoted with `'`, and start with a header row.

use crate::domain::error::BtscanError;
use crate::ports::results_port::ResultsPort;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }
}

impl ResultsPort for CsvAdapter {
    fn list_files(&self) -> Result<Vec<String>, BtscanError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BtscanError::ResultsData {
            file: self.base_path.display().to_string(),
            reason: format!("failed to read directory: {}", e),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if is_csv && path.is_file() {
                files.push(path.display().to_string());
            }
        }

        files.sort();
        Ok(files)
    }

    fn read_rows(&self, file: &str) -> Result<Vec<Vec<String>>, BtscanError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b',')
            .quote(b'\'')
            .has_headers(true)
            .flexible(true)
            .from_path(file)
            .map_err(|e| BtscanError::ResultsData {
                file: file.to_string(),
                reason: e.to_string(),
            })?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| BtscanError::ResultsData {
                file: file.to_string(),
                reason: format!("CSV parse error: {}", e),
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        debug!(file, rows = rows.len(), "read result file");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("b.csv"),
            "symbol,tf,dna\nBTC-USDT,2h,'(w,a'\nETH-USDT,4h,0034203\n",
        )
        .unwrap();
        fs::write(dir.path().join("a.csv"), "symbol,tf,dna\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();
        dir
    }

    #[test]
    fn lists_only_csv_files_sorted() {
        let dir = setup();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let files = adapter.list_files().unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.csv"));
        assert!(files[1].ends_with("b.csv"));
    }

    #[test]
    fn reads_rows_without_header_and_unquotes() {
        let dir = setup();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let file = dir.path().join("b.csv").display().to_string();
        let rows = adapter.read_rows(&file).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["BTC-USDT", "2h", "(w,a"]);
        assert_eq!(rows[1][2], "0034203");
    }

    #[test]
    fn missing_folder_is_error() {
        let adapter = CsvAdapter::new(PathBuf::from("/nonexistent/results"));
        assert!(matches!(
            adapter.list_files(),
            Err(BtscanError::ResultsData { .. })
        ));
    }
}
