//! Access to folders of per-run result tables.

use crate::domain::error::BtscanError;

pub trait ResultsPort {
    /// Result files in a stable order.
    fn list_files(&self) -> Result<Vec<String>, BtscanError>;

    /// Data rows of one file; the header row is not included.
    fn read_rows(&self, file: &str) -> Result<Vec<Vec<String>>, BtscanError>;
}
