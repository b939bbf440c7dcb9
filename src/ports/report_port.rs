//! Report output port.

use crate::domain::aggregate::RankedReport;
use crate::domain::error::BtscanError;
use std::path::Path;

/// Port for writing ranked reports.
pub trait ReportPort {
    fn write(&self, report: &RankedReport, output_path: &Path) -> Result<(), BtscanError>;
}
