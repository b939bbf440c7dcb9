//! Delimited report writer.
//!
//! Columns are fixed by [`REPORT_COLUMNS`]; the DNA sits in column 2 and the
//! annual return in column 11, which is the layout the folder scorer reads
//! back. Fields are quoted with `'` only when needed. Char-map DNA never
//! contains `'` or `"`, so it reads back unchanged.

use crate::domain::aggregate::RankedReport;
use crate::domain::error::BtscanError;
use crate::domain::metrics_record::{Field, MetricsRecord};
use crate::ports::report_port::ReportPort;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const REPORT_COLUMNS: [Field; 24] = [
    Field::Symbol,
    Field::Tf,
    Field::Dna,
    Field::StartDate,
    Field::FinishDate,
    Field::TotalTrades,
    Field::NOfLongs,
    Field::NOfShorts,
    Field::TotalProfit,
    Field::MaxMarginRatio,
    Field::MaxDd,
    Field::AnnualReturn,
    Field::WinRate,
    Field::Serenity,
    Field::Sharpe,
    Field::Calmar,
    Field::WinStrk,
    Field::LoseStrk,
    Field::LargestWin,
    Field::LargestLose,
    Field::NOfWins,
    Field::NOfLoses,
    Field::PaidFees,
    Field::MarketChange,
];

/// Default header: the column names.
pub fn default_header() -> Vec<String> {
    REPORT_COLUMNS.iter().map(|f| f.name().to_string()).collect()
}

/// Header cells with brackets and quote characters removed.
pub fn clean_header<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names
        .iter()
        .map(|n| {
            n.as_ref()
                .chars()
                .filter(|c| !matches!(c, '[' | ']' | '\'' | '"'))
                .collect::<String>()
                .trim()
                .to_string()
        })
        .collect()
}

pub struct CsvReportAdapter {
    delimiter: u8,
    header: Vec<String>,
}

impl CsvReportAdapter {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            header: default_header(),
        }
    }

    pub fn with_header<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.header = clean_header(names);
        self
    }

    /// Write the header and one row per record to `writer`.
    pub fn write_to<W: Write>(&self, report: &RankedReport, writer: W) -> Result<(), BtscanError> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote(b'\'')
            .quote_style(csv::QuoteStyle::Necessary)
            .flexible(true)
            .from_writer(writer);

        wtr.write_record(&self.header)?;
        for record in &report.rows {
            wtr.write_record(row_cells(record))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &RankedReport, output_path: &Path) -> Result<(), BtscanError> {
        let file = File::create(output_path)?;
        self.write_to(report, file)?;
        tracing::info!(
            path = %output_path.display(),
            rows = report.len(),
            "report written"
        );
        Ok(())
    }
}

fn row_cells(record: &MetricsRecord) -> Vec<String> {
    REPORT_COLUMNS
        .iter()
        .map(|field| {
            record
                .get(*field)
                .map(|v| v.to_string())
                .unwrap_or_default()
        })
        .collect()
}
