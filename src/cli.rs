//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::{clean_header, CsvReportAdapter, REPORT_COLUMNS};
use crate::adapters::exchange_info_adapter::ExchangeInfoAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::layered_config_adapter::LayeredConfigAdapter;
use crate::domain::aggregate::{rank, RankOptions, RankedReport, Threshold};
use crate::domain::config_validation::{
    parse_delimiter, validate_report_config, validate_score_config,
};
use crate::domain::dna::{
    decode_base32, decode_padded, decode_padded_into, encode_base32, encode_charmap, encode_padded,
};
use crate::domain::error::BtscanError;
use crate::domain::extract::{extract, ExtractError, Extraction};
use crate::domain::hyperparams::{parse_params, parse_ranges};
use crate::domain::metrics_record::{Field, MetricsRecord};
use crate::domain::routes::{example_route, inject_dna};
use crate::domain::score::{score, ScoreOptions, ScoreResult};
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::ports::symbol_port::SymbolPort;

#[derive(Parser, Debug)]
#[command(name = "btscan", about = "Backtest report scanner and hyperparameter DNA codec")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    /// Zero-padded digits with a trailing width digit (reversible)
    Padded,
    /// One character per parameter, scaled into its range (one-way)
    Charmap,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode hyperparameters into a DNA string
    Encode {
        /// Parameters as name=value,name=value
        #[arg(short, long)]
        params: String,
        #[arg(long, value_enum, default_value_t = Scheme::Padded)]
        scheme: Scheme,
        /// Ranges as name=min:max,... (charmap only)
        #[arg(short, long)]
        ranges: Option<String>,
        /// Print the DNA as a base32 tag
        #[arg(long)]
        base32: bool,
    },
    /// Decode a padded DNA string
    Decode {
        #[arg(short, long)]
        dna: String,
        /// Parameter names in DNA order, comma separated
        #[arg(short, long)]
        names: Option<String>,
        /// The DNA is given as a base32 tag
        #[arg(long)]
        base32: bool,
    },
    /// Convert any DNA string to its base32 tag, or back with --decode
    Tag {
        value: String,
        #[arg(long)]
        decode: bool,
    },
    /// Extract metrics from saved backtest output and rank them
    Extract {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        sort_key: Option<String>,
        #[arg(long)]
        top: Option<usize>,
        #[arg(long)]
        delimiter: Option<String>,
    },
    /// Rank DNAs across a folder of result tables
    Score {
        #[arg(short, long)]
        folder: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        top: Option<usize>,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// List tradable symbols from a cached exchange-info file
    ListSymbols {
        #[arg(long)]
        exchange_info: PathBuf,
        #[arg(long, default_value = "USDT")]
        quote: String,
    },
    /// Substitute a DNA string into a routes template
    Routes {
        #[arg(short, long)]
        template: PathBuf,
        #[arg(short, long)]
        anchor: String,
        #[arg(short, long)]
        dna: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Encode {
            params,
            scheme,
            ranges,
            base32,
        } => report_result(
            encode_dna(&params, scheme, ranges.as_deref(), base32).map(|dna| {
                println!("{}", dna);
            }),
        ),
        Command::Decode { dna, names, base32 } => {
            report_result(decode_dna(&dna, names.as_deref(), base32).map(|lines| {
                for line in lines {
                    println!("{}", line);
                }
            }))
        }
        Command::Tag { value, decode } => report_result(convert_tag(&value, decode).map(|out| {
            println!("{}", out);
        })),
        Command::Extract {
            inputs,
            config,
            output,
            sort_key,
            top,
            delimiter,
        } => run_extract(
            &inputs,
            config.as_ref(),
            output.as_ref(),
            sort_key.as_deref(),
            top,
            delimiter.as_deref(),
        ),
        Command::Score {
            folder,
            config,
            top,
            threshold,
        } => run_score(folder.as_ref(), config.as_ref(), top, threshold),
        Command::ListSymbols {
            exchange_info,
            quote,
        } => run_list_symbols(&exchange_info, &quote),
        Command::Routes {
            template,
            anchor,
            dna,
            output,
        } => run_routes(&template, &anchor, &dna, output.as_ref()),
    }
}

fn report_result(result: Result<(), BtscanError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, BtscanError> {
    match path {
        Some(path) => {
            FileConfigAdapter::from_file(path).map_err(|e| BtscanError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

pub fn encode_dna(
    params: &str,
    scheme: Scheme,
    ranges: Option<&str>,
    base32: bool,
) -> Result<String, BtscanError> {
    let hp = parse_params(params)?;
    let dna = match scheme {
        Scheme::Padded => encode_padded(&hp)?,
        Scheme::Charmap => {
            let ranges = ranges.ok_or_else(|| BtscanError::HyperparamSyntax {
                reason: "charmap encoding needs --ranges".into(),
            })?;
            encode_charmap(&hp, &parse_ranges(ranges)?)?
        }
    };
    if base32 {
        return Ok(encode_base32(&dna)?);
    }
    Ok(dna)
}

/// Printable lines for a decoded DNA: raw chunks, or `name = value` pairs
/// when names are given.
pub fn decode_dna(dna: &str, names: Option<&str>, base32: bool) -> Result<Vec<String>, BtscanError> {
    let dna = if base32 {
        decode_base32(dna)?
    } else {
        dna.to_string()
    };
    match names {
        None => Ok(decode_padded(&dna)?),
        Some(names) => {
            let names: Vec<&str> = names.split(',').map(str::trim).collect();
            let hp = decode_padded_into(&names, &dna)?;
            Ok(hp.iter().map(|(n, v)| format!("{} = {}", n, v)).collect())
        }
    }
}

pub fn convert_tag(value: &str, decode: bool) -> Result<String, BtscanError> {
    let out = if decode {
        decode_base32(value)?
    } else {
        encode_base32(value)?
    };
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub delimiter: u8,
    pub rank: RankOptions,
    /// Replacement header names, one per report column.
    pub header: Option<Vec<String>>,
}

/// Resolve `[report]` settings. Command-line values replace their config keys
/// before validation, so a bad config value that is overridden is never read.
pub fn build_report_settings(
    config: &dyn ConfigPort,
    sort_key: Option<&str>,
    top: Option<usize>,
    delimiter: Option<&str>,
) -> Result<ReportSettings, BtscanError> {
    let config = LayeredConfigAdapter::new(config)
        .with("report", "sort_key", sort_key)
        .with("report", "top_n", top)
        .with("report", "delimiter", delimiter);
    validate_report_config(&config)?;

    let invalid = |key: &str, reason: String| BtscanError::ConfigInvalid {
        section: "report".into(),
        key: key.into(),
        reason,
    };

    let delimiter = match config.get_string("report", "delimiter") {
        Some(d) => parse_delimiter(&d).map_err(|r| invalid("delimiter", r))?,
        None => b',',
    };

    let key = match config.get_string("report", "sort_key") {
        Some(k) => k.parse::<Field>().map_err(|r| invalid("sort_key", r))?,
        None => Field::TotalProfit,
    };

    let top_n = config
        .get_string("report", "top_n")
        .map(|_| config.get_int("report", "top_n", 1) as usize);

    let filter = match config.get_string("report", "filter_key") {
        Some(k) => Some(Threshold {
            field: k.parse::<Field>().map_err(|r| invalid("filter_key", r))?,
            min: config.get_double("report", "filter_min", 0.0),
        }),
        None => None,
    };

    let header = match config.get_string("report", "header") {
        Some(raw) => {
            let names = clean_header(&raw.split(',').collect::<Vec<_>>());
            if names.len() != REPORT_COLUMNS.len() || names.iter().any(String::is_empty) {
                return Err(invalid(
                    "header",
                    format!(
                        "header needs {} non-empty names, found {}",
                        REPORT_COLUMNS.len(),
                        names.len()
                    ),
                ));
            }
            Some(names)
        }
        None => None,
    };

    Ok(ReportSettings {
        delimiter,
        rank: RankOptions { key, top_n, filter },
        header,
    })
}

/// Resolve `[score]` settings, with command-line values taking precedence.
pub fn build_score_options(
    config: &dyn ConfigPort,
    top: Option<usize>,
    threshold: Option<f64>,
) -> Result<ScoreOptions, BtscanError> {
    let config = LayeredConfigAdapter::new(config)
        .with("score", "top_n", top)
        .with("score", "threshold", threshold);
    validate_score_config(&config)?;
    let defaults = ScoreOptions::default();

    Ok(ScoreOptions {
        key_column: config.get_int("score", "key_column", defaults.key_column as i64) as usize,
        value_column: config.get_int("score", "value_column", defaults.value_column as i64)
            as usize,
        top_n: config.get_int("score", "top_n", defaults.top_n as i64) as usize,
        threshold: config.get_double("score", "threshold", defaults.threshold),
    })
}

pub fn resolve_folder(folder_override: Option<&PathBuf>, config: &dyn ConfigPort) -> Option<PathBuf> {
    folder_override
        .cloned()
        .or_else(|| config.get_string("score", "folder").map(PathBuf::from))
}

/// Read and extract one saved report. On abort, the raw report is written to
/// stderr before the error is returned.
pub fn scan_report(path: &Path) -> Result<Extraction, BtscanError> {
    let text = fs::read_to_string(path)?;

    match extract(&text) {
        Ok(extraction) => {
            if let Extraction::Empty { reason, .. } = &extraction {
                warn!(path = %path.display(), marker = reason.marker(), "no results in report");
                if reason.surfaces_report() {
                    eprintln!("{}", text);
                }
            }
            Ok(extraction)
        }
        Err(ExtractError::Aborted { marker, line_no, hint }) => {
            eprintln!("{}", text);
            eprintln!("{}: {} on line {}", path.display(), marker, line_no);
            if let Some(hint) = hint {
                eprintln!("{}", hint);
            }
            Err(ExtractError::Aborted { marker, line_no, hint }.into())
        }
        Err(ExtractError::Parse(e)) => {
            eprintln!("{}: {}", path.display(), e.display_with_context());
            Err(ExtractError::Parse(e).into())
        }
    }
}

/// Extract every input in order. The first abort or parse failure ends the batch.
pub fn scan_reports(inputs: &[PathBuf]) -> Result<Vec<MetricsRecord>, BtscanError> {
    let mut records = Vec::with_capacity(inputs.len());
    for path in inputs {
        info!(path = %path.display(), "scanning report");
        records.push(scan_report(path)?.into_record());
    }
    Ok(records)
}

fn run_extract(
    inputs: &[PathBuf],
    config_path: Option<&PathBuf>,
    output_path: Option<&PathBuf>,
    sort_key: Option<&str>,
    top: Option<usize>,
    delimiter: Option<&str>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return report_result(Err(e)),
    };
    let settings = match build_report_settings(&config, sort_key, top, delimiter) {
        Ok(s) => s,
        Err(e) => return report_result(Err(e)),
    };

    eprintln!("Scanning {} report(s)...", inputs.len());
    let records = match scan_reports(inputs) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let report = rank(records, &settings.rank);
    print_ranked(&report);

    if let Some(output) = output_path {
        let mut writer = CsvReportAdapter::new(settings.delimiter);
        if let Some(header) = &settings.header {
            writer = writer.with_header(header.as_slice());
        }
        if let Err(e) = writer.write(&report, output) {
            return report_result(Err(e));
        }
        eprintln!("\nReport written to: {}", output.display());
    }
    ExitCode::SUCCESS
}

fn cell(record: &MetricsRecord, field: Field) -> String {
    record
        .get(field)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

const CONSOLE_COLUMNS: [Field; 15] = [
    Field::Dna,
    Field::TotalTrades,
    Field::NOfLongs,
    Field::NOfShorts,
    Field::TotalProfit,
    Field::MaxMarginRatio,
    Field::Pmr,
    Field::MaxDd,
    Field::AnnualReturn,
    Field::WinRate,
    Field::Serenity,
    Field::Sharpe,
    Field::Calmar,
    Field::PaidFees,
    Field::MarketChange,
];

fn print_ranked(report: &RankedReport) {
    let header: Vec<String> = CONSOLE_COLUMNS
        .iter()
        .map(|f| format!("{:>14}", f.name()))
        .collect();
    println!("{}", header.join(" "));

    for record in &report.rows {
        let row: Vec<String> = CONSOLE_COLUMNS
            .iter()
            .map(|f| format!("{:>14}", cell(record, *f)))
            .collect();
        println!("{}", row.join(" "));
    }
}

fn run_score(
    folder_override: Option<&PathBuf>,
    config_path: Option<&PathBuf>,
    top: Option<usize>,
    threshold: Option<f64>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return report_result(Err(e)),
    };
    let options = match build_score_options(&config, top, threshold) {
        Ok(o) => o,
        Err(e) => return report_result(Err(e)),
    };
    let folder = match resolve_folder(folder_override, &config) {
        Some(f) => f,
        None => {
            let err = BtscanError::ConfigMissing {
                section: "score".into(),
                key: "folder".into(),
            };
            return report_result(Err(err));
        }
    };

    eprintln!("Looking for files in: {}", folder.display());
    let result = match score(&CsvAdapter::new(folder), &options) {
        Ok(r) => r,
        Err(e) => return report_result(Err(e)),
    };
    eprintln!("Found {} csv files...", result.files.len());

    print_score(&result);
    ExitCode::SUCCESS
}

fn print_score(result: &ScoreResult) {
    for total in &result.totals {
        println!("{} {:.2}", total.key, total.total);
    }
    println!("{}", "*".repeat(50));

    for entry in &result.top {
        println!("Dna and pairs: {} {:.2}", entry.key, entry.total);
        for detail in &entry.details {
            println!("  {}", detail.row.join(", "));
        }
    }
}

fn run_list_symbols(exchange_info: &Path, quote: &str) -> ExitCode {
    let adapter = match ExchangeInfoAdapter::from_file(exchange_info) {
        Ok(a) => a,
        Err(e) => return report_result(Err(e)),
    };
    let symbols = match adapter.list_symbols(quote) {
        Ok(s) => s,
        Err(e) => return report_result(Err(e)),
    };

    if symbols.is_empty() {
        eprintln!("No symbols quoted in {}", quote);
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

/// Render the routes template with `dna` in place of `anchor`.
pub fn render_routes(template_path: &Path, anchor: &str, dna: &str) -> Result<String, BtscanError> {
    let template = fs::read_to_string(template_path)?;
    inject_dna(&template, anchor, dna)
}

fn run_routes(template: &Path, anchor: &str, dna: &str, output: Option<&PathBuf>) -> ExitCode {
    let rendered = match render_routes(template, anchor, dna) {
        Ok(r) => r,
        Err(e @ BtscanError::RouteAnchorMissing { .. }) => {
            eprintln!("error: {e}");
            eprintln!("\nReplace the dna strings in the routes file with anchors, e.g.:\n");
            eprintln!("{}", example_route(anchor));
            return (&e).into();
        }
        Err(e) => return report_result(Err(e)),
    };

    let output = output
        .cloned()
        .unwrap_or_else(|| PathBuf::from("routes.py"));
    match fs::write(&output, rendered) {
        Ok(()) => {
            eprintln!("Routes written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => report_result(Err(e.into())),
    }
}
