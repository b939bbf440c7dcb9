//! Metrics extraction from backtest console output.
//!
//! A single forward scan over the report lines. Each line is checked for the
//! stop markers first, then against the [`RULES`] table; a line may match
//! several rules. The only lookahead is the route table, whose values sit two
//! lines below its header.

use crate::domain::error::ParseError;
use crate::domain::metrics_record::{round_to, Field, MetricValue, MetricsRecord};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Integer token.
    Int,
    /// Float token rounded to the given decimals.
    Float(u32),
    /// Float token rounded to a whole number and stored as an integer.
    Whole,
    /// Last token verbatim.
    Raw,
    /// Last token with `%`, `(`, `)` and `,` removed, stored as text.
    Cleaned,
    /// Float token, 2 decimals, shifted by +100 when negative.
    MarginRatio,
    /// `n_of_longs` and `n_of_shorts` from one line.
    LongsShorts,
    /// `start_date` and `finish_date` separated by `=>`.
    DatePair,
    /// Exchange/symbol/timeframe/strategy/dna read from the line two below.
    RouteHeader,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// All of these must occur in the line.
    pub markers: &'static [&'static str],
    pub field: Field,
    pub kind: ValueKind,
}

const fn rule(markers: &'static [&'static str], field: Field, kind: ValueKind) -> Rule {
    Rule {
        markers,
        field,
        kind,
    }
}

pub const RULES: &[Rule] = &[
    rule(&["starting-ending date"], Field::StartDate, ValueKind::DatePair),
    rule(&["exchange", "symbol", "timeframe"], Field::Exchange, ValueKind::RouteHeader),
    rule(&["Total Closed Trades"], Field::TotalTrades, ValueKind::Int),
    rule(&["Total Net Profit"], Field::TotalProfit, ValueKind::Float(1)),
    rule(&["Max Drawdown"], Field::MaxDd, ValueKind::Float(1)),
    rule(&["Total Paid Fees"], Field::PaidFees, ValueKind::Float(1)),
    rule(&["Annual Return"], Field::AnnualReturn, ValueKind::Whole),
    rule(&["Percent Profitable"], Field::WinRate, ValueKind::Int),
    rule(&["Serenity Index"], Field::Serenity, ValueKind::Whole),
    rule(&["Sharpe Ratio"], Field::Sharpe, ValueKind::Whole),
    rule(&["Calmar Ratio"], Field::Calmar, ValueKind::Whole),
    rule(&["Sortino Ratio"], Field::Sortino, ValueKind::Whole),
    rule(&["Smart Sharpe"], Field::SmartSharpe, ValueKind::Float(1)),
    rule(&["Smart Sortino"], Field::SmartSortino, ValueKind::Float(1)),
    rule(&["Winning Streak"], Field::WinStrk, ValueKind::Int),
    rule(&["Losing Streak"], Field::LoseStrk, ValueKind::Int),
    rule(&["Longs | Shorts"], Field::NOfLongs, ValueKind::LongsShorts),
    rule(&["Largest Winning Trade"], Field::LargestWin, ValueKind::Float(2)),
    rule(&["Largest Losing Trade"], Field::LargestLose, ValueKind::Float(2)),
    rule(&["Total Winning Trades"], Field::NOfWins, ValueKind::Int),
    rule(&["Total Losing Trades"], Field::NOfLoses, ValueKind::Int),
    rule(&["Market Change"], Field::MarketChange, ValueKind::Float(2)),
    rule(&["Dna String:"], Field::Dna, ValueKind::Raw),
    rule(&["Sequential Hps"], Field::SeqHps, ValueKind::Cleaned),
    rule(&["Max. Margin Ratio ", "|"], Field::MaxMarginRatio, ValueKind::MarginRatio),
    rule(&["\"max_margin_ratio\":"], Field::MaxMarginRatio, ValueKind::MarginRatio),
    rule(&["Minimum Margin ", "|"], Field::MinMargin, ValueKind::Float(2)),
];

impl Rule {
    pub fn matches(&self, line: &str) -> bool {
        self.markers.iter().all(|m| line.contains(m))
    }
}

/// Why a scan stopped early without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    CandleNotFound,
    NoTrades,
    InsufficientMargin,
}

impl EmptyReason {
    pub fn marker(self) -> &'static str {
        match self {
            EmptyReason::CandleNotFound => "CandleNotFoundInDatabase",
            EmptyReason::NoTrades => "No trades were made",
            EmptyReason::InsufficientMargin => "InsufficientMargin",
        }
    }

    /// Whether the raw report should be shown to the user.
    pub fn surfaces_report(self) -> bool {
        !matches!(self, EmptyReason::NoTrades)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    #[error("report aborted on line {line_no} ({marker})")]
    Aborted {
        marker: &'static str,
        line_no: usize,
        hint: Option<&'static str>,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Complete(MetricsRecord),
    Empty {
        record: MetricsRecord,
        reason: EmptyReason,
    },
}

impl Extraction {
    pub fn record(&self) -> &MetricsRecord {
        match self {
            Extraction::Complete(record) | Extraction::Empty { record, .. } => record,
        }
    }

    pub fn into_record(self) -> MetricsRecord {
        match self {
            Extraction::Complete(record) | Extraction::Empty { record, .. } => record,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Extraction::Empty { .. })
    }
}

enum Stop {
    Abort(Option<&'static str>),
    Empty(EmptyReason),
}

const ABORTED: &str = "Aborted!";
const UNCAUGHT: &str = "Uncaught Exception";
const RANGE_HINT_MARKER: &str = "must be within the range";

fn check_stop(line: &str) -> Option<(&'static str, Stop)> {
    if line.contains(ABORTED) {
        return Some((
            ABORTED,
            Stop::Abort(Some(
                "possibly the engine's candle cache is corrupt; delete its temp/ folder",
            )),
        ));
    }
    if line.contains(EmptyReason::CandleNotFound.marker()) {
        return Some((
            EmptyReason::CandleNotFound.marker(),
            Stop::Empty(EmptyReason::CandleNotFound),
        ));
    }
    if line.contains(UNCAUGHT) {
        let hint = line
            .contains(RANGE_HINT_MARKER)
            .then_some("Check DNA String in routes file!");
        return Some((UNCAUGHT, Stop::Abort(hint)));
    }
    for reason in [EmptyReason::NoTrades, EmptyReason::InsufficientMargin] {
        if line.contains(reason.marker()) {
            return Some((reason.marker(), Stop::Empty(reason)));
        }
    }
    None
}

/// Scan `text` into a fresh [`MetricsRecord`].
pub fn extract(text: &str) -> Result<Extraction, ExtractError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut record = MetricsRecord::new();

    for (index, line) in lines.iter().enumerate() {
        let line_no = index + 1;

        match check_stop(line) {
            Some((marker, Stop::Abort(hint))) => {
                return Err(ExtractError::Aborted {
                    marker,
                    line_no,
                    hint,
                });
            }
            Some((_, Stop::Empty(reason))) => {
                debug!(line_no, marker = reason.marker(), "scan stopped early");
                return Ok(Extraction::Empty { record, reason });
            }
            None => {}
        }

        for rule in RULES.iter().filter(|r| r.matches(line)) {
            apply_rule(rule, &lines, index, &mut record)?;
            debug!(line_no, field = rule.field.name(), "matched");
        }

        record.update_pmr();
    }

    Ok(Extraction::Complete(record))
}

fn apply_rule(
    rule: &Rule,
    lines: &[&str],
    index: usize,
    record: &mut MetricsRecord,
) -> Result<(), ParseError> {
    let line = lines[index];
    let err = |message: String| ParseError {
        field: rule.field.name(),
        line_no: index + 1,
        line: line.to_string(),
        message,
    };

    match rule.kind {
        ValueKind::Int => {
            let v = parse_int(&clean_value(line)).map_err(err)?;
            record.set(rule.field, MetricValue::Int(v));
        }
        ValueKind::Float(places) => {
            let v = parse_float(&clean_value(line)).map_err(err)?;
            record.set(rule.field, MetricValue::Float(round_to(v, places)));
        }
        ValueKind::Whole => {
            let v = parse_float(&clean_value(line)).map_err(err)?;
            record.set(rule.field, MetricValue::Int(v.round_ties_even() as i64));
        }
        ValueKind::Raw => {
            record.set(rule.field, MetricValue::Text(last_token(line).to_string()));
        }
        ValueKind::Cleaned => {
            record.set(rule.field, MetricValue::Text(clean_value(line)));
        }
        ValueKind::MarginRatio => {
            let v = parse_float(&clean_value(line)).map_err(err)?;
            record.set(rule.field, MetricValue::Float(normalize_margin_ratio(v)));
        }
        ValueKind::LongsShorts => {
            let (longs, shorts) = split_longs_shorts(line).map_err(err)?;
            record.n_of_longs = Some(longs);
            record.n_of_shorts = Some(shorts);
        }
        ValueKind::DatePair => {
            let (start, finish) = split_dates(line).map_err(err)?;
            record.start_date = Some(start);
            record.finish_date = Some(finish);
        }
        ValueKind::RouteHeader => {
            let row = lines
                .get(index + 2)
                .ok_or_else(|| err("route table has no value row".into()))?;
            let route = split_route_row(row).map_err(err)?;
            record.exchange = Some(route.exchange);
            record.symbol = Some(route.symbol);
            record.tf = Some(route.tf);
            record.strategy = Some(route.strategy);
            if let Some(dna) = route.dna {
                record.dna = Some(dna);
            }
        }
    }
    Ok(())
}

/// Round to 2 decimals; negative ratios are reported relative to 100.
pub fn normalize_margin_ratio(value: f64) -> f64 {
    let ratio = round_to(value, 2);
    if ratio < 0.0 { ratio + 100.0 } else { ratio }
}

/// Last whitespace-delimited token, ignoring trailing table pipes.
pub fn last_token(line: &str) -> &str {
    line.trim_end_matches(|c: char| c == '|' || c.is_whitespace())
        .split_whitespace()
        .last()
        .unwrap_or("")
}

/// Last token with percent signs, parentheses and thousands separators removed.
pub fn clean_value(line: &str) -> String {
    last_token(line)
        .chars()
        .filter(|c| !matches!(c, '%' | '(' | ')' | ','))
        .collect()
}

fn parse_int(token: &str) -> Result<i64, String> {
    token
        .parse::<i64>()
        .map_err(|e| format!("'{}' is not an integer: {}", token, e))
}

fn parse_float(token: &str) -> Result<f64, String> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(format!("'{}' is not a finite number", token)),
        Err(e) => Err(format!("'{}' is not a number: {}", token, e)),
    }
}

fn split_longs_shorts(line: &str) -> Result<(i64, i64), String> {
    let tokens: Vec<&str> = line
        .trim_end_matches(|c: char| c == '|' || c.is_whitespace())
        .split_whitespace()
        .collect();
    if tokens.len() < 3 {
        return Err("expected '<longs> | <shorts>' at end of line".into());
    }
    let shorts = parse_int(&tokens[tokens.len() - 1].replace('%', ""))?;
    let longs = parse_int(&tokens[tokens.len() - 3].replace('%', ""))?;
    Ok((longs, shorts))
}

fn split_dates(line: &str) -> Result<(String, String), String> {
    let compact: String = line.chars().filter(|c| *c != ' ').collect();
    let segment = compact
        .trim_end_matches('|')
        .rsplit('|')
        .next()
        .unwrap_or("");
    let parts: Vec<&str> = segment.split("=>").collect();
    match parts.as_slice() {
        [start, finish] if !start.is_empty() && !finish.is_empty() => {
            Ok((start.to_string(), finish.to_string()))
        }
        _ => Err(format!("expected '<start> => <finish>', found '{}'", segment)),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteRow {
    pub exchange: String,
    pub symbol: String,
    pub tf: String,
    pub strategy: String,
    pub dna: Option<String>,
}

/// Split a route table row on `|` only; exchange names contain spaces.
pub fn split_route_row(row: &str) -> Result<RouteRow, String> {
    let row = row.trim();
    let row = row.strip_prefix('|').unwrap_or(row);
    let row = row.strip_suffix('|').unwrap_or(row);
    let tokens: Vec<String> = row.split('|').map(|t| t.trim().to_string()).collect();

    match tokens.as_slice() {
        [exchange, symbol, tf, strategy, rest @ ..] if rest.len() <= 1 => Ok(RouteRow {
            exchange: exchange.clone(),
            symbol: symbol.clone(),
            tf: tf.clone(),
            strategy: strategy.clone(),
            dna: rest.first().filter(|d| !d.is_empty()).cloned(),
        }),
        _ => Err(format!(
            "expected 4 or 5 '|'-separated route columns, found {}",
            tokens.len()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn net_profit_rounds_to_one_decimal() {
        let out = extract(" Total Net Profit              |  1234.567").unwrap();
        assert_relative_eq!(out.record().total_profit.unwrap(), 1234.6);
    }

    #[test]
    fn net_profit_takes_percentage_token() {
        let out = extract(" Total Net Profit   |   1,699,245.56 (1699.25%)").unwrap();
        assert_relative_eq!(out.record().total_profit.unwrap(), 1699.3);
    }

    #[test]
    fn tabular_margin_ratio_offsets_negatives() {
        let out = extract("Max. Margin Ratio | -12.345 |").unwrap();
        assert_relative_eq!(out.record().max_margin_ratio.unwrap(), 87.65, epsilon = 1e-9);
    }

    #[test]
    fn json_margin_ratio_uses_same_rule() {
        let out = extract("  \"max_margin_ratio\": 45.678,").unwrap();
        assert_relative_eq!(out.record().max_margin_ratio.unwrap(), 45.68);

        let out = extract("  \"max_margin_ratio\": -0.5,").unwrap();
        assert_relative_eq!(out.record().max_margin_ratio.unwrap(), 99.5);
    }

    #[test]
    fn margin_marker_needs_pipe() {
        let out = extract("Max. Margin Ratio was high").unwrap();
        assert_eq!(out.record().max_margin_ratio, None);
    }

    #[test]
    fn whole_number_fields_are_rounded() {
        let text = " Annual Return     |   123.5%\n Sharpe Ratio   |  1.49\n Serenity Index | 2.51";
        let record = extract(text).unwrap().into_record();
        assert_eq!(record.annual_return, Some(124));
        assert_eq!(record.sharpe, Some(1));
        assert_eq!(record.serenity, Some(3));
    }

    #[test]
    fn longs_and_shorts_split() {
        let record = extract(" Longs | Shorts   |   60% | 40%").unwrap().into_record();
        assert_eq!(record.n_of_longs, Some(60));
        assert_eq!(record.n_of_shorts, Some(40));
    }

    #[test]
    fn dates_split_on_arrow() {
        let record = extract(" starting-ending date | 2021-01-01 => 2021-06-01")
            .unwrap()
            .into_record();
        assert_eq!(record.start_date.as_deref(), Some("2021-01-01"));
        assert_eq!(record.finish_date.as_deref(), Some("2021-06-01"));
    }

    #[test]
    fn route_row_keeps_spaces_in_exchange() {
        let text = " exchange        | symbol   | timeframe | strategy | DNA\n\
                    -----------------+----------+-----------+----------+------\n \
                    Binance Futures | ETH-USDT | 6h        | Ott2     | *Og2O+";
        let record = extract(text).unwrap().into_record();
        assert_eq!(record.exchange.as_deref(), Some("Binance Futures"));
        assert_eq!(record.symbol.as_deref(), Some("ETH-USDT"));
        assert_eq!(record.tf.as_deref(), Some("6h"));
        assert_eq!(record.strategy.as_deref(), Some("Ott2"));
        assert_eq!(record.dna.as_deref(), Some("*Og2O+"));
    }

    #[test]
    fn route_header_without_value_row_is_parse_error() {
        let err = extract("exchange | symbol | timeframe\n-----").unwrap_err();
        assert!(matches!(err, ExtractError::Parse(ParseError { field: "exchange", .. })));
    }

    #[test]
    fn dna_string_kept_verbatim() {
        let record = extract("Dna String: (w,)%").unwrap().into_record();
        assert_eq!(record.dna.as_deref(), Some("(w,)%"));
    }

    #[test]
    fn aborted_is_an_error() {
        let text = " Total Closed Trades | 12\nAborted!\n Total Net Profit | 10";
        let err = extract(text).unwrap_err();
        assert_eq!(
            err,
            ExtractError::Aborted {
                marker: "Aborted!",
                line_no: 2,
                hint: Some("possibly the engine's candle cache is corrupt; delete its temp/ folder"),
            }
        );
    }

    #[test]
    fn uncaught_exception_range_hint() {
        let err = extract("Uncaught Exception: value must be within the range").unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Aborted {
                hint: Some("Check DNA String in routes file!"),
                ..
            }
        ));

        let err = extract("Uncaught Exception: boom").unwrap_err();
        assert!(matches!(err, ExtractError::Aborted { hint: None, .. }));
    }

    #[test]
    fn no_trades_keeps_earlier_fields() {
        let text = " starting-ending date | 2021-01-01 => 2021-02-01\n\
                    No trades were made\n Total Closed Trades | 5";
        let out = extract(text).unwrap();
        assert!(out.is_empty());
        let Extraction::Empty { record, reason } = out else {
            panic!("expected empty extraction");
        };
        assert_eq!(reason, EmptyReason::NoTrades);
        assert_eq!(record.start_date.as_deref(), Some("2021-01-01"));
        assert_eq!(record.total_trades, None);
    }

    #[test]
    fn bad_number_reports_field_and_line() {
        let err = extract("\n Total Closed Trades | twelve").unwrap_err();
        let ExtractError::Parse(parse) = err else {
            panic!("expected parse error");
        };
        assert_eq!(parse.field, "total_trades");
        assert_eq!(parse.line_no, 2);
        assert!(parse.line.contains("twelve"));
    }

    #[test]
    fn unmatched_lines_are_ignored() {
        let out = extract("hello\nworld\n").unwrap();
        assert_eq!(out, Extraction::Complete(MetricsRecord::new()));
    }

    #[test]
    fn pmr_follows_both_inputs() {
        let text = " Total Net Profit | 150\n Max. Margin Ratio | 40 |";
        let record = extract(text).unwrap().into_record();
        assert_relative_eq!(record.pmr.unwrap(), 3.75);
    }

    #[test]
    fn each_call_starts_fresh() {
        let first = extract(" Total Closed Trades | 12").unwrap().into_record();
        let second = extract(" Total Net Profit | 5").unwrap().into_record();
        assert_eq!(first.total_trades, Some(12));
        assert_eq!(second.total_trades, None);
    }

    #[test]
    fn clean_value_strips_decorations() {
        assert_eq!(clean_value("x | (1,234.5%) |"), "1234.5");
        assert_eq!(last_token("   "), "");
    }

    #[test]
    fn exact_ties_round_to_even() {
        let text = " Sharpe Ratio | 2.5\n Annual Return | 0.5%\n Max Drawdown | -0.25%";
        let record = extract(text).unwrap().into_record();
        assert_eq!(record.sharpe, Some(2));
        assert_eq!(record.annual_return, Some(0));
        assert_eq!(record.max_dd, Some(-0.2));
    }

    #[test]
    fn every_value_rule_keeps_its_precision() {
        use crate::domain::metrics_record::MetricValue::{Float, Int, Text};

        let cases: &[(&str, Field, MetricValue)] = &[
            (" Total Closed Trades | 42", Field::TotalTrades, Int(42)),
            (" Total Net Profit | 1,234.56 (12.3456%)", Field::TotalProfit, Float(12.3)),
            (" Max Drawdown | -12.46%", Field::MaxDd, Float(-12.5)),
            (" Total Paid Fees | 310.56", Field::PaidFees, Float(310.6)),
            (" Annual Return | 57.21%", Field::AnnualReturn, Int(57)),
            (" Percent Profitable | 55%", Field::WinRate, Int(55)),
            (" Serenity Index | 1.6", Field::Serenity, Int(2)),
            (" Sharpe Ratio | 2.45", Field::Sharpe, Int(2)),
            (" Calmar Ratio | 4.6", Field::Calmar, Int(5)),
            (" Sortino Ratio | 3.1", Field::Sortino, Int(3)),
            (" Smart Sharpe | 2.31", Field::SmartSharpe, Float(2.3)),
            (" Smart Sortino | 3.07", Field::SmartSortino, Float(3.1)),
            (" Winning Streak | 5", Field::WinStrk, Int(5)),
            (" Losing Streak | 3", Field::LoseStrk, Int(3)),
            (" Largest Winning Trade | 1,015.226", Field::LargestWin, Float(1015.23)),
            (" Largest Losing Trade | -432.104", Field::LargestLose, Float(-432.1)),
            (" Total Winning Trades | 23", Field::NOfWins, Int(23)),
            (" Total Losing Trades | 19", Field::NOfLoses, Int(19)),
            (" Market Change | 45.678%", Field::MarketChange, Float(45.68)),
            (" Sequential Hps | (0034203)", Field::SeqHps, Text("0034203".into())),
            ("Dna String: (w,;A", Field::Dna, Text("(w,;A".into())),
            (" Max. Margin Ratio | 23.456", Field::MaxMarginRatio, Float(23.46)),
            (" Minimum Margin | 1500.678", Field::MinMargin, Float(1500.68)),
        ];

        let text: Vec<&str> = cases.iter().map(|(line, _, _)| *line).collect();
        let record = extract(&text.join("\n")).unwrap().into_record();
        for (line, field, expected) in cases {
            assert_eq!(record.get(*field).as_ref(), Some(expected), "{}", line);
        }

        let simple_kinds = RULES.iter().filter(|r| {
            !matches!(
                r.kind,
                ValueKind::LongsShorts | ValueKind::DatePair | ValueKind::RouteHeader
            )
        });
        for rule in simple_kinds {
            assert!(
                cases.iter().any(|(_, field, _)| *field == rule.field),
                "no case for {}",
                rule.field
            );
        }
    }

    #[test]
    fn candle_not_found_is_empty_and_shown() {
        let text = " Total Closed Trades | 7\nCandleNotFoundInDatabase: no candles for BTC-USDT";
        let Extraction::Empty { record, reason } = extract(text).unwrap() else {
            panic!("expected empty extraction");
        };
        assert_eq!(reason, EmptyReason::CandleNotFound);
        assert!(reason.surfaces_report());
        assert_eq!(record.total_trades, Some(7));
    }

    #[test]
    fn insufficient_margin_is_empty_and_shown() {
        let out = extract("InsufficientMargin: not enough balance").unwrap();
        assert_eq!(
            out,
            Extraction::Empty {
                record: MetricsRecord::new(),
                reason: EmptyReason::InsufficientMargin,
            }
        );
        assert!(EmptyReason::InsufficientMargin.surfaces_report());
        assert!(!EmptyReason::NoTrades.surfaces_report());
    }

    #[test]
    fn candle_marker_wins_over_uncaught_exception() {
        let out = extract("Uncaught Exception: CandleNotFoundInDatabase").unwrap();
        assert!(matches!(
            out,
            Extraction::Empty {
                reason: EmptyReason::CandleNotFound,
                ..
            }
        ));

        let err = extract("Aborted! CandleNotFoundInDatabase").unwrap_err();
        assert!(matches!(err, ExtractError::Aborted { marker: "Aborted!", .. }));
    }
}
