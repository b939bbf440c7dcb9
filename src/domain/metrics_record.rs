//! Structured outcome of one backtest run.
//!
//! Every slot is optional: `None` means the metric never appeared in the
//! source text, which is not the same thing as an explicit zero.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    /// Numeric view used for ranking; text has none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            MetricValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
            MetricValue::Text(v) => f.write_str(v),
        }
    }
}

macro_rules! fields {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Addressable metric slots, named as they appear in reports.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Field {
            $($variant),+
        }

        impl Field {
            pub const ALL: &'static [Field] = &[$(Field::$variant),+];

            pub fn name(self) -> &'static str {
                match self {
                    $(Field::$variant => $name),+
                }
            }
        }
    };
}

fields! {
    Exchange => "exchange",
    Symbol => "symbol",
    Tf => "tf",
    Strategy => "strategy",
    Dna => "dna",
    StartDate => "start_date",
    FinishDate => "finish_date",
    SeqHps => "seq_hps",
    TotalTrades => "total_trades",
    NOfLongs => "n_of_longs",
    NOfShorts => "n_of_shorts",
    TotalProfit => "total_profit",
    MaxDd => "max_dd",
    PaidFees => "paid_fees",
    AnnualReturn => "annual_return",
    WinRate => "win_rate",
    Serenity => "serenity",
    Sharpe => "sharpe",
    Calmar => "calmar",
    Sortino => "sortino",
    SmartSharpe => "smart_sharpe",
    SmartSortino => "smart_sortino",
    WinStrk => "win_strk",
    LoseStrk => "lose_strk",
    LargestWin => "largest_win",
    LargestLose => "largest_lose",
    NOfWins => "n_of_wins",
    NOfLoses => "n_of_loses",
    MarketChange => "market_change",
    MaxMarginRatio => "max_margin_ratio",
    MinMargin => "min_margin",
    Pmr => "pmr",
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s.trim())
            .ok_or_else(|| format!("unknown metric '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsRecord {
    pub exchange: Option<String>,
    pub symbol: Option<String>,
    pub tf: Option<String>,
    pub strategy: Option<String>,
    pub dna: Option<String>,
    pub start_date: Option<String>,
    pub finish_date: Option<String>,
    pub seq_hps: Option<String>,
    pub total_trades: Option<i64>,
    pub n_of_longs: Option<i64>,
    pub n_of_shorts: Option<i64>,
    pub total_profit: Option<f64>,
    pub max_dd: Option<f64>,
    pub paid_fees: Option<f64>,
    pub annual_return: Option<i64>,
    pub win_rate: Option<i64>,
    pub serenity: Option<i64>,
    pub sharpe: Option<i64>,
    pub calmar: Option<i64>,
    pub sortino: Option<i64>,
    pub smart_sharpe: Option<f64>,
    pub smart_sortino: Option<f64>,
    pub win_strk: Option<i64>,
    pub lose_strk: Option<i64>,
    pub largest_win: Option<f64>,
    pub largest_lose: Option<f64>,
    pub n_of_wins: Option<i64>,
    pub n_of_loses: Option<i64>,
    pub market_change: Option<f64>,
    pub max_margin_ratio: Option<f64>,
    pub min_margin: Option<f64>,
    pub pmr: Option<f64>,
}

impl MetricsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<MetricValue> {
        use MetricValue::{Float, Int, Text};

        match field {
            Field::Exchange => self.exchange.clone().map(Text),
            Field::Symbol => self.symbol.clone().map(Text),
            Field::Tf => self.tf.clone().map(Text),
            Field::Strategy => self.strategy.clone().map(Text),
            Field::Dna => self.dna.clone().map(Text),
            Field::StartDate => self.start_date.clone().map(Text),
            Field::FinishDate => self.finish_date.clone().map(Text),
            Field::SeqHps => self.seq_hps.clone().map(Text),
            Field::TotalTrades => self.total_trades.map(Int),
            Field::NOfLongs => self.n_of_longs.map(Int),
            Field::NOfShorts => self.n_of_shorts.map(Int),
            Field::TotalProfit => self.total_profit.map(Float),
            Field::MaxDd => self.max_dd.map(Float),
            Field::PaidFees => self.paid_fees.map(Float),
            Field::AnnualReturn => self.annual_return.map(Int),
            Field::WinRate => self.win_rate.map(Int),
            Field::Serenity => self.serenity.map(Int),
            Field::Sharpe => self.sharpe.map(Int),
            Field::Calmar => self.calmar.map(Int),
            Field::Sortino => self.sortino.map(Int),
            Field::SmartSharpe => self.smart_sharpe.map(Float),
            Field::SmartSortino => self.smart_sortino.map(Float),
            Field::WinStrk => self.win_strk.map(Int),
            Field::LoseStrk => self.lose_strk.map(Int),
            Field::LargestWin => self.largest_win.map(Float),
            Field::LargestLose => self.largest_lose.map(Float),
            Field::NOfWins => self.n_of_wins.map(Int),
            Field::NOfLoses => self.n_of_loses.map(Int),
            Field::MarketChange => self.market_change.map(Float),
            Field::MaxMarginRatio => self.max_margin_ratio.map(Float),
            Field::MinMargin => self.min_margin.map(Float),
            Field::Pmr => self.pmr.map(Float),
        }
    }

    /// Store `value` in `field`. Returns false when the value kind does not
    /// match the slot (e.g. text into a numeric slot); the record is unchanged.
    pub fn set(&mut self, field: Field, value: MetricValue) -> bool {
        use MetricValue::{Float, Int, Text};

        fn text(slot: &mut Option<String>, v: MetricValue) -> bool {
            match v {
                Text(s) => {
                    *slot = Some(s);
                    true
                }
                _ => false,
            }
        }
        fn int(slot: &mut Option<i64>, v: MetricValue) -> bool {
            match v {
                Int(i) => {
                    *slot = Some(i);
                    true
                }
                _ => false,
            }
        }
        fn float(slot: &mut Option<f64>, v: MetricValue) -> bool {
            match v {
                Float(x) => {
                    *slot = Some(x);
                    true
                }
                Int(i) => {
                    *slot = Some(i as f64);
                    true
                }
                Text(_) => false,
            }
        }

        match field {
            Field::Exchange => text(&mut self.exchange, value),
            Field::Symbol => text(&mut self.symbol, value),
            Field::Tf => text(&mut self.tf, value),
            Field::Strategy => text(&mut self.strategy, value),
            Field::Dna => text(&mut self.dna, value),
            Field::StartDate => text(&mut self.start_date, value),
            Field::FinishDate => text(&mut self.finish_date, value),
            Field::SeqHps => text(&mut self.seq_hps, value),
            Field::TotalTrades => int(&mut self.total_trades, value),
            Field::NOfLongs => int(&mut self.n_of_longs, value),
            Field::NOfShorts => int(&mut self.n_of_shorts, value),
            Field::TotalProfit => float(&mut self.total_profit, value),
            Field::MaxDd => float(&mut self.max_dd, value),
            Field::PaidFees => float(&mut self.paid_fees, value),
            Field::AnnualReturn => int(&mut self.annual_return, value),
            Field::WinRate => int(&mut self.win_rate, value),
            Field::Serenity => int(&mut self.serenity, value),
            Field::Sharpe => int(&mut self.sharpe, value),
            Field::Calmar => int(&mut self.calmar, value),
            Field::Sortino => int(&mut self.sortino, value),
            Field::SmartSharpe => float(&mut self.smart_sharpe, value),
            Field::SmartSortino => float(&mut self.smart_sortino, value),
            Field::WinStrk => int(&mut self.win_strk, value),
            Field::LoseStrk => int(&mut self.lose_strk, value),
            Field::LargestWin => float(&mut self.largest_win, value),
            Field::LargestLose => float(&mut self.largest_lose, value),
            Field::NOfWins => int(&mut self.n_of_wins, value),
            Field::NOfLoses => int(&mut self.n_of_loses, value),
            Field::MarketChange => float(&mut self.market_change, value),
            Field::MaxMarginRatio => float(&mut self.max_margin_ratio, value),
            Field::MinMargin => float(&mut self.min_margin, value),
            Field::Pmr => float(&mut self.pmr, value),
        }
    }

    /// Recompute `pmr` once both inputs are set and non-zero.
    pub fn update_pmr(&mut self) {
        if let (Some(profit), Some(margin)) = (self.total_profit, self.max_margin_ratio) {
            if profit != 0.0 && margin != 0.0 {
                self.pmr = Some(round_to(profit / margin, 2));
            }
        }
    }

    /// Numeric value of `field`, if set.
    pub fn numeric(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(|v| v.as_f64())
    }
}

/// Round to `places` decimals using the exact binary value of `value`;
/// exact ties go to the even digit.
pub fn round_to(value: f64, places: u32) -> f64 {
    format!("{:.*}", places as usize, value)
        .parse()
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn new_record_is_unset() {
        let record = MetricsRecord::new();
        for field in Field::ALL {
            assert_eq!(record.get(*field), None, "{} should be unset", field);
        }
    }

    #[test]
    fn explicit_zero_differs_from_unset() {
        let mut record = MetricsRecord::new();
        assert!(record.set(Field::TotalTrades, MetricValue::Int(0)));
        assert_eq!(record.get(Field::TotalTrades), Some(MetricValue::Int(0)));
        assert_eq!(record.get(Field::NOfWins), None);
    }

    #[test]
    fn set_rejects_mismatched_kind() {
        let mut record = MetricsRecord::new();
        assert!(!record.set(Field::TotalTrades, MetricValue::Text("x".into())));
        assert!(!record.set(Field::Dna, MetricValue::Int(3)));
        assert_eq!(record, MetricsRecord::new());
    }

    #[test]
    fn field_names_round_trip_through_from_str() {
        for field in Field::ALL {
            assert_eq!(field.name().parse::<Field>(), Ok(*field));
        }
        assert!("bogus".parse::<Field>().is_err());
    }

    #[test]
    fn pmr_requires_both_inputs() {
        let mut record = MetricsRecord::new();
        record.total_profit = Some(150.0);
        record.update_pmr();
        assert_eq!(record.pmr, None);

        record.max_margin_ratio = Some(40.0);
        record.update_pmr();
        assert_relative_eq!(record.pmr.unwrap(), 3.75);

        record.update_pmr();
        assert_relative_eq!(record.pmr.unwrap(), 3.75);
    }

    #[test]
    fn pmr_skipped_for_zero_profit() {
        let mut record = MetricsRecord::new();
        record.total_profit = Some(0.0);
        record.max_margin_ratio = Some(40.0);
        record.update_pmr();
        assert_eq!(record.pmr, None);
    }

    #[test]
    fn round_to_uses_exact_value() {
        assert_relative_eq!(round_to(1234.567, 1), 1234.6);
        assert_relative_eq!(round_to(-12.345, 2), -12.35);
        assert_relative_eq!(round_to(2.675, 2), 2.67);
    }

    #[test]
    fn round_to_exact_ties_go_even() {
        assert_relative_eq!(round_to(2.5, 0), 2.0);
        assert_relative_eq!(round_to(3.5, 0), 4.0);
        assert_relative_eq!(round_to(-0.25, 1), -0.2);
        assert_relative_eq!(round_to(0.125, 2), 0.12);
    }

    #[test]
    fn pmr_rounds_exact_ties_even() {
        let mut record = MetricsRecord::new();
        record.total_profit = Some(0.125);
        record.max_margin_ratio = Some(1.0);
        record.update_pmr();
        assert_relative_eq!(record.pmr.unwrap(), 0.12);
    }
}
