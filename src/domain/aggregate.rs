//! Ranking of extracted records.

use crate::domain::metrics_record::{Field, MetricsRecord};
use std::cmp::Ordering;

/// Keep rows whose `field` is strictly greater than `min`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub field: Field,
    pub min: f64,
}

impl Threshold {
    pub fn accepts(&self, record: &MetricsRecord) -> bool {
        record
            .numeric(self.field)
            .map(|v| v > self.min)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankOptions {
    pub key: Field,
    pub top_n: Option<usize>,
    pub filter: Option<Threshold>,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            key: Field::TotalProfit,
            top_n: None,
            filter: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedReport {
    pub key: Option<Field>,
    pub rows: Vec<MetricsRecord>,
}

impl RankedReport {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sort descending by the key metric, filter, then truncate. Records without
/// the key sort last; ties keep input order.
pub fn rank(records: Vec<MetricsRecord>, options: &RankOptions) -> RankedReport {
    let mut rows: Vec<MetricsRecord> = match options.filter {
        Some(threshold) => records
            .into_iter()
            .filter(|r| threshold.accepts(r))
            .collect(),
        None => records,
    };

    rows.sort_by(|a, b| compare_desc(a.numeric(options.key), b.numeric(options.key)));

    if let Some(n) = options.top_n {
        rows.truncate(n);
    }

    RankedReport {
        key: Some(options.key),
        rows,
    }
}

fn compare_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
