//! Hyperparameter values and their declared ranges.

use crate::domain::error::BtscanError;

/// Ordered name -> value mapping. Insertion order is the DNA order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HyperparameterSet {
    entries: Vec<(String, f64)>,
}

impl HyperparameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. An existing name keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for HyperparameterSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

/// Declared ranges of a strategy's hyperparameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HyperparameterSpec {
    ranges: Vec<(String, ParamRange)>,
}

impl HyperparameterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, name: impl Into<String>, min: f64, max: f64) -> Self {
        self.ranges.push((name.into(), ParamRange { min, max }));
        self
    }

    pub fn range(&self, name: &str) -> Option<ParamRange> {
        self.ranges
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| *r)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Parse `name=value,name=value` into a set, keeping the written order.
pub fn parse_params(input: &str) -> Result<HyperparameterSet, BtscanError> {
    let mut set = HyperparameterSet::new();

    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(BtscanError::HyperparamSyntax {
                reason: "empty token in parameter list".into(),
            });
        }
        let (name, value) = split_pair(token)?;
        let value: f64 = value.parse().map_err(|_| BtscanError::HyperparamSyntax {
            reason: format!("'{}' is not a number (parameter {})", value, name),
        })?;
        if set.get(name).is_some() {
            return Err(BtscanError::HyperparamSyntax {
                reason: format!("duplicate parameter: {}", name),
            });
        }
        set.insert(name, value);
    }

    Ok(set)
}

/// Parse `name=min:max,name=min:max` into a range spec.
pub fn parse_ranges(input: &str) -> Result<HyperparameterSpec, BtscanError> {
    let mut spec = HyperparameterSpec::new();

    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(BtscanError::HyperparamSyntax {
                reason: "empty token in range list".into(),
            });
        }
        let (name, bounds) = split_pair(token)?;
        let (min, max) = bounds
            .split_once(':')
            .ok_or_else(|| BtscanError::HyperparamSyntax {
                reason: format!("range for {} must look like min:max", name),
            })?;
        let parse = |s: &str| -> Result<f64, BtscanError> {
            s.trim().parse().map_err(|_| BtscanError::HyperparamSyntax {
                reason: format!("'{}' is not a number (range of {})", s.trim(), name),
            })
        };
        spec = spec.with_range(name, parse(min)?, parse(max)?);
    }

    Ok(spec)
}

fn split_pair(token: &str) -> Result<(&str, &str), BtscanError> {
    let (name, value) = token
        .split_once('=')
        .ok_or_else(|| BtscanError::HyperparamSyntax {
            reason: format!("expected name=value, found '{}'", token),
        })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(BtscanError::HyperparamSyntax {
            reason: format!("missing parameter name in '{}'", token),
        });
    }
    Ok((name, value.trim()))
}
