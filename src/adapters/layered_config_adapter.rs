//! Command-line values layered over a base configuration.
//!
//! An override replaces the base value for its key, so validation sees the
//! value that will actually be used.

use crate::ports::config_port::ConfigPort;

pub struct LayeredConfigAdapter<'a> {
    base: &'a dyn ConfigPort,
    overrides: Vec<(String, String, String)>,
}

impl<'a> LayeredConfigAdapter<'a> {
    pub fn new(base: &'a dyn ConfigPort) -> Self {
        Self {
            base,
            overrides: Vec::new(),
        }
    }

    /// Override `[section] key` when `value` is present.
    pub fn with<T: ToString>(mut self, section: &str, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.overrides
                .push((section.to_string(), key.to_string(), value.to_string()));
        }
        self
    }

    fn lookup(&self, section: &str, key: &str) -> Option<&str> {
        self.overrides
            .iter()
            .rev()
            .find(|(s, k, _)| s == section && k == key)
            .map(|(_, _, v)| v.as_str())
    }
}

impl ConfigPort for LayeredConfigAdapter<'_> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        match self.lookup(section, key) {
            Some(v) => Some(v.to_string()),
            None => self.base.get_string(section, key),
        }
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.lookup(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self.base.get_int(section, key, default),
        }
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.lookup(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self.base.get_double(section, key, default),
        }
    }
}
