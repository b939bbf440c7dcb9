//! Domain error types.

/// A malformed value on a recognised report line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error on line {line_no} ({field}): {message}")]
pub struct ParseError {
    pub field: &'static str,
    pub line_no: usize,
    pub line: String,
    pub message: String,
}

impl ParseError {
    /// Format the error followed by the offending report line.
    pub fn display_with_context(&self) -> String {
        format!("{err}\n  > {line}", err = self, line = self.line.trim_end())
    }
}

/// Top-level error type for btscan.
#[derive(Debug, thiserror::Error)]
pub enum BtscanError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Dna(#[from] crate::domain::dna::DnaError),

    #[error("invalid hyperparameter list: {reason}")]
    HyperparamSyntax { reason: String },

    #[error(transparent)]
    Extract(#[from] crate::domain::extract::ExtractError),

    #[error("{file}: {reason}")]
    ResultsData { file: String, reason: String },

    #[error("exchange info error: {reason}")]
    ExchangeInfo { reason: String },

    #[error("anchor '{anchor}' not found in routes template")]
    RouteAnchorMissing { anchor: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&BtscanError> for std::process::ExitCode {
    fn from(err: &BtscanError) -> Self {
        use crate::domain::extract::ExtractError;

        let code: u8 = match err {
            BtscanError::Io(_) => 1,
            BtscanError::ConfigParse { .. }
            | BtscanError::ConfigMissing { .. }
            | BtscanError::ConfigInvalid { .. } => 2,
            BtscanError::Dna(_)
            | BtscanError::HyperparamSyntax { .. }
            | BtscanError::RouteAnchorMissing { .. } => 3,
            BtscanError::Extract(ExtractError::Parse(_)) => 4,
            BtscanError::Extract(ExtractError::Aborted { .. }) => 5,
            BtscanError::ResultsData { .. }
            | BtscanError::ExchangeInfo { .. }
            | BtscanError::Csv(_) => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_context_shows_line() {
        let err = ParseError {
            field: "total_trades",
            line_no: 7,
            line: " Total Closed Trades   |  abc   ".into(),
            message: "invalid digit found in string".into(),
        };
        let text = err.display_with_context();
        assert!(text.starts_with("parse error on line 7 (total_trades)"));
        assert!(text.ends_with(">  Total Closed Trades   |  abc"));
    }

    fn code_of(err: BtscanError) -> String {
        format!("{:?}", std::process::ExitCode::from(&err))
    }

    #[test]
    fn exit_codes_by_category() {
        use crate::domain::extract::ExtractError;
        let expect = |n: u8| format!("{:?}", std::process::ExitCode::from(n));

        assert_eq!(
            code_of(BtscanError::ConfigMissing {
                section: "score".into(),
                key: "folder".into()
            }),
            expect(2)
        );
        assert_eq!(
            code_of(BtscanError::HyperparamSyntax { reason: "x".into() }),
            expect(3)
        );
        assert_eq!(
            code_of(BtscanError::Extract(ExtractError::Aborted {
                marker: "Aborted!",
                line_no: 1,
                hint: None
            })),
            expect(5)
        );
        assert_eq!(
            code_of(BtscanError::ResultsData {
                file: "a.csv".into(),
                reason: "x".into()
            }),
            expect(6)
        );
        assert_eq!(
            code_of(std::io::Error::other("gone").into()),
            expect(1)
        );
    }
}
