//! Parsing error types for HTML extraction
//!
//! Extraction misses are not errors (a field simply stays `None`), so this
//! taxonomy only covers problems with the parser setup itself and with
//! values that are present but malformed.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParsingError {
    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("No valid selectors compiled for '{field}': {errors}")]
    NoValidSelectors { field: String, errors: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: Option<String>,
    },

    #[error("Malformed attribute value for '{attribute}': {reason}")]
    MalformedAttribute { attribute: String, reason: String },
}

impl ParsingError {
    /// Create an invalid selector error
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid regex pattern error
    pub fn invalid_pattern(pattern: &str, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the parser can keep going after this error.
    ///
    /// Setup errors (selectors, patterns) are fatal for the parser being
    /// built; per-value problems just drop that value.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidSelector { .. } | Self::NoValidSelectors { .. } | Self::InvalidPattern { .. } => false,
            Self::UrlResolutionFailed { .. } | Self::MalformedAttribute { .. } => true,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
