use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A URL field could not be parsed.
    #[error("Invalid configuration: `{field}` is not a valid URL: {source}")]
    InvalidUrl {
        field: &'static str,
        source: url::ParseError,
    },

    /// A required field was left empty.
    #[error("Invalid configuration: `{0}` must not be empty")]
    EmptyField(&'static str),
}
