//! CLI command implementations.

pub mod decide;
pub mod inspect;

use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A source status argument could not be parsed.
    #[error("invalid source status '{0}': expected unknown, loading, none, <n> or loading:<n>")]
    InvalidStatus(String),

    /// The output format is not supported.
    #[error("unsupported format '{0}': expected text or json")]
    InvalidFormat(String),
}

/// Output format shared by the commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl std::str::FromStr for Format {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CliError::InvalidFormat(other.to_string())),
        }
    }
}
