//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use terraforge::cache::CacheError;
use terraforge::service::SubmitError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to start the async runtime
    Runtime(String),
    /// Failed to open the result cache
    Cache(CacheError),
    /// Request was rejected or could not be queued
    Submit(SubmitError),
    /// Generation finished in a non-completed state
    Generation(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {self}");

        match self {
            CliError::Submit(SubmitError::Validation(_)) => {
                eprintln!();
                eprintln!("Check the request:");
                eprintln!("  - north must be greater than south, east greater than west");
                eprintln!("  - the area must stay under the configured km² limit");
                eprintln!("  - resolution must be between 64 and 8192");
            }
            CliError::Cache(_) => {
                eprintln!();
                eprintln!("Check that the cache directory is writable.");
            }
            _ => {}
        }

        process::exit(match self {
            CliError::LoggingInit(_) | CliError::Runtime(_) => 2,
            _ => 1,
        });
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "failed to initialize logging: {msg}"),
            CliError::Runtime(msg) => write!(f, "failed to start runtime: {msg}"),
            CliError::Cache(err) => write!(f, "cache error: {err}"),
            CliError::Submit(err) => write!(f, "submit failed: {err}"),
            CliError::Generation(msg) => write!(f, "generation failed: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<CacheError> for CliError {
    fn from(err: CacheError) -> Self {
        CliError::Cache(err)
    }
}

impl From<SubmitError> for CliError {
    fn from(err: SubmitError) -> Self {
        CliError::Submit(err)
    }
}
