//! Diagnostic types reported on standard error.

use std::path::PathBuf;

use thiserror::Error;

/// Command-line errors detected before any archive is touched.
///
/// Every variant ends the run with exit status 1 after the usage text.
#[derive(Debug, Error)]
pub enum UsageError {
    /// Invoked without any argument; only the usage text is printed.
    #[error("no arguments given")]
    NoArguments,

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Missing argument for -o")]
    MissingOutputArgument,

    #[error("No sources provided")]
    NoSources,

    #[error("Need -o output.zip when not using -separate")]
    MissingOutput,

    #[error("-o not supported with -separate")]
    OutputWithSeparate,

    #[error("{0}")]
    Parse(#[from] clap::Error),
}

impl UsageError {
    /// Message to print before the usage text, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            UsageError::NoArguments => None,
            other => Some(other.to_string()),
        }
    }
}

/// A source that was skipped. The run continues and the exit status is
/// unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceWarning {
    #[error("Source not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Shared-archive wording for a source that is neither file nor directory.
    #[error("Skipping: {}", .0.display())]
    Skipping(PathBuf),

    /// Separate-archive wording for a source that is neither file nor directory.
    #[error("Not a file or directory: {}", .0.display())]
    NotFileOrDirectory(PathBuf),
}
