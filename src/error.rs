//! Error types for the preload pipeline

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the preload core.
///
/// All of these are fatal to the current generation run; none are retried.
/// The core never prints; the CLI layer is responsible for presenting
/// these and exiting non-zero.
#[derive(Debug, Error)]
pub enum PreloadError {
    /// An exclude-regex pattern failed to compile.
    #[error("preload exclusion regex is invalid: \"{pattern}\": {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// An extension contained characters outside `[A-Za-z0-9]`.
    #[error("file extension is not valid: \"{0}\"")]
    InvalidExtension(String),

    /// Discovery was attempted without any include directories.
    #[error("attempt to discover files without an include directory list")]
    NoIncludePaths,

    /// The manifest was read before being populated.
    #[error("attempt to read the manifest before it was populated")]
    NotPopulated,

    /// The manifest was populated a second time.
    #[error("the manifest has already been populated")]
    AlreadyPopulated,

    /// The generated script could not be persisted.
    #[error("error writing the preload file to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
