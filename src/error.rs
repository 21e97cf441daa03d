use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur during config store operations.
///
/// Every operation either succeeds fully or returns one of these with the
/// previously persisted file and the live mirror left unchanged.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config or template file could not be read or written.
    #[error("config I/O failed for {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The on-disk document (or the template) is malformed.
    #[error("parse error in {path} at line {line}: {message}")]
    Parse {
        path: Utf8PathBuf,
        line: usize,
        message: String,
    },

    /// A section name, key, or value supplied by a caller would not survive
    /// a round-trip through the on-disk format.
    #[error("invalid {what} {text:?}: {reason}")]
    Syntax {
        what: &'static str,
        text: String,
        reason: &'static str,
    },

    /// A single-key write targeted a section the document does not have.
    #[error("no such section: {0}")]
    UnknownSection(String),
}

impl ConfigError {
    pub(crate) fn io(path: &camino::Utf8Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

/// Result type for config store operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
