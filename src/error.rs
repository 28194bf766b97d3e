//! Error kinds for rdir.
//!
//! Errors are captured into `AppState::last_error` (or the pager status
//! line) rather than propagated to the top; only unrecoverable startup and
//! terminal failures abort the process.

use crate::core::fsx::TextEncoding;

use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: malformed {} text", path.display(), encoding.label())]
    Decode { path: PathBuf, encoding: TextEncoding },

    #[error("{role} failed ({command}): {source}")]
    External {
        role: &'static str,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("terminal: {source}")]
    Terminal {
        #[source]
        source: std::io::Error,
    },

    #[error("{reason}")]
    Policy { reason: String },
}

impl Error {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn decode(path: &Path, encoding: TextEncoding) -> Self {
        Error::Decode {
            path: path.to_path_buf(),
            encoding,
        }
    }

    pub fn external(role: &'static str, command: impl Into<String>, source: std::io::Error) -> Self {
        Error::External {
            role,
            command: command.into(),
            source,
        }
    }

    pub fn policy(reason: impl Into<String>) -> Self {
        Error::Policy {
            reason: reason.into(),
        }
    }

    /// Short form for the status line; the full chain is traced instead.
    pub fn status_line(&self) -> String {
        self.to_string()
    }
}
