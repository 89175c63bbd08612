use std::path::{Path, PathBuf};

/// Convenience result type used across ctqc.
pub type QcResult<T> = Result<T, QcError>;

/// Top-level error taxonomy used by report and figure APIs.
#[derive(thiserror::Error, Debug)]
pub enum QcError {
    /// Caller-supplied value outside its allowed domain (e.g. a tissue label not in 1..=6).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An input path does not exist.
    #[error("file not found: '{}'", .0.display())]
    FileNotFound(PathBuf),

    /// An input exists but could not be read as a volume.
    #[error("failed to load '{}': {reason}", path.display())]
    Load {
        /// Offending input path.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// A naming convention did not match (session id, subject segment, ...).
    #[error("pattern mismatch: no match for `{pattern}` in '{input}'")]
    PatternMismatch {
        /// Pattern that was expected.
        pattern: String,
        /// Text that was searched.
        input: String,
    },

    /// Figure composition failed.
    #[error("render error: {0}")]
    Render(String),

    /// Invalid or unreadable report configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QcError {
    /// Build a [`QcError::InvalidArgument`] value.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Build a [`QcError::FileNotFound`] value.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    /// Build a [`QcError::Load`] value.
    pub fn load(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::Load {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`QcError::PatternMismatch`] value.
    pub fn pattern_mismatch(pattern: impl Into<String>, input: impl Into<String>) -> Self {
        Self::PatternMismatch {
            pattern: pattern.into(),
            input: input.into(),
        }
    }

    /// Build a [`QcError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`QcError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
