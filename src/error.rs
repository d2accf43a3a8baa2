//! Error taxonomy for pack resolution, installation and invocation.

use thiserror::Error;

/// Errors raised while fetching, installing or loading a pack.
///
/// `NotFound` and `NotInstalled` are kept apart so callers can decide whether
/// running an install is worth it.
#[derive(Debug, Error)]
pub enum PackError {
    /// The registry was unreachable or returned malformed data.
    #[error("Failed to fetch pack data: {0}")]
    Fetch(String),

    /// No metadata record exists, or the module holds no matching class.
    #[error("{0}")]
    NotFound(String),

    /// Metadata exists but the source cannot be imported.
    #[error("{0}")]
    NotInstalled(String),

    /// The source is present but failed while being imported.
    #[error("{0}")]
    Load(String),

    #[error("Could not install pack: {0}")]
    Installation(String),
}

impl PackError {
    /// Whether installing the pack may fix this error.
    pub fn is_recoverable_by_install(&self) -> bool {
        matches!(self, PackError::NotInstalled(_) | PackError::NotFound(_))
    }
}

/// Errors raised while constructing or calling a pack.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Pack {0} has no entry point to run")]
    NotInvocable(String),

    #[error("Failed to construct pack {class}: {reason}")]
    Construction { class: String, reason: String },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Failed to start pack process: {0}")]
    Spawn(#[from] std::io::Error),
}
