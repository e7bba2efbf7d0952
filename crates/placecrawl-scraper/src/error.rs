use thiserror::Error;

/// Failures reported by an [`AutomationPort`](crate::port::AutomationPort).
#[derive(Debug, Clone, Error)]
pub enum PortError {
    #[error("element not found: {0}")]
    NotFound(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("browser transport failure: {0}")]
    Transport(String),

    #[error("browser error {code}: {message}")]
    Protocol { code: String, message: String },
}

impl PortError {
    /// `NotFound` and `Timeout` mean "the page does not have this (yet)";
    /// callers fall back to a default instead of failing.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PortError::NotFound(_) | PortError::Timeout(_))
    }
}

/// Target-level failures. Each one aborts the current target only.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Port(#[from] PortError),

    #[error("search returned no matching business")]
    NoResults,

    #[error("search landed on an unrecognised page state")]
    UnknownState,

    #[error("candidate list contained no readable candidates")]
    NoCandidates,

    #[error("candidate resolution failed: {reason}")]
    ResolutionFailed { reason: String },

    #[error("detail view name \"{found}\" does not match query \"{expected}\"")]
    IdentityMismatch { expected: String, found: String },

    #[error("no entity id in detail reference \"{detail_ref}\"")]
    MissingEntityId { detail_ref: String },

    #[error("checkpoint flush failed: {reason}")]
    Checkpoint { reason: String },

    #[error("secondary lookup failed: {reason}")]
    Secondary { reason: String },
}
