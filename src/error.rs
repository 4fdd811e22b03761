//! Error types for the review core.

use thiserror::Error;

use crate::models::Side;

/// Everything the review core can fail with.
///
/// Remote and user-facing variants are shown to the user. The storage
/// variants are recovered where they occur and only ever reach the log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    /// Transport or decoding failure of the analysis call.
    #[error("Analysis request failed: {0}")]
    RemoteCallFailed(String),

    /// The service answered, but with an error payload. Shown verbatim.
    #[error("{0}")]
    AnalysisReportedError(String),

    #[error("'{file}' is not one of the {side} candidates")]
    InvalidSelection { side: Side, file: String },

    #[error("No problem at position {index} (the list has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("History data is unreadable: {0}")]
    HistoryCorrupt(String),

    #[error("Could not save history: {0}")]
    PersistenceWriteFailed(String),

    #[error("Choose one source file and one target file first")]
    SelectionIncomplete,

    #[error("A verification is already running")]
    AnalysisInFlight,

    #[error("No saved session with id '{0}'")]
    SessionNotFound(String),
}

impl ReviewError {
    /// Storage errors are recovered locally and never shown in the UI.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::HistoryCorrupt(_) | Self::PersistenceWriteFailed(_)
        )
    }

    /// Errors that indicate a caller bug rather than a user or remote problem.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSelection { .. } | Self::IndexOutOfRange { .. }
        )
    }
}
