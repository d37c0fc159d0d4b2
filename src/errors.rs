//! Typed error hierarchy for the LeadsFlow client.
//!
//! Each subsystem has its own enum; `WorkspaceError` is what the facade
//! returns and wraps the others:
//! - `ValidationError`: lead form and import checks
//! - `StageError`: funnel stage configuration
//! - `TaskError`: device-local task book
//! - `StoreError`: the persisted client store
//! - `WorkspaceError`: facade operations (wraps `ApiError` and the above)

use thiserror::Error;

use crate::api::ApiError;

/// Rejected lead input, caught before anything is sent to the backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Lead name must not be empty")]
    EmptyName,

    #[error("Invalid email address '{0}'")]
    InvalidEmail(String),

    #[error("Invalid phone number '{0}': expected 8 to 15 digits")]
    InvalidPhone(String),

    #[error("Deal value must be a non-negative number, got {0}")]
    InvalidDealValue(f64),
}

/// Errors from funnel stage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("Stage '{0}' not found")]
    NotFound(String),

    #[error("Stage label must not be empty")]
    EmptyLabel,

    #[error("Stage label '{0}' is already used by another stage")]
    DuplicateLabel(String),

    #[error("Invalid stage color '{0}': expected #rgb or #rrggbb")]
    InvalidColor(String),

    #[error("The funnel must keep at least one stage")]
    LastStage,

    #[error("Stage position {index} is out of range (0..{len})")]
    OutOfRange { index: usize, len: usize },
}

/// Errors from the device-local task book.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Task {0} not found")]
    NotFound(uuid::Uuid),

    #[error("No single task matches '{0}'")]
    UnknownRef(String),

    #[error("Task title must not be empty")]
    EmptyTitle,

    #[error("Task {0} is cancelled; reopen it before completing")]
    Cancelled(uuid::Uuid),
}

/// Errors from the persisted client store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access store at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store file {path} is not valid JSON: {source}")]
    Corrupt {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store schema version {found} is newer than the supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Failed to migrate legacy key '{key}': {message}")]
    Migration { key: String, message: String },
}

/// Errors returned by `Workspace` operations.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Lead {0} is not in the local list; refresh and try again")]
    LeadNotCached(String),

    #[error("Lead limit reached ({limit} leads on the current plan)")]
    LimitReached { limit: usize },

    #[error("Nothing to update")]
    EmptyPatch,

    #[error("{0}")]
    InvalidPreference(String),
}

impl WorkspaceError {
    /// True when the failure came from the backend being unreachable.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_connectivity())
    }
}
