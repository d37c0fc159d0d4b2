//! Remote Leads API client.
//!
//! ## Overview
//!
//! Every backend call goes through the [`LeadsApi`] trait. The production
//! implementation is [`HttpLeadsApi`] (reqwest, JSON); tests and offline
//! demos use [`InMemoryLeadsApi`]. Responses are validated once, in
//! [`schema`], so callers only ever see typed values or an [`ApiError`].
//!
//! ```text
//! Workspace ──> Arc<dyn LeadsApi> ──┬─> HttpLeadsApi ──> schema::decode ──> backend
//!                                   └─> InMemoryLeadsApi (failure injection)
//! ```
//!
//! ## Error classification
//!
//! Failures carry an [`ApiErrorKind`] derived from structured signals only:
//! HTTP status, transport error kind (connect / timeout) and the backend's
//! `error.code` field. Message text is informational and never inspected.

pub mod http;
pub mod memory;
pub mod schema;

use std::fmt;

use async_trait::async_trait;
use leadsflow_common::{Lead, LeadPatch, NewLead};
use serde::{Deserialize, Serialize};

pub use http::HttpLeadsApi;
pub use memory::InMemoryLeadsApi;

/// Coarse category of an API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// The record does not exist (already deleted counts as gone).
    NotFound,
    /// The backend could not be reached or answered with a gateway error.
    Unavailable,
    /// Credentials missing, expired or insufficient.
    Unauthorized,
    /// Plan limit on the backend side.
    LimitExceeded,
    /// The backend understood the request and refused it.
    Rejected,
    /// The response did not match the expected schema.
    InvalidResponse,
}

impl ApiErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Unavailable => "unavailable",
            Self::Unauthorized => "unauthorized",
            Self::LimitExceeded => "limit_exceeded",
            Self::Rejected => "rejected",
            Self::InvalidResponse => "invalid_response",
        }
    }

    /// Map a backend `error.code` to a kind. Unknown codes return `None` so
    /// the HTTP status decides.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "not_found" => Some(Self::NotFound),
            "unavailable" | "backend_unavailable" => Some(Self::Unavailable),
            "unauthorized" | "forbidden" => Some(Self::Unauthorized),
            "limit_exceeded" => Some(Self::LimitExceeded),
            "validation" | "rejected" | "conflict" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
    status: Option<u16>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::new(ApiErrorKind::NotFound, format!("{} not found", what))
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unavailable, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Rejected, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidResponse, message)
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// The target is already gone; deletions treat this as success.
    pub fn is_gone(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }

    /// The backend is unreachable; batch operations stop on this.
    pub fn is_connectivity(&self) -> bool {
        self.kind == ApiErrorKind::Unavailable
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    #[serde(default)]
    pub skipped: usize,
}

/// Account settings stored on the backend. The shape is owned by the
/// backend, so the client treats it as an opaque JSON object.
pub type RemoteSettings = serde_json::Map<String, serde_json::Value>;

/// Abstraction over the leads backend for testability.
/// Real implementation: `HttpLeadsApi`. Test double: `InMemoryLeadsApi`.
#[async_trait]
pub trait LeadsApi: Send + Sync {
    async fn list_leads(&self) -> ApiResult<Vec<Lead>>;

    async fn get_lead(&self, id: &str) -> ApiResult<Lead>;

    async fn create_lead(&self, lead: &NewLead) -> ApiResult<Lead>;

    async fn update_lead(&self, id: &str, patch: &LeadPatch) -> ApiResult<Lead>;

    async fn delete_lead(&self, id: &str) -> ApiResult<()>;

    async fn import_leads(&self, leads: &[NewLead]) -> ApiResult<ImportSummary>;

    /// Ask the backend to drop duplicate leads; returns how many were removed.
    async fn remove_duplicates(&self) -> ApiResult<usize>;

    async fn get_settings(&self) -> ApiResult<RemoteSettings>;

    async fn save_settings(&self, settings: &RemoteSettings) -> ApiResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_code() {
        assert_eq!(ApiErrorKind::from_code("not_found"), Some(ApiErrorKind::NotFound));
        assert_eq!(
            ApiErrorKind::from_code("backend_unavailable"),
            Some(ApiErrorKind::Unavailable)
        );
        assert_eq!(ApiErrorKind::from_code("something_else"), None);
    }

    #[test]
    fn test_error_predicates() {
        assert!(ApiError::not_found("Lead 7").is_gone());
        assert!(!ApiError::not_found("Lead 7").is_connectivity());
        assert!(ApiError::unavailable("connection refused").is_connectivity());
        assert!(!ApiError::rejected("bad").is_gone());
    }

    #[test]
    fn test_error_display_includes_kind_and_message() {
        let err = ApiError::not_found("Lead 7").with_status(404);
        assert_eq!(err.to_string(), "not_found: Lead 7 not found");
        assert_eq!(err.status(), Some(404));
    }
}
