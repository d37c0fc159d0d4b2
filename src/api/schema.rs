//! Response schema validation for the leads backend.
//!
//! The backend wraps payloads in an envelope:
//!
//! ```json
//! {"success": true, "leads": [ ... ]}
//! {"success": false, "error": {"code": "not_found", "message": "Lead 9 not found"}}
//! {"error": "Backend unavailable"}
//! ```
//!
//! Everything that inspects raw response bodies lives here. Callers get a
//! typed payload or an [`ApiError`] with a kind derived from the HTTP status
//! and the `error.code` field.

use leadsflow_common::Lead;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::{ApiError, ApiErrorKind, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Text(String),
}

/// Kind implied by an HTTP status alone.
pub fn kind_for_status(status: u16) -> ApiErrorKind {
    match status {
        404 | 410 => ApiErrorKind::NotFound,
        401 | 403 => ApiErrorKind::Unauthorized,
        502..=504 => ApiErrorKind::Unavailable,
        _ => ApiErrorKind::Rejected,
    }
}

fn error_from_body(status: u16, body: Option<&Value>) -> ApiError {
    let parsed = body
        .and_then(|v| v.get("error"))
        .and_then(|e| ErrorBody::deserialize(e).ok());

    let (code, message) = match parsed {
        Some(ErrorBody::Detailed { code, message }) => (code, message),
        Some(ErrorBody::Text(message)) => (None, Some(message)),
        None => (None, None),
    };

    let kind = code
        .as_deref()
        .and_then(ApiErrorKind::from_code)
        .unwrap_or_else(|| {
            if (200..300).contains(&status) {
                ApiErrorKind::Rejected
            } else {
                kind_for_status(status)
            }
        });
    let message = message.unwrap_or_else(|| format!("request failed with status {}", status));
    ApiError::new(kind, message).with_status(status)
}

fn parse_body(status: u16, body: &[u8]) -> ApiResult<Option<Value>> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => Ok(Some(value)),
        Err(e) if (200..300).contains(&status) => Err(ApiError::invalid_response(format!(
            "response is not JSON: {}",
            e
        ))
        .with_status(status)),
        // Error pages from proxies are often HTML; the status still classifies them.
        Err(_) => Ok(None),
    }
}

/// Validate the envelope and return the parsed body of a successful response.
fn check_envelope(status: u16, body: &[u8]) -> ApiResult<Option<Value>> {
    let value = parse_body(status, body)?;
    if !(200..300).contains(&status) {
        return Err(error_from_body(status, value.as_ref()));
    }
    if let Some(v) = &value {
        let explicit_failure = v.get("success").and_then(Value::as_bool) == Some(false);
        let has_error = v.get("error").is_some_and(|e| !e.is_null());
        if explicit_failure || has_error {
            return Err(error_from_body(status, Some(v)));
        }
    }
    Ok(value)
}

/// Decode `field` out of a successful envelope.
pub fn decode_field<T: DeserializeOwned>(status: u16, body: &[u8], field: &str) -> ApiResult<T> {
    let value = check_envelope(status, body)?
        .ok_or_else(|| ApiError::invalid_response("empty response body").with_status(status))?;
    let payload = value.get(field).cloned().ok_or_else(|| {
        ApiError::invalid_response(format!("response is missing field '{}'", field))
            .with_status(status)
    })?;
    serde_json::from_value(payload).map_err(|e| {
        ApiError::invalid_response(format!("field '{}' has unexpected shape: {}", field, e))
            .with_status(status)
    })
}

/// Decode the whole envelope object (minus `success`) as `T`.
pub fn decode_object<T: DeserializeOwned>(status: u16, body: &[u8]) -> ApiResult<T> {
    let value = check_envelope(status, body)?
        .ok_or_else(|| ApiError::invalid_response("empty response body").with_status(status))?;
    serde_json::from_value(value).map_err(|e| {
        ApiError::invalid_response(format!("unexpected response shape: {}", e)).with_status(status)
    })
}

/// Decode a lead list. Records that fail validation are dropped with a
/// warning so one bad row does not blank the whole funnel.
pub fn decode_leads(status: u16, body: &[u8]) -> ApiResult<Vec<Lead>> {
    let raw: Vec<Value> = decode_field(status, body, "leads")?;
    let total = raw.len();
    let leads: Vec<Lead> = raw
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Lead>(record) {
            Ok(lead) => Some(lead),
            Err(e) => {
                warn!(error = %e, "Dropping lead record with unexpected shape");
                None
            }
        })
        .collect();
    if leads.len() < total {
        warn!(dropped = total - leads.len(), total, "Lead list contained invalid records");
    }
    Ok(leads)
}

/// Decode a response that carries no payload (delete, save).
pub fn decode_ack(status: u16, body: &[u8]) -> ApiResult<()> {
    check_envelope(status, body).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(v: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&v).unwrap()
    }

    #[test]
    fn test_decode_leads_success() {
        let raw = body(serde_json::json!({
            "success": true,
            "leads": [
                {"id": "a", "name": "Ana", "status": "novo", "created_at": "2026-01-01T00:00:00Z"},
                {"id": 2, "nome": "Bia", "created_at": "2026-01-02T00:00:00Z"}
            ]
        }));
        let leads = decode_leads(200, &raw).unwrap();
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[1].id, "2");
    }

    #[test]
    fn test_decode_leads_drops_invalid_records() {
        let raw = body(serde_json::json!({
            "success": true,
            "leads": [
                {"id": "a", "name": "Ana", "created_at": "2026-01-01T00:00:00Z"},
                {"name": "no id"}
            ]
        }));
        let leads = decode_leads(200, &raw).unwrap();
        assert_eq!(leads.len(), 1);
    }

    #[test]
    fn test_missing_payload_field_is_invalid_response() {
        let raw = body(serde_json::json!({"success": true}));
        let err = decode_leads(200, &raw).unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::InvalidResponse);
    }

    #[test]
    fn test_success_false_uses_error_code() {
        let raw = body(serde_json::json!({
            "success": false,
            "error": {"code": "not_found", "message": "Lead 9 not found"}
        }));
        let err = decode_ack(200, &raw).unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::NotFound);
        assert_eq!(err.message(), "Lead 9 not found");
    }

    #[test]
    fn test_status_classification_without_body() {
        assert_eq!(decode_ack(404, b"").unwrap_err().kind(), ApiErrorKind::NotFound);
        assert_eq!(decode_ack(503, b"<html>down</html>").unwrap_err().kind(), ApiErrorKind::Unavailable);
        assert_eq!(decode_ack(401, b"").unwrap_err().kind(), ApiErrorKind::Unauthorized);
        assert_eq!(decode_ack(400, b"").unwrap_err().kind(), ApiErrorKind::Rejected);
    }

    #[test]
    fn test_limit_requires_error_code() {
        assert_eq!(decode_ack(429, b"").unwrap_err().kind(), ApiErrorKind::Rejected);
        assert_eq!(decode_ack(402, b"").unwrap_err().kind(), ApiErrorKind::Rejected);

        let raw = body(serde_json::json!({
            "error": {"code": "limit_exceeded", "message": "plan full"}
        }));
        let err = decode_ack(403, &raw).unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::LimitExceeded);
        assert_eq!(err.message(), "plan full");
    }

    #[test]
    fn test_code_overrides_status() {
        let raw = body(serde_json::json!({"error": {"code": "unavailable"}}));
        let err = decode_ack(500, &raw).unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Unavailable);
    }

    #[test]
    fn test_text_error_body() {
        let raw = body(serde_json::json!({"error": "duplicate phone"}));
        let err = decode_ack(422, &raw).unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Rejected);
        assert_eq!(err.message(), "duplicate phone");
    }

    #[test]
    fn test_empty_ack_is_ok() {
        assert!(decode_ack(204, b"").is_ok());
        assert!(decode_ack(200, br#"{"success": true}"#).is_ok());
    }

    #[test]
    fn test_non_json_success_is_invalid_response() {
        let err = decode_field::<Vec<Value>>(200, b"<html>", "leads").unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::InvalidResponse);
    }

    #[test]
    fn test_decode_object_import_summary() {
        let raw = body(serde_json::json!({"success": true, "imported": 3, "skipped": 1}));
        let summary: super::super::ImportSummary = decode_object(200, &raw).unwrap();
        assert_eq!(summary.imported, 3);
        assert_eq!(summary.skipped, 1);
    }
}
