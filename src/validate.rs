//! Structural validation of queue messages.
//!
//! Validation never fails loudly: malformed input yields `None` so the
//! worker can route the message to the invalid sink instead of erroring.

use serde_json::Value;

use crate::model::SubmissionKind;

/// Check a raw message body and return the JSON payload to persist, or
/// `None` if the message is structurally invalid.
///
/// Enrolment and registration messages carry the submitted form under a
/// `data` key whose value is itself a JSON-encoded object:
///
/// ```text
/// {"data": "{\"company_name\": \"Acme\"}"}
/// ```
///
/// Form messages additionally require an `origin` identifying the
/// submitting service; both fields are validated and the persisted payload
/// keeps the origin alongside the decoded data.
pub fn extract_payload(kind: SubmissionKind, body: &str) -> Option<Value> {
    let envelope: Value = serde_json::from_str(body).ok()?;
    let fields = envelope.as_object()?;

    match kind {
        SubmissionKind::Enrolment | SubmissionKind::Registration => {
            decode_data_field(fields.get("data")?)
        }
        SubmissionKind::Form => {
            let origin = fields.get("origin")?.as_str()?;
            if origin.trim().is_empty() {
                return None;
            }
            let data = decode_data_field(fields.get("data")?)?;
            Some(serde_json::json!({ "origin": origin, "data": data }))
        }
    }
}

/// The `data` field holds a JSON-encoded object as a string.
fn decode_data_field(raw: &Value) -> Option<Value> {
    let inner: Value = serde_json::from_str(raw.as_str()?).ok()?;
    inner.is_object().then_some(inner)
}
