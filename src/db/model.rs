//! Database entity models used by repositories.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::SubmissionKind;

/// A persisted submission row.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: i64,
    pub kind: SubmissionKind,
    pub sqs_message_id: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

/// Result of an insert attempt. A redelivered message trips the uniqueness
/// constraint on `(kind, sqs_message_id)` and surfaces here as `Duplicate`
/// rather than as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    Duplicate,
}
