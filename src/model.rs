use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three public submission channels, each backed by its own pair of
/// queues (inbound + invalid sink) and persisted with its own `kind`
/// discriminant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Enrolment,
    Registration,
    Form,
}

impl SubmissionKind {
    pub const ALL: [SubmissionKind; 3] = [
        SubmissionKind::Enrolment,
        SubmissionKind::Registration,
        SubmissionKind::Form,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::Enrolment => "enrolment",
            SubmissionKind::Registration => "registration",
            SubmissionKind::Form => "form",
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enrolment" => Ok(SubmissionKind::Enrolment),
            "registration" => Ok(SubmissionKind::Registration),
            "form" => Ok(SubmissionKind::Form),
            _ => Err(()),
        }
    }
}
