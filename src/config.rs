//! Configuration loader and validator for the ingestion service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::model::SubmissionKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub aws: Aws,
    pub queues: Queues,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub bind_addr: String,
    /// SQS long-poll wait per receive call. SQS caps this at 20.
    pub wait_time_seconds: i32,
    /// Receive batch size. SQS caps this at 10.
    pub max_messages: i32,
}

/// AWS connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Aws {
    pub region: String,
    /// Optional endpoint override, e.g. a localstack URL.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// Inbound and invalid-sink queue names for each submission kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Queues {
    pub enrolment: QueuePair,
    pub registration: QueuePair,
    pub form: QueuePair,
}

/// One inbound queue plus its invalid-message sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuePair {
    pub inbound: String,
    pub invalid: String,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Queue names configured for a submission kind.
    pub fn queue_pair(&self, kind: SubmissionKind) -> &QueuePair {
        match kind {
            SubmissionKind::Enrolment => &self.queues.enrolment,
            SubmissionKind::Registration => &self.queues.registration,
            SubmissionKind::Form => &self.queues.form,
        }
    }

    /// Database URL: `DATABASE_URL` env var wins, otherwise a sqlite file
    /// under `app.data_dir`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/directory.db", self.app.data_dir))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.bind_addr.trim().is_empty() {
        return Err(ConfigError::Invalid("app.bind_addr must be non-empty"));
    }
    if !(0..=20).contains(&cfg.app.wait_time_seconds) {
        return Err(ConfigError::Invalid(
            "app.wait_time_seconds must be between 0 and 20",
        ));
    }
    if !(1..=10).contains(&cfg.app.max_messages) {
        return Err(ConfigError::Invalid(
            "app.max_messages must be between 1 and 10",
        ));
    }

    if cfg.aws.region.trim().is_empty() {
        return Err(ConfigError::Invalid("aws.region must be non-empty"));
    }

    for kind in SubmissionKind::ALL {
        let pair = cfg.queue_pair(kind);
        if pair.inbound.trim().is_empty() {
            return Err(ConfigError::Invalid("queues.*.inbound must be non-empty"));
        }
        if pair.invalid.trim().is_empty() {
            return Err(ConfigError::Invalid("queues.*.invalid must be non-empty"));
        }
        if pair.inbound == pair.invalid {
            return Err(ConfigError::Invalid(
                "queues.*.inbound and queues.*.invalid must differ",
            ));
        }
    }

    Ok(())
}

/// Canonical example YAML, used by tests and as a starting point for deploys.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  bind_addr: "127.0.0.1:8080"
  wait_time_seconds: 20
  max_messages: 10

aws:
  region: "eu-west-2"
  endpoint_url: null

queues:
  enrolment:
    inbound: "directory-enrolment"
    invalid: "directory-enrolment-invalid"
  registration:
    inbound: "directory-registration"
    invalid: "directory-registration-invalid"
  form:
    inbound: "directory-form"
    invalid: "directory-form-invalid"
"#
}
