//! Send a raw message body to a kind's inbound queue.
//!
//! Operational utility for manual testing and backfills, e.g.:
//!
//! ```text
//! enqueue --kind enrolment --body '{"data": "{\"company_name\": \"Acme\"}"}'
//! ```

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use directory_ingest::config;
use directory_ingest::model::SubmissionKind;
use directory_ingest::queue::{self, QueueClient, SqsQueue};

#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Submission kind: enrolment, registration or form
    #[arg(long)]
    kind: String,

    /// Message body to enqueue, verbatim
    #[arg(long)]
    body: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let kind = args
        .kind
        .parse::<SubmissionKind>()
        .map_err(|_| anyhow!("unknown submission kind: {}", args.kind))?;

    let cfg = config::load(Some(&args.config))?;
    let sqs = queue::sqs_client(&cfg.aws).await;
    let queue = SqsQueue::resolve(sqs, &cfg.queue_pair(kind).inbound).await?;

    queue.send(&args.body).await?;
    println!("enqueued on {}", queue.name());
    Ok(())
}
