//! Resume analysis: staging an upload, running the external classification
//! engine over it, and decoding what the engine printed.
//!
//! `analyze` is the single entry point; every failure along the way is one of
//! the `AnalysisError` variants and ends the request. Nothing is retried here.

use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::models::prediction::Prediction;

pub mod decoder;
pub mod handlers;
pub mod intake;
pub mod runner;

use intake::{DocumentIntake, UploadedFile};
use runner::AnalysisRunner;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No file uploaded")]
    NoFileProvided,

    #[error("Failed to stage upload: {0}")]
    Storage(#[source] std::io::Error),

    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Classification engine failed (exit code {exit_code:?}): {diagnostic}")]
    ProcessFailure {
        exit_code: Option<i32>,
        diagnostic: String,
    },

    #[error("Classification engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed engine output: {0}")]
    MalformedOutput(String),
}

/// Stages the upload, runs the engine on it and decodes the result.
///
/// Fails with `NoFileProvided` before any process is spawned when `upload` is
/// `None`. The staged file is released when this returns, whatever the outcome.
pub async fn analyze(
    intake: &DocumentIntake,
    runner: &AnalysisRunner,
    upload: Option<UploadedFile>,
) -> Result<Prediction, AnalysisError> {
    let staged = intake.stage(upload)?;
    let raw = runner.run(staged.path()).await?;
    let prediction = decoder::decode(&raw)?;

    info!(
        "Analyzed {}: category='{}' confidence={} skills={}",
        staged.path().display(),
        prediction.result_category,
        prediction.confidence,
        prediction.skills.len()
    );

    Ok(prediction)
}
