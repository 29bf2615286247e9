//! Axum route handlers for the Predict API.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::analyze;
use crate::analysis::intake::{DocumentIntake, UploadedFile};
use crate::errors::AppError;
use crate::matching::engine::{rank, RankedPosting};
use crate::matching::query::{ExperienceInput, MatchFilters};
use crate::models::prediction::Prediction;
use crate::state::AppState;

/// Multipart field carrying the resume file.
pub const RESUME_FIELD: &str = "resume";

#[derive(Debug, Serialize)]
pub struct PredictMatchResponse {
    pub prediction: Prediction,
    pub postings: Vec<RankedPosting>,
}

struct UploadForm {
    resume: Option<UploadedFile>,
    filters: MatchFilters,
}

/// POST /api/v1/predict
///
/// Runs the classification engine over the uploaded resume and returns its prediction.
pub async fn handle_predict(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Prediction>, AppError> {
    let form = read_upload_form(&state.intake, multipart).await?;
    let prediction = analyze(&state.intake, &state.runner, form.resume).await?;
    Ok(Json(prediction))
}

/// POST /api/v1/predict/match
///
/// Full pipeline: stage → engine → decode → rank the corpus against the result.
/// Filters are validated before the engine is started.
pub async fn handle_predict_and_match(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PredictMatchResponse>, AppError> {
    let form = read_upload_form(&state.intake, multipart).await?;
    let mut query = form.filters.into_query(None)?;

    let prediction = analyze(&state.intake, &state.runner, form.resume).await?;
    query.prediction = Some(prediction.clone());

    let corpus = state.corpus.fetch_all().await?;
    let postings = rank(&corpus, &query);

    info!(
        "Resume classified as '{}', {} of {} postings matched",
        prediction.result_category,
        postings.len(),
        corpus.len()
    );

    Ok(Json(PredictMatchResponse {
        prediction,
        postings,
    }))
}

/// Reads the resume file and any filter fields from a multipart body.
///
/// A `resume` part with neither a file name nor content (what a browser sends
/// when no file was picked) counts as no file.
async fn read_upload_form(
    intake: &DocumentIntake,
    mut multipart: Multipart,
) -> Result<UploadForm, AppError> {
    let mut resume = None;
    let mut filters = MatchFilters::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            RESUME_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(invalid_multipart)?;

                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                if resume.is_some() {
                    warn!("Ignoring extra '{RESUME_FIELD}' part '{file_name}'");
                    continue;
                }

                info!("Received resume upload '{file_name}' ({} bytes)", data.len());
                resume = Some(intake.receive(&file_name, &data)?);
            }
            "title" => filters.title = Some(field.text().await.map_err(invalid_multipart)?),
            "location" => filters.location = Some(field.text().await.map_err(invalid_multipart)?),
            "experience" => {
                let text = field.text().await.map_err(invalid_multipart)?;
                filters.experience = Some(ExperienceInput::Text(text));
            }
            other => warn!("Ignoring unexpected multipart field '{other}'"),
        }
    }

    Ok(UploadForm { resume, filters })
}

fn invalid_multipart(e: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {e}"))
}
