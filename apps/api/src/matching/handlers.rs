//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::matching::engine::{rank, RankedPosting};
use crate::matching::locations::available_locations;
use crate::matching::query::{ExperienceInput, MatchFilters};
use crate::models::posting::JobPosting;
use crate::models::prediction::Prediction;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub experience: Option<ExperienceInput>,
    /// A prediction previously returned by the predict endpoint.
    #[serde(default)]
    pub prediction: Option<Prediction>,
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobPosting>>, AppError> {
    Ok(Json(state.corpus.fetch_all().await?))
}

/// GET /api/v1/jobs/locations
pub async fn handle_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    let corpus = state.corpus.fetch_all().await?;
    Ok(Json(available_locations(&corpus)))
}

/// GET /api/v1/jobs/search?title=&location=&experience=
///
/// Keyword search without a resume: every result scores 0.
pub async fn handle_search(
    State(state): State<AppState>,
    Query(filters): Query<MatchFilters>,
) -> Result<Json<Vec<RankedPosting>>, AppError> {
    let query = filters.into_query(None)?;
    let corpus = state.corpus.fetch_all().await?;
    Ok(Json(rank(&corpus, &query)))
}

/// POST /api/v1/jobs/match
///
/// Ranks the corpus against the filters and an optional prediction.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<Vec<RankedPosting>>, AppError> {
    let filters = MatchFilters {
        title: request.title,
        location: request.location,
        experience: request.experience,
    };
    let query = filters.into_query(request.prediction)?;

    let corpus = state.corpus.fetch_all().await?;
    let ranked = rank(&corpus, &query);

    info!(
        "Matched {} of {} postings (prediction: {})",
        ranked.len(),
        corpus.len(),
        query.prediction.is_some()
    );

    Ok(Json(ranked))
}
