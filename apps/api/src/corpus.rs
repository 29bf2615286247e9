//! Corpus gateway: read access to the job posting corpus.
//!
//! The scraper owns the `job_listings` table; this service only reads it.
//! `AppState` holds an `Arc<dyn CorpusGateway>` so handlers never touch SQL.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::errors::AppError;
use crate::models::posting::{JobPosting, JobPostingRow};

#[async_trait]
pub trait CorpusGateway: Send + Sync {
    /// Every posting, newest first.
    async fn fetch_all(&self) -> Result<Vec<JobPosting>, AppError>;
}

/// PostgreSQL-backed corpus.
pub struct PgCorpus {
    pool: PgPool,
}

impl PgCorpus {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CorpusGateway for PgCorpus {
    async fn fetch_all(&self) -> Result<Vec<JobPosting>, AppError> {
        let rows = sqlx::query_as::<_, JobPostingRow>(
            r#"
            SELECT id, job_title, company, location, experience, skills, url, salary, created_at
            FROM job_listings
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Fetched {} job postings", rows.len());

        Ok(rows.into_iter().map(JobPosting::from).collect())
    }
}

/// Fixed in-memory corpus for handler tests.
#[cfg(test)]
pub struct StaticCorpus(pub Vec<JobPosting>);

#[cfg(test)]
#[async_trait]
impl CorpusGateway for StaticCorpus {
    async fn fetch_all(&self) -> Result<Vec<JobPosting>, AppError> {
        Ok(self.0.clone())
    }
}
