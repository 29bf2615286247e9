use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::prediction::normalize_skill;

/// Row shape of the `job_listings` table as written by the scraper.
#[derive(Debug, Clone, FromRow)]
pub struct JobPostingRow {
    pub id: Uuid,
    pub job_title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub skills: Option<Vec<String>>,
    pub url: Option<String>,
    pub salary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A job posting as seen by the match engine. Skills are lowercased and
/// deduplicated (first occurrence kept) when a row is converted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub company: Option<String>,
    /// Comma-separated location names; empty when the listing has none.
    pub location: String,
    /// Free text such as "0-5 Yrs".
    pub experience: Option<String>,
    pub skills: Vec<String>,
    pub url: Option<String>,
    pub salary: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<JobPostingRow> for JobPosting {
    fn from(row: JobPostingRow) -> Self {
        let mut skills: Vec<String> = Vec::new();
        for skill in row.skills.unwrap_or_default() {
            let token = normalize_skill(&skill);
            if !token.is_empty() && !skills.contains(&token) {
                skills.push(token);
            }
        }

        JobPosting {
            id: row.id,
            title: row.job_title,
            company: row.company,
            location: row.location.unwrap_or_default(),
            experience: row.experience,
            skills,
            url: row.url,
            salary: row.salary,
            created_at: row.created_at,
        }
    }
}

impl JobPosting {
    /// Individual location names, trimmed, with empties dropped.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.location
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}
