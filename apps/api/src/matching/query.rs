use serde::Deserialize;

use crate::errors::AppError;
use crate::models::prediction::Prediction;

/// Everything the match engine needs to rank the corpus for one request.
#[derive(Debug, Clone, Default)]
pub struct MatchQuery {
    pub title: String,
    pub location: Option<String>,
    pub experience_years: Option<u32>,
    pub prediction: Option<Prediction>,
}

/// Experience filter as sent by clients: a JSON number or the raw text of a
/// form/query field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExperienceInput {
    Years(u64),
    Text(String),
}

/// Raw filter inputs from a query string, JSON body or multipart form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchFilters {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub experience: Option<ExperienceInput>,
}

impl MatchFilters {
    /// Validates the filters. Blank location or experience means "no filter";
    /// a non-blank experience must be a non-negative integer.
    pub fn into_query(self, prediction: Option<Prediction>) -> Result<MatchQuery, AppError> {
        let experience_years = match self.experience {
            None => None,
            Some(ExperienceInput::Years(years)) => Some(years_from(years)?),
            Some(ExperienceInput::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    None
                } else {
                    let years = text.parse::<u64>().map_err(|_| invalid_experience(text))?;
                    Some(years_from(years)?)
                }
            }
        };

        Ok(MatchQuery {
            title: self.title.unwrap_or_default(),
            location: self
                .location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            experience_years,
            prediction,
        })
    }
}

fn years_from(years: u64) -> Result<u32, AppError> {
    u32::try_from(years).map_err(|_| invalid_experience(&years.to_string()))
}

fn invalid_experience(raw: &str) -> AppError {
    AppError::Validation(format!(
        "experience must be a non-negative integer, got '{raw}'"
    ))
}
