use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Structured output of one classification engine run.
///
/// Skill tokens are normalized (trimmed, lowercased, deduplicated) on
/// construction, so comparisons against it never need to re-case anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PredictionPayload")]
pub struct Prediction {
    pub result_category: String,
    pub confidence: f64, // 0 – 100
    pub skills: BTreeSet<String>,
}

/// Wire shape shared by the engine's stdout and by clients echoing a
/// prediction back. Every field is optional here so that a missing field is
/// reported by name instead of as a generic serde error.
#[derive(Debug, Deserialize)]
pub struct PredictionPayload {
    pub result_category: Option<String>,
    pub confidence: Option<f64>,
    pub skills: Option<Vec<String>>,
    /// Set by the engine when it handled the input but could not classify it.
    #[serde(default)]
    pub error: Option<String>,
}

impl Prediction {
    pub fn new<I, S>(result_category: impl Into<String>, confidence: f64, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            result_category: result_category.into(),
            confidence,
            skills: normalize_skills(skills),
        }
    }
}

impl TryFrom<PredictionPayload> for Prediction {
    type Error = String;

    fn try_from(payload: PredictionPayload) -> Result<Self, Self::Error> {
        if let Some(error) = payload.error.filter(|e| !e.trim().is_empty()) {
            return Err(format!("classification engine reported an error: {error}"));
        }

        let category = payload
            .result_category
            .ok_or("missing required field 'result_category'")?;
        if category.trim().is_empty() {
            return Err("field 'result_category' is empty".to_string());
        }

        let confidence = payload
            .confidence
            .ok_or("missing required field 'confidence'")?;
        if !(0.0..=100.0).contains(&confidence) {
            return Err(format!(
                "field 'confidence' must be between 0 and 100, got {confidence}"
            ));
        }

        let skills = payload.skills.ok_or("missing required field 'skills'")?;

        Ok(Prediction::new(category.trim(), confidence, skills))
    }
}

/// Lowercases and trims skill tokens, dropping empties and duplicates.
pub fn normalize_skills<I, S>(skills: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    skills
        .into_iter()
        .map(|s| normalize_skill(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn normalize_skill(skill: &str) -> String {
    skill.trim().to_lowercase()
}
