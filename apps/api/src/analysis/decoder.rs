use crate::analysis::runner::RawOutput;
use crate::analysis::AnalysisError;
use crate::models::prediction::{Prediction, PredictionPayload};

/// Decodes the engine's stdout into a `Prediction`.
///
/// The output must be exactly one UTF-8 JSON object carrying `result_category`,
/// `confidence` (0–100) and `skills`. Nothing is defaulted: a missing field,
/// a wrong type or an engine-reported `error` is `MalformedOutput`.
pub fn decode(raw: &RawOutput) -> Result<Prediction, AnalysisError> {
    let payload: PredictionPayload = serde_json::from_slice(raw.as_bytes())
        .map_err(|e| AnalysisError::MalformedOutput(format!("Invalid prediction response: {e}")))?;

    Prediction::try_from(payload).map_err(AnalysisError::MalformedOutput)
}
