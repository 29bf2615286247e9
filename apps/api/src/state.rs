use std::sync::Arc;

use crate::analysis::intake::DocumentIntake;
use crate::analysis::runner::AnalysisRunner;
use crate::corpus::CorpusGateway;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable corpus source. Default: PgCorpus over the scraper's table.
    pub corpus: Arc<dyn CorpusGateway>,
    pub intake: DocumentIntake,
    pub runner: AnalysisRunner,
}
