use mes_core::config::ProgressConfig;
use mes_core::db::Database;
use mes_core::predict::ModelState;

/// Shared application state passed to all route handlers.
///
/// The model state is loaded once before the router is built and never
/// mutated afterwards, so handlers only ever read it.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub models: ModelState,
    pub progress: ProgressConfig,
}

impl AppState {
    pub fn new(db: Database, models: ModelState, progress: ProgressConfig) -> Self {
        Self {
            db,
            models,
            progress,
        }
    }
}
