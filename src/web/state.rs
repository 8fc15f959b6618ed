use crate::llm::LlmManager;

/// Shared application state for the web server.
///
/// Built once during startup and only read afterwards, so handlers share it
/// through an `Arc` without locking.
pub struct AppState {
    /// Rendered schema text sent with every question
    pub schema: String,
    pub llm_manager: LlmManager,
}

impl AppState {
    pub fn new(schema: String, llm_manager: LlmManager) -> Self {
        Self {
            schema,
            llm_manager,
        }
    }
}
