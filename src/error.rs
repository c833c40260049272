use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PlanError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, PlanError::InvalidRequest(_) | PlanError::Json(_))
    }
}
