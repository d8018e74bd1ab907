use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Failed to load grammar: {0}")]
    Language(String),

    #[error("Failed to parse document")]
    ParseFailed,
}
