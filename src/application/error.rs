use crate::domain::error::DomainError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Precondition(#[from] DomainError),

    #[error("remote call failed: {0}")]
    Remote(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("cache error: {0}")]
    Cache(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    pub fn is_precondition(&self) -> bool {
        matches!(self, AppError::Precondition(_))
    }
}
