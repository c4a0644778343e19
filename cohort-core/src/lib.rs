pub mod identity;
pub mod notification;
pub mod payment;
pub mod retry;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Storage unavailable: {0}")]
    StorageError(String),
    #[error("Identity verification failed: {0}")]
    IdentityError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        CoreError::StorageError(err.to_string())
    }
}
