pub mod identity;
pub mod payment;
pub mod push;
pub mod repository;

pub use identity::{Capability, Principal, Role};
pub use repository::{StoreError, StoreResult};

/// Error taxonomy shared by every component. Each variant carries a single
/// message that is safe to show to a caller.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::Unavailable(err.to_string())
    }
}
