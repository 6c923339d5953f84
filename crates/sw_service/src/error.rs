//! Service error surface. Soft clamps never surface here; everything below
//! is a refusal the caller has to show.

use sw_algo::{ReviewBlock, SubmissionBlock};
use sw_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Unknown, expired or revoked invite; nothing was created.
    #[error("access rejected: {reason}")]
    InviteRejected { reason: String },

    /// Malformed request (weight off-range, threshold too long, ...).
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("review blocked: {0}")]
    ReviewBlocked(ReviewBlock),

    #[error("submission blocked: {0}")]
    SubmissionBlocked(SubmissionBlock),

    #[error("role already set to {current}")]
    RoleLocked { current: String },

    #[error(transparent)]
    Store(#[from] IoError),
}

impl ServiceError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        ServiceError::NotFound { kind, id: id.to_string() }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
