//! Caller-visible failures of the reputation core

use thiserror::Error;

/// Every rejected operation maps to exactly one of these kinds.
///
/// None of them are transient: resubmitting the same request against the
/// same state fails the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReputationError {
    /// Privileged operation attempted by someone other than the administrator
    #[error("caller is not the administrator")]
    Unauthorized,

    /// Referenced category or reputation record does not exist
    #[error("category or reputation record not found")]
    NotFound,

    /// Same sender attested to the same target within the cooldown window
    #[error("attestation cooldown is still active")]
    CooldownActive,

    /// Sender and target are the same principal
    #[error("cannot attest to yourself")]
    SelfAttestation,
}

impl ReputationError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ReputationError::Unauthorized => "UNAUTHORIZED",
            ReputationError::NotFound => "NOT_FOUND",
            ReputationError::CooldownActive => "COOLDOWN_ACTIVE",
            ReputationError::SelfAttestation => "SELF_ATTESTATION",
        }
    }
}

pub type ReputationResult<T> = Result<T, ReputationError>;
