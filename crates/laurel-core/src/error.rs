//! Error taxonomy for the payout engine.

use crate::types::{PrizeRecordId, TransactionId, UserId};
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the commission and leaderboard engines.
///
/// Business-state conditions (empty referral chain, no eligible prize in a
/// batch, a retry that finds its work already recorded) are deliberately
/// NOT in this enum; those come back as structured zero-count outcomes so
/// callers can tell "nothing to do" from "something broke".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // === Configuration ===
    /// No commission plan is flagged default and active.
    #[error("no active commission plan is configured")]
    NoActivePlan,

    /// More than one plan is flagged default and active.
    #[error("{count} commission plans are flagged default and active")]
    AmbiguousActivePlan { count: usize },

    /// A plan failed its own invariants (level table, unit price).
    #[error("invalid commission plan: {0}")]
    InvalidPlan(String),

    // === Referral graph ===
    /// An edge already exists for the referred user (single-parent rule).
    #[error("referral relationship already exists for user {referred}")]
    DuplicateRelationship { referred: UserId },

    /// A user cannot be their own referrer.
    #[error("user {user} cannot refer themselves")]
    SelfReferral { user: UserId },

    /// No relationship row exists for the given referred user.
    #[error("no referral relationship exists for user {referred}")]
    UnknownRelationship { referred: UserId },

    // === Distribution ===
    /// The investment amount was zero or otherwise unusable.
    #[error("investment amount must be positive")]
    InvalidAmount,

    /// Store-layer failure; the whole unit of work was rolled back.
    #[error("persistence failure: {0}")]
    Persistence(String),

    // === Leaderboard ===
    /// The qualified subset of the leaderboard is empty.
    #[error("no qualified leaderboard participants")]
    NoQualifiedParticipants,

    // === Status machines ===
    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("unknown commission transaction: {0}")]
    UnknownTransaction(TransactionId),

    #[error("unknown prize record: {0}")]
    UnknownPrizeRecord(PrizeRecordId),
}

impl EngineError {
    /// Stable error code for operator-facing reports.
    pub fn code(&self) -> u32 {
        match self {
            Self::NoActivePlan => 2001,
            Self::AmbiguousActivePlan { .. } => 2002,
            Self::InvalidPlan(_) => 2003,
            Self::DuplicateRelationship { .. } => 2101,
            Self::SelfReferral { .. } => 2102,
            Self::UnknownRelationship { .. } => 2103,
            Self::InvalidAmount => 2201,
            Self::Persistence(_) => 2202,
            Self::NoQualifiedParticipants => 2301,
            Self::InvalidStatusTransition { .. } => 2401,
            Self::UnknownTransaction(_) => 2402,
            Self::UnknownPrizeRecord(_) => 2403,
        }
    }

    /// Whether retrying the same call can succeed without operator action.
    ///
    /// Configuration errors need an operator fix; duplicate-relationship
    /// means "already attributed" and retrying changes nothing; only
    /// store-layer failures are worth an automatic retry (the idempotency
    /// key makes the retry safe).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(EngineError::NoActivePlan.code(), 2001);
        assert_eq!(EngineError::NoQualifiedParticipants.code(), 2301);
    }

    #[test]
    fn test_only_persistence_is_recoverable() {
        assert!(EngineError::Persistence("lock poisoned".into()).is_recoverable());
        assert!(!EngineError::NoActivePlan.is_recoverable());
        assert!(!EngineError::DuplicateRelationship {
            referred: UserId::generate()
        }
        .is_recoverable());
    }

    #[test]
    fn test_display_names_the_reason() {
        let err = EngineError::AmbiguousActivePlan { count: 3 };
        assert!(err.to_string().contains('3'));
    }
}
