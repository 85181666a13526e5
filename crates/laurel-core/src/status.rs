//! Closed status state machines for payout rows.
//!
//! Statuses only ever move forward. Transition methods return the next
//! state or an [`EngineError::InvalidStatusTransition`]; there is no way
//! to reach a state outside these enums, so exhaustive matches keep the
//! transition tables compiler-checked.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Lifecycle of a commission transaction: `Pending -> Approved -> Paid`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Paid,
}

impl TransactionStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Paid => "paid",
        }
    }

    /// Whether `next` is a legal forward transition from this state.
    pub fn can_advance_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Approved, Self::Paid)
        )
    }

    pub fn advance_to(self, next: TransactionStatus) -> Result<TransactionStatus, EngineError> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(EngineError::InvalidStatusTransition {
                from: self.name(),
                to: next.name(),
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// Lifecycle of a prize record: `Calculated -> Distributed` or
/// `Calculated -> Cancelled`, both terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrizeStatus {
    Calculated,
    Distributed,
    Cancelled,
}

impl PrizeStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Calculated => "calculated",
            Self::Distributed => "distributed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn distribute(self) -> Result<PrizeStatus, EngineError> {
        match self {
            Self::Calculated => Ok(Self::Distributed),
            other => Err(EngineError::InvalidStatusTransition {
                from: other.name(),
                to: Self::Distributed.name(),
            }),
        }
    }

    pub fn cancel(self) -> Result<PrizeStatus, EngineError> {
        match self {
            Self::Calculated => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidStatusTransition {
                from: other.name(),
                to: Self::Cancelled.name(),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Distributed | Self::Cancelled)
    }
}

/// Referral edge status. Edges are deactivated, never deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    Active,
    Inactive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_forward_path() {
        let s = TransactionStatus::Pending;
        let s = s.advance_to(TransactionStatus::Approved).unwrap();
        let s = s.advance_to(TransactionStatus::Paid).unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn test_transaction_rejects_skip_and_backward() {
        assert!(TransactionStatus::Pending
            .advance_to(TransactionStatus::Paid)
            .is_err());
        assert!(TransactionStatus::Approved
            .advance_to(TransactionStatus::Pending)
            .is_err());
        assert!(TransactionStatus::Paid
            .advance_to(TransactionStatus::Approved)
            .is_err());
    }

    #[test]
    fn test_prize_terminal_states_are_immutable() {
        let distributed = PrizeStatus::Calculated.distribute().unwrap();
        assert!(distributed.distribute().is_err());
        assert!(distributed.cancel().is_err());

        let cancelled = PrizeStatus::Calculated.cancel().unwrap();
        assert!(cancelled.distribute().is_err());
        assert!(cancelled.cancel().is_err());
    }
}
