//! Identifier newtypes and shared referral rows.
//!
//! Users live in an external user-management system and are referenced
//! by identifier only; display names are denormalized into payout rows
//! at creation time so the ledger stays readable after the fact.

use crate::money::Amount;
use crate::status::RelationshipStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(
    /// Identity of a participant (investor, referrer, or operator).
    UserId
);
id_type!(
    /// Reference to an investment purchase held by the checkout collaborator.
    InvestmentId
);
id_type!(
    /// A referral edge row.
    RelationshipId
);
id_type!(
    /// A commission transaction row.
    TransactionId
);
id_type!(
    /// A leaderboard prize snapshot row.
    PrizeRecordId
);
id_type!(
    /// A commission plan version.
    PlanId
);

/// Directed referral edge: `referred` -> `referrer`.
///
/// At most one relationship may exist per referred user, regardless of
/// referrer. The row is created once on first attribution; afterwards only
/// the cumulative counters and the status change. Rows are never deleted,
/// only deactivated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferralRelationship {
    pub id: RelationshipId,

    /// The user who was referred (the child in the forest).
    pub referred: UserId,

    /// The user who referred them (the parent).
    pub referrer: UserId,

    /// Referral code used at attribution, if any.
    pub referral_code: Option<String>,

    /// Attribution channel label (e.g. "telegram", "web").
    pub source: String,

    pub status: RelationshipStatus,

    /// Cumulative amount invested by the referred user.
    pub invested: Amount,

    /// Cumulative direct commission the referrer earned from this user.
    pub commission_earned: Amount,

    pub created_at: DateTime<Utc>,
}

impl ReferralRelationship {
    pub fn new(
        referrer: UserId,
        referred: UserId,
        referral_code: Option<String>,
        source: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RelationshipId::generate(),
            referred,
            referrer,
            referral_code,
            source: source.to_string(),
            status: RelationshipStatus::Active,
            invested: Amount::ZERO,
            commission_earned: Amount::ZERO,
            created_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RelationshipStatus::Active
    }
}

/// A completed investment purchase, as reported by the checkout
/// collaborator. This table is the single authoritative aggregation
/// source for leaderboard volume.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvestmentRecord {
    pub investment_id: InvestmentId,
    pub investor: UserId,
    pub amount: Amount,
    pub package: String,
    pub recorded_at: DateTime<Utc>,
}

/// Per-referrer aggregate for the dashboard stats read.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferralStats {
    pub referrer: UserId,
    pub direct_referrals: u64,
    pub active_referrals: u64,
    pub total_invested: Amount,
    pub total_commission: Amount,
}
