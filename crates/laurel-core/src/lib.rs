//! # Laurel Core
//!
//! Domain model for the Laurel referral commission and leaderboard
//! incentive engine.
//!
//! ## Components
//!
//! - **Money**: integer minor-unit [`money::Amount`] with basis-point math
//! - **Referral rows**: single-parent edges and investment records
//! - **Plans**: versioned tiered payout schedules
//! - **Payouts**: commission transactions and prize records, the one
//!   representation every reward flows through
//! - **Statuses**: closed, forward-only state machines

pub mod config;
pub mod error;
pub mod money;
pub mod payout;
pub mod plan;
pub mod status;
pub mod types;

// Re-exports
pub use config::{LeaderboardConfig, PrizeTable};
pub use error::{EngineError, Result};
pub use money::Amount;
pub use payout::{CommissionTransaction, PrizeRecord, TransactionKind, PRIZE_LEVEL};
pub use plan::{CommissionPlan, LevelRate};
pub use status::{PrizeStatus, RelationshipStatus, TransactionStatus};
pub use types::{
    InvestmentId, InvestmentRecord, PlanId, PrizeRecordId, ReferralRelationship, ReferralStats,
    RelationshipId, TransactionId, UserId,
};
