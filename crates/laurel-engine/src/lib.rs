//! # Laurel Engine
//!
//! The payout engines of the Laurel referral incentive system.
//!
//! ## Components
//!
//! - [`graph::ReferralGraph`] - single-parent referral edges, bounded
//!   upward chain walk
//! - [`resolver::CommissionPlanResolver`] - the one default+active
//!   tiered payout schedule
//! - [`distributor::CommissionDistributor`] - investment event in,
//!   per-level pending commissions out, atomically
//! - [`leaderboard::LeaderboardRanker`] - deterministic direct-volume
//!   ranking with qualification
//! - [`prizes::PrizeCalculator`] / [`prizes::PrizeDistributor`] -
//!   two-phase prize snapshot and exactly-once payout
//! - [`admin::TransactionAdmin`] - forward-only transaction lifecycle
//!
//! Every component shares one [`laurel_storage::Database`] and appends
//! its decisions to one [`laurel_storage::AuditLog`].

pub mod admin;
pub mod distributor;
pub mod graph;
pub mod leaderboard;
pub mod prizes;
pub mod resolver;

use laurel_core::{EngineError, LeaderboardConfig};
use laurel_storage::{AuditLog, Database, StoreError};
use std::sync::Arc;

// Re-exports
pub use admin::TransactionAdmin;
pub use distributor::{CommissionDistributor, Disposition, DistributionReport};
pub use graph::ReferralGraph;
pub use leaderboard::{LeaderboardEntry, LeaderboardRanker};
pub use prizes::{PrizeCalculation, PrizeCalculator, PrizeDistribution, PrizeDistributor};
pub use resolver::CommissionPlanResolver;

/// Map a store failure to the engine taxonomy. The batch was rolled
/// back in full; callers may retry the whole call.
pub(crate) fn store_err(err: StoreError) -> EngineError {
    EngineError::Persistence(err.to_string())
}

/// All engines wired over one database and one audit log.
pub struct Laurel {
    pub graph: ReferralGraph,
    pub resolver: CommissionPlanResolver,
    pub distributor: CommissionDistributor,
    pub ranker: LeaderboardRanker,
    pub calculator: PrizeCalculator,
    pub prizes: PrizeDistributor,
    pub transactions: TransactionAdmin,
    db: Arc<Database>,
    audit: Arc<AuditLog>,
}

impl Laurel {
    pub fn new(db: Arc<Database>, audit: Arc<AuditLog>, config: LeaderboardConfig) -> Self {
        Self {
            graph: ReferralGraph::new(db.clone(), audit.clone()),
            resolver: CommissionPlanResolver::new(db.clone(), audit.clone()),
            distributor: CommissionDistributor::new(db.clone(), audit.clone()),
            ranker: LeaderboardRanker::new(db.clone(), config.clone()),
            calculator: PrizeCalculator::new(db.clone(), audit.clone(), config.clone()),
            prizes: PrizeDistributor::new(db.clone(), audit.clone()),
            transactions: TransactionAdmin::new(db.clone(), audit.clone()),
            db,
            audit,
        }
    }

    /// Fresh in-memory engine, mostly for tests and the CLI simulator.
    pub fn in_memory(config: LeaderboardConfig) -> Self {
        Self::new(Arc::new(Database::new()), Arc::new(AuditLog::new()), config)
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }
}
