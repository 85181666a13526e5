//! The shared relational store.
//!
//! One [`Database`] owns every table behind a single `RwLock`. Writes go
//! through [`Database::commit`] with a typed batch of [`WriteOp`]s: the
//! whole batch is validated against current state under the write guard,
//! then applied, so a failing op leaves nothing behind and two racing
//! commits serialize on the lock. The unique index on the
//! `(referrer, investment, level)` triple lives here, which makes the
//! store the final arbiter of commission idempotency.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use laurel_core::{
    Amount, CommissionPlan, CommissionTransaction, InvestmentId, InvestmentRecord, PlanId,
    PrizeRecord, PrizeRecordId, PrizeStatus, RelationshipStatus, ReferralRelationship,
    TransactionId, TransactionKind, TransactionStatus, UserId,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Store-layer failures. Any of these aborts the whole batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("commission already recorded for referrer {referrer}, investment {investment}, level {level}")]
    DuplicateCommission {
        referrer: UserId,
        investment: InvestmentId,
        level: u8,
    },

    #[error("duplicate transaction id {0}")]
    DuplicateTransactionId(TransactionId),

    #[error("relationship already exists for referred user {0}")]
    DuplicateRelationship(UserId),

    #[error("no relationship exists for referred user {0}")]
    UnknownRelationship(UserId),

    #[error("investment {0} already recorded")]
    DuplicateInvestment(InvestmentId),

    #[error("duplicate plan id {0}")]
    DuplicatePlanId(PlanId),

    #[error("unknown transaction {0}")]
    UnknownTransaction(TransactionId),

    #[error("unknown prize record {0}")]
    UnknownPrize(PrizeRecordId),

    #[error("duplicate rank {0} in prize snapshot")]
    DuplicateRank(u32),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

/// One write in an atomic batch.
#[derive(Clone, Debug)]
pub enum WriteOp {
    /// Record or refresh a participant's display name.
    UpsertParticipant { user: UserId, display_name: String },

    InsertRelationship(ReferralRelationship),

    DeactivateRelationship { referred: UserId },

    /// Bump the cumulative counters on the referred user's edge.
    AccrueRelationship {
        referred: UserId,
        invested: Amount,
        commission: Amount,
    },

    InsertPlan(CommissionPlan),

    /// Demote every default plan; paired with an [`WriteOp::InsertPlan`]
    /// when versioning a new default forward.
    ClearDefaultPlans,

    InsertInvestment(InvestmentRecord),

    InsertTransaction(CommissionTransaction),

    AdvanceTransaction {
        id: TransactionId,
        to: TransactionStatus,
    },

    /// Delete every calculated prize record and insert a fresh snapshot.
    /// Distributed and cancelled history is untouched.
    ReplaceCalculatedPrizes(Vec<PrizeRecord>),

    /// Pay out one prize: insert its transaction and advance the record,
    /// or skip both if the record is no longer `Calculated`.
    DistributePrize {
        prize: PrizeRecordId,
        actor: UserId,
        at: DateTime<Utc>,
        transaction: CommissionTransaction,
    },

    CancelPrize {
        prize: PrizeRecordId,
    },
}

/// What a committed batch actually did.
#[derive(Clone, Debug, Default)]
pub struct CommitReceipt {
    /// Transaction rows inserted (commissions and prize payouts).
    pub transactions_created: usize,

    /// Prize records advanced to `Distributed`.
    pub prizes_distributed: usize,

    /// Calculated prize records deleted by a snapshot replacement.
    pub prizes_replaced: usize,

    /// Prize ids skipped because their record was no longer `Calculated`.
    pub skipped_prizes: Vec<PrizeRecordId>,
}

#[derive(Default)]
struct Tables {
    participants: HashMap<UserId, String>,

    /// Keyed by referred user: the single-parent invariant is structural.
    relationships: IndexMap<UserId, ReferralRelationship>,

    plans: IndexMap<PlanId, CommissionPlan>,

    investments: IndexMap<InvestmentId, InvestmentRecord>,

    transactions: IndexMap<TransactionId, CommissionTransaction>,

    /// Unique index enforcing commission idempotency.
    commission_keys: HashSet<(UserId, InvestmentId, u8)>,

    prizes: IndexMap<PrizeRecordId, PrizeRecord>,
}

/// The single shared mutable resource of the engine.
#[derive(Default)]
pub struct Database {
    tables: RwLock<Tables>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and apply a batch under one write guard. A validation
    /// failure applies nothing.
    pub fn commit(&self, batch: Vec<WriteOp>) -> Result<CommitReceipt, StoreError> {
        let mut tables = self.tables.write();
        let skipped = Self::validate(&tables, &batch)?;
        let receipt = Self::apply(&mut tables, batch, skipped);
        tracing::debug!(
            transactions = receipt.transactions_created,
            prizes = receipt.prizes_distributed,
            skipped = receipt.skipped_prizes.len(),
            "batch committed"
        );
        Ok(receipt)
    }

    /// First pass: check every op against current state plus the effects
    /// staged by earlier ops in the same batch. Returns the indices of
    /// `DistributePrize` ops to skip.
    fn validate(tables: &Tables, batch: &[WriteOp]) -> Result<HashSet<usize>, StoreError> {
        let mut staged_keys: HashSet<(UserId, InvestmentId, u8)> = HashSet::new();
        let mut staged_tx_ids: HashSet<TransactionId> = HashSet::new();
        let mut staged_investments: HashSet<InvestmentId> = HashSet::new();
        let mut staged_relationships: HashSet<UserId> = HashSet::new();
        let mut staged_plans: HashSet<PlanId> = HashSet::new();
        let mut staged_settled: HashSet<PrizeRecordId> = HashSet::new();
        let mut skipped: HashSet<usize> = HashSet::new();

        for (index, op) in batch.iter().enumerate() {
            match op {
                WriteOp::UpsertParticipant { .. } | WriteOp::ClearDefaultPlans => {}

                WriteOp::InsertRelationship(rel) => {
                    if tables.relationships.contains_key(&rel.referred)
                        || !staged_relationships.insert(rel.referred)
                    {
                        return Err(StoreError::DuplicateRelationship(rel.referred));
                    }
                }

                WriteOp::DeactivateRelationship { referred }
                | WriteOp::AccrueRelationship { referred, .. } => {
                    if !tables.relationships.contains_key(referred)
                        && !staged_relationships.contains(referred)
                    {
                        return Err(StoreError::UnknownRelationship(*referred));
                    }
                }

                WriteOp::InsertPlan(plan) => {
                    if tables.plans.contains_key(&plan.id) || !staged_plans.insert(plan.id) {
                        return Err(StoreError::DuplicatePlanId(plan.id));
                    }
                }

                WriteOp::InsertInvestment(record) => {
                    if tables.investments.contains_key(&record.investment_id)
                        || !staged_investments.insert(record.investment_id)
                    {
                        return Err(StoreError::DuplicateInvestment(record.investment_id));
                    }
                }

                WriteOp::InsertTransaction(tx) => {
                    Self::validate_transaction(tables, tx, &mut staged_tx_ids, &mut staged_keys)?;
                }

                WriteOp::AdvanceTransaction { id, to } => {
                    let tx = tables
                        .transactions
                        .get(id)
                        .ok_or(StoreError::UnknownTransaction(*id))?;
                    if !tx.status.can_advance_to(*to) {
                        return Err(StoreError::InvalidTransition {
                            from: tx.status.name(),
                            to: to.name(),
                        });
                    }
                }

                WriteOp::ReplaceCalculatedPrizes(records) => {
                    let mut ranks = HashSet::new();
                    for record in records {
                        if !ranks.insert(record.rank) {
                            return Err(StoreError::DuplicateRank(record.rank));
                        }
                    }
                }

                WriteOp::DistributePrize {
                    prize, transaction, ..
                } => {
                    let record = tables
                        .prizes
                        .get(prize)
                        .ok_or(StoreError::UnknownPrize(*prize))?;
                    if record.status != PrizeStatus::Calculated || staged_settled.contains(prize) {
                        skipped.insert(index);
                        continue;
                    }
                    staged_settled.insert(*prize);
                    Self::validate_transaction(
                        tables,
                        transaction,
                        &mut staged_tx_ids,
                        &mut staged_keys,
                    )?;
                }

                WriteOp::CancelPrize { prize } => {
                    let record = tables
                        .prizes
                        .get(prize)
                        .ok_or(StoreError::UnknownPrize(*prize))?;
                    if record.status != PrizeStatus::Calculated || staged_settled.contains(prize) {
                        return Err(StoreError::InvalidTransition {
                            from: record.status.name(),
                            to: PrizeStatus::Cancelled.name(),
                        });
                    }
                    staged_settled.insert(*prize);
                }
            }
        }
        Ok(skipped)
    }

    fn validate_transaction(
        tables: &Tables,
        tx: &CommissionTransaction,
        staged_tx_ids: &mut HashSet<TransactionId>,
        staged_keys: &mut HashSet<(UserId, InvestmentId, u8)>,
    ) -> Result<(), StoreError> {
        if tables.transactions.contains_key(&tx.id) || !staged_tx_ids.insert(tx.id) {
            return Err(StoreError::DuplicateTransactionId(tx.id));
        }
        if let Some(key) = tx.idempotency_key() {
            if tables.commission_keys.contains(&key) || !staged_keys.insert(key) {
                return Err(StoreError::DuplicateCommission {
                    referrer: key.0,
                    investment: key.1,
                    level: key.2,
                });
            }
        }
        Ok(())
    }

    /// Second pass: apply every op that validation admitted.
    fn apply(tables: &mut Tables, batch: Vec<WriteOp>, skipped: HashSet<usize>) -> CommitReceipt {
        let mut receipt = CommitReceipt::default();

        for (index, op) in batch.into_iter().enumerate() {
            match op {
                WriteOp::UpsertParticipant { user, display_name } => {
                    tables.participants.insert(user, display_name);
                }

                WriteOp::InsertRelationship(rel) => {
                    tables.relationships.insert(rel.referred, rel);
                }

                WriteOp::DeactivateRelationship { referred } => {
                    if let Some(rel) = tables.relationships.get_mut(&referred) {
                        rel.status = RelationshipStatus::Inactive;
                    }
                }

                WriteOp::AccrueRelationship {
                    referred,
                    invested,
                    commission,
                } => {
                    if let Some(rel) = tables.relationships.get_mut(&referred) {
                        rel.invested = rel.invested.saturating_add(invested);
                        rel.commission_earned = rel.commission_earned.saturating_add(commission);
                    }
                }

                WriteOp::InsertPlan(plan) => {
                    tables.plans.insert(plan.id, plan);
                }

                WriteOp::ClearDefaultPlans => {
                    for plan in tables.plans.values_mut() {
                        plan.is_default = false;
                    }
                }

                WriteOp::InsertInvestment(record) => {
                    tables.investments.insert(record.investment_id, record);
                }

                WriteOp::InsertTransaction(tx) => {
                    Self::insert_transaction(tables, tx);
                    receipt.transactions_created += 1;
                }

                WriteOp::AdvanceTransaction { id, to } => {
                    if let Some(tx) = tables.transactions.get_mut(&id) {
                        tx.status = to;
                    }
                }

                WriteOp::ReplaceCalculatedPrizes(records) => {
                    let before = tables.prizes.len();
                    tables
                        .prizes
                        .retain(|_, record| record.status != PrizeStatus::Calculated);
                    receipt.prizes_replaced = before - tables.prizes.len();
                    for record in records {
                        tables.prizes.insert(record.id, record);
                    }
                }

                WriteOp::DistributePrize {
                    prize,
                    actor,
                    at,
                    transaction,
                } => {
                    if skipped.contains(&index) {
                        receipt.skipped_prizes.push(prize);
                        continue;
                    }
                    if let Some(record) = tables.prizes.get_mut(&prize) {
                        record.status = PrizeStatus::Distributed;
                        record.distributed_at = Some(at);
                        record.distributed_by = Some(actor);
                    }
                    Self::insert_transaction(tables, transaction);
                    receipt.transactions_created += 1;
                    receipt.prizes_distributed += 1;
                }

                WriteOp::CancelPrize { prize } => {
                    if let Some(record) = tables.prizes.get_mut(&prize) {
                        record.status = PrizeStatus::Cancelled;
                    }
                }
            }
        }
        receipt
    }

    fn insert_transaction(tables: &mut Tables, tx: CommissionTransaction) {
        if let Some(key) = tx.idempotency_key() {
            tables.commission_keys.insert(key);
        }
        tables.transactions.insert(tx.id, tx);
    }

    // === Reads ===

    pub fn participant_name(&self, user: &UserId) -> Option<String> {
        self.tables.read().participants.get(user).cloned()
    }

    /// Display name for payout rows: the registered name, or the raw id
    /// when the user-management collaborator never pushed one.
    pub fn display_name_or_id(&self, user: &UserId) -> String {
        self.participant_name(user)
            .unwrap_or_else(|| user.to_string())
    }

    pub fn relationship(&self, referred: &UserId) -> Option<ReferralRelationship> {
        self.tables.read().relationships.get(referred).cloned()
    }

    /// Active referrer of a user, if any. `None` is a normal chain
    /// terminus, not an error.
    pub fn active_referrer_of(&self, user: &UserId) -> Option<UserId> {
        self.tables
            .read()
            .relationships
            .get(user)
            .filter(|rel| rel.is_active())
            .map(|rel| rel.referrer)
    }

    /// Every relationship pointing at a referrer.
    pub fn relationships_to(&self, referrer: &UserId) -> Vec<ReferralRelationship> {
        self.tables
            .read()
            .relationships
            .values()
            .filter(|rel| rel.referrer == *referrer)
            .cloned()
            .collect()
    }

    pub fn relationships(&self) -> Vec<ReferralRelationship> {
        self.tables.read().relationships.values().cloned().collect()
    }

    pub fn plans(&self) -> Vec<CommissionPlan> {
        self.tables.read().plans.values().cloned().collect()
    }

    /// Plans flagged both default and active. The resolver decides what a
    /// count other than one means.
    pub fn default_active_plans(&self) -> Vec<CommissionPlan> {
        self.tables
            .read()
            .plans
            .values()
            .filter(|plan| plan.is_default && plan.is_active)
            .cloned()
            .collect()
    }

    pub fn investment(&self, id: &InvestmentId) -> Option<InvestmentRecord> {
        self.tables.read().investments.get(id).cloned()
    }

    pub fn investments(&self) -> Vec<InvestmentRecord> {
        self.tables.read().investments.values().cloned().collect()
    }

    pub fn transaction(&self, id: &TransactionId) -> Option<CommissionTransaction> {
        self.tables.read().transactions.get(id).cloned()
    }

    pub fn transactions(&self) -> Vec<CommissionTransaction> {
        self.tables.read().transactions.values().cloned().collect()
    }

    pub fn commissions_for_investment(
        &self,
        investment: &InvestmentId,
    ) -> Vec<CommissionTransaction> {
        self.tables
            .read()
            .transactions
            .values()
            .filter(|tx| {
                tx.kind == TransactionKind::ReferralCommission
                    && tx.investment.as_ref() == Some(investment)
            })
            .cloned()
            .collect()
    }

    pub fn prize(&self, id: &PrizeRecordId) -> Option<PrizeRecord> {
        self.tables.read().prizes.get(id).cloned()
    }

    pub fn prizes(&self) -> Vec<PrizeRecord> {
        self.tables.read().prizes.values().cloned().collect()
    }

    pub fn calculated_prizes(&self) -> Vec<PrizeRecord> {
        self.tables
            .read()
            .prizes
            .values()
            .filter(|record| record.status == PrizeStatus::Calculated)
            .cloned()
            .collect()
    }
}
