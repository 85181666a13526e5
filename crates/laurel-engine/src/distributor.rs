//! Commission distribution for qualifying investment events.
//!
//! One `distribute` call is one bounded unit of work: resolve the plan,
//! walk the chain, compute per-level payouts, and persist everything in
//! a single atomic batch. Either every level's transaction lands or none
//! does.

use crate::graph::ReferralGraph;
use crate::resolver::CommissionPlanResolver;
use crate::store_err;
use chrono::{DateTime, Utc};
use laurel_core::{
    Amount, CommissionTransaction, EngineError, InvestmentId, InvestmentRecord, Result, UserId,
};
use laurel_storage::{AuditAction, AuditLog, Database, StoreError, WriteOp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Actor label for audit entries; distribution is driven by the checkout
/// collaborator's investment-completion events, not by an operator.
const ACTOR: &str = "checkout";

/// How a distribution call concluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Commissions created for at least the recorded chain.
    Recorded,

    /// The investor has no referrer; a valid no-op.
    NoReferrer,

    /// Commissions for this investment already exist; retry no-op.
    AlreadyRecorded,
}

/// Structured outcome of one `distribute` call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistributionReport {
    pub investment: InvestmentId,
    pub disposition: Disposition,
    pub transactions_created: usize,
    pub total_cash: Amount,
    pub total_units: u64,
}

impl DistributionReport {
    pub fn summary(&self) -> String {
        match self.disposition {
            Disposition::Recorded => format!(
                "{} commission transactions created ({} cash, {} units)",
                self.transactions_created, self.total_cash, self.total_units
            ),
            Disposition::NoReferrer => "investor has no referrer, nothing to distribute".into(),
            Disposition::AlreadyRecorded => {
                "commissions for this investment already recorded".into()
            }
        }
    }
}

/// Walks the referral chain for an investment and creates one pending
/// commission transaction per rewarded level.
pub struct CommissionDistributor {
    db: Arc<Database>,
    audit: Arc<AuditLog>,
    resolver: CommissionPlanResolver,
    graph: ReferralGraph,
}

impl CommissionDistributor {
    pub fn new(db: Arc<Database>, audit: Arc<AuditLog>) -> Self {
        Self {
            resolver: CommissionPlanResolver::new(db.clone(), audit.clone()),
            graph: ReferralGraph::new(db.clone(), audit.clone()),
            db,
            audit,
        }
    }

    /// Distribute commissions for a completed investment.
    ///
    /// Idempotent per investment: a retry that finds the investment
    /// already recorded returns a zero-count
    /// [`Disposition::AlreadyRecorded`] report instead of double-paying.
    pub fn distribute(
        &self,
        investment_id: InvestmentId,
        investor: UserId,
        amount: Amount,
        package: &str,
        now: DateTime<Utc>,
    ) -> Result<DistributionReport> {
        if amount.is_zero() {
            self.audit_failure(&investment_id, "rejected: non-positive amount");
            return Err(EngineError::InvalidAmount);
        }

        if self.db.investment(&investment_id).is_some() {
            self.audit.append(
                ACTOR,
                AuditAction::DistributeCommissions,
                vec![investment_id.to_string()],
                Amount::ZERO,
                "skipped: already recorded",
            );
            return Ok(self.report(investment_id, Disposition::AlreadyRecorded, 0, Amount::ZERO, 0));
        }

        let plan = match self.resolver.active_plan() {
            Ok(plan) => plan,
            Err(err) => {
                self.audit_failure(&investment_id, &format!("aborted: {err}"));
                return Err(err);
            }
        };

        let chain = self.graph.chain_from(investor, plan.max_levels);
        let investor_name = self.db.display_name_or_id(&investor);

        let mut batch = vec![WriteOp::InsertInvestment(InvestmentRecord {
            investment_id,
            investor,
            amount,
            package: package.to_string(),
            recorded_at: now,
        })];

        let mut created = 0usize;
        let mut total_cash = Amount::ZERO;
        let mut total_units = 0u64;
        let mut direct_commission = Amount::ZERO;

        // strictly increasing level order; chain_from already yields it
        for (level, referrer) in &chain {
            let Some(rate) = plan.rate_for(*level) else {
                continue;
            };
            if rate.is_zero() {
                continue;
            }
            let tx = CommissionTransaction::referral_commission(
                &plan,
                *referrer,
                self.db.display_name_or_id(referrer),
                investor,
                investor_name.clone(),
                investment_id,
                amount,
                *level,
                rate.cash_bps,
                rate.unit_bps,
                package,
                now,
            );
            if *level == 1 {
                direct_commission = tx.cash_amount;
            }
            total_cash = total_cash.saturating_add(tx.cash_amount);
            total_units += tx.unit_count;
            created += 1;
            batch.push(WriteOp::InsertTransaction(tx));
        }

        if !chain.is_empty() {
            batch.push(WriteOp::AccrueRelationship {
                referred: investor,
                invested: amount,
                commission: direct_commission,
            });
        }

        match self.db.commit(batch) {
            Ok(_) => {
                let disposition = if chain.is_empty() {
                    Disposition::NoReferrer
                } else {
                    Disposition::Recorded
                };
                let report =
                    self.report(investment_id, disposition, created, total_cash, total_units);
                self.audit.append(
                    ACTOR,
                    AuditAction::DistributeCommissions,
                    vec![investment_id.to_string(), investor.to_string()],
                    total_cash,
                    &report.summary(),
                );
                tracing::info!(
                    investment = %investment_id,
                    levels = created,
                    cash = %total_cash,
                    "commissions distributed"
                );
                Ok(report)
            }
            Err(StoreError::DuplicateInvestment(_)) | Err(StoreError::DuplicateCommission { .. }) => {
                // lost the race against a concurrent call for the same
                // investment; that call's writes are complete, ours rolled back
                self.audit.append(
                    ACTOR,
                    AuditAction::DistributeCommissions,
                    vec![investment_id.to_string()],
                    Amount::ZERO,
                    "skipped: already recorded",
                );
                Ok(self.report(investment_id, Disposition::AlreadyRecorded, 0, Amount::ZERO, 0))
            }
            Err(other) => {
                self.audit_failure(&investment_id, &format!("persistence failure: {other}"));
                Err(store_err(other))
            }
        }
    }

    fn report(
        &self,
        investment: InvestmentId,
        disposition: Disposition,
        transactions_created: usize,
        total_cash: Amount,
        total_units: u64,
    ) -> DistributionReport {
        DistributionReport {
            investment,
            disposition,
            transactions_created,
            total_cash,
            total_units,
        }
    }

    fn audit_failure(&self, investment: &InvestmentId, outcome: &str) {
        self.audit.append(
            ACTOR,
            AuditAction::DistributeCommissions,
            vec![investment.to_string()],
            Amount::ZERO,
            outcome,
        );
    }
}
