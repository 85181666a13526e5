//! Payout rows: commission transactions and prize records.
//!
//! All rewards flow through one representation. A multi-level referral
//! commission and a leaderboard prize are both `CommissionTransaction`
//! rows; prizes additionally keep a `PrizeRecord` snapshot that drives
//! the two-phase calculate/distribute state machine.

use crate::money::Amount;
use crate::plan::CommissionPlan;
use crate::status::{PrizeStatus, TransactionStatus};
use crate::types::{InvestmentId, PlanId, PrizeRecordId, TransactionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Level recorded on leaderboard-prize transactions instead of a chain
/// position.
pub const PRIZE_LEVEL: u8 = 0;

/// What kind of reward a transaction represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    ReferralCommission,
    LeaderboardPrize,
}

/// An immutable payout fact. Created exactly once per
/// `(referrer, investment, level)` triple for referral commissions;
/// never mutated except forward status transitions, never deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommissionTransaction {
    pub id: TransactionId,

    /// Plan the rates came from; prizes carry no plan.
    pub plan: Option<PlanId>,

    pub referrer: UserId,
    pub referrer_name: String,

    pub referred: UserId,
    pub referred_name: String,

    /// Source investment; prizes have no source investment.
    pub investment: Option<InvestmentId>,

    /// Investment amount the percentages were applied to.
    pub investment_amount: Amount,

    /// Chain level (1 = direct referrer), or [`PRIZE_LEVEL`] for prizes.
    pub level: u8,

    /// Cash rate applied, in basis points.
    pub cash_bps: u32,

    /// In-kind rate applied, in basis points.
    pub unit_bps: u32,

    /// Computed cash reward.
    pub cash_amount: Amount,

    /// Computed in-kind reward in whole units.
    pub unit_count: u64,

    pub status: TransactionStatus,
    pub kind: TransactionKind,

    /// Free-text note for operators.
    pub note: String,

    pub created_at: DateTime<Utc>,
}

impl CommissionTransaction {
    /// Build a referral-commission row for one chain level, applying the
    /// plan's rates with truncating integer math.
    #[allow(clippy::too_many_arguments)]
    pub fn referral_commission(
        plan: &CommissionPlan,
        referrer: UserId,
        referrer_name: String,
        referred: UserId,
        referred_name: String,
        investment: InvestmentId,
        investment_amount: Amount,
        level: u8,
        cash_bps: u32,
        unit_bps: u32,
        package: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let cash_amount = investment_amount.apply_bps(cash_bps);
        let unit_count = investment_amount
            .apply_bps(unit_bps)
            .whole_units(plan.unit_price);
        Self {
            id: TransactionId::generate(),
            plan: Some(plan.id),
            referrer,
            referrer_name,
            referred,
            referred_name,
            investment: Some(investment),
            investment_amount,
            level,
            cash_bps,
            unit_bps,
            cash_amount,
            unit_count,
            status: TransactionStatus::Pending,
            kind: TransactionKind::ReferralCommission,
            note: format!("level {level} commission on {package}"),
            created_at: now,
        }
    }

    /// Build a leaderboard-prize row. The winner appears as both referrer
    /// and referred, with the sentinel level.
    pub fn leaderboard_prize(
        winner: UserId,
        winner_name: String,
        rank: u32,
        prize: Amount,
        volume: Amount,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            plan: None,
            referrer: winner,
            referrer_name: winner_name.clone(),
            referred: winner,
            referred_name: winner_name,
            investment: None,
            investment_amount: volume,
            level: PRIZE_LEVEL,
            cash_bps: 0,
            unit_bps: 0,
            cash_amount: prize,
            unit_count: 0,
            status: TransactionStatus::Pending,
            kind: TransactionKind::LeaderboardPrize,
            note: format!("leaderboard prize, rank {rank}"),
            created_at: now,
        }
    }

    /// Natural idempotency key for referral commissions.
    pub fn idempotency_key(&self) -> Option<(UserId, InvestmentId, u8)> {
        match self.kind {
            TransactionKind::ReferralCommission => {
                self.investment.map(|inv| (self.referrer, inv, self.level))
            }
            TransactionKind::LeaderboardPrize => None,
        }
    }
}

/// Persisted snapshot of a leaderboard winner at calculation time.
///
/// Rank is unique within one calculation epoch: a recalculation replaces
/// every calculated-but-undistributed record, while distributed and
/// cancelled rows are immutable history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrizeRecord {
    pub id: PrizeRecordId,

    pub rank: u32,

    pub user: UserId,
    pub user_name: String,

    /// Direct sales volume at calculation time.
    pub volume: Amount,

    /// Direct referral count at calculation time.
    pub referral_count: u64,

    pub prize: Amount,

    pub status: PrizeStatus,

    pub calculated_at: DateTime<Utc>,
    pub calculated_by: UserId,

    pub distributed_at: Option<DateTime<Utc>>,
    pub distributed_by: Option<UserId>,
}

impl PrizeRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn calculated(
        rank: u32,
        user: UserId,
        user_name: String,
        volume: Amount,
        referral_count: u64,
        prize: Amount,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PrizeRecordId::generate(),
            rank,
            user,
            user_name,
            volume,
            referral_count,
            prize,
            status: PrizeStatus::Calculated,
            calculated_at: now,
            calculated_by: actor,
            distributed_at: None,
            distributed_by: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> CommissionPlan {
        CommissionPlan::standard(Utc::now())
    }

    #[test]
    fn test_referral_commission_math() {
        let plan = plan();
        let tx = CommissionTransaction::referral_commission(
            &plan,
            UserId::generate(),
            "Referrer".into(),
            UserId::generate(),
            "Investor".into(),
            InvestmentId::generate(),
            Amount::from_major(1_000),
            1,
            1_000,
            500,
            "Gold package",
            Utc::now(),
        );
        // 10% cash of $1,000
        assert_eq!(tx.cash_amount, Amount::from_major(100));
        // 5% in-kind of $1,000 = $50 -> one $50 unit
        assert_eq!(tx.unit_count, 1);
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.kind, TransactionKind::ReferralCommission);
        assert!(tx.idempotency_key().is_some());
    }

    #[test]
    fn test_prize_row_shape() {
        let winner = UserId::generate();
        let tx = CommissionTransaction::leaderboard_prize(
            winner,
            "Winner".into(),
            1,
            Amount::from_major(5_000),
            Amount::from_major(12_000),
            Utc::now(),
        );
        assert_eq!(tx.level, PRIZE_LEVEL);
        assert_eq!(tx.referrer, tx.referred);
        assert_eq!(tx.cash_amount, Amount::from_major(5_000));
        assert!(tx.plan.is_none());
        assert!(tx.investment.is_none());
        assert!(tx.idempotency_key().is_none());
    }
}
