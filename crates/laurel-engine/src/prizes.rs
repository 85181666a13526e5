//! Prize lifecycle: one-time calculation snapshot, then a two-phase
//! distribution that can never double-pay.
//!
//! `PrizeCalculator` snapshots the qualified top of the leaderboard into
//! `Calculated` records, atomically replacing any previous undistributed
//! snapshot. `PrizeDistributor` advances explicitly listed records to
//! `Distributed`, creating the payout transaction in the same commit.

use crate::leaderboard::LeaderboardRanker;
use crate::store_err;
use chrono::{DateTime, Utc};
use laurel_core::{
    Amount, CommissionTransaction, EngineError, LeaderboardConfig, PrizeRecord, PrizeRecordId,
    PrizeStatus, Result, UserId,
};
use laurel_storage::{AuditAction, AuditLog, Database, WriteOp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of a winner calculation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrizeCalculation {
    pub winners: Vec<PrizeRecord>,

    /// Stale calculated records deleted by this recalculation.
    pub replaced: usize,

    /// Total prize money in the snapshot.
    pub total_prizes: Amount,
}

/// Maps the ranked, qualified leaderboard into the fixed prize table and
/// persists the snapshot.
pub struct PrizeCalculator {
    db: Arc<Database>,
    audit: Arc<AuditLog>,
    ranker: LeaderboardRanker,
    config: LeaderboardConfig,
}

impl PrizeCalculator {
    pub fn new(db: Arc<Database>, audit: Arc<AuditLog>, config: LeaderboardConfig) -> Self {
        Self {
            ranker: LeaderboardRanker::new(db.clone(), config.clone()),
            db,
            audit,
            config,
        }
    }

    /// Snapshot the current winners. Safe to re-run any number of times
    /// before distribution: each run replaces the previous `Calculated`
    /// records and never touches distributed history.
    pub fn calculate_winners(&self, actor: UserId, now: DateTime<Utc>) -> Result<PrizeCalculation> {
        let board = self
            .ranker
            .compute_leaderboard(self.config.max_winners as usize);
        let winners: Vec<PrizeRecord> = board
            .iter()
            .filter(|entry| entry.qualified)
            .map(|entry| {
                PrizeRecord::calculated(
                    entry.rank,
                    entry.user,
                    entry.display_name.clone(),
                    entry.direct_volume,
                    entry.direct_referrals,
                    entry.prize,
                    actor,
                    now,
                )
            })
            .collect();

        if winners.is_empty() {
            self.audit.append(
                &actor.to_string(),
                AuditAction::CalculatePrizes,
                vec![],
                Amount::ZERO,
                "no qualified participants",
            );
            return Err(EngineError::NoQualifiedParticipants);
        }

        let total_prizes: Amount = winners.iter().map(|w| w.prize).sum();
        let receipt = self
            .db
            .commit(vec![WriteOp::ReplaceCalculatedPrizes(winners.clone())])
            .map_err(|err| {
                self.audit.append(
                    &actor.to_string(),
                    AuditAction::CalculatePrizes,
                    vec![],
                    Amount::ZERO,
                    &format!("persistence failure: {err}"),
                );
                store_err(err)
            })?;

        self.audit.append(
            &actor.to_string(),
            AuditAction::CalculatePrizes,
            winners.iter().map(|w| w.id.to_string()).collect(),
            total_prizes,
            &format!(
                "{} winners calculated, {} stale records replaced",
                winners.len(),
                receipt.prizes_replaced
            ),
        );
        tracing::info!(winners = winners.len(), total = %total_prizes, "prize winners calculated");

        Ok(PrizeCalculation {
            winners,
            replaced: receipt.prizes_replaced,
            total_prizes,
        })
    }
}

/// Outcome of a distribution batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrizeDistribution {
    pub requested: usize,

    /// Records actually advanced to `Distributed`.
    pub distributed: usize,

    /// Ids skipped because the record was missing or no longer
    /// `Calculated`. Retrying with the same list is safe.
    pub skipped: Vec<PrizeRecordId>,

    pub total_cash: Amount,
}

/// Advances calculated prizes to distributed, exactly once each.
pub struct PrizeDistributor {
    db: Arc<Database>,
    audit: Arc<AuditLog>,
}

impl PrizeDistributor {
    pub fn new(db: Arc<Database>, audit: Arc<AuditLog>) -> Self {
        Self { db, audit }
    }

    /// Distribute the listed prize records. The id list is explicit by
    /// design; there is no "distribute everything".
    ///
    /// Ineligible ids are skipped, not failed, so an interrupted batch
    /// can be retried wholesale. For each eligible record the payout
    /// transaction and the status transition land in one commit.
    pub fn distribute(
        &self,
        actor: UserId,
        prize_ids: &[PrizeRecordId],
        now: DateTime<Utc>,
    ) -> Result<PrizeDistribution> {
        let mut ops = Vec::new();
        let mut staged: Vec<(PrizeRecordId, Amount)> = Vec::new();
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();

        for id in prize_ids {
            if !seen.insert(*id) {
                continue;
            }
            match self.db.prize(id) {
                Some(record) if record.status == PrizeStatus::Calculated => {
                    let transaction = CommissionTransaction::leaderboard_prize(
                        record.user,
                        record.user_name.clone(),
                        record.rank,
                        record.prize,
                        record.volume,
                        now,
                    );
                    staged.push((*id, record.prize));
                    ops.push(WriteOp::DistributePrize {
                        prize: *id,
                        actor,
                        at: now,
                        transaction,
                    });
                }
                // unknown and already-settled ids alike are skips, so a
                // retried batch never errors on work that is already done
                _ => skipped.push(*id),
            }
        }

        if ops.is_empty() {
            let result = PrizeDistribution {
                requested: prize_ids.len(),
                distributed: 0,
                skipped,
                total_cash: Amount::ZERO,
            };
            self.audit.append(
                &actor.to_string(),
                AuditAction::DistributePrizes,
                vec![],
                Amount::ZERO,
                "nothing eligible to distribute",
            );
            return Ok(result);
        }

        let receipt = self.db.commit(ops).map_err(|err| {
            self.audit.append(
                &actor.to_string(),
                AuditAction::DistributePrizes,
                staged.iter().map(|(id, _)| id.to_string()).collect(),
                Amount::ZERO,
                &format!("persistence failure: {err}"),
            );
            store_err(err)
        })?;

        let total_cash: Amount = staged
            .iter()
            .filter(|(id, _)| !receipt.skipped_prizes.contains(id))
            .map(|(_, prize)| *prize)
            .sum();
        skipped.extend(receipt.skipped_prizes);

        self.audit.append(
            &actor.to_string(),
            AuditAction::DistributePrizes,
            staged.iter().map(|(id, _)| id.to_string()).collect(),
            total_cash,
            &format!(
                "{} prizes distributed, {} skipped",
                receipt.prizes_distributed,
                skipped.len()
            ),
        );
        tracing::info!(
            distributed = receipt.prizes_distributed,
            skipped = skipped.len(),
            cash = %total_cash,
            "prizes distributed"
        );

        Ok(PrizeDistribution {
            requested: prize_ids.len(),
            distributed: receipt.prizes_distributed,
            skipped,
            total_cash,
        })
    }

    /// Cancel one calculated prize. Terminal states reject the
    /// transition; cancellation is per-id and deliberate, like
    /// distribution.
    pub fn cancel(&self, actor: UserId, prize_id: PrizeRecordId) -> Result<()> {
        let record = self
            .db
            .prize(&prize_id)
            .ok_or(EngineError::UnknownPrizeRecord(prize_id))?;
        record.status.cancel()?;

        self.db
            .commit(vec![WriteOp::CancelPrize { prize: prize_id }])
            .map_err(store_err)?;

        self.audit.append(
            &actor.to_string(),
            AuditAction::CancelPrize,
            vec![prize_id.to_string()],
            record.prize,
            "prize cancelled",
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laurel_core::{InvestmentId, InvestmentRecord, ReferralRelationship};

    fn seed_qualified_referrers(db: &Database, count: usize) -> Vec<UserId> {
        (0..count)
            .map(|i| {
                let referrer = UserId::generate();
                let referred = UserId::generate();
                db.commit(vec![WriteOp::InsertRelationship(ReferralRelationship::new(
                    referrer, referred, None, "web", Utc::now(),
                ))])
                .unwrap();
                db.commit(vec![WriteOp::InsertInvestment(InvestmentRecord {
                    investment_id: InvestmentId::generate(),
                    investor: referred,
                    // distinct volumes so ranks are forced
                    amount: Amount::from_major(10_000 - i as u64 * 100),
                    package: "Gold".into(),
                    recorded_at: Utc::now(),
                })])
                .unwrap();
                referrer
            })
            .collect()
    }

    struct Fixture {
        db: Arc<Database>,
        calculator: PrizeCalculator,
        distributor: PrizeDistributor,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(Database::new());
        let audit = Arc::new(AuditLog::new());
        Fixture {
            calculator: PrizeCalculator::new(db.clone(), audit.clone(), LeaderboardConfig::default()),
            distributor: PrizeDistributor::new(db.clone(), audit.clone()),
            db,
        }
    }

    #[test]
    fn test_empty_leaderboard_is_a_business_error() {
        let f = fixture();
        let err = f
            .calculator
            .calculate_winners(UserId::generate(), Utc::now())
            .unwrap_err();
        assert_eq!(err, EngineError::NoQualifiedParticipants);
    }

    #[test]
    fn test_recalculation_replaces_without_duplicating() {
        let f = fixture();
        seed_qualified_referrers(&f.db, 4);
        let operator = UserId::generate();

        let first = f.calculator.calculate_winners(operator, Utc::now()).unwrap();
        assert_eq!(first.winners.len(), 4);
        assert_eq!(first.replaced, 0);

        let second = f.calculator.calculate_winners(operator, Utc::now()).unwrap();
        assert_eq!(second.winners.len(), 4);
        assert_eq!(second.replaced, 4);

        // exactly one record per rank
        let prizes = f.db.prizes();
        assert_eq!(prizes.len(), 4);
        let mut ranks: Vec<u32> = prizes.iter().map(|p| p.rank).collect();
        ranks.sort();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_distribution_is_exactly_once() {
        let f = fixture();
        seed_qualified_referrers(&f.db, 3);
        let operator = UserId::generate();

        let calc = f.calculator.calculate_winners(operator, Utc::now()).unwrap();
        let ids: Vec<PrizeRecordId> = calc.winners.iter().map(|w| w.id).collect();

        let first = f.distributor.distribute(operator, &ids, Utc::now()).unwrap();
        assert_eq!(first.distributed, 3);
        assert!(first.skipped.is_empty());

        let second = f.distributor.distribute(operator, &ids, Utc::now()).unwrap();
        assert_eq!(second.distributed, 0);
        assert_eq!(second.skipped.len(), 3);

        // one payout transaction per prize, no more
        assert_eq!(f.db.transactions().len(), 3);
    }

    #[test]
    fn test_distributed_records_survive_recalculation() {
        let f = fixture();
        seed_qualified_referrers(&f.db, 3);
        let operator = UserId::generate();

        let calc = f.calculator.calculate_winners(operator, Utc::now()).unwrap();
        let paid_id = calc.winners[0].id;
        f.distributor
            .distribute(operator, &[paid_id], Utc::now())
            .unwrap();

        let recalc = f.calculator.calculate_winners(operator, Utc::now()).unwrap();
        // the two undistributed records were replaced, the paid one kept
        assert_eq!(recalc.replaced, 2);

        let paid = f.db.prize(&paid_id).unwrap();
        assert_eq!(paid.status, PrizeStatus::Distributed);
        assert!(paid.distributed_at.is_some());
        assert_eq!(paid.distributed_by, Some(operator));
    }

    #[test]
    fn test_prize_transaction_shape() {
        let f = fixture();
        seed_qualified_referrers(&f.db, 1);
        let operator = UserId::generate();

        let calc = f.calculator.calculate_winners(operator, Utc::now()).unwrap();
        let winner = calc.winners[0].clone();
        f.distributor
            .distribute(operator, &[winner.id], Utc::now())
            .unwrap();

        let txs = f.db.transactions();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].level, laurel_core::PRIZE_LEVEL);
        assert_eq!(txs[0].referrer, winner.user);
        assert_eq!(txs[0].referred, winner.user);
        assert_eq!(txs[0].cash_amount, winner.prize);
    }

    #[test]
    fn test_empty_eligible_list_is_success() {
        let f = fixture();
        let result = f
            .distributor
            .distribute(UserId::generate(), &[PrizeRecordId::generate()], Utc::now())
            .unwrap();
        assert_eq!(result.distributed, 0);
        assert_eq!(result.skipped.len(), 1);
    }

    #[test]
    fn test_cancelled_prize_cannot_be_distributed() {
        let f = fixture();
        seed_qualified_referrers(&f.db, 1);
        let operator = UserId::generate();

        let calc = f.calculator.calculate_winners(operator, Utc::now()).unwrap();
        let id = calc.winners[0].id;
        f.distributor.cancel(operator, id).unwrap();

        let result = f.distributor.distribute(operator, &[id], Utc::now()).unwrap();
        assert_eq!(result.distributed, 0);
        assert_eq!(result.skipped, vec![id]);

        // cancelling twice is an explicit error
        assert!(matches!(
            f.distributor.cancel(operator, id),
            Err(EngineError::InvalidStatusTransition { .. })
        ));
    }
}
