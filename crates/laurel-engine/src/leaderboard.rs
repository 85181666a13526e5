//! Leaderboard ranking over direct referral sales.
//!
//! Ranking counts ONLY direct (level-1) volume: the sum of investments
//! made by users a referrer directly referred. Deeper-level volume feeds
//! the commission walk, never the leaderboard. Volume is aggregated from
//! raw investment rows, the single authoritative source; the cumulative
//! edge counters are a derived cache used for stats reads only.

use laurel_core::{Amount, LeaderboardConfig, UserId};
use laurel_storage::Database;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One ranked row. Recomputed on demand, never persisted as-is.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based rank.
    pub rank: u32,

    pub user: UserId,
    pub display_name: String,

    /// Active direct referrals.
    pub direct_referrals: u64,

    /// Sum of investments by directly referred users.
    pub direct_volume: Amount,

    /// Whether the volume meets the qualification threshold.
    pub qualified: bool,

    /// Prize at this rank, zero when unqualified or out of the table.
    pub prize: Amount,
}

/// Computes the ordered, classified leaderboard.
pub struct LeaderboardRanker {
    db: Arc<Database>,
    config: LeaderboardConfig,
}

impl LeaderboardRanker {
    pub fn new(db: Arc<Database>, config: LeaderboardConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &LeaderboardConfig {
        &self.config
    }

    /// The top `limit` referrers.
    ///
    /// Ordering is a total order - volume descending, then referral count
    /// descending, then user id ascending - so repeated calls over the
    /// same data return the same ranking.
    pub fn compute_leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let mut counts: HashMap<UserId, u64> = HashMap::new();
        let mut parent: HashMap<UserId, UserId> = HashMap::new();

        for rel in self.db.relationships() {
            if !rel.is_active() {
                continue;
            }
            *counts.entry(rel.referrer).or_insert(0) += 1;
            parent.insert(rel.referred, rel.referrer);
        }

        let mut volumes: HashMap<UserId, Amount> = HashMap::new();
        for investment in self.db.investments() {
            if let Some(referrer) = parent.get(&investment.investor) {
                let volume = volumes.entry(*referrer).or_insert(Amount::ZERO);
                *volume = volume.saturating_add(investment.amount);
            }
        }

        let mut rows: Vec<(UserId, u64, Amount)> = counts
            .into_iter()
            .map(|(referrer, count)| {
                let volume = volumes.get(&referrer).copied().unwrap_or(Amount::ZERO);
                (referrer, count, volume)
            })
            .collect();

        rows.sort_by(|a, b| {
            b.2.cmp(&a.2)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.0.cmp(&b.0))
        });

        rows.into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, (user, count, volume))| {
                let rank = index as u32 + 1;
                let qualified = volume >= self.config.qualification_threshold;
                LeaderboardEntry {
                    rank,
                    user,
                    display_name: self.db.display_name_or_id(&user),
                    direct_referrals: count,
                    direct_volume: volume,
                    qualified,
                    prize: if qualified {
                        self.config.prize_for_rank(rank)
                    } else {
                        Amount::ZERO
                    },
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use laurel_core::{InvestmentId, InvestmentRecord, ReferralRelationship};
    use laurel_storage::WriteOp;

    fn seed_referrer(db: &Database, referrals: &[(UserId, Amount)]) -> UserId {
        let referrer = UserId::generate();
        for (referred, amount) in referrals {
            db.commit(vec![WriteOp::InsertRelationship(ReferralRelationship::new(
                referrer, *referred, None, "web", Utc::now(),
            ))])
            .unwrap();
            if !amount.is_zero() {
                db.commit(vec![WriteOp::InsertInvestment(InvestmentRecord {
                    investment_id: InvestmentId::generate(),
                    investor: *referred,
                    amount: *amount,
                    package: "Starter".into(),
                    recorded_at: Utc::now(),
                })])
                .unwrap();
            }
        }
        referrer
    }

    #[test]
    fn test_tie_broken_by_referral_count() {
        let db = Arc::new(Database::new());
        // X: $3,000 over 5 referrals; Y: $3,000 over 3 referrals
        let x = seed_referrer(
            &db,
            &[
                (UserId::generate(), Amount::from_major(1_000)),
                (UserId::generate(), Amount::from_major(500)),
                (UserId::generate(), Amount::from_major(500)),
                (UserId::generate(), Amount::from_major(500)),
                (UserId::generate(), Amount::from_major(500)),
            ],
        );
        let y = seed_referrer(
            &db,
            &[
                (UserId::generate(), Amount::from_major(1_000)),
                (UserId::generate(), Amount::from_major(1_000)),
                (UserId::generate(), Amount::from_major(1_000)),
            ],
        );

        let ranker = LeaderboardRanker::new(db, LeaderboardConfig::default());
        let board = ranker.compute_leaderboard(10);

        assert_eq!(board[0].user, x);
        assert_eq!(board[1].user, y);
        assert!(board[0].qualified && board[1].qualified);
        assert_eq!(board[0].prize, Amount::from_major(5_000));
        assert_eq!(board[1].prize, Amount::from_major(3_000));
    }

    #[test]
    fn test_unqualified_still_ranked_with_zero_prize() {
        let db = Arc::new(Database::new());
        seed_referrer(&db, &[(UserId::generate(), Amount::from_major(1_000))]);

        let ranker = LeaderboardRanker::new(db, LeaderboardConfig::default());
        let board = ranker.compute_leaderboard(10);

        assert_eq!(board.len(), 1);
        assert_eq!(board[0].rank, 1);
        assert!(!board[0].qualified);
        assert_eq!(board[0].prize, Amount::ZERO);
    }

    #[test]
    fn test_deeper_levels_excluded_from_volume() {
        let db = Arc::new(Database::new());
        let (a, b, c) = (UserId::generate(), UserId::generate(), UserId::generate());
        // A referred B; B referred C; C invests
        for (referrer, referred) in [(a, b), (b, c)] {
            db.commit(vec![WriteOp::InsertRelationship(ReferralRelationship::new(
                referrer, referred, None, "web", Utc::now(),
            ))])
            .unwrap();
        }
        db.commit(vec![WriteOp::InsertInvestment(InvestmentRecord {
            investment_id: InvestmentId::generate(),
            investor: c,
            amount: Amount::from_major(4_000),
            package: "Gold".into(),
            recorded_at: Utc::now(),
        })])
        .unwrap();

        let ranker = LeaderboardRanker::new(db, LeaderboardConfig::default());
        let board = ranker.compute_leaderboard(10);

        // B gets the volume; A sees none of C's investment
        let b_row = board.iter().find(|e| e.user == b).unwrap();
        let a_row = board.iter().find(|e| e.user == a).unwrap();
        assert_eq!(b_row.direct_volume, Amount::from_major(4_000));
        assert_eq!(a_row.direct_volume, Amount::ZERO);
    }

    #[test]
    fn test_full_ties_fall_back_to_user_id() {
        let db = Arc::new(Database::new());
        // identical volume and count: only the id can order them
        for _ in 0..6 {
            seed_referrer(&db, &[(UserId::generate(), Amount::from_major(3_000))]);
        }

        let ranker = LeaderboardRanker::new(db, LeaderboardConfig::default());
        let board = ranker.compute_leaderboard(10);
        assert_eq!(board.len(), 6);
        for pair in board.windows(2) {
            assert!(pair[0].user < pair[1].user);
        }
    }

    use proptest::prelude::*;

    proptest! {
        /// Repeated computations over the same data give the same ranking,
        /// and the order is the documented total order.
        #[test]
        fn prop_ranking_is_a_stable_total_order(
            volumes in prop::collection::vec((1u64..20, 0u64..5_000), 1..12)
        ) {
            let db = Arc::new(Database::new());
            for (referrals, major) in &volumes {
                let per_referral = Amount::from_major(*major);
                let users: Vec<(UserId, Amount)> = (0..*referrals)
                    .map(|_| (UserId::generate(), per_referral))
                    .collect();
                seed_referrer(&db, &users);
            }

            let ranker = LeaderboardRanker::new(db, LeaderboardConfig::default());
            let first = ranker.compute_leaderboard(usize::MAX);
            let second = ranker.compute_leaderboard(usize::MAX);

            let order: Vec<UserId> = first.iter().map(|e| e.user).collect();
            let order_again: Vec<UserId> = second.iter().map(|e| e.user).collect();
            prop_assert_eq!(order, order_again);

            for pair in first.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let ordered = a.direct_volume > b.direct_volume
                    || (a.direct_volume == b.direct_volume
                        && a.direct_referrals > b.direct_referrals)
                    || (a.direct_volume == b.direct_volume
                        && a.direct_referrals == b.direct_referrals
                        && a.user < b.user);
                prop_assert!(ordered);
            }
        }
    }

    #[test]
    fn test_limit_truncates() {
        let db = Arc::new(Database::new());
        for _ in 0..5 {
            seed_referrer(&db, &[(UserId::generate(), Amount::from_major(3_000))]);
        }
        let ranker = LeaderboardRanker::new(db, LeaderboardConfig::default());
        assert_eq!(ranker.compute_leaderboard(3).len(), 3);
    }
}
