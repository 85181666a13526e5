//! Leaderboard incentive configuration.
//!
//! The prize pool is a fixed tier table:
//!
//! | Rank | Prize |
//! |------|-------|
//! | 1 | $5,000 |
//! | 2 | $3,000 |
//! | 3 | $2,000 |
//! | 4-10 | $500 each |
//! | 11+ | nothing |
//!
//! Amounts and the qualification threshold are configurable; the defaults
//! above apply when a section is omitted from the config file.

use crate::money::Amount;
use serde::{Deserialize, Serialize};

/// Fixed rank-to-amount prize table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTable {
    #[serde(default = "default_first_prize")]
    pub first: Amount,

    #[serde(default = "default_second_prize")]
    pub second: Amount,

    #[serde(default = "default_third_prize")]
    pub third: Amount,

    /// Flat amount for every remaining winning rank.
    #[serde(default = "default_runner_up_prize")]
    pub runner_up: Amount,
}

impl Default for PrizeTable {
    fn default() -> Self {
        Self {
            first: default_first_prize(),
            second: default_second_prize(),
            third: default_third_prize(),
            runner_up: default_runner_up_prize(),
        }
    }
}

/// Leaderboard ranking and prize-pool settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Minimum direct volume for prize eligibility.
    #[serde(default = "default_qualification_threshold")]
    pub qualification_threshold: Amount,

    /// Highest rank that wins a prize.
    #[serde(default = "default_max_winners")]
    pub max_winners: u32,

    #[serde(default)]
    pub prizes: PrizeTable,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            qualification_threshold: default_qualification_threshold(),
            max_winners: default_max_winners(),
            prizes: PrizeTable::default(),
        }
    }
}

impl LeaderboardConfig {
    /// Prize for a 1-based rank. Ranks beyond `max_winners` win nothing;
    /// qualification is the caller's concern.
    pub fn prize_for_rank(&self, rank: u32) -> Amount {
        match rank {
            0 => Amount::ZERO,
            1 => self.prizes.first,
            2 => self.prizes.second,
            3 => self.prizes.third,
            r if r <= self.max_winners => self.prizes.runner_up,
            _ => Amount::ZERO,
        }
    }
}

fn default_qualification_threshold() -> Amount {
    Amount::from_major(2_500)
}

fn default_max_winners() -> u32 {
    10
}

fn default_first_prize() -> Amount {
    Amount::from_major(5_000)
}

fn default_second_prize() -> Amount {
    Amount::from_major(3_000)
}

fn default_third_prize() -> Amount {
    Amount::from_major(2_000)
}

fn default_runner_up_prize() -> Amount {
    Amount::from_major(500)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        let config = LeaderboardConfig::default();
        assert_eq!(config.prize_for_rank(1), Amount::from_major(5_000));
        assert_eq!(config.prize_for_rank(2), Amount::from_major(3_000));
        assert_eq!(config.prize_for_rank(3), Amount::from_major(2_000));
        assert_eq!(config.prize_for_rank(4), Amount::from_major(500));
        assert_eq!(config.prize_for_rank(10), Amount::from_major(500));
        assert_eq!(config.prize_for_rank(11), Amount::ZERO);
        assert_eq!(config.prize_for_rank(0), Amount::ZERO);
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: LeaderboardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.qualification_threshold, Amount::from_major(2_500));
        assert_eq!(config.max_winners, 10);
        assert_eq!(config.prizes, PrizeTable::default());
    }
}
