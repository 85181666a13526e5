//! Commission plan model.
//!
//! A plan is a versioned schedule of per-level payout rates. Exactly one
//! plan is flagged default and active at a time; plans referenced by
//! transactions are immutable and new schedules version forward.
//!
//! ## Default schedule
//!
//! | Level | Cash | In-kind |
//! |-------|------|---------|
//! | 1 | 10% | 5% |
//! | 2 | 5% | 2% |
//! | 3 | 2% | 1% |

use crate::error::EngineError;
use crate::money::{Amount, BPS_SCALE};
use crate::types::PlanId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payout rates for one referral level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRate {
    /// Referral level (1 = direct referrer).
    pub level: u8,

    /// Cash reward in basis points of the investment amount.
    pub cash_bps: u32,

    /// In-kind reward in basis points of the investment amount.
    pub unit_bps: u32,
}

impl LevelRate {
    /// A level with neither cash nor in-kind reward produces no transaction.
    pub fn is_zero(&self) -> bool {
        self.cash_bps == 0 && self.unit_bps == 0
    }
}

/// A versioned tiered payout schedule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommissionPlan {
    pub id: PlanId,

    pub name: String,

    /// Monotonically increasing version; history is never mutated.
    pub version: u32,

    /// Upper bound on the referral-chain walk.
    pub max_levels: u8,

    /// Rates for levels `1..=max_levels`. Missing levels pay nothing.
    pub rates: Vec<LevelRate>,

    /// Price of one in-kind unit.
    pub unit_price: Amount,

    /// Whether this plan is the default schedule.
    pub is_default: bool,

    /// Whether this plan may be used for new distributions.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

impl CommissionPlan {
    /// Rates for a given level, if the plan defines any.
    pub fn rate_for(&self, level: u8) -> Option<&LevelRate> {
        self.rates.iter().find(|r| r.level == level)
    }

    /// The standard three-level schedule, flagged default and active.
    pub fn standard(now: DateTime<Utc>) -> Self {
        Self {
            id: PlanId::generate(),
            name: "standard".to_string(),
            version: 1,
            max_levels: 3,
            rates: vec![
                LevelRate {
                    level: 1,
                    cash_bps: 1_000,
                    unit_bps: 500,
                },
                LevelRate {
                    level: 2,
                    cash_bps: 500,
                    unit_bps: 200,
                },
                LevelRate {
                    level: 3,
                    cash_bps: 200,
                    unit_bps: 100,
                },
            ],
            unit_price: Amount::from_major(50),
            is_default: true,
            is_active: true,
            created_at: now,
        }
    }

    /// Validate the plan's internal invariants.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_levels == 0 {
            return Err(EngineError::InvalidPlan("max_levels must be at least 1".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for rate in &self.rates {
            if rate.level == 0 || rate.level > self.max_levels {
                return Err(EngineError::InvalidPlan(format!(
                    "level {} outside 1..={}",
                    rate.level, self.max_levels
                )));
            }
            if !seen.insert(rate.level) {
                return Err(EngineError::InvalidPlan(format!(
                    "duplicate rate for level {}",
                    rate.level
                )));
            }
            if rate.cash_bps > BPS_SCALE || rate.unit_bps > BPS_SCALE {
                return Err(EngineError::InvalidPlan(format!(
                    "level {} rate exceeds 100%",
                    rate.level
                )));
            }
            if rate.unit_bps > 0 && self.unit_price.is_zero() {
                return Err(EngineError::InvalidPlan(
                    "in-kind rate requires a nonzero unit price".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_plan_is_valid() {
        let plan = CommissionPlan::standard(Utc::now());
        assert!(plan.validate().is_ok());
        assert!(plan.is_default && plan.is_active);
        assert_eq!(plan.max_levels, 3);
    }

    #[test]
    fn test_rate_lookup() {
        let plan = CommissionPlan::standard(Utc::now());
        assert_eq!(plan.rate_for(1).unwrap().cash_bps, 1_000);
        assert_eq!(plan.rate_for(3).unwrap().cash_bps, 200);
        assert!(plan.rate_for(4).is_none());
    }

    #[test]
    fn test_validate_rejects_out_of_range_level() {
        let mut plan = CommissionPlan::standard(Utc::now());
        plan.rates.push(LevelRate {
            level: 9,
            cash_bps: 100,
            unit_bps: 0,
        });
        assert!(matches!(plan.validate(), Err(EngineError::InvalidPlan(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_level() {
        let mut plan = CommissionPlan::standard(Utc::now());
        plan.rates.push(LevelRate {
            level: 1,
            cash_bps: 100,
            unit_bps: 0,
        });
        assert!(matches!(plan.validate(), Err(EngineError::InvalidPlan(_))));
    }

    #[test]
    fn test_validate_rejects_unit_rate_without_price() {
        let mut plan = CommissionPlan::standard(Utc::now());
        plan.unit_price = Amount::ZERO;
        assert!(matches!(plan.validate(), Err(EngineError::InvalidPlan(_))));
    }
}
