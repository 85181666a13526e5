//! CLI configuration types.
//!
//! Loaded from a TOML file plus `LAUREL__`-prefixed environment
//! overrides. Every section is optional; omitted values fall back to
//! the defaults below, so an empty file is a valid configuration.

use anyhow::Context;
use chrono::{DateTime, Utc};
use laurel_core::{Amount, CommissionPlan, LeaderboardConfig, LevelRate, PlanId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete CLI configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Commission plan installed at startup.
    #[serde(default)]
    pub plan: PlanConfig,

    /// Leaderboard thresholds and prize table.
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Commission schedule, one rate pair per level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanConfig {
    #[serde(default = "default_plan_name")]
    pub name: String,

    /// Cash rates in basis points, index 0 = level 1.
    #[serde(default = "default_cash_bps")]
    pub cash_bps: Vec<u32>,

    /// In-kind rates in basis points, index 0 = level 1.
    #[serde(default = "default_unit_bps")]
    pub unit_bps: Vec<u32>,

    /// In-kind unit price in minor units (cents).
    #[serde(default = "default_unit_price_minor")]
    pub unit_price_minor: u64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            name: default_plan_name(),
            cash_bps: default_cash_bps(),
            unit_bps: default_unit_bps(),
            unit_price_minor: default_unit_price_minor(),
        }
    }
}

impl PlanConfig {
    /// Build the default+active plan this config describes. Levels come
    /// from the longer of the two rate lists; a missing rate is zero.
    pub fn to_plan(&self, now: DateTime<Utc>) -> CommissionPlan {
        let levels = self.cash_bps.len().max(self.unit_bps.len());
        let rates = (0..levels)
            .map(|i| LevelRate {
                level: i as u8 + 1,
                cash_bps: self.cash_bps.get(i).copied().unwrap_or(0),
                unit_bps: self.unit_bps.get(i).copied().unwrap_or(0),
            })
            .collect();
        CommissionPlan {
            id: PlanId::generate(),
            name: self.name.clone(),
            version: 1,
            max_levels: levels as u8,
            rates,
            unit_price: Amount::from_minor(self.unit_price_minor),
            is_default: true,
            is_active: true,
            created_at: now,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON-formatted events instead of human-readable lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Load configuration from `path` (optional) and the environment.
pub fn load(path: &Path) -> anyhow::Result<CliConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("LAUREL").separator("__"))
        .build()
        .with_context(|| format!("reading configuration from {}", path.display()))?;
    settings
        .try_deserialize()
        .context("invalid configuration values")
}

fn default_plan_name() -> String {
    "standard".to_string()
}

fn default_cash_bps() -> Vec<u32> {
    vec![1_000, 500, 200]
}

fn default_unit_bps() -> Vec<u32> {
    vec![500, 200, 100]
}

fn default_unit_price_minor() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}
