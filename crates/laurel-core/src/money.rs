//! Integer money arithmetic.
//!
//! Every monetary value in the system is an [`Amount`] of minor units
//! (cents). Rates are basis points (10 000 bps = 100%). All payout math
//! is integer arithmetic with `u128` intermediates; division truncates,
//! so fractional in-kind units are never rounded up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Basis points in one whole (100%).
pub const BPS_SCALE: u32 = 10_000;

/// Minor units per major currency unit.
pub const MINOR_PER_MAJOR: u64 = 100;

/// A monetary amount in minor units (cents).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Construct from minor units (cents).
    pub const fn from_minor(minor: u64) -> Self {
        Amount(minor)
    }

    /// Construct from whole major units (dollars).
    pub const fn from_major(major: u64) -> Self {
        Amount(major * MINOR_PER_MAJOR)
    }

    /// Raw minor units.
    pub const fn minor(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Apply a basis-point rate, truncating to whole minor units.
    pub fn apply_bps(self, bps: u32) -> Amount {
        let scaled = self.0 as u128 * bps as u128 / BPS_SCALE as u128;
        Amount(scaled as u64)
    }

    /// Whole units purchasable at `unit_price`. Truncates; a zero unit
    /// price yields zero units rather than dividing by zero.
    pub fn whole_units(self, unit_price: Amount) -> u64 {
        if unit_price.0 == 0 {
            return 0;
        }
        self.0 / unit_price.0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        Amount(self.0 + other.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, other: Amount) {
        self.0 += other.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc.saturating_add(a))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_PER_MAJOR,
            self.0 % MINOR_PER_MAJOR
        )
    }
}
