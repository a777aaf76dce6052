//! Fixed-point currency amounts, always held at two decimal places.
//!
//! Stripe reports money as integer minor units. Amounts are never routed
//! through `f64`: the ÷100 conversion happens at display time in integer
//! space, so `1000` prints exactly `10.00` and `-30` exactly `-0.30`.

use std::fmt;
use std::ops::Neg;

/// A signed currency value with exactly two decimal places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    cents: i64,
}

impl Amount {
    /// Wrap integer minor units (cents). Whole cents are already exact at
    /// two decimals, so no rounding is involved.
    pub fn from_minor_units(minor: i64) -> Self {
        Self { cents: minor }
    }

    pub fn minor_units(self) -> i64 {
        self.cents
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount { cents: self.cents.saturating_neg() }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}
