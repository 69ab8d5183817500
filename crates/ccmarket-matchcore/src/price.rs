//! Exact unit prices.
//!
//! A price is kept as the ratio of two unit counts and compared by
//! cross-multiplication in `u128`, so no division ever rounds inside a
//! consensus check. [`UnitPrice::to_decimal`] exists for display only.

use std::cmp::Ordering;
use std::fmt;

use ccmarket_types::Units;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `numerator / denominator` units of one side per unit of the other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnitPrice {
    numerator: Units,
    denominator: Units,
}

impl UnitPrice {
    /// `None` when `denominator` is zero.
    #[must_use]
    pub fn new(numerator: Units, denominator: Units) -> Option<Self> {
        (denominator != 0).then_some(Self {
            numerator,
            denominator,
        })
    }

    #[must_use]
    pub fn numerator(&self) -> Units {
        self.numerator
    }

    #[must_use]
    pub fn denominator(&self) -> Units {
        self.denominator
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    /// Integer part, as the legacy integer unit price.
    #[must_use]
    pub fn floor(&self) -> Units {
        self.numerator / self.denominator
    }

    /// `floor(amount / self)`: how many denominator units `amount` numerator
    /// units buy. `None` for a zero price.
    #[must_use]
    pub fn units_for(&self, amount: Units) -> Option<Units> {
        if self.numerator == 0 {
            return None;
        }
        let scaled = u128::from(amount) * u128::from(self.denominator) / u128::from(self.numerator);
        Units::try_from(scaled).ok()
    }

    /// `ceil(quantity * self)`: numerator units needed for `quantity`
    /// denominator units.
    #[must_use]
    pub fn cost_of(&self, quantity: Units) -> Option<Units> {
        let product = u128::from(quantity) * u128::from(self.numerator);
        Units::try_from(product.div_ceil(u128::from(self.denominator))).ok()
    }

    /// Decimal rendering for listings; `None` if it does not fit.
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::from(self.numerator).checked_div(Decimal::from(self.denominator))
    }
}

impl PartialEq for UnitPrice {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for UnitPrice {}

impl PartialOrd for UnitPrice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UnitPrice {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = u128::from(self.numerator) * u128::from(other.denominator);
        let rhs = u128::from(other.numerator) * u128::from(self.denominator);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for UnitPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(d) => write!(f, "{d}"),
            None => write!(f, "{}/{}", self.numerator, self.denominator),
        }
    }
}
