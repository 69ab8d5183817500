//! Remainder validators.
//!
//! Each validator re-derives a fill's invariants from the submitted numbers
//! alone, so a filler cannot pass self-consistent but mispriced quantities:
//! 1. no quantity involved may be zero
//! 2. conservation on both sides: `orig = remaining + transferred`
//! 3. price non-regression against the order's own ratio, compared exactly

use ccmarket_types::{CcMarketError, Result, Units};

use crate::{Fill, UnitPrice};

fn require_nonzero(value: Units, field: &'static str) -> Result<()> {
    if value == 0 {
        return Err(CcMarketError::ZeroQuantity { field });
    }
    Ok(())
}

fn require_sum(orig: Units, remaining: Units, moved: Units, side: &str) -> Result<()> {
    if remaining.checked_add(moved) != Some(orig) {
        tracing::warn!(orig, remaining, moved, side, "Fill does not conserve units");
        return Err(CcMarketError::ConservationViolation {
            reason: format!("{side}: {orig} != {remaining} remaining + {moved} moved"),
        });
    }
    Ok(())
}

fn ratio(numerator: Units, denominator: Units, field: &'static str) -> Result<UnitPrice> {
    UnitPrice::new(numerator, denominator).ok_or(CcMarketError::ZeroQuantity { field })
}

/// Validate a bid fill: coin per token received by the filler must not exceed
/// the bid's coin per token.
pub fn validate_bid_remainder(fill: &Fill) -> Result<()> {
    require_nonzero(fill.orig_units, "orig coin")?;
    require_nonzero(fill.received_units, "received coin")?;
    require_nonzero(fill.paid_units, "paid token units")?;
    require_nonzero(fill.orig_remaining, "orig remaining token units")?;
    require_sum(
        fill.orig_remaining,
        fill.remaining_required,
        fill.paid_units,
        "token units",
    )?;
    require_sum(fill.orig_units, fill.remaining_units, fill.received_units, "coin")?;

    let order_price = ratio(fill.orig_units, fill.orig_remaining, "orig remaining token units")?;
    let received_price = ratio(fill.received_units, fill.paid_units, "paid token units")?;
    if received_price > order_price {
        tracing::warn!(%received_price, %order_price, "Bid filled above its unit price");
        return Err(CcMarketError::PriceRegression {
            reason: format!(
                "bid: received {} coin for {} units exceeds unit price {order_price}",
                fill.received_units, fill.paid_units
            ),
        });
    }
    Ok(())
}

/// Validate an ask fill: coin per token paid by the filler must not be below
/// the ask's coin per token.
pub fn validate_ask_remainder(fill: &Fill) -> Result<()> {
    require_nonzero(fill.orig_units, "orig token units")?;
    require_nonzero(fill.received_units, "received token units")?;
    require_nonzero(fill.paid_units, "paid coin")?;
    require_nonzero(fill.orig_remaining, "orig coin")?;
    require_sum(fill.orig_remaining, fill.remaining_required, fill.paid_units, "coin")?;
    require_sum(
        fill.orig_units,
        fill.remaining_units,
        fill.received_units,
        "token units",
    )?;

    let order_price = ratio(fill.orig_remaining, fill.orig_units, "orig token units")?;
    let paid_price = ratio(fill.paid_units, fill.received_units, "received token units")?;
    if paid_price < order_price {
        tracing::warn!(%paid_price, %order_price, "Ask filled below its unit price");
        return Err(CcMarketError::PriceRegression {
            reason: format!(
                "ask: paid {} coin for {} units is below unit price {order_price}",
                fill.paid_units, fill.received_units
            ),
        });
    }
    Ok(())
}

/// Swaps settle against a second token with ask arithmetic.
pub fn validate_swap_remainder(fill: &Fill) -> Result<()> {
    validate_ask_remainder(fill)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(received: Units, paid: Units) -> Fill {
        Fill {
            orig_units: 500_000_000,
            received_units: received,
            remaining_units: 500_000_000 - received,
            orig_remaining: 1_000_000,
            paid_units: paid,
            remaining_required: 1_000_000 - paid,
        }
    }

    #[test]
    fn honest_bid_fill_passes() {
        validate_bid_remainder(&bid(200_000_000, 400_000)).unwrap();
    }

    #[test]
    fn bid_price_regression_rejected_even_when_balanced() {
        // balances on both sides but implies 625 coin per unit against 500
        let err = validate_bid_remainder(&bid(250_000_000, 400_000)).unwrap_err();
        assert!(matches!(err, CcMarketError::PriceRegression { .. }));
    }

    #[test]
    fn regression_finer_than_integer_price_is_caught() {
        // order 1000 coin / 3 units; 334 coin for 1 unit is above 333.33
        let fill = Fill {
            orig_units: 1_000,
            received_units: 334,
            remaining_units: 666,
            orig_remaining: 3,
            paid_units: 1,
            remaining_required: 2,
        };
        assert!(validate_bid_remainder(&fill).is_err());

        // 667 for 2 floors to the same integer price 333 but is still above
        let over = Fill {
            received_units: 667,
            remaining_units: 333,
            paid_units: 2,
            remaining_required: 1,
            ..fill
        };
        assert!(matches!(
            validate_bid_remainder(&over).unwrap_err(),
            CcMarketError::PriceRegression { .. }
        ));
        let exact = Fill {
            received_units: 666,
            remaining_units: 334,
            ..over
        };
        validate_bid_remainder(&exact).unwrap();
    }

    #[test]
    fn conservation_breach_rejected() {
        let mut fill = bid(200_000_000, 400_000);
        fill.remaining_units += 1;
        assert!(matches!(
            validate_bid_remainder(&fill).unwrap_err(),
            CcMarketError::ConservationViolation { .. }
        ));
        let mut fill = bid(200_000_000, 400_000);
        fill.remaining_required -= 1;
        assert!(validate_bid_remainder(&fill).is_err());
    }

    #[test]
    fn zero_fields_rejected() {
        assert_eq!(
            validate_bid_remainder(&bid(0, 400_000)).unwrap_err(),
            CcMarketError::ZeroQuantity { field: "received coin" }
        );
    }

    #[test]
    fn ask_underpayment_rejected() {
        // order: 1,000,000 units for 2,000,000 coin; 500,000 coin for 250,001 units
        let fill = Fill {
            orig_units: 1_000_000,
            received_units: 250_001,
            remaining_units: 749_999,
            orig_remaining: 2_000_000,
            paid_units: 500_000,
            remaining_required: 1_500_000,
        };
        assert!(matches!(
            validate_ask_remainder(&fill).unwrap_err(),
            CcMarketError::PriceRegression { .. }
        ));
        let honest = Fill {
            received_units: 250_000,
            remaining_units: 750_000,
            ..fill
        };
        validate_ask_remainder(&honest).unwrap();
        validate_swap_remainder(&honest).unwrap();
    }
}
