//! Partial and full fill computation.
//!
//! A resting order locks `orig_units` of one side and asks `orig_remaining`
//! of the other:
//!
//! | instrument | locked (`orig_units`) | asked (`orig_remaining`) |
//! |---|---|---|
//! | bid | coin | token units |
//! | ask | token units | coin |
//! | swap | token units | units of a second token |
//!
//! A filler pays `paid_units` of the asked side and receives
//! `received_units` of the locked side. Every compute function either returns
//! a [`Fill`] that already passed its remainder validator, or the error that
//! stopped it.

use ccmarket_types::{CcMarketError, Result, Units, constants};
use serde::{Deserialize, Serialize};

use crate::UnitPrice;
use crate::remainder::{validate_ask_remainder, validate_bid_remainder};

/// Outcome of one fill against a resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Units the order had locked before this fill.
    pub orig_units: Units,
    /// Locked units released to the filler.
    pub received_units: Units,
    /// Locked units left in the order.
    pub remaining_units: Units,
    /// Units the order still asked for before this fill.
    pub orig_remaining: Units,
    /// Units the filler pays to the order owner.
    pub paid_units: Units,
    /// Units the order still asks for after this fill.
    pub remaining_required: Units,
}

impl Fill {
    /// Whole order taken; nothing stays locked.
    #[must_use]
    pub fn full(orig_units: Units, orig_remaining: Units) -> Self {
        Self {
            orig_units,
            received_units: orig_units,
            remaining_units: 0,
            orig_remaining,
            paid_units: orig_remaining,
            remaining_required: 0,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining_required == 0
    }
}

/// Fill a bid that locked `orig_coin` for `orig_remaining_units` tokens with
/// `paid_units` tokens.
///
/// The unit price is the integer `orig_coin / orig_remaining_units`, so the
/// owner never pays more per token than advertised.
pub fn compute_bid_fill(orig_coin: Units, orig_remaining_units: Units, paid_units: Units) -> Result<Fill> {
    if orig_remaining_units == 0 {
        return Err(CcMarketError::DegenerateOrder {
            reason: "bid asks for zero token units".into(),
        });
    }
    if orig_coin == 0 {
        return Err(CcMarketError::DegenerateOrder {
            reason: "bid locks zero coin".into(),
        });
    }
    if paid_units >= orig_remaining_units {
        tracing::debug!(orig_coin, orig_remaining_units, paid_units, "Bid totally filled");
        return Ok(Fill::full(orig_coin, orig_remaining_units));
    }
    let unit_price = orig_coin / orig_remaining_units;
    if unit_price == 0 {
        return Err(CcMarketError::DegenerateOrder {
            reason: format!("bid unit price rounds to zero ({orig_coin} / {orig_remaining_units})"),
        });
    }
    let received_units = paid_units
        .checked_mul(unit_price)
        .ok_or(CcMarketError::ArithmeticOverflow { context: "bid received coin" })?;
    if received_units == 0 {
        return Err(CcMarketError::ZeroQuantity { field: "received coin" });
    }
    if received_units > orig_coin {
        return Err(CcMarketError::FillOutOfRange {
            reason: format!("received coin {received_units} exceeds locked {orig_coin}"),
        });
    }
    let fill = Fill {
        orig_units: orig_coin,
        received_units,
        remaining_units: orig_coin - received_units,
        orig_remaining: orig_remaining_units,
        paid_units,
        remaining_required: orig_remaining_units - paid_units,
    };
    tracing::debug!(
        received = fill.received_units,
        remaining = fill.remaining_units,
        unit_price,
        "Computed bid fill"
    );
    validate_bid_remainder(&fill)?;
    Ok(fill)
}

/// Fill an ask that locked `orig_units` tokens for `orig_coin` with
/// `paid_coin`.
///
/// Token units can be far finer than coin, so the price is kept exact:
/// `received = floor(paid_coin * orig_units / orig_coin)`. Prices at or below
/// one coin unit per 10^15 token units are rejected.
pub fn compute_ask_fill(orig_units: Units, orig_coin: Units, paid_coin: Units) -> Result<Fill> {
    compute_ask_style(orig_units, orig_coin, paid_coin, "ask")
}

/// Fill a swap that locked `orig_units` tokens for `orig_units2` units of a
/// second token. Same arithmetic as an ask.
pub fn compute_swap_fill(orig_units: Units, orig_units2: Units, paid_units2: Units) -> Result<Fill> {
    compute_ask_style(orig_units, orig_units2, paid_units2, "swap")
}

fn compute_ask_style(orig_units: Units, orig_price: Units, paid: Units, kind: &str) -> Result<Fill> {
    if orig_price == 0 {
        return Err(CcMarketError::DegenerateOrder {
            reason: format!("{kind} asks for zero payment"),
        });
    }
    if orig_units == 0 {
        return Err(CcMarketError::DegenerateOrder {
            reason: format!("{kind} locks zero token units"),
        });
    }
    if paid >= orig_price {
        tracing::debug!(orig_units, orig_price, paid, kind, "Order totally filled");
        return Ok(Fill::full(orig_units, orig_price));
    }
    if u128::from(orig_price) * constants::PRICE_EPSILON_DENOMINATOR <= u128::from(orig_units) {
        return Err(CcMarketError::PriceBelowEpsilon {
            orig_coin: orig_price,
            orig_units,
        });
    }
    let price = UnitPrice::new(orig_price, orig_units).ok_or(CcMarketError::DegenerateOrder {
        reason: format!("{kind} locks zero token units"),
    })?;
    let received_units = price
        .units_for(paid)
        .ok_or(CcMarketError::ArithmeticOverflow { context: "ask received units" })?;
    if received_units == 0 {
        return Err(CcMarketError::ZeroQuantity { field: "received token units" });
    }
    if received_units > orig_units {
        return Err(CcMarketError::FillOutOfRange {
            reason: format!("received units {received_units} exceed locked {orig_units}"),
        });
    }
    let fill = Fill {
        orig_units,
        received_units,
        remaining_units: orig_units - received_units,
        orig_remaining: orig_price,
        paid_units: paid,
        remaining_required: orig_price - paid,
    };
    tracing::debug!(
        received = fill.received_units,
        remaining_required = fill.remaining_required,
        %price,
        kind,
        "Computed ask-style fill"
    );
    validate_ask_remainder(&fill)?;
    Ok(fill)
}
