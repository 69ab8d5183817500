//! Conditions that hold resting orders and token balances.

use ccmarket_types::{Address, Condition, EvalCode, PubKey, condition_address};

/// Coin locked by a bid, releasable only through the order-book module.
#[must_use]
pub fn bid_lock() -> Condition {
    Condition::single(EvalCode::ASSETS, PubKey::module_global(EvalCode::ASSETS))
}

/// Token units locked by an ask.
#[must_use]
pub fn ask_lock() -> Condition {
    Condition::dual_eval(
        EvalCode::TOKENS,
        EvalCode::ASSETS,
        PubKey::module_global(EvalCode::ASSETS),
    )
}

/// Token balance of `key`.
#[must_use]
pub fn token_holder(key: PubKey) -> Condition {
    Condition::single(EvalCode::TOKENS, key)
}

#[must_use]
pub fn bid_lock_address() -> Address {
    condition_address(&bid_lock())
}

#[must_use]
pub fn ask_lock_address() -> Address {
    condition_address(&ask_lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_are_distinct() {
        assert_ne!(bid_lock_address(), ask_lock_address());
        let alice = PubKey::from_label("alice");
        assert_ne!(condition_address(&token_holder(alice)), ask_lock_address());
        assert!(ask_lock().has_eval(EvalCode::TOKENS));
        assert!(!bid_lock().has_eval(EvalCode::TOKENS));
    }
}
