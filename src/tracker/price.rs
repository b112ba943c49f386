//! Sequential percent-change tracker

use crate::feed::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Last observed price and change for one symbol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceState {
    pub last_price: Option<Decimal>,
    pub last_change_pct: Option<Decimal>,
}

/// Display classification of a percent change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeDirection {
    /// Zero or positive change
    NonNegative,
    /// Negative change
    Negative,
}

impl ChangeDirection {
    /// Classify a signed percent change
    pub fn of(change_pct: Decimal) -> Self {
        if change_pct.is_sign_negative() && !change_pct.is_zero() {
            Self::Negative
        } else {
            Self::NonNegative
        }
    }
}

/// Per-symbol baseline prices
///
/// Every update compares against the price set by the previous update for
/// the same symbol, then replaces it.
#[derive(Debug, Default)]
pub struct PriceTracker {
    states: HashMap<Symbol, PriceState>,
}

impl PriceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `new_price` for `symbol` and return its percent change
    ///
    /// The first price for a symbol becomes the baseline and yields zero.
    /// Returns `None` and leaves the state untouched if the change does not
    /// fit in a `Decimal`.
    pub fn update(&mut self, symbol: &Symbol, new_price: Decimal) -> Option<Decimal> {
        let last = self.states.get(symbol).and_then(|s| s.last_price);

        let change_pct = match last {
            Some(last) if !last.is_zero() => new_price
                .checked_sub(last)?
                .checked_div(last)?
                .checked_mul(Decimal::ONE_HUNDRED)?,
            _ => Decimal::ZERO,
        };

        let state = self.states.entry(symbol.clone()).or_default();
        state.last_price = Some(new_price);
        state.last_change_pct = Some(change_pct);
        Some(change_pct)
    }

    /// Current state for `symbol`; unset fields if no price was seen yet
    pub fn state(&self, symbol: &Symbol) -> PriceState {
        self.states.get(symbol).copied().unwrap_or_default()
    }

    /// Drop everything known about `symbol`
    pub fn forget(&mut self, symbol: &Symbol) {
        self.states.remove(symbol);
    }
}
