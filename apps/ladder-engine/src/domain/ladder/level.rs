//! Level slots.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle of a single ladder level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelState {
    /// Not yet submitted; price follows the entry price.
    Pending,
    /// A limit order was submitted at `price`. Terminal.
    Placed,
}

/// One level of a ladder: its state and the price it carries.
///
/// A pending slot's price is the most recently computed target. A placed
/// slot's price is the limit price that was submitted and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSlot {
    state: LevelState,
    price: Decimal,
}

impl LevelSlot {
    /// A pending slot at `price`.
    #[must_use]
    pub const fn pending(price: Decimal) -> Self {
        Self {
            state: LevelState::Pending,
            price,
        }
    }

    /// A placed slot at `price`.
    #[must_use]
    pub const fn placed(price: Decimal) -> Self {
        Self {
            state: LevelState::Placed,
            price,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LevelState {
        self.state
    }

    /// Price carried by the slot.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Whether an order exists for this level.
    #[must_use]
    pub const fn is_placed(&self) -> bool {
        matches!(self.state, LevelState::Placed)
    }
}
