//! Fill — a completed (or partial) order execution.

use super::event::Side;
use super::price::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Record of liquidity actually consumed by one of our orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub ts: i64,
    pub order_id: String,
    pub strategy_id: String,
    pub symbol: String,
    pub side: Side,
    pub qty_filled: i64,
    pub fill_price: Price,
    pub commission: Decimal,
    /// Bracket prices carried through from the entry order so the emulator
    /// can spawn the exits when this fill lands.
    pub linked_stop_price: Option<Price>,
    pub linked_target_price: Option<Price>,
}
