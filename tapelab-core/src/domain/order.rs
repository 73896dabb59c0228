//! Order lifecycle types.

use super::event::Side;
use super::price::Price;
use serde::{Deserialize, Serialize};

/// Supported order types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    StopMarket,
}

/// Order lifecycle status.
///
/// `Filled`, `Rejected` and `Cancelled` are terminal; a terminal transition
/// removes the order from the execution emulator's live table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    PendingSubmit,
    Accepted,
    Rejected,
    PartiallyFilled,
    Filled,
    PendingCancel,
    Cancelled,
    Triggered,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }
}

/// A client order, also used as the payload of status-update events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub ts: i64,
    pub id: String,
    pub strategy_id: String,
    pub symbol: String,
    pub qty: i64,
    pub order_type: OrderType,
    pub side: Side,
    pub limit_price: Option<Price>,
    pub stop_price: Option<Price>,
    pub filled_qty: i64,
    pub status: OrderStatus,
    /// Stop price of the bracket exit to spawn once this entry fills.
    pub linked_stop_price: Option<Price>,
    /// Target price of the bracket exit to spawn once this entry fills.
    pub linked_target_price: Option<Price>,
    /// For bracket children and stop-spawned market orders: the originating
    /// order's id. Top-level entries carry `None`.
    pub parent_order_id: Option<String>,
}

impl Order {
    pub fn remaining_qty(&self) -> i64 {
        self.qty - self.filled_qty
    }
}
