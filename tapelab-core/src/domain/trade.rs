//! Closed round-trip trade records.

use super::price::Price;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a position over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDirection {
    Long,
    Short,
}

/// One closed (or partially closed) round trip, as appended to the trade log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub symbol: String,
    pub entry_ts: i64,
    pub exit_ts: i64,
    pub direction: TradeDirection,
    pub entry_price: Price,
    pub exit_price: Price,
    pub qty: i64,
    /// Tick-valued gross P&L in account currency.
    pub pnl: Decimal,
    /// Entry-side commission accumulated on the position plus the exit fill's.
    pub commission: Decimal,
}

impl ClosedTrade {
    /// P&L net of commission.
    pub fn net_pnl(&self) -> Decimal {
        self.pnl - self.commission
    }
}
