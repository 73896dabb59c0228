//! Domain types — the vocabulary of tapelab.
//!
//! Every module in the system builds on these types: tick-aligned prices,
//! market/order/fill events with their total ordering, and closed-trade
//! records.

pub mod event;
pub mod fill;
pub mod order;
pub mod price;
pub mod trade;

// Re-export the most commonly used types at the domain level.
pub use event::{DepthCommand, DepthUpdate, Event, Side, Signal, TradeTick};
pub use fill::Fill;
pub use order::{Order, OrderStatus, OrderType};
pub use price::Price;
pub use trade::{ClosedTrade, TradeDirection};
