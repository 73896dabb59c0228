//! Strategy components.
//!
//! A strategy observes trades (with read access to the book), its own fills,
//! and status updates for its orders, and emits signal events for the
//! execution emulator to act on.

pub mod footprint;

pub use footprint::{FootprintDiagonalRatio, FootprintParams, ZeroCompareAction};

use crate::book::DepthBook;
use crate::domain::{Event, Fill, Order, TradeTick};

/// Behaviour contract between the controller and a trading strategy.
pub trait Strategy {
    fn strategy_id(&self) -> &str;

    /// Called on every trade print; returns any signals to enqueue.
    fn on_trade(&mut self, trade: &TradeTick, book: &DepthBook) -> Vec<Event>;

    /// Called when one of the strategy's orders is filled.
    fn on_fill(&mut self, fill: &Fill);

    /// Called on any status update for one of the strategy's orders.
    fn on_order_status(&mut self, order: &Order);
}
