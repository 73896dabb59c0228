//! Event variants and their total ordering.
//!
//! Everything that flows through the simulation is an [`Event`]. Events are
//! totally ordered by `(timestamp, kind_priority, sequence)`; the sequence
//! component is assigned when an event enters the queue, so events produced
//! earlier dispatch earlier within the same nanosecond.

use super::fill::Fill;
use super::order::{Order, OrderType};
use super::price::Price;
use serde::{Deserialize, Serialize};

/// Side of a trade or order.
///
/// In trade events the side is the aggressor (`Buy` = buy-aggressor). Depth
/// events reuse the enum with the source dialect's inversion: a `Sell`-tagged
/// depth row updates the bid ladder and a `Buy`-tagged row the ask ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn flip(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// +1 for `Buy`, -1 for `Sell`.
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

/// Kind of modification carried by a depth update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthCommand {
    Insert,
    Update,
    Delete,
}

/// A time-and-sales print.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeTick {
    pub ts: i64,
    pub symbol: String,
    pub price: Price,
    pub qty: i64,
    /// Aggressor side.
    pub side: Side,
}

/// A single price-level change on one side of the book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthUpdate {
    pub ts: i64,
    pub symbol: String,
    pub side: Side,
    pub price: Price,
    pub qty: i64,
    pub num_orders: u32,
    pub command: DepthCommand,
    pub flags: i64,
}

/// A strategy's intent to enter, carrying the bracket exit prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub ts: i64,
    pub strategy_id: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub qty: i64,
    pub trigger_price: Option<Price>,
    pub stop_price: Option<Price>,
    pub target_price: Option<Price>,
}

/// Tagged union of everything the controller dispatches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Trade(TradeTick),
    Depth(DepthUpdate),
    Signal(Signal),
    Order(Order),
    Fill(Fill),
}

impl Event {
    pub fn timestamp(&self) -> i64 {
        match self {
            Event::Trade(e) => e.ts,
            Event::Depth(e) => e.ts,
            Event::Signal(e) => e.ts,
            Event::Order(e) => e.ts,
            Event::Fill(e) => e.ts,
        }
    }

    /// Tie-break rank among events sharing a timestamp; variant listing order.
    pub fn kind_priority(&self) -> u8 {
        match self {
            Event::Trade(_) => 0,
            Event::Depth(_) => 1,
            Event::Signal(_) => 2,
            Event::Order(_) => 3,
            Event::Fill(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_flip_and_sign() {
        assert_eq!(Side::Buy.flip(), Side::Sell);
        assert_eq!(Side::Sell.flip(), Side::Buy);
        assert_eq!(Side::Buy.sign(), 1);
        assert_eq!(Side::Sell.sign(), -1);
    }

    #[test]
    fn kind_priority_follows_variant_order() {
        let trade = Event::Trade(TradeTick {
            ts: 1,
            symbol: "ES".into(),
            price: "5950.25".parse().unwrap(),
            qty: 1,
            side: Side::Buy,
        });
        let depth = Event::Depth(DepthUpdate {
            ts: 1,
            symbol: "ES".into(),
            side: Side::Sell,
            price: "5950.00".parse().unwrap(),
            qty: 10,
            num_orders: 1,
            command: DepthCommand::Update,
            flags: 1,
        });
        assert!(trade.kind_priority() < depth.kind_priority());
    }
}
