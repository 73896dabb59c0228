//! Depth-driven order book — sorted bid/ask ladders with BBO, level queries,
//! queue-ahead estimation, and liquidity walks.
//!
//! The book is rebuilt from depth updates only; trades never mutate it
//! except through [`DepthBook::walk_liquidity`], which models the liquidity
//! our own market orders consume. A crossed book (best bid ≥ best ask) is
//! logged and left as-is — downstream components operate on the crossed
//! state.

use crate::domain::{DepthCommand, DepthUpdate, Price, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Aggregate state of a single price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub qty: i64,
    pub num_orders: u32,
}

/// Which ladder a query addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSide {
    Bid,
    Ask,
}

impl BookSide {
    /// The ladder an order of the given side rests on when it does not cross.
    pub fn resting_for(side: Side) -> BookSide {
        match side {
            Side::Buy => BookSide::Bid,
            Side::Sell => BookSide::Ask,
        }
    }
}

/// Limit-order-book state for one symbol.
#[derive(Debug, Clone)]
pub struct DepthBook {
    symbol: String,
    tick_size: Price,
    bids: BTreeMap<Price, Level>,
    asks: BTreeMap<Price, Level>,
    last_update_time: i64,
    best_bid: Option<Price>,
    best_ask: Option<Price>,
}

impl DepthBook {
    pub fn new(symbol: impl Into<String>, tick_size: Price) -> Self {
        Self {
            symbol: symbol.into(),
            tick_size,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            last_update_time: 0,
            best_bid: None,
            best_ask: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn last_update_time(&self) -> i64 {
        self.last_update_time
    }

    /// Apply a depth update.
    ///
    /// No-op on symbol mismatch or stale timestamp. The event's side field
    /// uses the source dialect: `Sell` rows update the bid ladder, `Buy`
    /// rows the ask ladder.
    pub fn apply_depth(&mut self, event: &DepthUpdate) {
        if event.symbol != self.symbol || event.ts < self.last_update_time {
            return;
        }
        self.last_update_time = event.ts;

        let ladder = match event.side {
            Side::Sell => &mut self.bids,
            Side::Buy => &mut self.asks,
        };

        match event.command {
            DepthCommand::Delete => {
                ladder.remove(&event.price);
            }
            DepthCommand::Insert | DepthCommand::Update => {
                if event.qty > 0 {
                    ladder.insert(
                        event.price,
                        Level {
                            qty: event.qty,
                            num_orders: event.num_orders,
                        },
                    );
                } else {
                    ladder.remove(&event.price);
                }
            }
        }

        self.refresh_bbo();

        if let (Some(bid), Some(ask)) = (self.best_bid, self.best_ask) {
            if bid >= ask {
                warn!(
                    symbol = %self.symbol,
                    ts = event.ts,
                    %bid,
                    %ask,
                    "book crossed"
                );
            }
        }
    }

    /// Best bid/ask prices and their displayed quantities.
    pub fn bbo(&self) -> (Option<Price>, i64, Option<Price>, i64) {
        let bid_qty = self
            .best_bid
            .and_then(|p| self.bids.get(&p))
            .map_or(0, |l| l.qty);
        let ask_qty = self
            .best_ask
            .and_then(|p| self.asks.get(&p))
            .map_or(0, |l| l.qty);
        (self.best_bid, bid_qty, self.best_ask, ask_qty)
    }

    /// State of a specific price level, if present.
    pub fn level(&self, price: Price, side: BookSide) -> Option<Level> {
        match side {
            BookSide::Bid => self.bids.get(&price).copied(),
            BookSide::Ask => self.asks.get(&price).copied(),
        }
    }

    /// Resting quantity at strictly better prices on the same side an order
    /// of `order_side` would rest on. Better means higher for a buy (bid
    /// ladder), lower for a sell (ask ladder).
    pub fn qty_ahead(&self, price: Price, order_side: Side) -> i64 {
        match order_side {
            Side::Buy => self
                .bids
                .range((
                    std::ops::Bound::Excluded(price),
                    std::ops::Bound::Unbounded,
                ))
                .map(|(_, l)| l.qty)
                .sum(),
            Side::Sell => self.asks.range(..price).map(|(_, l)| l.qty).sum(),
        }
    }

    /// Consume liquidity from the side opposite an aggressor of `side`,
    /// best price outward, up to `qty` contracts. Mutates the touched
    /// levels and deletes the ones fully consumed.
    ///
    /// Returns the filled quantity and the volume-weighted average price,
    /// or `None` if no liquidity was consumed at all.
    pub fn walk_liquidity(&mut self, side: Side, qty: i64) -> Option<(i64, Price)> {
        let ladder = match side {
            Side::Buy => &mut self.asks,
            Side::Sell => &mut self.bids,
        };

        let mut remaining = qty;
        let mut filled: i64 = 0;
        let mut total_value = Decimal::ZERO;
        let mut emptied: Vec<Price> = Vec::new();

        // Asks walk up from the best (lowest) price, bids walk down.
        let prices: Vec<Price> = match side {
            Side::Buy => ladder.keys().copied().collect(),
            Side::Sell => ladder.keys().rev().copied().collect(),
        };

        for price in prices {
            if remaining == 0 {
                break;
            }
            let level = ladder.get_mut(&price).expect("price taken from ladder keys");
            let take = remaining.min(level.qty);
            filled += take;
            total_value += price.notional(take);
            remaining -= take;
            level.qty -= take;
            if level.qty <= 0 {
                emptied.push(price);
            }
        }

        for price in emptied {
            ladder.remove(&price);
        }
        self.refresh_bbo();

        if filled == 0 {
            return None;
        }
        let avg = Price::new(total_value / Decimal::from(filled));
        Some((filled, avg))
    }

    /// Seed the synthetic ten-level book used by the test scenarios:
    /// bids from 5950.00 down, asks from one tick above, quantities growing
    /// away from the bid top and toward the ask bottom.
    pub fn seed_synthetic(&mut self) {
        info!(symbol = %self.symbol, "seeding synthetic order book");
        let base = Price::new(dec!(5950.00));
        for i in 0..10i64 {
            self.bids.insert(
                base.offset_ticks(-i, self.tick_size),
                Level {
                    qty: 100 * (10 - i),
                    num_orders: 5,
                },
            );
            self.asks.insert(
                base.offset_ticks(i + 1, self.tick_size),
                Level {
                    qty: 100 * (i + 1),
                    num_orders: 5,
                },
            );
        }
        self.refresh_bbo();
    }

    fn refresh_bbo(&mut self) {
        self.best_bid = self.bids.keys().next_back().copied();
        self.best_ask = self.asks.keys().next().copied();
    }
}
