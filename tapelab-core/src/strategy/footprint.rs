//! Footprint diagonal-ratio strategy.
//!
//! Accumulates a volume-at-price profile over wall-clock-aligned bars and,
//! at each bar roll, compares bid volume at a price with ask volume one tick
//! above it (the footprint diagonal). A lopsided ratio beyond the threshold
//! signals an entry in the direction of the aggression, bracketed by a
//! fixed-tick stop and a risk-reward-scaled target.

use crate::book::DepthBook;
use crate::domain::{Event, Fill, Order, OrderType, Price, Side, Signal, TradeTick};
use crate::strategy::Strategy;
use chrono::{DateTime, Timelike};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Policy when one leg of the diagonal has zero volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroCompareAction {
    /// Substitute 1 for the zero leg and compute the ratio normally.
    Set0To1,
    /// Force the ratio to ±1000 in the direction of the non-zero leg.
    SetPerc1000,
}

/// Tunables for [`FootprintDiagonalRatio`].
#[derive(Debug, Clone)]
pub struct FootprintParams {
    pub percentage_threshold: Decimal,
    pub enable_zero_compares: bool,
    pub zero_compare_action: ZeroCompareAction,
    pub stop_ticks: i64,
    pub risk_reward: Decimal,
    pub bar_interval_minutes: i64,
    /// Minimum opposite-side BBO quantity required to signal; 0 disables.
    pub min_liquidity_check: i64,
}

impl Default for FootprintParams {
    fn default() -> Self {
        Self {
            percentage_threshold: dec!(150.0),
            enable_zero_compares: false,
            zero_compare_action: ZeroCompareAction::Set0To1,
            stop_ticks: 11,
            risk_reward: dec!(2.5),
            bar_interval_minutes: 1,
            min_liquidity_check: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct VolumeAtPrice {
    bid_vol: i64,
    ask_vol: i64,
}

/// Diagonal-ratio strategy over a per-bar VAP profile.
pub struct FootprintDiagonalRatio {
    strategy_id: String,
    symbol: String,
    tick_size: Price,
    params: FootprintParams,
    bar_interval_ns: i64,
    bar_start: Option<i64>,
    profile: BTreeMap<Price, VolumeAtPrice>,
    position: i64,
    /// One-slot entry lock: set when a signal goes out, cleared when the
    /// position returns to flat or a top-level order terminates.
    entry_pending: bool,
}

impl FootprintDiagonalRatio {
    pub fn new(symbol: impl Into<String>, tick_size: Price, params: FootprintParams) -> Self {
        let symbol = symbol.into();
        Self {
            strategy_id: format!("FootprintDiagonalRatio_{symbol}"),
            symbol,
            tick_size,
            bar_interval_ns: params.bar_interval_minutes * 60 * 1_000_000_000,
            params,
            bar_start: None,
            profile: BTreeMap::new(),
            position: 0,
            entry_pending: false,
        }
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    /// Bar start: wall-clock minute floored to the bar interval.
    fn align_bar_start(&self, ts: i64) -> i64 {
        let dt = DateTime::from_timestamp_nanos(ts);
        let interval = self.params.bar_interval_minutes as u32;
        let minute = (dt.minute() / interval.max(1)) * interval.max(1);
        dt.with_minute(minute)
            .and_then(|d| d.with_second(0))
            .and_then(|d| d.with_nanosecond(0))
            .map_or(ts, |d| d.timestamp_nanos_opt().unwrap_or(ts))
    }

    fn reset_bar(&mut self, ts: i64) {
        self.profile.clear();
        self.bar_start = Some(self.align_bar_start(ts));
    }

    /// Evaluate the finished bar's profile and emit at most one entry signal.
    fn evaluate_bar(&mut self, ts: i64, book: &DepthBook) -> Vec<Event> {
        if self.profile.is_empty() || self.entry_pending {
            return Vec::new();
        }

        for (&price_bid, vap) in self.profile.iter() {
            if vap.bid_vol == 0 {
                continue;
            }
            let price_ask_diag = price_bid.offset_ticks(1, self.tick_size);
            let bid_vol = Decimal::from(vap.bid_vol);
            let ask_vol = Decimal::from(
                self.profile
                    .get(&price_ask_diag)
                    .map_or(0, |v| v.ask_vol),
            );

            let mut d_bid = bid_vol;
            let mut d_ask = ask_vol;
            let mut ratio = Decimal::ZERO;
            let mut forced = false;

            if d_bid.is_zero() || d_ask.is_zero() {
                if !self.params.enable_zero_compares {
                    continue;
                }
                match self.params.zero_compare_action {
                    ZeroCompareAction::Set0To1 => {
                        if d_bid.is_zero() {
                            d_bid = Decimal::ONE;
                        }
                        if d_ask.is_zero() {
                            d_ask = Decimal::ONE;
                        }
                    }
                    ZeroCompareAction::SetPerc1000 => {
                        ratio = if d_bid.is_zero() {
                            dec!(1000)
                        } else {
                            dec!(-1000)
                        };
                        forced = true;
                    }
                }
            }

            if !forced {
                ratio = if ask_vol >= bid_vol {
                    d_ask / d_bid * dec!(100)
                } else {
                    d_bid / d_ask * dec!(-100)
                };
            }

            let (signal_side, trigger_price) = if ratio >= self.params.percentage_threshold {
                (Side::Buy, price_ask_diag)
            } else if ratio <= -self.params.percentage_threshold {
                (Side::Sell, price_bid)
            } else {
                continue;
            };

            if self.position != 0 {
                continue;
            }
            if self.params.min_liquidity_check > 0 {
                let (_, bid_qty, _, ask_qty) = book.bbo();
                let opposite = match signal_side {
                    Side::Buy => ask_qty,
                    Side::Sell => bid_qty,
                };
                if opposite < self.params.min_liquidity_check {
                    continue;
                }
            }

            let stop_dist = Decimal::from(self.params.stop_ticks) * self.tick_size.value();
            let target_dist = stop_dist * self.params.risk_reward;
            let (stop_price, target_price) = match signal_side {
                Side::Buy => (trigger_price - stop_dist, trigger_price + target_dist),
                Side::Sell => (trigger_price + stop_dist, trigger_price - target_dist),
            };

            info!(
                strategy = %self.strategy_id,
                side = ?signal_side,
                %trigger_price,
                %ratio,
                "diagonal ratio signal"
            );
            self.entry_pending = true;
            return vec![Event::Signal(Signal {
                ts,
                strategy_id: self.strategy_id.clone(),
                symbol: self.symbol.clone(),
                side: signal_side,
                order_type: OrderType::Market,
                qty: 1,
                trigger_price: Some(trigger_price),
                stop_price: Some(stop_price),
                target_price: Some(target_price),
            })];
        }
        Vec::new()
    }
}

impl Strategy for FootprintDiagonalRatio {
    fn strategy_id(&self) -> &str {
        &self.strategy_id
    }

    fn on_trade(&mut self, trade: &TradeTick, book: &DepthBook) -> Vec<Event> {
        if trade.symbol != self.symbol {
            return Vec::new();
        }

        if self.bar_start.is_none() {
            self.reset_bar(trade.ts);
        }
        let bar_start = self.bar_start.expect("bar initialized above");

        let mut out = Vec::new();
        if trade.ts >= bar_start + self.bar_interval_ns {
            // A boundary trade finalizes the previous bar before counting.
            out = self.evaluate_bar(bar_start + self.bar_interval_ns - 1, book);
            self.reset_bar(trade.ts);
        }

        let vap = self.profile.entry(trade.price).or_default();
        match trade.side {
            Side::Sell => vap.bid_vol += trade.qty,
            Side::Buy => vap.ask_vol += trade.qty,
        }
        out
    }

    fn on_fill(&mut self, fill: &Fill) {
        if fill.strategy_id != self.strategy_id {
            return;
        }
        self.position += fill.qty_filled * fill.side.sign();
        if self.position == 0 {
            // Position closed: ready for a new entry.
            self.entry_pending = false;
        }
        debug!(strategy = %self.strategy_id, position = self.position, "position updated");
    }

    fn on_order_status(&mut self, order: &Order) {
        if order.strategy_id != self.strategy_id {
            return;
        }
        if order.status.is_terminal() && order.parent_order_id.is_none() {
            self.entry_pending = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderStatus;

    const MINUTE_NS: i64 = 60 * 1_000_000_000;

    fn px(s: &str) -> Price {
        s.parse().unwrap()
    }

    fn strategy() -> FootprintDiagonalRatio {
        FootprintDiagonalRatio::new("ES", px("0.25"), FootprintParams::default())
    }

    fn trade(ts: i64, price: &str, qty: i64, side: Side) -> TradeTick {
        TradeTick {
            ts,
            symbol: "ES".into(),
            price: px(price),
            qty,
            side,
        }
    }

    fn book() -> DepthBook {
        DepthBook::new("ES", px("0.25"))
    }

    fn first_signal(events: Vec<Event>) -> Option<Signal> {
        events.into_iter().find_map(|e| match e {
            Event::Signal(s) => Some(s),
            _ => None,
        })
    }

    #[test]
    fn bar_start_aligns_to_minute() {
        let s = strategy();
        // 90 seconds past the epoch floors to the 60-second boundary.
        assert_eq!(s.align_bar_start(90 * 1_000_000_000), MINUTE_NS);
        assert_eq!(s.align_bar_start(MINUTE_NS), MINUTE_NS);
        assert_eq!(s.align_bar_start(59 * 1_000_000_000), 0);
    }

    #[test]
    fn bullish_diagonal_emits_buy_bracket() {
        let mut s = strategy();
        let b = book();

        // Within the first bar: heavy ask volume one tick above bid volume.
        s.on_trade(&trade(1_000, "5950.00", 10, Side::Sell), &b);
        s.on_trade(&trade(2_000, "5950.25", 40, Side::Buy), &b);

        // Boundary trade finalizes the bar.
        let events = s.on_trade(&trade(MINUTE_NS + 1, "5950.25", 1, Side::Buy), &b);
        let sig = first_signal(events).expect("signal expected");

        assert_eq!(sig.side, Side::Buy);
        assert_eq!(sig.trigger_price, Some(px("5950.25")));
        // stop = trigger - 11 ticks, target = trigger + 11 * 2.5 ticks.
        assert_eq!(sig.stop_price, Some(px("5947.50")));
        assert_eq!(sig.target_price, Some(px("5957.125")));
        assert_eq!(sig.ts, MINUTE_NS - 1);
    }

    #[test]
    fn bearish_diagonal_emits_sell_bracket() {
        let mut s = strategy();
        let b = book();

        s.on_trade(&trade(1_000, "5950.00", 40, Side::Sell), &b);
        s.on_trade(&trade(2_000, "5950.25", 10, Side::Buy), &b);

        let events = s.on_trade(&trade(MINUTE_NS + 1, "5950.25", 1, Side::Buy), &b);
        let sig = first_signal(events).expect("signal expected");

        assert_eq!(sig.side, Side::Sell);
        assert_eq!(sig.trigger_price, Some(px("5950.00")));
        assert_eq!(sig.stop_price, Some(px("5952.75")));
        assert_eq!(sig.target_price, Some(px("5943.125")));
    }

    #[test]
    fn balanced_flow_stays_quiet() {
        let mut s = strategy();
        let b = book();

        s.on_trade(&trade(1_000, "5950.00", 30, Side::Sell), &b);
        s.on_trade(&trade(2_000, "5950.25", 31, Side::Buy), &b);

        let events = s.on_trade(&trade(MINUTE_NS + 1, "5950.25", 1, Side::Buy), &b);
        assert!(first_signal(events).is_none());
    }

    #[test]
    fn zero_ask_leg_skipped_unless_enabled() {
        let mut s = strategy();
        let b = book();
        // Only bid volume, nothing on the diagonal.
        s.on_trade(&trade(1_000, "5950.00", 50, Side::Sell), &b);
        let events = s.on_trade(&trade(MINUTE_NS + 1, "5950.25", 1, Side::Buy), &b);
        assert!(first_signal(events).is_none());
    }

    #[test]
    fn zero_compare_forced_ratio_signals_sell() {
        let mut s = FootprintDiagonalRatio::new(
            "ES",
            px("0.25"),
            FootprintParams {
                enable_zero_compares: true,
                zero_compare_action: ZeroCompareAction::SetPerc1000,
                ..FootprintParams::default()
            },
        );
        let b = book();
        s.on_trade(&trade(1_000, "5950.00", 50, Side::Sell), &b);
        let events = s.on_trade(&trade(MINUTE_NS + 1, "5950.25", 1, Side::Buy), &b);
        let sig = first_signal(events).expect("forced ratio signal");
        assert_eq!(sig.side, Side::Sell);
    }

    #[test]
    fn boundary_trade_counts_toward_new_bar() {
        let mut s = strategy();
        let b = book();
        s.on_trade(&trade(1_000, "5950.00", 10, Side::Sell), &b);

        // Exactly at the boundary: finalizes the old bar, lands in the new.
        s.on_trade(&trade(MINUTE_NS, "5951.00", 7, Side::Buy), &b);
        assert_eq!(s.bar_start, Some(MINUTE_NS));
        assert_eq!(s.profile.get(&px("5951.00")).unwrap().ask_vol, 7);
        assert!(s.profile.get(&px("5950.00")).is_none());
    }

    #[test]
    fn entry_lock_blocks_second_signal_until_flat() {
        let mut s = strategy();
        let b = book();

        s.on_trade(&trade(1_000, "5950.00", 10, Side::Sell), &b);
        s.on_trade(&trade(2_000, "5950.25", 40, Side::Buy), &b);
        let events = s.on_trade(&trade(MINUTE_NS + 1, "5950.25", 1, Side::Buy), &b);
        assert!(first_signal(events).is_some());

        // Same imbalance next bar, but the lock is held.
        s.on_trade(&trade(MINUTE_NS + 2_000, "5950.00", 10, Side::Sell), &b);
        s.on_trade(&trade(MINUTE_NS + 3_000, "5950.25", 40, Side::Buy), &b);
        let events = s.on_trade(&trade(2 * MINUTE_NS + 1, "5950.25", 1, Side::Buy), &b);
        assert!(first_signal(events).is_none());

        // Fill in, fill out: flat clears the lock.
        s.on_fill(&Fill {
            ts: 10,
            order_id: "E1".into(),
            strategy_id: s.strategy_id().to_string(),
            symbol: "ES".into(),
            side: Side::Buy,
            qty_filled: 1,
            fill_price: px("5950.25"),
            commission: Decimal::ZERO,
            linked_stop_price: None,
            linked_target_price: None,
        });
        assert_eq!(s.position(), 1);
        s.on_fill(&Fill {
            ts: 20,
            order_id: "X1".into(),
            strategy_id: s.strategy_id().to_string(),
            symbol: "ES".into(),
            side: Side::Sell,
            qty_filled: 1,
            fill_price: px("5951.00"),
            commission: Decimal::ZERO,
            linked_stop_price: None,
            linked_target_price: None,
        });
        assert_eq!(s.position(), 0);
        assert!(!s.entry_pending);
    }

    #[test]
    fn terminal_status_of_top_level_order_clears_lock() {
        let mut s = strategy();
        s.entry_pending = true;
        s.on_order_status(&Order {
            ts: 1,
            id: "E1".into(),
            strategy_id: s.strategy_id().to_string(),
            symbol: "ES".into(),
            qty: 1,
            order_type: OrderType::Market,
            side: Side::Buy,
            limit_price: None,
            stop_price: None,
            filled_qty: 0,
            status: OrderStatus::Rejected,
            linked_stop_price: None,
            linked_target_price: None,
            parent_order_id: None,
        });
        assert!(!s.entry_pending);

        // Child-order terminals leave the lock alone.
        s.entry_pending = true;
        s.on_order_status(&Order {
            ts: 2,
            id: "T1".into(),
            strategy_id: s.strategy_id().to_string(),
            symbol: "ES".into(),
            qty: 1,
            order_type: OrderType::Limit,
            side: Side::Sell,
            limit_price: Some(px("5956.00")),
            stop_price: None,
            filled_qty: 0,
            status: OrderStatus::Cancelled,
            linked_stop_price: None,
            linked_target_price: None,
            parent_order_id: Some("E1".into()),
        });
        assert!(s.entry_pending);
    }

    #[test]
    fn min_liquidity_gate_blocks_thin_books() {
        let mut s = FootprintDiagonalRatio::new(
            "ES",
            px("0.25"),
            FootprintParams {
                min_liquidity_check: 50,
                ..FootprintParams::default()
            },
        );
        // Empty book: opposite-side quantity is 0 < 50.
        let b = book();
        s.on_trade(&trade(1_000, "5950.00", 10, Side::Sell), &b);
        s.on_trade(&trade(2_000, "5950.25", 40, Side::Buy), &b);
        let events = s.on_trade(&trade(MINUTE_NS + 1, "5950.25", 1, Side::Buy), &b);
        assert!(first_signal(events).is_none());
    }
}
