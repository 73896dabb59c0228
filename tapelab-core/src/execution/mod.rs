//! Execution emulator — order lifecycle, fill generation, and OCO
//! bookkeeping.
//!
//! Market orders walk the opposite side of the book. Limit orders rest with
//! an estimated queue position that each matching trade erodes; fills on the
//! non-crossing path always execute at the limit price. Stop-market orders
//! wait for a triggering trade and then spawn a latency-shifted child market
//! order. Bracket exits are linked through a side table keyed by the entry
//! order id; filling one exit cancels the other.
//!
//! Handlers never touch the event queue directly: each returns the events it
//! produced and the controller enqueues them, so no handler observes its own
//! output within the same turn.

use crate::book::{BookSide, DepthBook};
use crate::domain::{Event, Fill, Order, OrderStatus, OrderType, Price, Side, Signal, TradeTick};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Latency and cost parameters of the simulated venue path.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub commission_per_contract: Decimal,
    pub latency_data_signal_ns: i64,
    pub latency_signal_order_ns: i64,
}

/// A resting limit order plus its queue estimate.
#[derive(Debug, Clone)]
struct PendingLimit {
    order: Order,
    qty_ahead: i64,
    qty_filled: i64,
}

/// Exit-order slots for one bracket entry.
#[derive(Debug, Clone, Default)]
struct LinkedExits {
    stop_id: Option<String>,
    target_id: Option<String>,
}

/// Simulates the exchange-facing order path.
pub struct ExecutionEmulator {
    config: ExecutionConfig,
    order_counter: u64,
    /// Live orders by id; terminal transitions prune entries.
    submitted_orders: BTreeMap<String, Order>,
    pending_limit_orders: BTreeMap<String, PendingLimit>,
    pending_stop_orders: BTreeMap<String, Order>,
    /// Bracket linkage, keyed by entry order id.
    linked_exit_orders: BTreeMap<String, LinkedExits>,
}

impl ExecutionEmulator {
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            order_counter: 0,
            submitted_orders: BTreeMap::new(),
            pending_limit_orders: BTreeMap::new(),
            pending_stop_orders: BTreeMap::new(),
            linked_exit_orders: BTreeMap::new(),
        }
    }

    /// Ids are deterministic: a running counter plus the event timestamp.
    fn next_order_id(&mut self, prefix: &str, ts: i64) -> String {
        self.order_counter += 1;
        format!("{prefix}_{}_{ts}", self.order_counter)
    }

    /// Turn a strategy signal into a latency-shifted entry order.
    pub fn process_signal(&mut self, signal: &Signal) -> Vec<Event> {
        let arrival_ts =
            signal.ts + self.config.latency_data_signal_ns + self.config.latency_signal_order_ns;
        let entry_id = self.next_order_id("ENTRY", arrival_ts);

        let entry = Order {
            ts: arrival_ts,
            id: entry_id.clone(),
            strategy_id: signal.strategy_id.clone(),
            symbol: signal.symbol.clone(),
            qty: signal.qty,
            order_type: signal.order_type,
            side: signal.side,
            limit_price: None,
            stop_price: None,
            filled_qty: 0,
            status: OrderStatus::PendingSubmit,
            linked_stop_price: signal.stop_price,
            linked_target_price: signal.target_price,
            parent_order_id: None,
        };

        self.submitted_orders.insert(entry_id.clone(), entry.clone());
        if signal.stop_price.is_some() || signal.target_price.is_some() {
            self.linked_exit_orders
                .insert(entry_id.clone(), LinkedExits::default());
        }
        debug!(order_id = %entry_id, arrival_ts, "entry order scheduled from signal");
        vec![Event::Order(entry)]
    }

    /// Attempt placement/execution of an order in `PendingSubmit` state.
    pub fn execute_order(&mut self, order: &Order, book: &mut DepthBook) -> Vec<Event> {
        // Orders arriving straight from tests or replay may not have passed
        // through `process_signal`; make sure the registry knows them.
        self.submitted_orders
            .entry(order.id.clone())
            .or_insert_with(|| order.clone());

        let mut out = Vec::new();
        self.push_status(&mut out, &order.id, OrderStatus::Accepted, order.ts, None);

        match order.order_type {
            OrderType::Market => self.execute_market_order(order, book, &mut out),
            OrderType::Limit => self.place_limit_order(order, book, &mut out),
            OrderType::StopMarket => self.place_stop_order(order, &mut out),
        }
        out
    }

    fn execute_market_order(&mut self, order: &Order, book: &mut DepthBook, out: &mut Vec<Event>) {
        let Some((filled_qty, avg_price)) = book.walk_liquidity(order.side, order.qty) else {
            self.reject_order(out, order, "no liquidity on required side");
            return;
        };

        let commission = self.config.commission_per_contract * Decimal::from(filled_qty);
        out.push(Event::Fill(Fill {
            ts: order.ts,
            order_id: order.id.clone(),
            strategy_id: order.strategy_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            qty_filled: filled_qty,
            fill_price: avg_price,
            commission,
            linked_stop_price: order.linked_stop_price,
            linked_target_price: order.linked_target_price,
        }));

        let status = if filled_qty == order.qty {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.push_status(out, &order.id, status, order.ts, Some(filled_qty));
    }

    fn place_limit_order(&mut self, order: &Order, book: &mut DepthBook, out: &mut Vec<Event>) {
        let Some(limit) = order.limit_price else {
            self.reject_order(out, order, "limit price not specified");
            return;
        };

        let (best_bid, _, best_ask, _) = book.bbo();
        let crosses = match order.side {
            Side::Buy => best_ask.is_some_and(|ask| limit >= ask),
            Side::Sell => best_bid.is_some_and(|bid| limit <= bid),
        };
        if crosses {
            info!(order_id = %order.id, %limit, "limit crosses the market, executing as market");
            self.execute_market_order(order, book, out);
            return;
        }

        // Queue estimate: everything at better prices plus the displayed
        // quantity already resting at our own level.
        let qty_better = book.qty_ahead(limit, order.side);
        let at_level = book
            .level(limit, BookSide::resting_for(order.side))
            .map_or(0, |l| l.qty);
        let qty_ahead = qty_better + at_level;

        debug!(order_id = %order.id, %limit, qty_ahead, "limit order resting");
        self.pending_limit_orders.insert(
            order.id.clone(),
            PendingLimit {
                order: order.clone(),
                qty_ahead,
                qty_filled: 0,
            },
        );
    }

    fn place_stop_order(&mut self, order: &Order, out: &mut Vec<Event>) {
        if order.stop_price.is_none() {
            self.reject_order(out, order, "stop price not specified");
            return;
        }
        self.pending_stop_orders
            .insert(order.id.clone(), order.clone());
    }

    /// Scan resting limit orders against an incoming trade using the
    /// queue-position heuristic.
    ///
    /// A trade at the limit price first consumes the estimated queue ahead; a
    /// trade strictly through the limit implies the queue was swept, so the
    /// full remainder fills. Fill price is always the limit price.
    pub fn check_limit_fills(&mut self, trade: &TradeTick) -> Vec<Event> {
        let mut out = Vec::new();
        if self.pending_limit_orders.is_empty() {
            return out;
        }

        let ids: Vec<String> = self.pending_limit_orders.keys().cloned().collect();
        for id in ids {
            let Some(pending) = self.pending_limit_orders.get_mut(&id) else {
                continue;
            };
            if pending.order.symbol != trade.symbol {
                continue;
            }
            let Some(limit) = pending.order.limit_price else {
                continue;
            };

            let matches = match pending.order.side {
                Side::Buy => trade.side == Side::Sell && trade.price <= limit,
                Side::Sell => trade.side == Side::Buy && trade.price >= limit,
            };
            if !matches {
                continue;
            }

            let qty_remaining = pending.order.qty - pending.qty_filled;
            let fill_qty = if trade.price == limit {
                let after_queue = (trade.qty - pending.qty_ahead).max(0);
                pending.qty_ahead = (pending.qty_ahead - trade.qty).max(0);
                after_queue.min(qty_remaining)
            } else {
                // Price traded through the limit: the queue ahead is gone.
                pending.qty_ahead = 0;
                qty_remaining
            };

            if fill_qty == 0 {
                continue;
            }
            pending.qty_filled += fill_qty;
            let total_filled = pending.qty_filled;
            let complete = total_filled >= pending.order.qty;
            let order = pending.order.clone();

            let commission = self.config.commission_per_contract * Decimal::from(fill_qty);
            out.push(Event::Fill(Fill {
                ts: trade.ts,
                order_id: id.clone(),
                strategy_id: order.strategy_id.clone(),
                symbol: order.symbol.clone(),
                side: order.side,
                qty_filled: fill_qty,
                fill_price: limit,
                commission,
                linked_stop_price: order.linked_stop_price,
                linked_target_price: order.linked_target_price,
            }));

            if complete {
                self.pending_limit_orders.remove(&id);
                self.push_status(&mut out, &id, OrderStatus::Filled, trade.ts, Some(total_filled));
                self.cancel_linked_stop(&order, trade.ts, &mut out);
            } else {
                self.push_status(
                    &mut out,
                    &id,
                    OrderStatus::PartiallyFilled,
                    trade.ts,
                    Some(total_filled),
                );
            }
        }
        out
    }

    /// Trigger resting stops against an incoming trade. A triggered stop
    /// cancels its linked target and spawns a latency-shifted market order
    /// for the unfilled remainder.
    pub fn check_stop_triggers(&mut self, trade: &TradeTick) -> Vec<Event> {
        let mut out = Vec::new();
        if self.pending_stop_orders.is_empty() {
            return out;
        }

        let ids: Vec<String> = self.pending_stop_orders.keys().cloned().collect();
        for id in ids {
            let Some(order) = self.pending_stop_orders.get(&id) else {
                continue;
            };
            if order.symbol != trade.symbol {
                continue;
            }
            let Some(stop_price) = order.stop_price else {
                continue;
            };
            let triggered = match order.side {
                Side::Sell => trade.price <= stop_price,
                Side::Buy => trade.price >= stop_price,
            };
            if !triggered {
                continue;
            }

            let order = self.pending_stop_orders.remove(&id).expect("id from key scan");
            self.push_status(&mut out, &id, OrderStatus::Triggered, trade.ts, None);
            self.cancel_linked_target(&order, trade.ts, &mut out);

            let child_qty = order.qty - order.filled_qty;
            if child_qty > 0 {
                let child = Order {
                    ts: trade.ts + self.config.latency_signal_order_ns,
                    id: format!("{id}_MKT"),
                    strategy_id: order.strategy_id.clone(),
                    symbol: order.symbol.clone(),
                    qty: child_qty,
                    order_type: OrderType::Market,
                    side: order.side,
                    limit_price: None,
                    stop_price: None,
                    filled_qty: 0,
                    status: OrderStatus::PendingSubmit,
                    linked_stop_price: None,
                    linked_target_price: None,
                    parent_order_id: Some(id.clone()),
                };
                self.submitted_orders.insert(child.id.clone(), child.clone());
                out.push(Event::Order(child));
            }
        }
        out
    }

    /// Called on every fill; spawns the bracket exits when the fill belongs
    /// to a registered entry order.
    pub fn on_fill(&mut self, fill: &Fill) -> Vec<Event> {
        let mut out = Vec::new();
        let Some(exits) = self.linked_exit_orders.get(&fill.order_id) else {
            return out;
        };
        let exits = exits.clone();
        let exit_side = fill.side.flip();
        let exit_qty = fill.qty_filled;
        let child_ts = fill.ts + self.config.latency_signal_order_ns;

        if let Some(stop_price) = fill.linked_stop_price {
            if exits.stop_id.is_none() {
                let stop_id = self.next_order_id("STOP", child_ts);
                let stop = self.make_exit_order(
                    fill,
                    stop_id.clone(),
                    child_ts,
                    exit_side,
                    exit_qty,
                    OrderType::StopMarket,
                    None,
                    Some(stop_price),
                );
                self.submitted_orders.insert(stop_id.clone(), stop.clone());
                self.linked_exit_orders
                    .get_mut(&fill.order_id)
                    .expect("linkage checked above")
                    .stop_id = Some(stop_id);
                out.push(Event::Order(stop));
            }
        }

        if let Some(target_price) = fill.linked_target_price {
            if exits.target_id.is_none() {
                let target_id = self.next_order_id("TARGET", child_ts);
                let target = self.make_exit_order(
                    fill,
                    target_id.clone(),
                    child_ts,
                    exit_side,
                    exit_qty,
                    OrderType::Limit,
                    Some(target_price),
                    None,
                );
                self.submitted_orders.insert(target_id.clone(), target.clone());
                self.linked_exit_orders
                    .get_mut(&fill.order_id)
                    .expect("linkage checked above")
                    .target_id = Some(target_id);
                out.push(Event::Order(target));
            }
        }
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn make_exit_order(
        &self,
        entry_fill: &Fill,
        id: String,
        ts: i64,
        side: Side,
        qty: i64,
        order_type: OrderType,
        limit_price: Option<Price>,
        stop_price: Option<Price>,
    ) -> Order {
        Order {
            ts,
            id,
            strategy_id: entry_fill.strategy_id.clone(),
            symbol: entry_fill.symbol.clone(),
            qty,
            order_type,
            side,
            limit_price,
            stop_price,
            filled_qty: 0,
            status: OrderStatus::PendingSubmit,
            linked_stop_price: None,
            linked_target_price: None,
            parent_order_id: Some(entry_fill.order_id.clone()),
        }
    }

    /// OCO: a filled target cancels the sibling stop and releases the
    /// linkage record.
    fn cancel_linked_stop(&mut self, filled_target: &Order, ts: i64, out: &mut Vec<Event>) {
        let Some(entry_id) = filled_target.parent_order_id.as_deref() else {
            return;
        };
        let Some(exits) = self.linked_exit_orders.get(entry_id) else {
            return;
        };
        if let Some(stop_id) = exits.stop_id.clone() {
            if self.pending_stop_orders.remove(&stop_id).is_some() {
                self.push_status(out, &stop_id, OrderStatus::Cancelled, ts, None);
                self.linked_exit_orders.remove(entry_id);
            }
        }
    }

    /// OCO: a triggered stop cancels the sibling target and releases the
    /// linkage record.
    fn cancel_linked_target(&mut self, triggered_stop: &Order, ts: i64, out: &mut Vec<Event>) {
        let Some(entry_id) = triggered_stop.parent_order_id.as_deref() else {
            return;
        };
        let Some(exits) = self.linked_exit_orders.get(entry_id) else {
            return;
        };
        if let Some(target_id) = exits.target_id.clone() {
            if self.pending_limit_orders.remove(&target_id).is_some() {
                self.push_status(out, &target_id, OrderStatus::Cancelled, ts, None);
                self.linked_exit_orders.remove(entry_id);
            }
        }
    }

    fn reject_order(&mut self, out: &mut Vec<Event>, order: &Order, reason: &str) {
        warn!(order_id = %order.id, reason, "order rejected");
        self.push_status(out, &order.id, OrderStatus::Rejected, order.ts, None);
    }

    /// Emit a status-update event carrying a snapshot of the order, keeping
    /// the registry copy in sync and pruning it on terminal transitions.
    fn push_status(
        &mut self,
        out: &mut Vec<Event>,
        order_id: &str,
        status: OrderStatus,
        ts: i64,
        filled_qty: Option<i64>,
    ) {
        let Some(order) = self.submitted_orders.get_mut(order_id) else {
            warn!(order_id, ?status, "status update for unknown order id");
            return;
        };
        if let Some(filled) = filled_qty {
            order.filled_qty = filled;
        }
        if status == OrderStatus::Filled {
            order.filled_qty = order.qty;
        }
        order.status = status;

        let mut snapshot = order.clone();
        snapshot.ts = ts;
        out.push(Event::Order(snapshot));

        if status.is_terminal() {
            self.submitted_orders.remove(order_id);
        }
    }

    pub fn pending_limit_count(&self) -> usize {
        self.pending_limit_orders.len()
    }

    pub fn pending_stop_count(&self) -> usize {
        self.pending_stop_orders.len()
    }
}
