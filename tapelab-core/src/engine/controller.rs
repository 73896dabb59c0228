//! Backtest controller — the merged-stream dispatch loop.
//!
//! One priority queue holds every event in flight. The exogenous market
//! stream is drained into it lazily (its head is pushed whenever it sorts at
//! or before the queue front), and events produced by handlers are pushed as
//! they appear, so endogenous orders generated late in the run are never
//! lost. Dispatch is strictly timestamp-monotonic.

use crate::book::DepthBook;
use crate::data::EventSource;
use crate::domain::{Event, OrderStatus};
use crate::engine::queue::EventQueue;
use crate::execution::ExecutionEmulator;
use crate::portfolio::Portfolio;
use crate::strategy::Strategy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Owns the simulation state and runs the event loop.
pub struct BacktestController<S: Strategy> {
    queue: EventQueue,
    book: DepthBook,
    execution: ExecutionEmulator,
    portfolio: Portfolio,
    strategy: S,
    current_time: i64,
    max_events: Option<u64>,
    stop: Arc<AtomicBool>,
}

impl<S: Strategy> BacktestController<S> {
    pub fn new(
        book: DepthBook,
        execution: ExecutionEmulator,
        portfolio: Portfolio,
        strategy: S,
        max_events: Option<u64>,
    ) -> Self {
        Self {
            queue: EventQueue::new(),
            book,
            execution,
            portfolio,
            strategy,
            current_time: 0,
            max_events,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag that aborts the loop cleanly when set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn book(&self) -> &DepthBook {
        &self.book
    }

    pub fn book_mut(&mut self) -> &mut DepthBook {
        &mut self.book
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Drive the loop to completion (or interruption / event bound) and
    /// record a final equity point at the last seen timestamp.
    ///
    /// Returns the number of events dispatched.
    pub fn run(&mut self, source: &mut dyn EventSource) -> u64 {
        let mut pending_market = source.next_event();
        let mut count: u64 = 0;

        loop {
            if self.stop.load(Ordering::Relaxed) {
                warn!("backtest interrupted");
                break;
            }

            // Continuous merge: pull market events in while they sort at or
            // before everything already queued.
            while let Some(head) = pending_market.take() {
                let due = match self.queue.peek_key() {
                    None => true,
                    Some((front_ts, _, _)) => head.timestamp() <= front_ts,
                };
                if due {
                    self.queue.push(head);
                    pending_market = source.next_event();
                } else {
                    pending_market = Some(head);
                    break;
                }
            }

            let Some(event) = self.queue.pop() else {
                break;
            };
            debug_assert!(
                event.timestamp() >= self.current_time,
                "event time went backwards: {} < {}",
                event.timestamp(),
                self.current_time
            );
            self.current_time = event.timestamp();

            count += 1;
            if let Some(max) = self.max_events {
                if count > max {
                    info!(max, "event bound reached");
                    break;
                }
            }

            self.dispatch(event);
        }

        info!(count, "backtest loop finished");
        self.portfolio.update_equity(self.current_time);
        count
    }

    fn dispatch(&mut self, event: Event) {
        match event {
            Event::Depth(depth) => self.book.apply_depth(&depth),
            Event::Trade(trade) => {
                self.portfolio.update_market_price(&trade);
                let signals = self.strategy.on_trade(&trade, &self.book);
                self.enqueue_all(signals);
                // Limit matching runs before stop triggers so a freshly
                // triggered stop's market child never races this trade.
                let fills = self.execution.check_limit_fills(&trade);
                self.enqueue_all(fills);
                let triggers = self.execution.check_stop_triggers(&trade);
                self.enqueue_all(triggers);
            }
            Event::Signal(signal) => {
                let orders = self.execution.process_signal(&signal);
                self.enqueue_all(orders);
            }
            Event::Order(order) if order.status == OrderStatus::PendingSubmit => {
                let produced = self.execution.execute_order(&order, &mut self.book);
                self.enqueue_all(produced);
            }
            Event::Order(order) => {
                self.portfolio.on_order_status(&order);
                self.strategy.on_order_status(&order);
            }
            Event::Fill(fill) => {
                self.portfolio.update_fill(&fill);
                self.strategy.on_fill(&fill);
                let exits = self.execution.on_fill(&fill);
                self.enqueue_all(exits);
            }
        }
    }

    fn enqueue_all(&mut self, events: Vec<Event>) {
        for event in events {
            self.queue.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::VecSource;
    use crate::domain::{Fill, Order, Price, Side, TradeTick};
    use crate::execution::ExecutionConfig;
    use rust_decimal_macros::dec;

    /// Strategy that records the timestamps it observes.
    struct Recorder {
        id: String,
        seen: Vec<i64>,
    }

    impl Strategy for Recorder {
        fn strategy_id(&self) -> &str {
            &self.id
        }

        fn on_trade(&mut self, trade: &TradeTick, _book: &DepthBook) -> Vec<Event> {
            self.seen.push(trade.ts);
            Vec::new()
        }

        fn on_fill(&mut self, _fill: &Fill) {}
        fn on_order_status(&mut self, _order: &Order) {}
    }

    fn px(s: &str) -> Price {
        s.parse().unwrap()
    }

    fn controller(max_events: Option<u64>) -> BacktestController<Recorder> {
        BacktestController::new(
            DepthBook::new("ES", px("0.25")),
            ExecutionEmulator::new(ExecutionConfig {
                commission_per_contract: dec!(2.50),
                latency_data_signal_ns: 100_000,
                latency_signal_order_ns: 500_000,
            }),
            Portfolio::new(dec!(100000), px("0.25"), dec!(12.50)),
            Recorder {
                id: "rec".into(),
                seen: Vec::new(),
            },
            max_events,
        )
    }

    fn trade(ts: i64) -> Event {
        Event::Trade(TradeTick {
            ts,
            symbol: "ES".into(),
            price: px("5950.25"),
            qty: 1,
            side: Side::Buy,
        })
    }

    #[test]
    fn dispatches_stream_in_order() {
        let mut c = controller(None);
        let mut source = VecSource::new(vec![trade(10), trade(20), trade(30)]);
        let count = c.run(&mut source);
        assert_eq!(count, 3);
        assert_eq!(c.strategy().seen, vec![10, 20, 30]);
    }

    #[test]
    fn max_events_bounds_the_loop() {
        let mut c = controller(Some(2));
        let mut source = VecSource::new(vec![trade(10), trade(20), trade(30)]);
        let count = c.run(&mut source);
        assert_eq!(count, 3); // the third pop trips the bound before dispatch
        assert_eq!(c.strategy().seen, vec![10, 20]);
    }

    #[test]
    fn stop_flag_interrupts_cleanly() {
        let mut c = controller(None);
        c.stop_handle().store(true, Ordering::Relaxed);
        let mut source = VecSource::new(vec![trade(10)]);
        let count = c.run(&mut source);
        assert_eq!(count, 0);
        // Final equity point still recorded.
        assert!(!c.portfolio().equity_curve().is_empty());
    }

    #[test]
    fn final_equity_point_uses_last_seen_timestamp() {
        let mut c = controller(None);
        let mut source = VecSource::new(vec![trade(10), trade(99)]);
        c.run(&mut source);
        let (ts, _) = *c.portfolio().equity_curve().last().unwrap();
        assert_eq!(ts, 99);
    }
}
