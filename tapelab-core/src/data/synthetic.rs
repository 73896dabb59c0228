//! Synthetic test scenarios.
//!
//! Each scenario seeds one trade to establish price context, injects a
//! bracketed entry signal, and schedules an exit trade after the bracket
//! children have had time to arrive (the entry order lands at
//! `signal.ts + latency_data_signal + latency_signal_order`, and the exits
//! another `latency_signal_order` after the entry fill). Target scenarios
//! price the exit trade one tick through the target so the queue-ahead
//! model treats the level as swept; the fill still executes at the target
//! price itself.

use crate::domain::{Event, OrderType, Price, Side, Signal, TradeTick};
use rust_decimal_macros::dec;
use std::str::FromStr;
use thiserror::Error;

/// The four end-to-end bracket scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestScenario {
    LongTarget,
    LongStop,
    ShortTarget,
    ShortStop,
}

#[derive(Debug, Error)]
#[error("unknown test scenario: {0}")]
pub struct ParseScenarioError(String);

impl FromStr for TestScenario {
    type Err = ParseScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "long_target" => Ok(TestScenario::LongTarget),
            "long_stop" => Ok(TestScenario::LongStop),
            "short_target" => Ok(TestScenario::ShortTarget),
            "short_stop" => Ok(TestScenario::ShortStop),
            other => Err(ParseScenarioError(other.to_string())),
        }
    }
}

impl TestScenario {
    fn is_short(self) -> bool {
        matches!(self, TestScenario::ShortTarget | TestScenario::ShortStop)
    }

    fn is_target(self) -> bool {
        matches!(self, TestScenario::LongTarget | TestScenario::ShortTarget)
    }
}

/// Build the event sequence for a scenario. Pair with a synthetically
/// seeded book (see `DepthBook::seed_synthetic`).
pub fn scenario_events(
    scenario: TestScenario,
    symbol: &str,
    strategy_id: &str,
    tick_size: Price,
) -> Vec<Event> {
    let (side, trigger, stop, target) = if scenario.is_short() {
        (
            Side::Sell,
            Price::new(dec!(5950.75)),
            Price::new(dec!(5953.50)),
            Price::new(dec!(5943.875)),
        )
    } else {
        (
            Side::Buy,
            Price::new(dec!(5950.25)),
            Price::new(dec!(5947.50)),
            Price::new(dec!(5956.625)),
        )
    };

    // Exit trade: at the stop for stop scenarios; one tick through the
    // target for target scenarios. A resting exit limit only matches
    // opposite-side aggression, so target exits continue in the entry's
    // direction while stop exits trade against it.
    let exit_through = if side == Side::Buy { 1 } else { -1 };
    let (exit_price, aggressor) = if scenario.is_target() {
        (target.offset_ticks(exit_through, tick_size), side)
    } else {
        (stop, side.flip())
    };

    vec![
        Event::Trade(TradeTick {
            ts: 1_000,
            symbol: symbol.to_string(),
            price: Price::new(dec!(5950.50)),
            qty: 1,
            side: Side::Buy,
        }),
        Event::Signal(Signal {
            ts: 2_000,
            strategy_id: strategy_id.to_string(),
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            qty: 1,
            trigger_price: Some(trigger),
            stop_price: Some(stop),
            target_price: Some(target),
        }),
        // Entry arrives at 602_000, its fill spawns exits at 1_102_000;
        // the exit trade lands well after both.
        Event::Trade(TradeTick {
            ts: 2_000_000,
            symbol: symbol.to_string(),
            price: exit_price,
            qty: 10,
            side: aggressor,
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick() -> Price {
        Price::new(dec!(0.25))
    }

    #[test]
    fn scenario_names_parse() {
        assert_eq!(
            "long_target".parse::<TestScenario>().unwrap(),
            TestScenario::LongTarget
        );
        assert_eq!(
            "short_stop".parse::<TestScenario>().unwrap(),
            TestScenario::ShortStop
        );
        assert!("sideways".parse::<TestScenario>().is_err());
    }

    #[test]
    fn long_target_sequence_shape() {
        let events = scenario_events(TestScenario::LongTarget, "ES", "strat", tick());
        assert_eq!(events.len(), 3);
        let ts: Vec<i64> = events.iter().map(|e| e.timestamp()).collect();
        assert!(ts.windows(2).all(|w| w[0] < w[1]));

        let Event::Signal(sig) = &events[1] else {
            panic!("expected signal");
        };
        assert_eq!(sig.side, Side::Buy);
        assert_eq!(sig.stop_price, Some(Price::new(dec!(5947.50))));
        assert_eq!(sig.target_price, Some(Price::new(dec!(5956.625))));

        let Event::Trade(exit) = &events[2] else {
            panic!("expected exit trade");
        };
        // One tick through the 5956.625 target, buy-side aggression.
        assert_eq!(exit.price, Price::new(dec!(5956.875)));
        assert_eq!(exit.side, Side::Buy);
    }

    #[test]
    fn short_stop_exit_sits_at_stop() {
        let events = scenario_events(TestScenario::ShortStop, "ES", "strat", tick());
        let Event::Trade(exit) = &events[2] else {
            panic!("expected exit trade");
        };
        assert_eq!(exit.price, Price::new(dec!(5953.50)));
        assert_eq!(exit.side, Side::Buy);
    }
}
