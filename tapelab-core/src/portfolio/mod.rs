//! Portfolio accounting — cash, directional positions, realized P&L, the
//! equity curve, and the closed-trade log.
//!
//! Positions use cost-basis tracking per symbol: closing against the entry
//! price realizes tick-valued P&L, and a fill larger than the open position
//! flips it, opening the overflow at the fill price. Cash always satisfies
//! `cash = initial_capital − Σ price·qty·dir − Σ commission`.

use crate::domain::{ClosedTrade, Fill, Order, Price, TradeDirection, TradeTick};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// Entry details for one open position.
#[derive(Debug, Clone)]
pub struct OpenPosition {
    pub entry_ts: i64,
    pub entry_price: Price,
    pub qty: i64,
    pub direction: TradeDirection,
    pub commission: Decimal,
}

/// Single-account portfolio state.
pub struct Portfolio {
    initial_capital: Decimal,
    cash: Decimal,
    tick_value: Decimal,
    tick_size: Price,
    holdings: BTreeMap<String, i64>,
    positions_avg_price: BTreeMap<String, Price>,
    open_positions: BTreeMap<String, OpenPosition>,
    last_market_price: BTreeMap<String, Price>,
    realized_pnl: Decimal,
    equity_curve: Vec<(i64, Decimal)>,
    trade_log: Vec<ClosedTrade>,
}

impl Portfolio {
    pub fn new(initial_capital: Decimal, tick_size: Price, tick_value: Decimal) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            tick_value,
            tick_size,
            holdings: BTreeMap::new(),
            positions_avg_price: BTreeMap::new(),
            open_positions: BTreeMap::new(),
            last_market_price: BTreeMap::new(),
            realized_pnl: Decimal::ZERO,
            equity_curve: vec![(0, initial_capital)],
            trade_log: Vec::new(),
        }
    }

    /// Track the last traded price per symbol for mark-to-market.
    pub fn update_market_price(&mut self, trade: &TradeTick) {
        self.last_market_price
            .insert(trade.symbol.clone(), trade.price);
    }

    /// Apply a fill: cash, position, realized P&L, trade log, equity.
    pub fn update_fill(&mut self, fill: &Fill) {
        let symbol = &fill.symbol;
        let qty = fill.qty_filled;
        let price = fill.fill_price;
        let direction = fill.side.sign();
        let pos_change = qty * direction;

        self.cash -= price.notional(qty * direction) + fill.commission;

        let current_pos = self.holdings.get(symbol).copied().unwrap_or(0);
        let new_pos = current_pos + pos_change;

        if current_pos != 0 && new_pos * current_pos <= 0 {
            // Closing, or flipping through flat.
            let qty_closed = current_pos.abs().min(qty);
            if let Some(entry) = self.open_positions.get(symbol).cloned() {
                let pnl_dir = match entry.direction {
                    TradeDirection::Long => 1,
                    TradeDirection::Short => -1,
                };
                let point_pnl = (price.value() - entry.entry_price.value())
                    * Decimal::from(pnl_dir * qty_closed);
                let pnl = point_pnl / self.tick_size.value() * self.tick_value;
                self.realized_pnl += pnl;
                self.trade_log.push(ClosedTrade {
                    symbol: symbol.clone(),
                    entry_ts: entry.entry_ts,
                    exit_ts: fill.ts,
                    direction: entry.direction,
                    entry_price: entry.entry_price,
                    exit_price: price,
                    qty: qty_closed,
                    pnl,
                    commission: entry.commission + fill.commission,
                });

                if new_pos == 0 {
                    self.open_positions.remove(symbol);
                    self.positions_avg_price.remove(symbol);
                } else {
                    // Flipped: the overflow opens a fresh position at the
                    // fill price.
                    self.positions_avg_price.insert(symbol.clone(), price);
                    self.open_positions.insert(
                        symbol.clone(),
                        OpenPosition {
                            entry_ts: fill.ts,
                            entry_price: price,
                            qty: new_pos,
                            direction: direction_of(new_pos),
                            commission: fill.commission,
                        },
                    );
                }
            }
        } else if new_pos != 0 {
            if current_pos == 0 {
                // Opening from flat.
                self.positions_avg_price.insert(symbol.clone(), price);
                self.open_positions.insert(
                    symbol.clone(),
                    OpenPosition {
                        entry_ts: fill.ts,
                        entry_price: price,
                        qty: new_pos,
                        direction: direction_of(new_pos),
                        commission: fill.commission,
                    },
                );
            } else {
                // Adding to an existing position: blend the average price.
                let old_avg = self
                    .positions_avg_price
                    .get(symbol)
                    .copied()
                    .unwrap_or(price);
                let blended = (old_avg.notional(current_pos) + price.notional(pos_change))
                    / Decimal::from(new_pos);
                self.positions_avg_price
                    .insert(symbol.clone(), Price::new(blended));
                if let Some(open) = self.open_positions.get_mut(symbol) {
                    open.qty = new_pos;
                    open.commission += fill.commission;
                }
            }
        }

        if new_pos == 0 {
            self.holdings.remove(symbol);
        } else {
            self.holdings.insert(symbol.clone(), new_pos);
        }
        self.update_equity(fill.ts);
    }

    /// Record current equity (cash + unrealized P&L) on the curve. Appends
    /// for a fresh timestamp; rewrites the tail when equity moved within the
    /// same instant.
    pub fn update_equity(&mut self, ts: i64) {
        let mut unrealized = Decimal::ZERO;
        for (symbol, &qty) in &self.holdings {
            if qty == 0 {
                continue;
            }
            let (Some(last), Some(avg)) = (
                self.last_market_price.get(symbol),
                self.positions_avg_price.get(symbol),
            ) else {
                continue;
            };
            let per_contract =
                (last.value() - avg.value()) / self.tick_size.value() * self.tick_value;
            unrealized += per_contract * Decimal::from(qty);
        }

        let equity = self.cash + unrealized;
        match self.equity_curve.last() {
            Some(&(last_ts, last_eq)) if last_ts >= ts => {
                if equity != last_eq {
                    *self.equity_curve.last_mut().expect("non-empty curve") = (ts, equity);
                }
            }
            _ => self.equity_curve.push((ts, equity)),
        }
    }

    /// Non-fill status updates are only observed, never acted on.
    pub fn on_order_status(&mut self, order: &Order) {
        debug!(order_id = %order.id, status = ?order.status, "order status noted");
    }

    pub fn initial_capital(&self) -> Decimal {
        self.initial_capital
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    pub fn holdings(&self, symbol: &str) -> i64 {
        self.holdings.get(symbol).copied().unwrap_or(0)
    }

    pub fn open_position(&self, symbol: &str) -> Option<&OpenPosition> {
        self.open_positions.get(symbol)
    }

    pub fn avg_price(&self, symbol: &str) -> Option<Price> {
        self.positions_avg_price.get(symbol).copied()
    }

    pub fn equity_curve(&self) -> &[(i64, Decimal)] {
        &self.equity_curve
    }

    pub fn trade_log(&self) -> &[ClosedTrade] {
        &self.trade_log
    }
}

fn direction_of(position: i64) -> TradeDirection {
    if position > 0 {
        TradeDirection::Long
    } else {
        TradeDirection::Short
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use rust_decimal_macros::dec;

    fn px(s: &str) -> Price {
        s.parse().unwrap()
    }

    fn portfolio() -> Portfolio {
        Portfolio::new(dec!(100000), px("0.25"), dec!(12.50))
    }

    fn fill(ts: i64, side: Side, qty: i64, price: &str) -> Fill {
        Fill {
            ts,
            order_id: "O1".into(),
            strategy_id: "strat".into(),
            symbol: "ES".into(),
            side,
            qty_filled: qty,
            fill_price: px(price),
            commission: dec!(2.50),
            linked_stop_price: None,
            linked_target_price: None,
        }
    }

    fn mark(p: &mut Portfolio, ts: i64, price: &str) {
        p.update_market_price(&TradeTick {
            ts,
            symbol: "ES".into(),
            price: px(price),
            qty: 1,
            side: Side::Buy,
        });
    }

    #[test]
    fn buy_fill_debits_cash_and_opens_long() {
        let mut p = portfolio();
        p.update_fill(&fill(10, Side::Buy, 2, "5950.25"));

        assert_eq!(p.cash(), dec!(100000) - dec!(5950.25) * dec!(2) - dec!(2.50));
        assert_eq!(p.holdings("ES"), 2);
        let open = p.open_position("ES").unwrap();
        assert_eq!(open.direction, TradeDirection::Long);
        assert_eq!(open.entry_price, px("5950.25"));
    }

    #[test]
    fn round_trip_realizes_tick_valued_pnl() {
        let mut p = portfolio();
        p.update_fill(&fill(10, Side::Buy, 1, "5950.25"));
        p.update_fill(&fill(20, Side::Sell, 1, "5956.625"));

        // 6.375 points = 25.5 ticks at $12.50.
        assert_eq!(p.realized_pnl(), dec!(318.75));
        assert_eq!(p.holdings("ES"), 0);
        assert!(p.open_position("ES").is_none());
        assert!(p.avg_price("ES").is_none());

        let trades = p.trade_log();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].direction, TradeDirection::Long);
        assert_eq!(trades[0].qty, 1);
        assert_eq!(trades[0].pnl, dec!(318.75));
        assert_eq!(trades[0].commission, dec!(5.00));
    }

    #[test]
    fn short_round_trip() {
        let mut p = portfolio();
        p.update_fill(&fill(10, Side::Sell, 1, "5950.00"));
        assert_eq!(p.holdings("ES"), -1);
        assert_eq!(
            p.open_position("ES").unwrap().direction,
            TradeDirection::Short
        );

        p.update_fill(&fill(20, Side::Buy, 1, "5943.875"));
        // 6.125 points = 24.5 ticks at $12.50.
        assert_eq!(p.realized_pnl(), dec!(306.25));
        assert_eq!(p.holdings("ES"), 0);
    }

    #[test]
    fn cash_equation_holds_over_many_fills() {
        let mut p = portfolio();
        let fills = [
            fill(10, Side::Buy, 2, "5950.25"),
            fill(20, Side::Sell, 1, "5951.00"),
            fill(30, Side::Sell, 3, "5949.50"),
            fill(40, Side::Buy, 2, "5948.00"),
        ];
        let mut expected = dec!(100000);
        for f in &fills {
            expected -= f.fill_price.notional(f.qty_filled * f.side.sign()) + f.commission;
            p.update_fill(f);
        }
        assert_eq!(p.cash(), expected);
    }

    #[test]
    fn flip_closes_old_and_opens_overflow_at_fill_price() {
        let mut p = portfolio();
        p.update_fill(&fill(10, Side::Buy, 1, "5950.00"));
        // Sell 3: closes the 1-lot long, opens a 2-lot short at 5952.00.
        p.update_fill(&fill(20, Side::Sell, 3, "5952.00"));

        assert_eq!(p.holdings("ES"), -2);
        let open = p.open_position("ES").unwrap();
        assert_eq!(open.direction, TradeDirection::Short);
        assert_eq!(open.entry_price, px("5952.00"));
        assert_eq!(open.qty, -2);

        // One closed-trade record for the closed portion only.
        let trades = p.trade_log();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].qty, 1);
        // 2 points = 8 ticks = $100.
        assert_eq!(trades[0].pnl, dec!(100.00));
    }

    #[test]
    fn adding_blends_average_price() {
        let mut p = portfolio();
        p.update_fill(&fill(10, Side::Buy, 1, "5950.00"));
        p.update_fill(&fill(20, Side::Buy, 1, "5951.00"));

        assert_eq!(p.holdings("ES"), 2);
        assert_eq!(p.avg_price("ES").unwrap(), px("5950.50"));
        assert_eq!(p.open_position("ES").unwrap().commission, dec!(5.00));
    }

    #[test]
    fn equity_includes_unrealized_pnl() {
        let mut p = portfolio();
        p.update_fill(&fill(10, Side::Buy, 1, "5950.00"));
        mark(&mut p, 15, "5952.00");
        p.update_equity(20);

        // Cash is down by notional + commission; unrealized is +8 ticks.
        let (ts, equity) = *p.equity_curve().last().unwrap();
        assert_eq!(ts, 20);
        let expected_cash = dec!(100000) - dec!(5950.00) - dec!(2.50);
        assert_eq!(equity, expected_cash + dec!(100.00));
    }

    #[test]
    fn equity_curve_appends_then_rewrites_same_instant() {
        let mut p = portfolio();
        p.update_equity(10);
        let len_after_first = p.equity_curve().len();
        // Same timestamp, same equity: no new point, no rewrite.
        p.update_equity(10);
        assert_eq!(p.equity_curve().len(), len_after_first);

        // Same timestamp but equity moved: tail rewritten in place.
        p.update_fill(&fill(10, Side::Buy, 1, "5950.00"));
        assert_eq!(p.equity_curve().len(), len_after_first);
    }

    #[test]
    fn flat_symbol_has_no_position_records() {
        let mut p = portfolio();
        p.update_fill(&fill(10, Side::Buy, 2, "5950.00"));
        p.update_fill(&fill(20, Side::Sell, 2, "5950.00"));
        assert_eq!(p.holdings("ES"), 0);
        assert!(p.open_position("ES").is_none());
        assert!(p.avg_price("ES").is_none());
    }
}
