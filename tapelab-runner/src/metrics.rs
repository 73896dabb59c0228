//! Performance metrics — pure functions over the equity curve and trade log.
//!
//! The equity curve is resampled to daily closes before any statistic is
//! computed. P&L aggregates stay in `Decimal`; ratio statistics (win rate,
//! profit factor, Sharpe) are reported as `f64`.

use chrono::{DateTime, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tapelab_core::domain::ClosedTrade;

/// Aggregate statistics for one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub initial_capital: Decimal,
    pub final_equity: Decimal,
    pub total_net_pnl: Decimal,
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub max_drawdown: Decimal,
    pub sharpe: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from a nanosecond equity curve and trade list.
    pub fn compute(
        equity_curve: &[(i64, Decimal)],
        trades: &[ClosedTrade],
        initial_capital: Decimal,
    ) -> Self {
        let daily = daily_equity(equity_curve);
        let final_equity = daily
            .last()
            .map_or(initial_capital, |&(_, equity)| equity);
        Self {
            initial_capital,
            final_equity,
            total_net_pnl: total_net_pnl(trades),
            total_trades: trades.len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            max_drawdown: max_drawdown(&daily),
            sharpe: sharpe_ratio(&daily),
        }
    }
}

/// Resample a nanosecond equity curve to one point per calendar day (last
/// observation of the day).
pub fn daily_equity(equity_curve: &[(i64, Decimal)]) -> Vec<(NaiveDate, Decimal)> {
    let mut daily: Vec<(NaiveDate, Decimal)> = Vec::new();
    for &(ts, equity) in equity_curve {
        let date = DateTime::from_timestamp_nanos(ts).date_naive();
        match daily.last_mut() {
            Some((last_date, last_eq)) if *last_date == date => *last_eq = equity,
            _ => daily.push((date, equity)),
        }
    }
    daily
}

/// Sum of per-trade P&L net of commission.
pub fn total_net_pnl(trades: &[ClosedTrade]) -> Decimal {
    trades.iter().map(ClosedTrade::net_pnl).sum()
}

/// Fraction of trades with positive net P&L. 0.0 when there are no trades.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades
        .iter()
        .filter(|t| t.net_pnl() > Decimal::ZERO)
        .count();
    wins as f64 / trades.len() as f64
}

/// Gross profit over gross loss (net of commission). Infinite when there
/// are profits but no losses; 0.0 with no trades either way.
pub fn profit_factor(trades: &[ClosedTrade]) -> f64 {
    let mut gross_profit = Decimal::ZERO;
    let mut gross_loss = Decimal::ZERO;
    for trade in trades {
        let pnl = trade.net_pnl();
        if pnl > Decimal::ZERO {
            gross_profit += pnl;
        } else {
            gross_loss -= pnl;
        }
    }
    let profit = gross_profit.to_f64().unwrap_or(0.0);
    let loss = gross_loss.to_f64().unwrap_or(0.0);
    if loss == 0.0 {
        if profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        profit / loss
    }
}

/// Largest peak-to-trough equity decline, in account currency (≥ 0).
pub fn max_drawdown(daily: &[(NaiveDate, Decimal)]) -> Decimal {
    let mut peak: Option<Decimal> = None;
    let mut max_dd = Decimal::ZERO;
    for &(_, equity) in daily {
        let high = match peak {
            Some(p) if p >= equity => p,
            _ => {
                peak = Some(equity);
                equity
            }
        };
        let dd = high - equity;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

/// Annualized Sharpe ratio from daily returns, √252 scaling.
///
/// Returns 0.0 with fewer than two usable return observations or zero
/// variance.
pub fn sharpe_ratio(daily: &[(NaiveDate, Decimal)]) -> f64 {
    let values: Vec<f64> = daily
        .iter()
        .filter_map(|&(_, equity)| equity.to_f64())
        .collect();
    let returns: Vec<f64> = values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    let std = variance.sqrt();
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * (252.0_f64).sqrt()
}
