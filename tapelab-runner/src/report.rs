//! Report and artifact export — trade tape CSV, daily equity CSV, and the
//! text summary block.

use crate::metrics::PerformanceMetrics;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tapelab_core::domain::{ClosedTrade, TradeDirection};

fn iso(ts: i64) -> String {
    DateTime::from_timestamp_nanos(ts)
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}

pub fn write_trades_csv(path: &Path, trades: &[ClosedTrade]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create trades CSV {}", path.display()))?;

    writeln!(
        file,
        "symbol,entry_time,exit_time,direction,entry_price,exit_price,quantity,pnl,commission"
    )?;

    for trade in trades {
        let direction = match trade.direction {
            TradeDirection::Long => "LONG",
            TradeDirection::Short => "SHORT",
        };
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{}",
            trade.symbol,
            iso(trade.entry_ts),
            iso(trade.exit_ts),
            direction,
            trade.entry_price,
            trade.exit_price,
            trade.qty,
            trade.pnl,
            trade.commission
        )?;
    }

    Ok(())
}

pub fn write_equity_csv(path: &Path, daily: &[(NaiveDate, Decimal)]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create equity CSV {}", path.display()))?;
    writeln!(file, "date,equity")?;
    for (date, equity) in daily {
        writeln!(file, "{date},{equity}")?;
    }
    Ok(())
}

/// Render the terminal summary block.
pub fn format_summary(metrics: &PerformanceMetrics) -> String {
    let mut out = String::new();
    let rule = "-".repeat(30);
    writeln!(out, "--- Backtest Results ---").ok();
    writeln!(out, "Initial Capital: {:.2}", metrics.initial_capital).ok();
    writeln!(out, "Final Equity:    {:.2}", metrics.final_equity).ok();
    writeln!(out, "Total Net P&L:   {:.2}", metrics.total_net_pnl).ok();
    writeln!(out, "{rule}").ok();
    writeln!(out, "Total Closed Trades: {}", metrics.total_trades).ok();
    writeln!(out, "Win Rate:            {:.2}%", metrics.win_rate * 100.0).ok();
    if metrics.profit_factor.is_finite() {
        writeln!(out, "Profit Factor:       {:.2}", metrics.profit_factor).ok();
    } else {
        writeln!(out, "Profit Factor:       inf").ok();
    }
    writeln!(out, "Max Drawdown:        {:.2}", metrics.max_drawdown).ok();
    writeln!(out, "Sharpe Ratio (Ann.): {:.2}", metrics.sharpe).ok();
    writeln!(out, "{rule}").ok();
    out
}
