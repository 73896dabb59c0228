//! Single backtest execution orchestration.
//!
//! Builds the core components from a [`BacktestConfig`], selects the data
//! source (tick database, or a synthetic scenario when `test_scenario` is
//! set), runs the controller loop, and packages metrics and artifacts.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::info;

use tapelab_core::book::DepthBook;
use tapelab_core::data::{synthetic, EventSource, SideRule, SqliteTickSource, VecSource};
use tapelab_core::domain::{ClosedTrade, Price};
use tapelab_core::engine::BacktestController;
use tapelab_core::execution::{ExecutionConfig, ExecutionEmulator};
use tapelab_core::portfolio::Portfolio;
use tapelab_core::strategy::{
    FootprintDiagonalRatio, FootprintParams, Strategy, ZeroCompareAction,
};

use crate::config::BacktestConfig;
use crate::metrics::{daily_equity, PerformanceMetrics};

/// Everything a reporter needs from a finished run.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub metrics: PerformanceMetrics,
    pub trades: Vec<ClosedTrade>,
    pub daily_equity: Vec<(NaiveDate, Decimal)>,
    pub events_processed: u64,
}

fn decimal_param(value: f64, name: &str) -> Result<Decimal> {
    Decimal::from_f64(value).with_context(|| format!("invalid {name}: {value}"))
}

/// Run a backtest to completion.
///
/// Only data-source open failures and malformed numeric parameters escape
/// as errors; everything recoverable is absorbed (and logged) inside the
/// loop.
pub fn run_backtest(config: &BacktestConfig) -> Result<BacktestReport> {
    let bt = &config.backtest;
    let tick_size =
        Price::from_config(bt.tick_size).with_context(|| format!("invalid tick_size: {}", bt.tick_size))?;
    let tick_value = decimal_param(bt.tick_value, "tick_value")?;
    let capital = decimal_param(bt.capital, "capital")?;
    let commission = decimal_param(bt.commission, "commission")?;

    let zero_compare_action = match config.strategy.zero_compare_action.as_str() {
        "set_0_to_1" => ZeroCompareAction::Set0To1,
        "set_perc_1000" => ZeroCompareAction::SetPerc1000,
        other => bail!("unknown zero_compare_action: {other}"),
    };
    let params = FootprintParams {
        percentage_threshold: decimal_param(
            config.strategy.percentage_threshold,
            "percentage_threshold",
        )?,
        enable_zero_compares: config.strategy.enable_zero_compares,
        zero_compare_action,
        stop_ticks: config.strategy.stop_ticks,
        risk_reward: decimal_param(config.strategy.risk_reward, "risk_reward")?,
        bar_interval_minutes: config.strategy.bar_interval_minutes,
        min_liquidity_check: config.strategy.min_liquidity_check,
    };
    let strategy = FootprintDiagonalRatio::new(bt.symbol.clone(), tick_size, params);

    let mut book = DepthBook::new(bt.symbol.clone(), tick_size);
    let mut source: Box<dyn EventSource> = match &bt.test_scenario {
        Some(name) => {
            let scenario = name
                .parse()
                .with_context(|| format!("invalid test_scenario: {name}"))?;
            info!(scenario = %name, "running synthetic scenario");
            book.seed_synthetic();
            Box::new(VecSource::new(synthetic::scenario_events(
                scenario,
                &bt.symbol,
                strategy.strategy_id(),
                tick_size,
            )))
        }
        None => Box::new(
            SqliteTickSource::open(&bt.db_path, &bt.symbol, SideRule::default())
                .with_context(|| format!("opening tick database {}", bt.db_path))?,
        ),
    };

    let execution = ExecutionEmulator::new(ExecutionConfig {
        commission_per_contract: commission,
        latency_data_signal_ns: bt.latency_data_signal_us * 1_000,
        latency_signal_order_ns: bt.latency_signal_order_us * 1_000,
    });
    let portfolio = Portfolio::new(capital, tick_size, tick_value);

    let mut controller =
        BacktestController::new(book, execution, portfolio, strategy, bt.max_events);
    let events_processed = controller.run(source.as_mut());

    let portfolio = controller.portfolio();
    let trades = portfolio.trade_log().to_vec();
    let daily = daily_equity(portfolio.equity_curve());
    let metrics = PerformanceMetrics::compute(portfolio.equity_curve(), &trades, capital);
    info!(
        events = events_processed,
        trades = trades.len(),
        "backtest complete"
    );

    Ok(BacktestReport {
        metrics,
        trades,
        daily_equity: daily,
        events_processed,
    })
}
