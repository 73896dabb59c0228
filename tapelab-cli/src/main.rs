//! Tapelab CLI — load a config, run the backtest, print the summary, and
//! write the trade/equity artifacts.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tapelab_runner::{config::BacktestConfig, report, run_backtest};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tapelab", about = "Event-time limit-order-book backtester")]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, default_value = "tapelab.toml")]
    config: PathBuf,

    /// Override the tick database path.
    #[arg(long)]
    db_path: Option<String>,

    /// Override the instrument symbol.
    #[arg(long)]
    symbol: Option<String>,

    /// Stop after this many events.
    #[arg(long)]
    max_events: Option<u64>,

    /// Run a synthetic scenario instead of the tick database
    /// (long_target, long_stop, short_target, short_stop).
    #[arg(long)]
    test_scenario: Option<String>,

    /// Directory for the trade-log and equity CSV artifacts.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = BacktestConfig::from_file(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    if let Some(db_path) = args.db_path {
        config.backtest.db_path = db_path;
    }
    if let Some(symbol) = args.symbol {
        config.backtest.symbol = symbol;
    }
    if let Some(max_events) = args.max_events {
        config.backtest.max_events = Some(max_events);
    }
    if let Some(scenario) = args.test_scenario {
        config.backtest.test_scenario = Some(scenario);
    }

    let result = run_backtest(&config)?;

    print!("{}", report::format_summary(&result.metrics));

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating output dir {}", args.output_dir.display()))?;
    let trades_path = args.output_dir.join("trade_log.csv");
    report::write_trades_csv(&trades_path, &result.trades)?;
    let equity_path = args.output_dir.join("equity_daily.csv");
    report::write_equity_csv(&equity_path, &result.daily_equity)?;
    tracing::info!(
        trades = %trades_path.display(),
        equity = %equity_path.display(),
        "artifacts written"
    );

    Ok(())
}
