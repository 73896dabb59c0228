//! SQLite tick-database source.
//!
//! Reads the `<SYMBOL>_tas` (time and sales) and `<SYMBOL>_depth` tables of
//! a tick database, decodes rows into events, and merges the two streams by
//! ascending timestamp. Rows that fail to decode are skipped with a warning
//! so one bad row never stalls a replay.

use super::merge::MergedStream;
use super::{EventSource, VecSource};
use crate::domain::{DepthCommand, DepthUpdate, Event, Price, Side, TradeTick};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// How a depth row's flags field maps to a book side.
///
/// The least-significant-bit rule is what the reference data vendor uses
/// (odd flags = bid-side row, tagged `Sell` in this dialect); other vendors
/// can add their own variants here without touching the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideRule {
    #[default]
    FlagsLsb,
}

impl SideRule {
    pub fn side_from_flags(self, flags: i64) -> Side {
        match self {
            SideRule::FlagsLsb => {
                if flags % 2 == 1 {
                    Side::Sell
                } else {
                    Side::Buy
                }
            }
        }
    }
}

/// Errors opening or querying the tick database. Decoding problems never
/// surface here — they are absorbed row by row.
#[derive(Debug, Error)]
pub enum TickStoreError {
    #[error("failed to open tick database: {0}")]
    Open(#[source] rusqlite::Error),

    #[error("query against {table} failed: {source}")]
    Query {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
}

/// Event source backed by a persisted tick database.
pub struct SqliteTickSource {
    inner: MergedStream<VecSource, VecSource>,
}

impl SqliteTickSource {
    /// Open the database read-only and load both row streams for `symbol`.
    pub fn open(
        path: impl AsRef<Path>,
        symbol: &str,
        side_rule: SideRule,
    ) -> Result<Self, TickStoreError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(TickStoreError::Open)?;

        let table_symbol = symbol.replace('-', "_");
        let tas_table = format!("{table_symbol}_tas");
        let depth_table = format!("{table_symbol}_depth");

        let trades = load_trades(&conn, &tas_table, symbol)?;
        let depth = load_depth(&conn, &depth_table, symbol, side_rule)?;
        info!(
            symbol,
            trades = trades.len(),
            depth = depth.len(),
            "tick database loaded"
        );

        Ok(Self {
            inner: MergedStream::new(VecSource::new(trades), VecSource::new(depth)),
        })
    }
}

impl EventSource for SqliteTickSource {
    fn next_event(&mut self) -> Option<Event> {
        self.inner.next_event()
    }
}

type RawTradeRow = (i64, String, i64, i64);
type RawDepthRow = (i64, i64, i64, u32, String, i64);

fn load_trades(
    conn: &Connection,
    table: &str,
    symbol: &str,
) -> Result<Vec<Event>, TickStoreError> {
    let sql = format!("SELECT timestamp, price, qty, side FROM {table} ORDER BY timestamp ASC");
    let mut stmt = conn.prepare(&sql).map_err(|source| TickStoreError::Query {
        table: table.to_string(),
        source,
    })?;
    let rows = stmt
        .query_map([], |row| {
            Ok::<RawTradeRow, rusqlite::Error>((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .map_err(|source| TickStoreError::Query {
            table: table.to_string(),
            source,
        })?;

    let mut events = Vec::new();
    for row in rows {
        let raw = match row {
            Ok(raw) => raw,
            Err(e) => {
                warn!(table, error = %e, "skipping unreadable trade row");
                continue;
            }
        };
        match decode_trade(&raw, symbol) {
            Some(event) => events.push(event),
            None => warn!(table, ?raw, "skipping undecodable trade row"),
        }
    }
    Ok(events)
}

fn decode_trade(row: &RawTradeRow, symbol: &str) -> Option<Event> {
    let (ts, price, qty, side) = row;
    let side = match *side {
        0 => Side::Buy,
        1 => Side::Sell,
        _ => return None,
    };
    Some(Event::Trade(TradeTick {
        ts: *ts,
        symbol: symbol.to_string(),
        price: price.parse::<Price>().ok()?,
        qty: *qty,
        side,
    }))
}

fn load_depth(
    conn: &Connection,
    table: &str,
    symbol: &str,
    side_rule: SideRule,
) -> Result<Vec<Event>, TickStoreError> {
    let sql = format!(
        "SELECT timestamp, command, flags, num_orders, price, qty FROM {table} ORDER BY timestamp ASC"
    );
    let mut stmt = conn.prepare(&sql).map_err(|source| TickStoreError::Query {
        table: table.to_string(),
        source,
    })?;
    let rows = stmt
        .query_map([], |row| {
            Ok::<RawDepthRow, rusqlite::Error>((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })
        .map_err(|source| TickStoreError::Query {
            table: table.to_string(),
            source,
        })?;

    let mut events = Vec::new();
    for row in rows {
        let raw = match row {
            Ok(raw) => raw,
            Err(e) => {
                warn!(table, error = %e, "skipping unreadable depth row");
                continue;
            }
        };
        match decode_depth(&raw, symbol, side_rule) {
            Some(event) => events.push(event),
            None => warn!(table, ?raw, "skipping undecodable depth row"),
        }
    }
    Ok(events)
}

fn decode_depth(row: &RawDepthRow, symbol: &str, side_rule: SideRule) -> Option<Event> {
    let (ts, command, flags, num_orders, price, qty) = row;
    let command = match *command {
        1 => DepthCommand::Insert,
        2 => DepthCommand::Update,
        3 => DepthCommand::Delete,
        other => {
            // Codes 4-7 show up in the wild with unverified semantics.
            warn!(code = other, "unknown depth command, treating as UPDATE");
            DepthCommand::Update
        }
    };
    Some(Event::Depth(DepthUpdate {
        ts: *ts,
        symbol: symbol.to_string(),
        side: side_rule.side_from_flags(*flags),
        price: price.parse::<Price>().ok()?,
        qty: *qty,
        num_orders: *num_orders,
        command,
        flags: *flags,
    }))
}
