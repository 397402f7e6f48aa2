//! SQLite-backed ledger store.
//!
//! The `bpd` table is written by the settlement import pipeline; this service
//! only reads it. Days are stored in the pipeline's `%d/%b/%y` text form and
//! measures arrive as loosely-typed text, so both are coerced here: rows with
//! unparseable days are dropped from the working set, non-numeric measures
//! become absent. The date-window predicate is applied after parsing — the
//! stored day text does not sort chronologically, so a SQL BETWEEN would lie.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, OpenFlags, Row};
use tracing::{debug, info, warn};

use crate::models::{parse_day, parse_numeric, LedgerRecord};
use crate::report::scope::Scope;
use crate::report::window::DateWindow;

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -64000;
PRAGMA temp_store = MEMORY;

CREATE TABLE IF NOT EXISTS bpd (
    linha_id INTEGER PRIMARY KEY,
    dia TEXT NOT NULL,
    reference TEXT NOT NULL DEFAULT '',
    club TEXT NOT NULL DEFAULT '',
    playerID TEXT NOT NULL DEFAULT '',
    playerName TEXT NOT NULL DEFAULT '',
    agentName TEXT NOT NULL DEFAULT '',
    agentId TEXT NOT NULL DEFAULT '',
    superAgentName TEXT NOT NULL DEFAULT '',
    superagentId TEXT NOT NULL DEFAULT '',
    localWins TEXT,
    localFee TEXT,
    hands TEXT,
    dolarWins TEXT,
    dolarFee TEXT,
    dolarRakeback TEXT,
    dolarRebate TEXT,
    realWins TEXT,
    realFee TEXT,
    realRakeback TEXT,
    realRebate TEXT,
    realAgentSett TEXT,
    dolarAgentSett TEXT,
    realRevShare TEXT,
    realBPFProfit TEXT,
    deal TEXT,
    rebate TEXT
);

CREATE INDEX IF NOT EXISTS idx_bpd_player ON bpd(playerName);
CREATE INDEX IF NOT EXISTS idx_bpd_dia ON bpd(dia);
"#;

const SELECT_COLUMNS: &str = "linha_id, dia, reference, club, playerID, playerName, \
     agentName, agentId, superAgentName, superagentId, localWins, localFee, hands, \
     dolarWins, dolarFee, dolarRakeback, dolarRebate, realWins, realFee, realRakeback, \
     realRebate, realAgentSett, dolarAgentSett, realRevShare, realBPFProfit, deal, rebate";

/// Read adapter over the `bpd` ledger table.
pub struct LedgerStore {
    conn: Arc<Mutex<Connection>>,
}

impl LedgerStore {
    pub fn new(db_path: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(db_path, flags)
            .with_context(|| format!("Failed to open ledger database at {}", db_path))?;

        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize ledger schema")?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM bpd", [], |row| row.get(0))
            .unwrap_or(0);

        info!("📊 Ledger database initialized at: {}", db_path);
        info!("📈 Settlement rows in ledger: {}", count);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Fetch the records a scope may see within an optional date window.
    /// The player predicate is baked into the query; the window is applied
    /// after day parsing. Rows whose day does not parse never enter the
    /// working set.
    pub fn try_fetch(
        &self,
        scope: &Scope,
        window: Option<DateWindow>,
    ) -> Result<Vec<LedgerRecord>> {
        let conn = self.conn.lock();

        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM bpd");
        let mut bind: Vec<String> = Vec::new();
        if let Some(player) = scope.player_predicate() {
            sql.push_str(" WHERE playerName = ?1");
            bind.push(player.to_string());
        }
        sql.push_str(" ORDER BY linha_id");

        let mut stmt = conn.prepare(&sql).context("Failed to prepare ledger fetch")?;
        let rows = stmt
            .query_map(params_from_iter(bind.iter()), read_raw_row)
            .context("Ledger fetch failed")?;

        let mut records = Vec::new();
        let mut dropped = 0usize;
        for raw in rows {
            let (day_text, record_without_day) = raw?;
            let Some(day) = parse_day(&day_text) else {
                dropped += 1;
                continue;
            };
            if let Some(w) = window {
                if !w.contains(day) {
                    continue;
                }
            }
            let mut record = record_without_day;
            record.day = day;
            records.push(record);
        }

        if dropped > 0 {
            debug!("Dropped {} ledger rows with unparseable days", dropped);
        }

        Ok(records)
    }

    /// Infallible fetch for the render path: connectivity or query failure
    /// degrades to an empty set, never an error.
    pub fn fetch(&self, scope: &Scope, window: Option<DateWindow>) -> Vec<LedgerRecord> {
        match self.try_fetch(scope, window) {
            Ok(records) => records,
            Err(e) => {
                warn!("Ledger fetch failed, serving empty set: {}", e);
                Vec::new()
            }
        }
    }

    /// Most recent parseable day in the whole ledger. The reference date for
    /// the relative period windows.
    pub fn latest_day(&self) -> Option<NaiveDate> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT DISTINCT dia FROM bpd").ok()?;
        let days = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .ok()?
            .filter_map(|r| r.ok())
            .filter_map(|s| parse_day(&s))
            .max();
        days
    }

    pub fn distinct_players(&self, scope: &Scope) -> Vec<String> {
        self.distinct("playerName", scope)
    }

    pub fn distinct_clubs(&self, scope: &Scope) -> Vec<String> {
        self.distinct("club", scope)
    }

    pub fn distinct_agents(&self, scope: &Scope) -> Vec<String> {
        self.distinct("agentName", scope)
    }

    pub fn distinct_references(&self, scope: &Scope) -> Vec<String> {
        self.distinct("reference", scope)
    }

    fn distinct(&self, column: &'static str, scope: &Scope) -> Vec<String> {
        let conn = self.conn.lock();

        let mut sql = format!("SELECT DISTINCT {column} FROM bpd");
        let mut bind: Vec<String> = Vec::new();
        if let Some(player) = scope.player_predicate() {
            sql.push_str(" WHERE playerName = ?1");
            bind.push(player.to_string());
        }
        sql.push_str(&format!(" ORDER BY {column}"));

        let result = conn.prepare(&sql).and_then(|mut stmt| {
            stmt.query_map(params_from_iter(bind.iter()), |row| {
                row.get::<_, Option<String>>(0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
        });

        match result {
            Ok(values) => values
                .into_iter()
                .flatten()
                .filter(|v| !v.is_empty())
                .collect(),
            Err(e) => {
                warn!("Distinct {} listing failed: {}", column, e);
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM bpd", [], |row| row.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read one row, deferring day parsing to the caller: the raw day text comes
/// back alongside a record whose `day` field is a placeholder.
fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<(String, LedgerRecord)> {
    let day_text: String = text_cell(row, 1)?;

    let record = LedgerRecord {
        row_id: row.get(0)?,
        // Replaced once the day text parses; rows that fail never surface.
        day: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default(),
        reference: text_cell(row, 2)?,
        club: text_cell(row, 3)?,
        player_id: text_cell(row, 4)?,
        player_name: text_cell(row, 5)?,
        agent_name: text_cell(row, 6)?,
        agent_id: text_cell(row, 7)?,
        super_agent_name: text_cell(row, 8)?,
        super_agent_id: text_cell(row, 9)?,
        local_wins: numeric_cell(row, 10)?,
        local_fee: numeric_cell(row, 11)?,
        hands: numeric_cell(row, 12)?,
        dolar_wins: numeric_cell(row, 13)?,
        dolar_fee: numeric_cell(row, 14)?,
        dolar_rakeback: numeric_cell(row, 15)?,
        dolar_rebate: numeric_cell(row, 16)?,
        real_wins: numeric_cell(row, 17)?,
        real_fee: numeric_cell(row, 18)?,
        real_rakeback: numeric_cell(row, 19)?,
        real_rebate: numeric_cell(row, 20)?,
        real_agent_sett: numeric_cell(row, 21)?,
        dolar_agent_sett: numeric_cell(row, 22)?,
        real_rev_share: numeric_cell(row, 23)?,
        real_bpf_profit: numeric_cell(row, 24)?,
        deal: numeric_cell(row, 25)?,
        rebate: numeric_cell(row, 26)?,
    };

    Ok((day_text, record))
}

/// Tolerant text read: NULL and non-text cells degrade to an empty string.
fn text_cell(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        _ => String::new(),
    })
}

/// Tolerant numeric read: the import pipeline writes text, but stray native
/// numerics show up too. Anything that doesn't coerce is absent.
fn numeric_cell(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f).filter(|v| v.is_finite()),
        ValueRef::Text(t) => parse_numeric(&String::from_utf8_lossy(t)),
        ValueRef::Blob(_) => None,
    })
}
