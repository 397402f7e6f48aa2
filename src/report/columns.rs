//! Display-column selection over ledger records.
//!
//! Columns are addressed by their store names so a persisted selection stays
//! valid across clients. Unknown names are dropped; an empty selection falls
//! back to the default table layout.

use serde_json::Value;

use crate::models::{LedgerRecord, Measure};

/// Every selectable column, identity fields first, in table order.
pub const ALL_COLUMNS: &[&str] = &[
    "dia",
    "reference",
    "club",
    "playerID",
    "playerName",
    "agentName",
    "agentId",
    "superAgentName",
    "superagentId",
    "localWins",
    "localFee",
    "hands",
    "dolarWins",
    "dolarFee",
    "dolarRakeback",
    "dolarRebate",
    "dolarAgentSett",
    "realWins",
    "realFee",
    "realRakeback",
    "realRebate",
    "realAgentSett",
    "realRevShare",
    "realBPFProfit",
    "deal",
    "rebate",
];

/// Initial table layout before the user picks columns.
pub const DEFAULT_COLUMNS: &[&str] = &[
    "dia",
    "reference",
    "club",
    "playerName",
    "agentName",
    "localWins",
    "localFee",
    "hands",
];

/// Validate a requested column subset: unknown names dropped, order of
/// `ALL_COLUMNS` preserved, empty result replaced by the defaults.
pub fn validate_columns(requested: &[String]) -> Vec<String> {
    let kept: Vec<String> = ALL_COLUMNS
        .iter()
        .copied()
        .filter(|c| requested.iter().any(|r| r.as_str() == *c))
        .map(|c| c.to_string())
        .collect();

    if kept.is_empty() {
        default_columns()
    } else {
        kept
    }
}

pub fn default_columns() -> Vec<String> {
    DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// One table cell: text for identity columns, a possibly-absent number for
/// measures.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(Option<f64>),
}

impl CellValue {
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Number(Some(v)) => serde_json::json!(v),
            CellValue::Number(None) => Value::Null,
        }
    }

    /// Plain string form for delimited exports; absent numbers export empty.
    pub fn to_export_string(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(Some(v)) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    format!("{}", *v as i64)
                } else {
                    format!("{v}")
                }
            }
            CellValue::Number(None) => String::new(),
        }
    }
}

/// Value of a named column on a record. Days render ISO so exports sort.
pub fn column_value(record: &LedgerRecord, column: &str) -> CellValue {
    if let Some(measure) = Measure::from_column(column) {
        return CellValue::Number(measure.of(record));
    }

    let text = match column {
        "dia" => record.day.format("%Y-%m-%d").to_string(),
        "reference" => record.reference.clone(),
        "club" => record.club.clone(),
        "playerID" => record.player_id.clone(),
        "playerName" => record.player_name.clone(),
        "agentName" => record.agent_name.clone(),
        "agentId" => record.agent_id.clone(),
        "superAgentName" => record.super_agent_name.clone(),
        "superagentId" => record.super_agent_id.clone(),
        _ => String::new(),
    };
    CellValue::Text(text)
}
