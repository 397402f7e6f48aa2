//! Core data model for the poker ledger dashboard.
//! Mission: one typed row per player/club/day settlement line.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format the `bpd` table stores in its `dia` column (e.g. "05/Jul/25").
pub const DAY_FORMAT: &str = "%d/%b/%y";

/// Settlement currencies used by the clubs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "real")]
    Real,
    #[serde(rename = "dolar")]
    Dolar,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Real => "real",
            Currency::Dolar => "dolar",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "real" | "r$" | "brl" => Some(Currency::Real),
            "dolar" | "dollar" | "us$" | "usd" => Some(Currency::Dolar),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Real => "R$",
            Currency::Dolar => "US$",
        }
    }
}

/// One settled line of the `bpd` ledger: a player's results for one
/// club/reference on one day. Measures are coerced to `Option<f64>` at fetch
/// time; `None` means the stored value was missing or non-numeric and must be
/// excluded from sums rather than counted as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub row_id: i64,
    pub day: NaiveDate,
    pub reference: String,
    pub club: String,
    pub player_id: String,
    pub player_name: String,
    pub agent_name: String,
    pub agent_id: String,
    pub super_agent_name: String,
    pub super_agent_id: String,

    pub local_wins: Option<f64>,
    pub local_fee: Option<f64>,
    pub hands: Option<f64>,
    pub dolar_wins: Option<f64>,
    pub dolar_fee: Option<f64>,
    pub dolar_rakeback: Option<f64>,
    pub dolar_rebate: Option<f64>,
    pub real_wins: Option<f64>,
    pub real_fee: Option<f64>,
    pub real_rakeback: Option<f64>,
    pub real_rebate: Option<f64>,
    pub real_agent_sett: Option<f64>,
    pub dolar_agent_sett: Option<f64>,
    pub real_rev_share: Option<f64>,
    pub real_bpf_profit: Option<f64>,
    pub deal: Option<f64>,
    pub rebate: Option<f64>,
}

/// The measurable (summable) columns of the ledger, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Measure {
    LocalWins,
    LocalFee,
    Hands,
    DolarWins,
    DolarFee,
    DolarRakeback,
    DolarRebate,
    DolarAgentSett,
    RealWins,
    RealFee,
    RealRakeback,
    RealRebate,
    RealAgentSett,
    RealRevShare,
    RealBpfProfit,
    Deal,
    Rebate,
}

impl Measure {
    pub const ALL: [Measure; 17] = [
        Measure::LocalWins,
        Measure::LocalFee,
        Measure::Hands,
        Measure::DolarWins,
        Measure::DolarFee,
        Measure::DolarRakeback,
        Measure::DolarRebate,
        Measure::DolarAgentSett,
        Measure::RealWins,
        Measure::RealFee,
        Measure::RealRakeback,
        Measure::RealRebate,
        Measure::RealAgentSett,
        Measure::RealRevShare,
        Measure::RealBpfProfit,
        Measure::Deal,
        Measure::Rebate,
    ];

    /// Column name as stored in the `bpd` table.
    pub fn column(&self) -> &'static str {
        match self {
            Measure::LocalWins => "localWins",
            Measure::LocalFee => "localFee",
            Measure::Hands => "hands",
            Measure::DolarWins => "dolarWins",
            Measure::DolarFee => "dolarFee",
            Measure::DolarRakeback => "dolarRakeback",
            Measure::DolarRebate => "dolarRebate",
            Measure::DolarAgentSett => "dolarAgentSett",
            Measure::RealWins => "realWins",
            Measure::RealFee => "realFee",
            Measure::RealRakeback => "realRakeback",
            Measure::RealRebate => "realRebate",
            Measure::RealAgentSett => "realAgentSett",
            Measure::RealRevShare => "realRevShare",
            Measure::RealBpfProfit => "realBPFProfit",
            Measure::Deal => "deal",
            Measure::Rebate => "rebate",
        }
    }

    pub fn from_column(s: &str) -> Option<Self> {
        Measure::ALL.iter().copied().find(|m| m.column() == s)
    }

    /// Settlement currency of this column, if it carries one. `hands`, `deal`
    /// and the bare `rebate` column are unit-less counts/amounts.
    pub fn currency(&self) -> Option<Currency> {
        match self {
            Measure::DolarWins
            | Measure::DolarFee
            | Measure::DolarRakeback
            | Measure::DolarRebate
            | Measure::DolarAgentSett => Some(Currency::Dolar),
            Measure::RealWins
            | Measure::RealFee
            | Measure::RealRakeback
            | Measure::RealRebate
            | Measure::RealAgentSett
            | Measure::RealRevShare
            | Measure::RealBpfProfit => Some(Currency::Real),
            _ => None,
        }
    }

    /// Value of this measure on a record.
    pub fn of(&self, r: &LedgerRecord) -> Option<f64> {
        match self {
            Measure::LocalWins => r.local_wins,
            Measure::LocalFee => r.local_fee,
            Measure::Hands => r.hands,
            Measure::DolarWins => r.dolar_wins,
            Measure::DolarFee => r.dolar_fee,
            Measure::DolarRakeback => r.dolar_rakeback,
            Measure::DolarRebate => r.dolar_rebate,
            Measure::DolarAgentSett => r.dolar_agent_sett,
            Measure::RealWins => r.real_wins,
            Measure::RealFee => r.real_fee,
            Measure::RealRakeback => r.real_rakeback,
            Measure::RealRebate => r.real_rebate,
            Measure::RealAgentSett => r.real_agent_sett,
            Measure::RealRevShare => r.real_rev_share,
            Measure::RealBpfProfit => r.real_bpf_profit,
            Measure::Deal => r.deal,
            Measure::Rebate => r.rebate,
        }
    }

    /// Format a total of this column for display. Unavailable totals render
    /// as "N/A", currency totals with their symbol, counts without decimals.
    pub fn format_total(&self, total: Option<f64>) -> String {
        match total {
            None => "N/A".to_string(),
            Some(v) => match self.currency() {
                Some(c) => format!("{} {:.2}", c.symbol(), v),
                None => format!("{:.0}", v),
            },
        }
    }
}

/// Coerce a raw stored value to a number. Invalid or empty input is absent,
/// never zero and never an error.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a ledger day in the store's `%d/%b/%y` form.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT).ok()
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub ledger_db_path: String,
    pub auth_db_path: String,
    pub bind_addr: String,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Self {
        let ledger_db_path = std::env::var("LEDGER_DB_PATH")
            .or_else(|_| std::env::var("DATABASE_PATH"))
            .unwrap_or_else(|_| "bpdash_ledger.db".to_string());

        let auth_db_path =
            std::env::var("AUTH_DB_PATH").unwrap_or_else(|_| "bpdash_auth.db".to_string());

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let jwt_secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "dev-secret-change-in-production-minimum-32-characters".to_string());

        Self {
            ledger_db_path,
            auth_db_path,
            bind_addr,
            jwt_secret,
        }
    }
}
