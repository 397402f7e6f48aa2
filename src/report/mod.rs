//! Reporting core: scope, date windows, filtering, aggregation, pagination
//! and the per-session render pipeline.

pub mod aggregate;
pub mod columns;
pub mod context;
pub mod export;
pub mod filter;
pub mod paginate;
pub mod scope;
pub mod window;

pub use context::{render, DashboardView, SessionContext};
pub use filter::{Dimension, FilterSelections, Selection};
pub use paginate::{paginate, PageSize, Pagination};
pub use scope::Scope;
pub use window::{resolve_window, DateWindow, NamedPeriod};

#[cfg(test)]
pub(crate) mod testutil {
    use crate::models::LedgerRecord;
    use chrono::NaiveDate;

    /// Minimal record builder for the reporting tests. Identity fields that a
    /// test does not care about get stable defaults; all measures start absent.
    pub fn record(player: &str, club: &str, agent: &str, reference: &str) -> LedgerRecord {
        LedgerRecord {
            row_id: 0,
            day: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            reference: reference.to_string(),
            club: club.to_string(),
            player_id: format!("id-{player}"),
            player_name: player.to_string(),
            agent_name: agent.to_string(),
            agent_id: format!("id-{agent}"),
            super_agent_name: String::new(),
            super_agent_id: String::new(),
            local_wins: None,
            local_fee: None,
            hands: None,
            dolar_wins: None,
            dolar_fee: None,
            dolar_rakeback: None,
            dolar_rebate: None,
            real_wins: None,
            real_fee: None,
            real_rakeback: None,
            real_rebate: None,
            real_agent_sett: None,
            dolar_agent_sett: None,
            real_rev_share: None,
            real_bpf_profit: None,
            deal: None,
            rebate: None,
        }
    }
}
