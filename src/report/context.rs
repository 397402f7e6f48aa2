//! Per-session dashboard state and the render pipeline.
//!
//! One user interaction = one synchronous pass: the caller applies the
//! interaction's mutations to the session context, fetches the scoped and
//! date-bounded record set, and hands both to `render`. `render` is pure —
//! all I/O stays at the boundary — and returns the view model together with
//! the updated context (healed filters, clamped page, refreshed fingerprint).

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{Currency, LedgerRecord, Measure};
use crate::report::aggregate::{aggregate, MetricSummary};
use crate::report::columns::{column_value, default_columns};
use crate::report::filter::{fingerprint, FilterSelections, Fingerprint};
use crate::report::paginate::{page_slice, paginate, PageSize, Pagination};
use crate::report::window::{DateWindow, NamedPeriod};

/// Ephemeral UI state for one logged-in user. Lives for the session, owned by
/// the server, mutated only by that user's own interactions.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub period: NamedPeriod,
    pub filters: FilterSelections,
    pub page: usize,
    pub page_size: PageSize,
    pub currencies: Vec<Currency>,
    pub columns: Vec<String>,
    /// Identity of the record set the filters were last validated against.
    pub fingerprint: Option<Fingerprint>,
    /// Page count of the last render, for navigation against known bounds.
    pub total_pages: usize,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            period: NamedPeriod::default(),
            filters: FilterSelections::default(),
            page: 1,
            page_size: PageSize::default(),
            currencies: vec![Currency::Real],
            columns: default_columns(),
            fingerprint: None,
            total_pages: 1,
        }
    }
}

impl SessionContext {
    /// Changing the page size always restarts at page 1.
    pub fn set_page_size(&mut self, page_size: PageSize) {
        if self.page_size != page_size {
            self.page_size = page_size;
            self.page = 1;
        }
    }

    pub fn set_period(&mut self, period: NamedPeriod) {
        self.period = period;
    }
}

/// Distinct values per dimension in the fetched set; the option universes a
/// filter UI offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub players: Vec<String>,
    pub clubs: Vec<String>,
    pub agents: Vec<String>,
    pub references: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[LedgerRecord]) -> Self {
        fn distinct(values: impl Iterator<Item = String>) -> Vec<String> {
            let mut v: Vec<String> = values.collect();
            v.sort();
            v.dedup();
            v
        }

        Self {
            players: distinct(records.iter().map(|r| r.player_name.clone())),
            clubs: distinct(records.iter().map(|r| r.club.clone())),
            agents: distinct(records.iter().map(|r| r.agent_name.clone())),
            references: distinct(records.iter().map(|r| r.reference.clone())),
        }
    }
}

/// The headline cards, formatted under the active-currency policy, with the
/// raw per-currency figures alongside.
#[derive(Debug, Clone, Serialize)]
pub struct MetricCards {
    pub hands: String,
    pub wins: String,
    pub rakeback: String,
    pub rebate: String,
    pub balance: String,
    pub raw: MetricSummary,
}

impl MetricCards {
    fn build(summary: MetricSummary, currencies: &[Currency]) -> Self {
        let hands = match summary.hands {
            Some(v) => format!("{v:.0}"),
            None => "N/A".to_string(),
        };
        Self {
            hands,
            wins: summary.wins.format(currencies),
            rakeback: summary.rakeback.format(currencies),
            rebate: summary.rebate.format(currencies),
            balance: summary.balance.format(currencies),
            raw: summary,
        }
    }
}

/// Everything one render pass produces.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    /// Non-fatal notice, e.g. the store was unreachable and the set is empty.
    pub notice: Option<String>,
    pub period: NamedPeriod,
    pub window: Option<DateWindow>,
    pub currencies: Vec<Currency>,
    /// Headline cards over the whole fetched (scoped + date-bounded) set.
    pub metrics: MetricCards,
    pub filters: FilterSelections,
    pub options: FilterOptions,
    pub columns: Vec<String>,
    /// The visible page, column subset applied.
    pub rows: Vec<Value>,
    pub pagination: Pagination,
    /// Totals over the visible page only.
    pub page_totals: BTreeMap<String, Option<f64>>,
    /// Totals over the whole filtered set; present only while pagination is
    /// actually splitting it (more than one page), shown side by side with
    /// the page totals, never merged.
    pub grand_totals: Option<BTreeMap<String, Option<f64>>>,
    pub fetched_rows: usize,
    pub filtered_rows: usize,
    pub timestamp: String,
}

/// One pure render pass: heal filters, filter, paginate, aggregate.
pub fn render(
    mut ctx: SessionContext,
    window: Option<DateWindow>,
    records: Vec<LedgerRecord>,
    notice: Option<String>,
) -> (DashboardView, SessionContext) {
    // Self-healing: only re-validate when the data identity moved.
    let fp = fingerprint(&records);
    if ctx.fingerprint.as_ref() != Some(&fp) {
        if ctx.filters.heal(&records) {
            debug!("record set changed; stale filter selections reset to all");
        }
        ctx.fingerprint = Some(fp);
    }

    let metrics = MetricSummary::compute(&records);
    let options = FilterOptions::from_records(&records);

    let filtered = ctx.filters.apply(&records);
    let pagination = paginate(filtered.len(), ctx.page_size, ctx.page);
    ctx.page = pagination.page;
    ctx.total_pages = pagination.total_pages;

    let page = page_slice(&filtered, &pagination);

    let visible_measures: Vec<Measure> = ctx
        .columns
        .iter()
        .filter_map(|c| Measure::from_column(c))
        .collect();

    let page_totals = aggregate(page, &visible_measures);
    let grand_totals = if pagination.total_pages > 1 && ctx.page_size != PageSize::All {
        Some(aggregate(&filtered, &visible_measures))
    } else {
        None
    };

    let rows: Vec<Value> = page
        .iter()
        .map(|r| {
            let cells: serde_json::Map<String, Value> = ctx
                .columns
                .iter()
                .map(|c| (c.clone(), column_value(r, c).to_json()))
                .collect();
            Value::Object(cells)
        })
        .collect();

    let view = DashboardView {
        notice,
        period: ctx.period,
        window,
        currencies: ctx.currencies.clone(),
        metrics: MetricCards::build(metrics, &ctx.currencies),
        filters: ctx.filters.clone(),
        options,
        columns: ctx.columns.clone(),
        rows,
        pagination,
        page_totals,
        grand_totals,
        fetched_rows: records.len(),
        filtered_rows: filtered.len(),
        timestamp: Utc::now().to_rfc3339(),
    };

    (view, ctx)
}
