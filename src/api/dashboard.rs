//! Dashboard endpoints.
//!
//! One GET per interaction: the query parameters carry that interaction's
//! mutations (period, filters, page, page size, currency, columns), the
//! handler applies them to the caller's session context, runs a single
//! fetch → filter → paginate → aggregate pass and returns the view model.
//! Exports rebuild the same filtered set independently of pagination.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::models::Claims;
use crate::ledger::{LedgerStore, UserConfigStore};
use crate::models::Currency;
use crate::report::columns::validate_columns;
use crate::report::context::{render, DashboardView, FilterOptions, SessionContext};
use crate::report::export::{build_export, write_csv, write_xlsx, ExportTable};
use crate::report::filter::{fingerprint, Dimension, Selection};
use crate::report::paginate::{PageNav, PageSize};
use crate::report::scope::Scope;
use crate::report::window::{resolve_window, NamedPeriod};

const PREF_DEFAULT_PERIOD: &str = "default_period";
const PREF_CURRENCY: &str = "currency";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerStore>,
    pub configs: Arc<UserConfigStore>,
    /// Session contexts, one per username. Each user's state is only ever
    /// mutated by that user's own requests.
    pub sessions: Arc<RwLock<HashMap<String, SessionContext>>>,
}

impl AppState {
    pub fn new(ledger: Arc<LedgerStore>, configs: Arc<UserConfigStore>) -> Self {
        Self {
            ledger,
            configs,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

/// Query parameters of one dashboard interaction. Everything optional; an
/// absent parameter means "leave that part of the session context alone".
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// Named period key, or "custom" together with `start`/`end`.
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Comma-separated values per dimension; the literal "all" clears one.
    pub player: Option<String>,
    pub club: Option<String>,
    pub agent: Option<String>,
    pub reference: Option<String>,
    pub clear_filters: Option<bool>,
    /// Page number or a nav keyword: first / prev / next / last.
    pub page: Option<String>,
    /// "all" or a positive row count.
    pub page_size: Option<String>,
    /// "real", "dolar", "both" or "none".
    pub currency: Option<String>,
    /// Comma-separated column subset.
    pub columns: Option<String>,
}

/// GET /api/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<DashboardQuery>,
) -> Json<DashboardView> {
    Json(run_pipeline(&state, &claims, &q))
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub options: FilterOptions,
    pub timestamp: String,
}

/// GET /api/dashboard/options — the full option universes for the caller's
/// scope, date-window independent.
pub async fn get_options(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Json<OptionsResponse> {
    let scope = Scope::for_role(&claims.role, &claims.username);

    Json(OptionsResponse {
        options: FilterOptions {
            players: state.ledger.distinct_players(&scope),
            clubs: state.ledger.distinct_clubs(&scope),
            agents: state.ledger.distinct_agents(&scope),
            references: state.ledger.distinct_references(&scope),
        },
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// GET /api/dashboard/export.csv
pub async fn export_csv(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let table = export_table(&state, &claims);
    match write_csv(&table) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"dados_tabela.csv\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            warn!("CSV export failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Export failed").into_response()
        }
    }
}

/// GET /api/dashboard/export.xlsx
pub async fn export_xlsx(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let table = export_table(&state, &claims);
    match write_xlsx(&table) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (
                    header::CONTENT_TYPE,
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                ),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"dados_tabela.xlsx\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            warn!("XLSX export failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Export failed").into_response()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfigUpdate {
    pub value: String,
}

/// GET /api/config/:key
pub async fn get_config(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(key): Path<String>,
) -> Result<Json<ConfigResponse>, StatusCode> {
    let default = default_preference(&key).ok_or(StatusCode::NOT_FOUND)?;
    let value = state.configs.get(&claims.username, &key, default);
    Ok(Json(ConfigResponse { key, value }))
}

/// PUT /api/config/:key — best effort; an unknown key or value is rejected,
/// a storage failure silently keeps the previous preference.
pub async fn put_config(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(key): Path<String>,
    Json(body): Json<ConfigUpdate>,
) -> Result<Json<ConfigResponse>, StatusCode> {
    default_preference(&key).ok_or(StatusCode::NOT_FOUND)?;

    let valid = match key.as_str() {
        PREF_DEFAULT_PERIOD => NamedPeriod::from_key(&body.value).is_some(),
        PREF_CURRENCY => matches!(body.value.as_str(), "real" | "dolar" | "both"),
        _ => false,
    };
    if !valid {
        return Err(StatusCode::BAD_REQUEST);
    }

    state.configs.set(&claims.username, &key, &body.value);

    // A currency preference applies to the live session immediately.
    if key == PREF_CURRENCY {
        if let Some(ctx) = state.sessions.write().get_mut(&claims.username) {
            ctx.currencies = parse_currencies(&body.value);
        }
    }

    Ok(Json(ConfigResponse {
        key,
        value: body.value,
    }))
}

fn default_preference(key: &str) -> Option<&'static str> {
    match key {
        PREF_DEFAULT_PERIOD => Some("last_week"),
        PREF_CURRENCY => Some("real"),
        _ => None,
    }
}

/// One full interaction pass: load (or seed) the session context, apply the
/// query's mutations, fetch under scope + window, render, store the updated
/// context back.
fn run_pipeline(state: &AppState, claims: &Claims, q: &DashboardQuery) -> DashboardView {
    let username = &claims.username;

    let mut ctx = state
        .sessions
        .read()
        .get(username)
        .cloned()
        .unwrap_or_else(|| initial_context(state, username));

    apply_mutations(&mut ctx, q);

    let scope = Scope::for_role(&claims.role, username);
    let today = Utc::now().date_naive();
    let reference = state.ledger.latest_day().unwrap_or(today);
    let window = resolve_window(ctx.period, reference, today);

    let (records, notice) = match state.ledger.try_fetch(&scope, window) {
        Ok(records) => (records, None),
        Err(e) => {
            warn!("Ledger unavailable: {}", e);
            (
                Vec::new(),
                Some("Ledger store unavailable; showing an empty data set".to_string()),
            )
        }
    };

    let (view, updated) = render(ctx, window, records, notice);
    state.sessions.write().insert(username.clone(), updated);
    view
}

/// Exports cover the whole filtered set under the caller's current session
/// state — pagination never truncates a download.
fn export_table(state: &AppState, claims: &Claims) -> ExportTable {
    let username = &claims.username;

    let mut ctx = state
        .sessions
        .read()
        .get(username)
        .cloned()
        .unwrap_or_else(|| initial_context(state, username));

    let scope = Scope::for_role(&claims.role, username);
    let today = Utc::now().date_naive();
    let reference = state.ledger.latest_day().unwrap_or(today);
    let window = resolve_window(ctx.period, reference, today);

    let records = state.ledger.fetch(&scope, window);

    // Same self-healing rule as the render path.
    let fp = fingerprint(&records);
    if ctx.fingerprint.as_ref() != Some(&fp) {
        if ctx.filters.heal(&records) {
            debug!("record set changed; stale filter selections reset before export");
        }
        ctx.fingerprint = Some(fp);
    }

    let filtered = ctx.filters.apply(&records);
    let table = build_export(&filtered, &ctx.columns);

    state.sessions.write().insert(username.clone(), ctx);
    table
}

/// First render of a session: preferences seed the context, hardcoded
/// defaults cover a missing or failing config store.
fn initial_context(state: &AppState, username: &str) -> SessionContext {
    let mut ctx = SessionContext::default();

    let period_key = state
        .configs
        .get(username, PREF_DEFAULT_PERIOD, NamedPeriod::LastWeek.key());
    if let Some(period) = NamedPeriod::from_key(&period_key) {
        ctx.period = period;
    }

    let currency = state.configs.get(username, PREF_CURRENCY, "real");
    ctx.currencies = parse_currencies(&currency);

    ctx
}

fn apply_mutations(ctx: &mut SessionContext, q: &DashboardQuery) {
    if let Some(period_key) = &q.period {
        if period_key == "custom" {
            if let (Some(start), Some(end)) = (q.start, q.end) {
                match NamedPeriod::custom(start, end) {
                    Ok(period) => ctx.set_period(period),
                    // Invalid range: keep the previous window, no error.
                    Err(e) => debug!("rejected custom range: {}", e),
                }
            }
        } else if let Some(period) = NamedPeriod::from_key(period_key) {
            ctx.set_period(period);
        }
    }

    if q.clear_filters.unwrap_or(false) {
        ctx.filters.reset();
    }

    let dims = [
        (Dimension::Player, &q.player),
        (Dimension::Club, &q.club),
        (Dimension::Agent, &q.agent),
        (Dimension::Reference, &q.reference),
    ];
    for (dim, raw) in dims {
        if let Some(raw) = raw {
            ctx.filters.set(dim, parse_selection(raw));
        }
    }

    if let Some(raw) = &q.page_size {
        if let Some(page_size) = PageSize::parse(raw) {
            ctx.set_page_size(page_size);
        }
    }

    if let Some(raw) = &q.page {
        if let Some(nav) = PageNav::parse(raw) {
            ctx.page = nav.apply(ctx.page, ctx.total_pages);
        }
    }

    if let Some(raw) = &q.currency {
        ctx.currencies = parse_currencies(raw);
    }

    if let Some(raw) = &q.columns {
        let requested: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        ctx.columns = validate_columns(&requested);
    }
}

fn parse_selection(raw: &str) -> Selection {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Selection::All;
    }
    let values: BTreeSet<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if values.is_empty() {
        Selection::All
    } else {
        Selection::Values(values)
    }
}

fn parse_currencies(raw: &str) -> Vec<Currency> {
    match raw.trim().to_lowercase().as_str() {
        "both" => vec![Currency::Real, Currency::Dolar],
        "none" => Vec::new(),
        s => match Currency::from_str(s) {
            Some(c) => vec![c],
            None => vec![Currency::Real],
        },
    }
}
