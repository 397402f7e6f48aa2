//! Integration tests for the dashboard pipeline
//!
//! Drives the real stores and the render pipeline end to end the way one
//! user session would: fetch under scope and window, filter, paginate,
//! aggregate, export. Uses a throwaway SQLite file seeded the way the
//! settlement import pipeline writes rows.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use tempfile::NamedTempFile;

use bpdash_backend::auth::models::UserRole;
use bpdash_backend::ledger::LedgerStore;
use bpdash_backend::models::Currency;
use bpdash_backend::report::context::render;
use bpdash_backend::report::export::{build_export, write_csv, GRAND_TOTAL_LABEL};
use bpdash_backend::report::filter::{Dimension, Selection};
use bpdash_backend::report::paginate::PageSize;
use bpdash_backend::report::window::resolve_window;
use bpdash_backend::report::{NamedPeriod, Scope, SessionContext};

struct Fixture {
    store: LedgerStore,
    _file: NamedTempFile,
    path: std::path::PathBuf,
}

fn fixture() -> Fixture {
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_path_buf();
    let store = LedgerStore::new(path.to_str().unwrap()).unwrap();
    Fixture {
        store,
        _file: file,
        path,
    }
}

fn seed_row(
    path: &std::path::Path,
    dia: &str,
    player: &str,
    club: &str,
    real_wins: &str,
    real_fee: &str,
    hands: &str,
) {
    let conn = Connection::open(path).unwrap();
    conn.execute(
        "INSERT INTO bpd (dia, reference, club, playerID, playerName, agentName,
                          realWins, realFee, realRakeback, hands)
         VALUES (?1, 'REF-1', ?2, 'pid', ?3, 'agent', ?4, ?5, '2.5', ?6)",
        params![dia, club, player, real_wins, real_fee, hands],
    )
    .unwrap();
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn player_session_sees_only_own_rows_and_totals() {
    let fx = fixture();
    seed_row(&fx.path, "05/Jul/25", "Maria Silva", "ClubA", "100", "10", "40");
    seed_row(&fx.path, "06/Jul/25", "Maria Silva", "ClubB", "-25", "5", "60");
    seed_row(&fx.path, "05/Jul/25", "Pedro", "ClubA", "999", "99", "10");

    let scope = Scope::for_role(&UserRole::Player, "Maria Silva");
    let window = resolve_window(NamedPeriod::ShowAll, d(2025, 7, 6), d(2025, 7, 6));
    let records = fx.store.fetch(&scope, window);
    assert_eq!(records.len(), 2);

    let mut ctx = SessionContext::default();
    ctx.currencies = vec![Currency::Real];
    let (view, _) = render(ctx, window, records, None);

    // Metric cards over the scoped fetch: Pedro's rows never leak in.
    assert_eq!(view.metrics.raw.wins.real, Some(75.0));
    assert_eq!(view.metrics.raw.rakeback.real, Some(5.0)); // 2.5 per row
    assert_eq!(view.metrics.hands, "100");
    // balance = wins − fee + rakeback = 75 − 15 + 5
    assert_eq!(view.metrics.raw.balance.real, Some(65.0));
    assert_eq!(view.metrics.balance, "R$ 65.00");
}

#[test]
fn date_window_narrows_the_fetch() {
    let fx = fixture();
    seed_row(&fx.path, "01/Jul/25", "Maria Silva", "ClubA", "1", "0", "1");
    seed_row(&fx.path, "07/Jul/25", "Maria Silva", "ClubA", "2", "0", "1");
    seed_row(&fx.path, "12/Jul/25", "Maria Silva", "ClubA", "4", "0", "1");

    // Current week anchored on the latest ledger day (Sat 2025-07-12).
    let reference = fx.store.latest_day().unwrap();
    assert_eq!(reference, d(2025, 7, 12));

    let window = resolve_window(NamedPeriod::CurrentWeek, reference, d(2025, 7, 15));
    let records = fx.store.fetch(&Scope::All, window);
    // Mon 07-07 .. Sat 07-12: the 07-01 row is outside.
    assert_eq!(records.len(), 2);
}

#[test]
fn paging_through_a_filtered_set_keeps_totals_consistent() {
    let fx = fixture();
    for i in 0..125 {
        let club = if i % 5 == 0 { "ClubB" } else { "ClubA" };
        seed_row(&fx.path, "05/Jul/25", &format!("P{i}"), club, "1", "0", "1");
    }

    let records = fx.store.fetch(&Scope::All, None);
    assert_eq!(records.len(), 125);

    let mut ctx = SessionContext::default();
    ctx.page_size = PageSize::Rows(50);
    ctx.columns = vec!["playerName".to_string(), "realWins".to_string()];
    ctx.filters.set(
        Dimension::Club,
        Selection::Values(BTreeSet::from(["ClubA".to_string()])),
    );

    // 100 ClubA rows → 2 pages of 50.
    let (view, ctx) = render(ctx, None, records.clone(), None);
    assert_eq!(view.filtered_rows, 100);
    assert_eq!(view.pagination.total_pages, 2);
    assert_eq!(view.page_totals["realWins"], Some(50.0));
    let grand = view.grand_totals.as_ref().expect("paginated set");
    assert_eq!(grand["realWins"], Some(100.0));

    // Walk to the last page: page totals change, grand totals do not.
    let mut ctx2 = ctx.clone();
    ctx2.page = 2;
    let (view2, _) = render(ctx2, None, records, None);
    assert_eq!(view2.pagination.page, 2);
    assert_eq!(view2.page_totals["realWins"], Some(50.0));
    assert_eq!(
        view2.grand_totals.as_ref().unwrap()["realWins"],
        view.grand_totals.as_ref().unwrap()["realWins"]
    );
}

#[test]
fn window_change_resets_stale_filters() {
    let fx = fixture();
    seed_row(&fx.path, "05/Jul/25", "Maria Silva", "ClubA", "1", "0", "1");
    seed_row(&fx.path, "20/Jun/25", "Pedro", "ClubZ", "1", "0", "1");

    // First render over July data; the user picks ClubA.
    let july = resolve_window(
        NamedPeriod::custom(d(2025, 7, 1), d(2025, 7, 31)).unwrap(),
        d(2025, 7, 5),
        d(2025, 7, 5),
    );
    let records = fx.store.fetch(&Scope::All, july);
    let (_, mut ctx) = render(SessionContext::default(), july, records, None);
    ctx.filters.set(
        Dimension::Club,
        Selection::Values(BTreeSet::from(["ClubA".to_string()])),
    );

    // Second render over June data: ClubA no longer exists, every dimension
    // resets to "all" and the June rows show unfiltered.
    let june = resolve_window(
        NamedPeriod::custom(d(2025, 6, 1), d(2025, 6, 30)).unwrap(),
        d(2025, 6, 30),
        d(2025, 6, 30),
    );
    let records = fx.store.fetch(&Scope::All, june);
    let (view, ctx) = render(ctx, june, records, None);

    assert!(ctx.filters.is_unfiltered());
    assert_eq!(view.filtered_rows, 1);
}

#[test]
fn export_matches_filtered_set_with_grand_total() {
    let fx = fixture();
    seed_row(&fx.path, "05/Jul/25", "Maria Silva", "ClubA", "100", "10", "40");
    seed_row(&fx.path, "06/Jul/25", "Pedro", "ClubB", "50", "5", "20");

    let records = fx.store.fetch(&Scope::All, None);
    let columns = vec![
        "dia".to_string(),
        "playerName".to_string(),
        "realWins".to_string(),
        "hands".to_string(),
    ];

    let table = build_export(&records, &columns);
    let csv_bytes = write_csv(&table).unwrap();
    let text = String::from_utf8(csv_bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "dia,playerName,realWins,hands");
    assert_eq!(lines.len(), 4);
    let totals = lines[3];
    assert!(totals.starts_with(GRAND_TOTAL_LABEL));
    assert!(totals.contains("150"));
    assert!(totals.ends_with("60"));
}
