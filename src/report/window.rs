//! Date window resolution for the period selectors.
//!
//! The relative periods (current week, last week, last 30 days) anchor on a
//! *reference date*: the most recent day present in the ledger when the store
//! has data, else the system date. That keeps a stale ledger usable — the
//! windows follow the data. "Today" is the one deliberate exception: it always
//! means the true system date.

use anyhow::{bail, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// An inclusive calendar-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// A period selector: a predefined window relative to the reference date, an
/// explicit custom range, or everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NamedPeriod {
    CurrentWeek,
    Today,
    LastWeek,
    Last30Days,
    ShowAll,
    Custom { start: NaiveDate, end: NaiveDate },
}

impl NamedPeriod {
    /// Stable key used for query parameters and persisted preferences.
    pub fn key(&self) -> &'static str {
        match self {
            NamedPeriod::CurrentWeek => "current_week",
            NamedPeriod::Today => "today",
            NamedPeriod::LastWeek => "last_week",
            NamedPeriod::Last30Days => "last_30_days",
            NamedPeriod::ShowAll => "show_all",
            NamedPeriod::Custom { .. } => "custom",
        }
    }

    /// Parse a preference/query key. `custom` is not constructible from a bare
    /// key — it needs explicit endpoints.
    pub fn from_key(s: &str) -> Option<Self> {
        match s {
            "current_week" => Some(NamedPeriod::CurrentWeek),
            "today" => Some(NamedPeriod::Today),
            "last_week" => Some(NamedPeriod::LastWeek),
            "last_30_days" => Some(NamedPeriod::Last30Days),
            "show_all" => Some(NamedPeriod::ShowAll),
            _ => None,
        }
    }

    /// Build a validated custom range.
    pub fn custom(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            bail!("custom range start {start} is after end {end}");
        }
        Ok(NamedPeriod::Custom { start, end })
    }
}

impl Default for NamedPeriod {
    fn default() -> Self {
        NamedPeriod::LastWeek
    }
}

/// Resolve a period to its inclusive window. `None` means no date bound at
/// all: the store must not apply a date predicate.
pub fn resolve_window(
    period: NamedPeriod,
    reference_date: NaiveDate,
    today: NaiveDate,
) -> Option<DateWindow> {
    match period {
        NamedPeriod::CurrentWeek => {
            let weekday = reference_date.weekday().num_days_from_monday() as i64;
            Some(DateWindow {
                start: reference_date - Duration::days(weekday),
                end: reference_date,
            })
        }
        NamedPeriod::Today => Some(DateWindow {
            start: today,
            end: today,
        }),
        NamedPeriod::LastWeek => {
            // Most recent Sunday strictly before the current week.
            let weekday = reference_date.weekday().num_days_from_monday() as i64;
            let end = reference_date - Duration::days(weekday + 1);
            Some(DateWindow {
                start: end - Duration::days(6),
                end,
            })
        }
        NamedPeriod::Last30Days => Some(DateWindow {
            start: reference_date - Duration::days(29),
            end: reference_date,
        }),
        NamedPeriod::ShowAll => None,
        NamedPeriod::Custom { start, end } => Some(DateWindow { start, end }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_current_week_starts_monday() {
        // 2025-07-12 is a Saturday.
        let w = resolve_window(NamedPeriod::CurrentWeek, d(2025, 7, 12), d(2025, 7, 12)).unwrap();
        assert_eq!(w.start, d(2025, 7, 7));
        assert_eq!(w.end, d(2025, 7, 12));

        // On a Monday the window is a single day.
        let w = resolve_window(NamedPeriod::CurrentWeek, d(2025, 7, 7), d(2025, 7, 7)).unwrap();
        assert_eq!(w.start, d(2025, 7, 7));
        assert_eq!(w.end, d(2025, 7, 7));
    }

    #[test]
    fn test_today_uses_system_date_not_reference() {
        // Stale store: reference lags three days behind the clock.
        let w = resolve_window(NamedPeriod::Today, d(2025, 7, 12), d(2025, 7, 15)).unwrap();
        assert_eq!(w.start, d(2025, 7, 15));
        assert_eq!(w.end, d(2025, 7, 15));
    }

    #[test]
    fn test_last_week_is_monday_through_sunday() {
        // From Saturday 2025-07-12: previous week is Mon 2025-06-30 .. Sun 2025-07-06.
        let w = resolve_window(NamedPeriod::LastWeek, d(2025, 7, 12), d(2025, 7, 12)).unwrap();
        assert_eq!(w.start, d(2025, 6, 30));
        assert_eq!(w.end, d(2025, 7, 6));
        assert_eq!(w.end.weekday(), chrono::Weekday::Sun);

        // From a Monday, "last week" ends yesterday (Sunday).
        let w = resolve_window(NamedPeriod::LastWeek, d(2025, 7, 7), d(2025, 7, 7)).unwrap();
        assert_eq!(w.start, d(2025, 6, 30));
        assert_eq!(w.end, d(2025, 7, 6));
    }

    #[test]
    fn test_last_30_days_is_inclusive() {
        let w = resolve_window(NamedPeriod::Last30Days, d(2025, 7, 12), d(2025, 7, 12)).unwrap();
        assert_eq!(w.start, d(2025, 6, 13));
        assert_eq!(w.end, d(2025, 7, 12));
        // 30 calendar days including both endpoints.
        assert_eq!((w.end - w.start).num_days(), 29);
    }

    #[test]
    fn test_show_all_has_no_bound() {
        assert_eq!(
            resolve_window(NamedPeriod::ShowAll, d(2025, 7, 12), d(2025, 7, 12)),
            None
        );
    }

    #[test]
    fn test_custom_range_validation() {
        let ok = NamedPeriod::custom(d(2025, 7, 1), d(2025, 7, 10)).unwrap();
        let w = resolve_window(ok, d(2025, 7, 12), d(2025, 7, 12)).unwrap();
        assert_eq!((w.start, w.end), (d(2025, 7, 1), d(2025, 7, 10)));

        // Single-day custom range is valid.
        assert!(NamedPeriod::custom(d(2025, 7, 1), d(2025, 7, 1)).is_ok());
        // Inverted range is rejected.
        assert!(NamedPeriod::custom(d(2025, 7, 10), d(2025, 7, 1)).is_err());
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let w = DateWindow {
            start: d(2025, 7, 1),
            end: d(2025, 7, 10),
        };
        assert!(w.contains(d(2025, 7, 1)));
        assert!(w.contains(d(2025, 7, 10)));
        assert!(!w.contains(d(2025, 6, 30)));
        assert!(!w.contains(d(2025, 7, 11)));
    }

    #[test]
    fn test_period_key_round_trip() {
        for p in [
            NamedPeriod::CurrentWeek,
            NamedPeriod::Today,
            NamedPeriod::LastWeek,
            NamedPeriod::Last30Days,
            NamedPeriod::ShowAll,
        ] {
            assert_eq!(NamedPeriod::from_key(p.key()), Some(p));
        }
        assert_eq!(NamedPeriod::from_key("custom"), None);
        assert_eq!(NamedPeriod::from_key("bogus"), None);
    }
}
