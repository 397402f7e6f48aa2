//! Currency-aware aggregation over record subsets.
//!
//! Sums are computed over coerced values only: absent measures contribute
//! nothing, and a column with no valid value at all reports as unavailable
//! (`None`), never as zero. The same functions serve both granularities the
//! dashboard needs — the visible page and the whole filtered set — the caller
//! just hands in a different slice.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Currency, LedgerRecord, Measure};

/// Sum one measure over a record subset. `None` when no record carries a
/// valid value for it.
pub fn sum_measure(records: &[LedgerRecord], measure: Measure) -> Option<f64> {
    let mut total: Option<f64> = None;
    for r in records {
        if let Some(v) = measure.of(r) {
            *total.get_or_insert(0.0) += v;
        }
    }
    total
}

/// Totals for the requested measures, keyed by column name.
pub fn aggregate(records: &[LedgerRecord], measures: &[Measure]) -> BTreeMap<String, Option<f64>> {
    measures
        .iter()
        .map(|m| (m.column().to_string(), sum_measure(records, *m)))
        .collect()
}

/// Derived balance: wins − fee + rakeback, from already-aggregated components
/// of a single currency. Unavailable only when all three components are.
pub fn balance(wins: Option<f64>, fee: Option<f64>, rakeback: Option<f64>) -> Option<f64> {
    if wins.is_none() && fee.is_none() && rakeback.is_none() {
        return None;
    }
    Some(wins.unwrap_or(0.0) - fee.unwrap_or(0.0) + rakeback.unwrap_or(0.0))
}

/// One figure per settlement currency. The two sides are never summed —
/// they are different units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct CurrencyAmounts {
    pub real: Option<f64>,
    pub dolar: Option<f64>,
}

impl CurrencyAmounts {
    /// Format under the active-currency policy: both → concatenated
    /// per-currency figures, one → that figure alone, none → unavailable.
    pub fn format(&self, active: &[Currency]) -> String {
        let real_on = active.contains(&Currency::Real);
        let dolar_on = active.contains(&Currency::Dolar);

        let part = |currency: Currency, v: Option<f64>| match v {
            Some(v) => format!("{} {:.2}", currency.symbol(), v),
            None => "N/A".to_string(),
        };

        match (real_on, dolar_on) {
            (true, true) => format!(
                "{} + {}",
                part(Currency::Real, self.real),
                part(Currency::Dolar, self.dolar)
            ),
            (true, false) => part(Currency::Real, self.real),
            (false, true) => part(Currency::Dolar, self.dolar),
            (false, false) => "N/A".to_string(),
        }
    }
}

/// The headline metrics of the dashboard cards, computed over one record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub hands: Option<f64>,
    pub wins: CurrencyAmounts,
    pub rakeback: CurrencyAmounts,
    pub rebate: CurrencyAmounts,
    pub balance: CurrencyAmounts,
}

impl MetricSummary {
    pub fn compute(records: &[LedgerRecord]) -> Self {
        let wins = CurrencyAmounts {
            real: sum_measure(records, Measure::RealWins),
            dolar: sum_measure(records, Measure::DolarWins),
        };
        let fee_real = sum_measure(records, Measure::RealFee);
        let fee_dolar = sum_measure(records, Measure::DolarFee);
        let rakeback = CurrencyAmounts {
            real: sum_measure(records, Measure::RealRakeback),
            dolar: sum_measure(records, Measure::DolarRakeback),
        };

        MetricSummary {
            hands: sum_measure(records, Measure::Hands),
            wins,
            rakeback,
            rebate: CurrencyAmounts {
                real: sum_measure(records, Measure::RealRebate),
                dolar: sum_measure(records, Measure::DolarRebate),
            },
            balance: CurrencyAmounts {
                real: balance(wins.real, fee_real, rakeback.real),
                dolar: balance(wins.dolar, fee_dolar, rakeback.dolar),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::testutil::record;

    #[test]
    fn test_sum_skips_absent_values() {
        // hands column [10, absent("bad"), absent(None), 5] → 15.
        let mut rows = vec![
            record("A", "C", "G", "R"),
            record("B", "C", "G", "R"),
            record("C", "C", "G", "R"),
            record("D", "C", "G", "R"),
        ];
        rows[0].hands = Some(10.0);
        rows[1].hands = None;
        rows[2].hands = None;
        rows[3].hands = Some(5.0);

        assert_eq!(sum_measure(&rows, Measure::Hands), Some(15.0));
    }

    #[test]
    fn test_empty_set_is_unavailable_not_zero() {
        assert_eq!(sum_measure(&[], Measure::RealWins), None);

        let totals = aggregate(&[], &Measure::ALL);
        assert!(totals.values().all(|v| v.is_none()));
    }

    #[test]
    fn test_all_absent_column_is_unavailable() {
        let rows = vec![record("A", "C", "G", "R"), record("B", "C", "G", "R")];
        assert_eq!(sum_measure(&rows, Measure::DolarRakeback), None);
    }

    #[test]
    fn test_aggregation_is_additive_across_page_slices() {
        let mut rows = Vec::new();
        for i in 0..25 {
            let mut r = record(&format!("P{i}"), "C", "G", "R");
            r.real_wins = Some(i as f64);
            // Leave every third row's fee absent.
            r.real_fee = if i % 3 == 0 { None } else { Some(1.5) };
            rows.push(r);
        }

        let full_wins = sum_measure(&rows, Measure::RealWins);
        let full_fee = sum_measure(&rows, Measure::RealFee);

        // Sum page-level totals over all pages of size 10.
        let mut paged_wins: Option<f64> = None;
        let mut paged_fee: Option<f64> = None;
        for chunk in rows.chunks(10) {
            if let Some(v) = sum_measure(chunk, Measure::RealWins) {
                *paged_wins.get_or_insert(0.0) += v;
            }
            if let Some(v) = sum_measure(chunk, Measure::RealFee) {
                *paged_fee.get_or_insert(0.0) += v;
            }
        }

        assert_eq!(paged_wins, full_wins);
        assert_eq!(paged_fee, full_fee);
    }

    #[test]
    fn test_balance_per_currency() {
        assert_eq!(balance(Some(100.0), Some(10.0), Some(5.0)), Some(95.0));
        assert_eq!(balance(Some(100.0), None, None), Some(100.0));
        assert_eq!(balance(None, Some(10.0), None), Some(-10.0));
        assert_eq!(balance(None, None, None), None);
    }

    #[test]
    fn test_currency_amounts_formatting_policy() {
        let amounts = CurrencyAmounts {
            real: Some(1500.0),
            dolar: Some(20.5),
        };
        assert_eq!(
            amounts.format(&[Currency::Real, Currency::Dolar]),
            "R$ 1500.00 + US$ 20.50"
        );
        assert_eq!(amounts.format(&[Currency::Real]), "R$ 1500.00");
        assert_eq!(amounts.format(&[Currency::Dolar]), "US$ 20.50");
        assert_eq!(amounts.format(&[]), "N/A");

        let missing = CurrencyAmounts {
            real: None,
            dolar: Some(1.0),
        };
        assert_eq!(
            missing.format(&[Currency::Real, Currency::Dolar]),
            "N/A + US$ 1.00"
        );
        assert_eq!(missing.format(&[Currency::Real]), "N/A");
    }

    #[test]
    fn test_metric_summary_balance_uses_aggregated_components() {
        let mut a = record("A", "C", "G", "R");
        a.real_wins = Some(100.0);
        a.real_fee = Some(10.0);
        a.real_rakeback = Some(4.0);
        a.hands = Some(50.0);
        let mut b = record("B", "C", "G", "R");
        b.real_wins = Some(-20.0);
        b.real_fee = Some(5.0);
        b.hands = Some(30.0);

        let summary = MetricSummary::compute(&[a, b]);
        assert_eq!(summary.hands, Some(80.0));
        assert_eq!(summary.wins.real, Some(80.0));
        assert_eq!(summary.balance.real, Some(80.0 - 15.0 + 4.0));
        // No dollar data anywhere: unavailable, not zero.
        assert_eq!(summary.wins.dolar, None);
        assert_eq!(summary.balance.dolar, None);
    }
}
