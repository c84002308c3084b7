//! Shared primitive types used across the entire planner.

/// Number of monthly periods in one plan. One period = one calendar month.
pub const HORIZON: usize = 12;

pub const QUARTERS: usize = 4;

pub const MONTHS_PER_QUARTER: usize = 3;

/// Zero-based month index, 0 = January.
pub type MonthIndex = usize;

/// A stable business-unit identifier ("sdr", "saas", ...).
pub type UnitId = String;

/// The canonical run identifier.
pub type RunId = String;

/// One value per month over the full horizon.
pub type MonthlySeries = [f64; HORIZON];

/// Month names used as keys in the published target map.
pub const MONTH_LABELS: [&str; HORIZON] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun",
    "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// Quarter (0..4) that a month belongs to.
pub fn quarter_of(month: MonthIndex) -> usize {
    month / MONTHS_PER_QUARTER
}

/// Month indices belonging to a quarter.
pub fn months_of(quarter: usize) -> std::ops::Range<MonthIndex> {
    let start = quarter * MONTHS_PER_QUARTER;
    start..start + MONTHS_PER_QUARTER
}

/// Sum each quarter's three months.
pub fn quarter_totals(series: &MonthlySeries) -> [f64; QUARTERS] {
    let mut totals = [0.0; QUARTERS];
    for (month, value) in series.iter().enumerate() {
        totals[quarter_of(month)] += value;
    }
    totals
}

/// Look up a month index by its label. Case-insensitive.
pub fn month_from_label(label: &str) -> Option<MonthIndex> {
    MONTH_LABELS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(label.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn months_map_to_quarters() {
        assert_eq!(quarter_of(0), 0);
        assert_eq!(quarter_of(2), 0);
        assert_eq!(quarter_of(3), 1);
        assert_eq!(quarter_of(11), 3);
        assert_eq!(months_of(2).collect::<Vec<_>>(), vec![6, 7, 8]);
    }

    #[test]
    fn quarter_totals_sum_three_months() {
        let series: MonthlySeries = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        assert_eq!(quarter_totals(&series), [6.0, 15.0, 24.0, 33.0]);
    }

    #[test]
    fn labels_resolve_case_insensitively() {
        assert_eq!(month_from_label("fev"), Some(1));
        assert_eq!(month_from_label(" Dez "), Some(11));
        assert_eq!(month_from_label("Feb"), None);
    }
}
