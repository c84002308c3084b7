//! Reverse funnel tests: stage inversion, investment floor and shift.

use funnel_core::{
    config::{BusinessUnitConfig, ConversionRates, CostBasis, PlannerConfig},
    funnel_subsystem::{
        apply_investment_floor, ceil_count, compute_funnel, invert_funnel, shift_investment,
    },
    types::{MonthlySeries, HORIZON},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn unit(unit_id: &str) -> BusinessUnitConfig {
    PlannerConfig::default_test().units[unit_id].clone()
}

fn half_rates() -> ConversionRates {
    ConversionRates {
        lead_to_mql:      0.5,
        mql_to_rm:        0.5,
        rm_to_rr:         0.5,
        rr_to_proposal:   0.5,
        proposal_to_sale: 0.5,
    }
}

fn consulting_revenue() -> MonthlySeries {
    let units = [1.0, 2.0, 2.0, 5.0, 5.0, 5.0, 10.0, 10.0, 10.0, 15.0, 18.0, 17.0];
    units.map(|u| u * 54_000.0)
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// [100, 90, 110, 105] floors to [100, 100, 110, 110] and shifts to
/// [100, 110, 110, 110].
#[test]
fn floor_then_shift_sequence() {
    let committed = apply_investment_floor(&[100.0, 90.0, 110.0, 105.0]);
    assert_eq!(committed, vec![100.0, 100.0, 110.0, 110.0]);

    let reported = shift_investment(&committed);
    assert_eq!(reported, vec![100.0, 110.0, 110.0, 110.0]);
}

/// Empty and single-month inputs survive the floor and the shift.
#[test]
fn floor_and_shift_handle_short_inputs() {
    assert!(apply_investment_floor(&[]).is_empty());
    assert!(shift_investment(&[]).is_empty());
    assert_eq!(shift_investment(&[42.0]), vec![42.0]);
}

/// Each stage doubles through 50% conversion rates.
#[test]
fn inversion_walks_up_the_funnel() {
    let counts = invert_funnel(3.0, &half_rates());

    assert_eq!(counts.proposals, 6);
    assert_eq!(counts.meetings_held, 12);
    assert_eq!(counts.meetings_scheduled, 24);
    assert_eq!(counts.mqls, 48);
    assert_eq!(counts.leads, 96);
}

/// Fractional stage volumes round up; float noise does not.
#[test]
fn ceiling_rounds_up_but_absorbs_noise() {
    assert_eq!(ceil_count(0.0), 0);
    assert_eq!(ceil_count(-3.0), 0);
    assert_eq!(ceil_count(0.2), 1);
    assert_eq!(ceil_count(10.2), 11);
    assert_eq!(ceil_count(10.0), 10);
    assert_eq!(ceil_count(10.000_000_000_1), 10);
}

/// Every stage count is the ceiling of the stage below over its rate.
#[test]
fn stage_counts_are_consistent_with_rates() {
    let saas = unit("saas");
    let revenue: MonthlySeries = [
        550_000.0, 454_500.0, 0.0, 1_000_000.0, 17_000.0, 3.0,
        2_000_000.0, 123_456.0, 999_999.0, 750_000.0, 1.0, 4_250_000.0,
    ];
    let rates = saas.conversion_rates;

    let records = compute_funnel(&revenue, &saas, None, None);

    assert_eq!(records.len(), HORIZON);
    for r in &records {
        assert!(r.revenue_to_sell >= 0.0 && r.sales_count >= 0.0);
        assert_eq!(r.proposal_count, ceil_count(r.sales_count / rates.proposal_to_sale));
        assert_eq!(r.meetings_held_count, ceil_count(r.proposal_count as f64 / rates.rr_to_proposal));
        assert_eq!(r.meetings_scheduled_count, ceil_count(r.meetings_held_count as f64 / rates.rm_to_rr));
        assert_eq!(r.mql_count, ceil_count(r.meetings_scheduled_count as f64 / rates.mql_to_rm));
        assert_eq!(r.lead_count, ceil_count(r.mql_count as f64 / rates.lead_to_mql));
    }
}

/// Committed (pre-shift) investment never decreases month over month.
#[test]
fn committed_investment_is_monotonic() {
    let saas = unit("saas");
    let revenue: MonthlySeries = [
        900_000.0, 100_000.0, 500_000.0, 0.0, 1_200_000.0, 300_000.0,
        300_000.0, 2_000_000.0, 0.0, 50_000.0, 1_000_000.0, 10.0,
    ];

    let records = compute_funnel(&revenue, &saas, None, None);

    for pair in records.windows(2) {
        assert!(
            pair[1].committed_investment >= pair[0].committed_investment,
            "month {} committed {} dropped below {}",
            pair[1].month,
            pair[1].committed_investment,
            pair[0].committed_investment
        );
    }
}

/// Reported investment is the next month's committed value; December keeps its own.
#[test]
fn reported_investment_is_shifted_one_month() {
    let saas = unit("saas");
    let revenue: MonthlySeries = [
        100_000.0, 200_000.0, 150_000.0, 400_000.0, 400_000.0, 500_000.0,
        600_000.0, 550_000.0, 700_000.0, 800_000.0, 900_000.0, 850_000.0,
    ];

    let records = compute_funnel(&revenue, &saas, None, None);

    for month in 0..HORIZON - 1 {
        assert_eq!(records[month].investment, records[month + 1].committed_investment);
    }
    assert_eq!(records[HORIZON - 1].investment, records[HORIZON - 1].committed_investment);
}

/// Consulting sells whole projects: sales equal units, investment is
/// units × 9k, the December dip is floored, and month 0 takes the override.
#[test]
fn consulting_plan_end_to_end() {
    let consulting = unit("consulting");
    let revenue = consulting_revenue();

    let records = compute_funnel(&revenue, &consulting, None, Some(&revenue));

    assert_eq!(records[3].sales_count, 5.0);
    assert_eq!(records[11].raw_investment, 17.0 * 9_000.0);
    assert_eq!(records[11].committed_investment, 18.0 * 9_000.0);
    assert_eq!(records[1].investment, 18_000.0);
    assert_eq!(records[10].investment, 162_000.0);

    // Override: 9k / 9k per sale = 1 sale, walked up the funnel.
    let first = &records[0];
    assert_eq!(first.investment, 9_000.0);
    assert_eq!(first.sales_count, 1.0);
    assert_eq!(first.proposal_count, 3);
    assert_eq!(first.meetings_held_count, 6);
    assert_eq!(first.meetings_scheduled_count, 8);
    assert_eq!(first.mql_count, 16);
    assert_eq!(first.lead_count, 64);
}

/// Units without recurring revenue report a zero base and sell the full target.
#[test]
fn missing_recurring_base_reports_zero() {
    let education = unit("education");
    let revenue = [100_000.0; HORIZON];

    let records = compute_funnel(&revenue, &education, None, None);

    for r in &records {
        assert_eq!(r.recurring_base, 0.0);
        assert_eq!(r.target_revenue, r.revenue_to_sell);
    }
}

/// The cost basis picks which unit cost prices a sale; an explicit
/// override beats both.
#[test]
fn cost_basis_selects_unit_cost() {
    let revenue = [25_000.0; HORIZON]; // 10 sales at 2.5k
    let mut education = unit("education");

    education.cost_basis = CostBasis::PerAcquisition;
    let per_acquisition = compute_funnel(&revenue, &education, None, None);
    assert!((per_acquisition[5].raw_investment - 10.0 * 550.0).abs() < 1e-9);

    education.cost_basis = CostBasis::PerSale;
    let per_sale = compute_funnel(&revenue, &education, None, None);
    assert!((per_sale[5].raw_investment - 10.0 * 400.0).abs() < 1e-9);

    education.cost_per_sale_override = Some(1_000.0);
    let overridden = compute_funnel(&revenue, &education, None, None);
    assert!((overridden[5].raw_investment - 10.0 * 1_000.0).abs() < 1e-9);
}
