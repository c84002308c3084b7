//! Recurring-revenue simulation tests.

use funnel_core::{
    config::RecurrenceParams,
    recurrence_subsystem::{simulate, RecurrenceState},
    types::{MonthlySeries, HORIZON},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

const TICKET: f64 = 17_000.0;

fn saas_params() -> RecurrenceParams {
    RecurrenceParams {
        initial_base:   700_000.0,
        churn_rate:     0.06,
        retention_rate: 0.25,
        initial_gap_override: None,
    }
}

fn flat(value: f64) -> MonthlySeries {
    [value; HORIZON]
}

fn assert_close(actual: f64, expected: f64, what: &str) {
    let tolerance = 1e-6 * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance,
        "{what}: expected {expected}, got {actual}"
    );
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// 1.25M target against a 700k base leaves 550k to sell, ≈ 32.35 sales.
#[test]
fn first_month_gap_is_target_minus_base() {
    let outcome = simulate(&saas_params(), &flat(1_250_000.0), TICKET);

    assert_close(outcome.recurring_base[0], 700_000.0, "base[0]");
    assert_close(outcome.revenue_to_sell[0], 550_000.0, "revenue_to_sell[0]");
    assert_close(outcome.new_sales_count[0], 550_000.0 / 17_000.0, "new_sales[0]");
    assert!((outcome.new_sales_count[0] - 32.35).abs() < 0.01);
}

/// Month 1 base = 700k × 0.94 + 32.35 sales × 17k × 0.25 retained.
#[test]
fn retained_sales_feed_next_month_base() {
    let outcome = simulate(&saas_params(), &flat(1_250_000.0), TICKET);

    let expected_base = 700_000.0 * 0.94 + 550_000.0 * 0.25;
    assert_close(outcome.recurring_base[1], expected_base, "base[1]");
    assert_close(outcome.revenue_to_sell[1], 1_250_000.0 - expected_base, "revenue_to_sell[1]");
}

/// With no retention and nothing to sell, the base decays geometrically.
#[test]
fn base_decays_by_churn_without_sales() {
    let params = RecurrenceParams { retention_rate: 0.0, ..saas_params() };

    let outcome = simulate(&params, &flat(0.0), TICKET);

    for month in 0..HORIZON {
        let expected = 700_000.0 * 0.94_f64.powi(month as i32);
        assert_close(outcome.recurring_base[month], expected, "decayed base");
        assert_eq!(outcome.revenue_to_sell[month], 0.0);
        assert_eq!(outcome.new_sales_count[month], 0.0);
    }
}

/// A target already covered by the base yields zero to sell, never negative.
#[test]
fn revenue_to_sell_clamped_at_zero() {
    let outcome = simulate(&saas_params(), &flat(400_000.0), TICKET);

    for month in 0..HORIZON {
        assert!(outcome.revenue_to_sell[month] >= 0.0);
    }
    assert_eq!(outcome.revenue_to_sell[0], 0.0);
}

/// Overshooting one month earns no credit in the next: the base simply
/// decays from where it was.
#[test]
fn surplus_is_not_carried_forward() {
    let mut targets = flat(1_250_000.0);
    targets[0] = 0.0;

    let outcome = simulate(&saas_params(), &targets, TICKET);

    assert_eq!(outcome.revenue_to_sell[0], 0.0);
    assert_close(outcome.recurring_base[1], 700_000.0 * 0.94, "base[1]");
    assert_close(outcome.revenue_to_sell[1], 1_250_000.0 - 658_000.0, "revenue_to_sell[1]");
}

/// A gap override pins month 0's revenue to sell and back-solves the base.
#[test]
fn gap_override_pins_first_month() {
    let params = RecurrenceParams { initial_gap_override: Some(200_000.0), ..saas_params() };

    let outcome = simulate(&params, &flat(1_250_000.0), TICKET);

    assert_close(outcome.recurring_base[0], 1_050_000.0, "back-solved base");
    assert_close(outcome.revenue_to_sell[0], 200_000.0, "pinned gap");
}

/// Stepping the state by hand reproduces the full simulation.
#[test]
fn manual_steps_match_simulation() {
    let params = saas_params();
    let targets: MonthlySeries = [
        1_125_000.0, 1_237_500.0, 1_387_500.0, 1_350_000.0, 1_485_000.0, 1_665_000.0,
        1_800_000.0, 1_980_000.0, 2_220_000.0, 2_720_000.0, 2_880_000.0, 2_400_000.0,
    ];
    let outcome = simulate(&params, &targets, TICKET);

    let mut state = RecurrenceState::initial(&params, targets[0]);
    for (month, target) in targets.iter().enumerate() {
        let (next, figures) = state.step(*target, &params, TICKET);
        assert_eq!(figures.recurring_base, outcome.recurring_base[month]);
        assert_eq!(figures.revenue_to_sell, outcome.revenue_to_sell[month]);
        assert_eq!(figures.new_sales_count, outcome.new_sales_count[month]);
        state = next;
    }
}
