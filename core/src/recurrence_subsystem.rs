//! Recurring-revenue simulation: how much of each month's target is
//! already covered by subscription revenue, and how much must be sold.
//!
//! The recurrence is an explicit fold over the twelve months with
//! RecurrenceState as the accumulator:
//!   1. The base decays by the churn rate.
//!   2. Last month's new sales add `sales × ticket × retention` to the base.
//!   3. Revenue to sell is the shortfall `max(0, target − base)`.
//!   4. New sales this month are `revenue_to_sell / ticket` (fractional).
//!
//! A month that overshoots its target is clamped to zero; the surplus
//! is not carried forward.
//!
//! Units without a recurrence block skip this stage.

use crate::{
    config::RecurrenceParams,
    error::FunnelResult,
    event::PlanEvent,
    subsystem::{PlanSubsystem, UnitPlan},
    types::{MonthlySeries, HORIZON},
};
use serde::{Deserialize, Serialize};

// ── Public types ─────────────────────────────────────────────────────────────

/// Loop-carried state between months.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceState {
    /// Base entering the month, after churn but before retention.
    pub recurring_base:        f64,
    pub prior_month_new_sales: f64,
}

/// One month of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceMonth {
    pub recurring_base:  f64,
    pub revenue_to_sell: f64,
    pub new_sales_count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceOutcome {
    pub recurring_base:  MonthlySeries,
    pub revenue_to_sell: MonthlySeries,
    pub new_sales_count: MonthlySeries,
}

impl RecurrenceState {
    /// Month 0 state. With a gap override the base is back-solved so the
    /// first month's revenue to sell equals the override.
    pub fn initial(params: &RecurrenceParams, first_target: f64) -> Self {
        let recurring_base = match params.initial_gap_override {
            Some(gap) => first_target - gap,
            None      => params.initial_base,
        };
        Self { recurring_base, prior_month_new_sales: 0.0 }
    }

    /// Advance one month. Returns the state for the next month and this
    /// month's figures.
    pub fn step(
        self,
        target: f64,
        params: &RecurrenceParams,
        ticket_price: f64,
    ) -> (Self, RecurrenceMonth) {
        let base = self.recurring_base
            + self.prior_month_new_sales * ticket_price * params.retention_rate;
        let revenue_to_sell = (target - base).max(0.0);
        let new_sales_count = revenue_to_sell / ticket_price;

        let next = Self {
            recurring_base:        base * (1.0 - params.churn_rate),
            prior_month_new_sales: new_sales_count,
        };
        (next, RecurrenceMonth { recurring_base: base, revenue_to_sell, new_sales_count })
    }
}

/// Run the recurrence over the full horizon.
pub fn simulate(
    params: &RecurrenceParams,
    monthly_targets: &MonthlySeries,
    ticket_price: f64,
) -> RecurrenceOutcome {
    let seed = RecurrenceState::initial(params, monthly_targets[0]);

    let (_, months) = monthly_targets.iter().fold(
        (seed, Vec::with_capacity(HORIZON)),
        |(state, mut months), &target| {
            let (next, month) = state.step(target, params, ticket_price);
            months.push(month);
            (next, months)
        },
    );

    let mut outcome = RecurrenceOutcome {
        recurring_base:  [0.0; HORIZON],
        revenue_to_sell: [0.0; HORIZON],
        new_sales_count: [0.0; HORIZON],
    };
    for (i, month) in months.iter().enumerate() {
        outcome.recurring_base[i] = month.recurring_base;
        outcome.revenue_to_sell[i] = month.revenue_to_sell;
        outcome.new_sales_count[i] = month.new_sales_count;
    }
    outcome
}

// ── Subsystem ────────────────────────────────────────────────────────────────

pub struct RecurrenceSubsystem;

impl PlanSubsystem for RecurrenceSubsystem {
    fn name(&self) -> &'static str {
        "recurrence"
    }

    fn update(
        &mut self,
        plan: &mut UnitPlan,
        _events_in: &[PlanEvent],
    ) -> FunnelResult<Vec<PlanEvent>> {
        let Some(params) = plan.unit.recurrence.clone() else {
            plan.recurrence = None;
            return Ok(vec![PlanEvent::RecurrenceSkipped { unit: plan.unit_id().to_string() }]);
        };

        let targets = *plan.monthly_target()?;
        let outcome = simulate(&params, &targets, plan.unit.ticket_price);

        let mut covered_months = 0;
        for (month, (target, to_sell)) in targets.iter().zip(&outcome.revenue_to_sell).enumerate() {
            if *target > 0.0 && *to_sell == 0.0 {
                covered_months += 1;
                log::warn!(
                    "{} month {}: target {:.0} already covered by recurring base {:.0}",
                    plan.unit_id(),
                    month,
                    target,
                    outcome.recurring_base[month]
                );
            }
        }

        let event = PlanEvent::RecurrenceSimulated {
            unit:          plan.unit_id().to_string(),
            final_base:    outcome.recurring_base[HORIZON - 1],
            total_to_sell: outcome.revenue_to_sell.iter().sum(),
            covered_months,
        };
        plan.recurrence = Some(outcome);
        Ok(vec![event])
    }
}
