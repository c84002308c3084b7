//! Period distribution: quarterly targets into twelve monthly targets.
//!
//! Every strategy guarantees that the three months of a quarter add up
//! to that quarter's total. For unit-based distribution the quarter
//! totals are an output rather than an input.

use crate::{
    config::{DistributionStrategy, QuarterlyTarget},
    error::{FunnelError, FunnelResult},
    event::PlanEvent,
    subsystem::{PlanSubsystem, UnitPlan},
    types::{months_of, MonthlySeries, HORIZON, QUARTERS},
};

/// Spread a quarterly target over the horizon using `strategy`.
pub fn distribute(
    target: &QuarterlyTarget,
    strategy: &DistributionStrategy,
) -> FunnelResult<MonthlySeries> {
    match strategy {
        DistributionStrategy::SmoothCurve { weights, baseline } => {
            smooth_curve(target, weights, *baseline)
        }
        DistributionStrategy::UnitBased { units, ticket_price } => {
            Ok(unit_based(units, *ticket_price))
        }
        DistributionStrategy::ProportionalWeights { quarter_weights } => {
            Ok(proportional(target, quarter_weights))
        }
    }
}

fn smooth_curve(
    target: &QuarterlyTarget,
    weights: &MonthlySeries,
    baseline: f64,
) -> FunnelResult<MonthlySeries> {
    let mut monthly = [0.0; HORIZON];
    for quarter in 0..QUARTERS {
        let raw_sum: f64 = months_of(quarter).map(|m| weights[m] * baseline).sum();
        if raw_sum.is_nan() || raw_sum <= 0.0 {
            return Err(FunnelError::DegenerateBaseline { quarter: quarter + 1 });
        }
        let scale = target.quarter(quarter) / raw_sum;
        for month in months_of(quarter) {
            monthly[month] = weights[month] * baseline * scale;
        }
    }
    Ok(monthly)
}

fn unit_based(units: &[u32; HORIZON], ticket_price: f64) -> MonthlySeries {
    let mut monthly = [0.0; HORIZON];
    for (slot, count) in monthly.iter_mut().zip(units) {
        *slot = f64::from(*count) * ticket_price;
    }
    monthly
}

fn proportional(target: &QuarterlyTarget, quarter_weights: &[[f64; 3]; QUARTERS]) -> MonthlySeries {
    let mut monthly = [0.0; HORIZON];
    for (quarter, fractions) in quarter_weights.iter().enumerate() {
        for (month, fraction) in months_of(quarter).zip(fractions) {
            monthly[month] = target.quarter(quarter) * fraction;
        }
    }
    monthly
}

// ── Subsystem ────────────────────────────────────────────────────────────────

pub struct DistributionSubsystem;

impl PlanSubsystem for DistributionSubsystem {
    fn name(&self) -> &'static str {
        "distribution"
    }

    fn update(
        &mut self,
        plan: &mut UnitPlan,
        _events_in: &[PlanEvent],
    ) -> FunnelResult<Vec<PlanEvent>> {
        let monthly = distribute(&plan.quarterly_target, &plan.unit.distribution)?;
        let annual_total: f64 = monthly.iter().sum();
        plan.monthly_target = Some(monthly);

        log::debug!(
            "{}: distributed {:.0} over {} months ({})",
            plan.unit_id(),
            annual_total,
            HORIZON,
            plan.unit.distribution.label()
        );

        Ok(vec![PlanEvent::TargetsDistributed {
            unit:     plan.unit_id().to_string(),
            strategy: plan.unit.distribution.label().to_string(),
            annual_total,
        }])
    }
}
