//! Subsystem trait and the per-unit working record it operates on.
//!
//! RULE: Every pipeline stage implements PlanSubsystem.
//! The engine calls update() on each registered subsystem
//! in registration order, once per business unit.
//! Execution order is fixed and documented in engine.rs.

use crate::{
    config::{BusinessUnitConfig, QuarterlyTarget},
    error::{FunnelError, FunnelResult},
    event::PlanEvent,
    funnel_subsystem::MonthlyFunnelRecord,
    recurrence_subsystem::RecurrenceOutcome,
    types::MonthlySeries,
};

/// Everything known about one unit while its pipeline runs.
/// Each stage fills in its own slot; later stages read earlier slots.
#[derive(Debug, Clone)]
pub struct UnitPlan {
    pub unit:             BusinessUnitConfig,
    pub quarterly_target: QuarterlyTarget,
    pub monthly_target:   Option<MonthlySeries>,
    pub recurrence:       Option<RecurrenceOutcome>,
    pub records:          Vec<MonthlyFunnelRecord>,
}

impl UnitPlan {
    pub fn new(unit: BusinessUnitConfig, quarterly_target: QuarterlyTarget) -> Self {
        Self {
            unit,
            quarterly_target,
            monthly_target: None,
            recurrence: None,
            records: Vec::new(),
        }
    }

    pub fn unit_id(&self) -> &str {
        &self.unit.unit_id
    }

    /// Monthly targets, once the distribution stage has run.
    pub fn monthly_target(&self) -> FunnelResult<&MonthlySeries> {
        self.monthly_target.as_ref().ok_or_else(|| {
            FunnelError::Other(anyhow::anyhow!(
                "unit '{}': monthly targets requested before distribution ran",
                self.unit.unit_id
            ))
        })
    }
}

/// The contract every pipeline stage must fulfill.
pub trait PlanSubsystem: Send {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per unit by the engine.
    ///
    /// - `plan`:      the unit's working record, filled by earlier stages
    /// - `events_in`: events emitted by earlier stages for this unit
    ///
    /// Returns a vec of new events to add to the run's event log.
    fn update(
        &mut self,
        plan: &mut UnitPlan,
        events_in: &[PlanEvent],
    ) -> FunnelResult<Vec<PlanEvent>>;
}
