//! The planning engine: runs the reverse-funnel pipeline per business unit.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Distribution subsystem  (quarterly → monthly targets)
//!   2. Recurrence subsystem    (recurring base, revenue to sell; skipped
//!                               for units without a recurring component)
//!   3. Funnel subsystem        (stage volumes, floored and shifted investment)
//!   then, across all units:
//!   4. Aggregation             (summaries, consolidated view, published targets)
//!
//! RULES:
//!   - Each unit is an independent pure computation; units never share state.
//!   - Units run in unit-id order so event logs are reproducible.
//!   - A run with a configuration equal to the previous one returns the
//!     previous report without recomputing.

use crate::{
    aggregation,
    config::PlannerConfig,
    distribution_subsystem::DistributionSubsystem,
    error::FunnelResult,
    event::{EventLogEntry, PlanEvent},
    funnel_subsystem::{FunnelSubsystem, MonthlyFunnelRecord},
    recurrence_subsystem::RecurrenceSubsystem,
    report::{PlanReport, UnitPlanOutput},
    subsystem::{PlanSubsystem, UnitPlan},
    types::{quarter_totals, RunId, HORIZON},
};
use std::collections::BTreeMap;

pub struct PlanEngine {
    pub run_id:    RunId,
    subsystems:    Vec<Box<dyn PlanSubsystem>>,
    event_log:     Vec<EventLogEntry>,
    last_run:      Option<(PlannerConfig, PlanReport)>,
    runs_computed: u64,
}

impl PlanEngine {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            subsystems:    Vec::new(),
            event_log:     Vec::new(),
            last_run:      None,
            runs_computed: 0,
        }
    }

    /// Build a fully wired engine with all subsystems registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(run_id: RunId) -> Self {
        let mut engine = PlanEngine::new(run_id);

        // EXECUTION ORDER: fixed, documented, never reordered.
        engine.register(Box::new(DistributionSubsystem));
        engine.register(Box::new(RecurrenceSubsystem));
        engine.register(Box::new(FunnelSubsystem));
        engine
    }

    /// Register a subsystem. Call in the documented execution order.
    pub fn register(&mut self, subsystem: Box<dyn PlanSubsystem>) {
        self.subsystems.push(subsystem);
    }

    /// Plan every unit and aggregate. Returns the cached report when the
    /// configuration is unchanged since the last run.
    pub fn run(&mut self, config: &PlannerConfig) -> FunnelResult<PlanReport> {
        if let Some((last_config, last_report)) = &self.last_run {
            if last_config == config {
                log::debug!("{}: configuration unchanged, reusing last report", self.run_id);
                return Ok(last_report.clone());
            }
        }

        config.validate()?;

        let mut units = BTreeMap::new();
        for unit_id in config.units.keys() {
            let output = self.run_pipeline(config, unit_id)?;
            units.insert(unit_id.clone(), output);
        }

        let record_sets: Vec<&[MonthlyFunnelRecord]> =
            units.values().map(|u| u.records.as_slice()).collect();
        let consolidated = aggregation::consolidate(&record_sets);
        let consolidated_totals = aggregation::consolidated_totals(&consolidated);
        let published_targets = aggregation::publish_targets(
            units.iter().map(|(id, u)| (id.as_str(), u.records.as_slice())),
        );

        let completed = PlanEvent::RunCompleted {
            run_id:     self.run_id.clone(),
            unit_count: units.len(),
        };
        append_event(&mut self.event_log, &self.run_id, None, "engine", &completed)?;

        log::info!(
            "{}: {} units, investment {:.0}, revenue to sell {:.0}, ROI {:.2}",
            self.run_id,
            units.len(),
            consolidated_totals.total_investment,
            consolidated_totals.total_revenue_to_sell,
            consolidated_totals.roi
        );

        let report = PlanReport {
            run_id: self.run_id.clone(),
            units,
            consolidated,
            consolidated_totals,
            published_targets,
        };
        self.runs_computed += 1;
        self.last_run = Some((config.clone(), report.clone()));
        Ok(report)
    }

    /// Plan a single unit. Does not touch the cached report.
    pub fn run_unit(&mut self, config: &PlannerConfig, unit_id: &str) -> FunnelResult<UnitPlanOutput> {
        let unit = config.unit(unit_id)?;
        unit.validate()?;
        config.target_for(unit_id)?.validate(unit_id)?;
        self.run_pipeline(config, unit_id)
    }

    /// Number of runs that actually recomputed (cache hits excluded).
    pub fn runs_computed(&self) -> u64 {
        self.runs_computed
    }

    pub fn event_log(&self) -> &[EventLogEntry] {
        &self.event_log
    }

    /// Events recorded for one unit, in emission order.
    pub fn events_for_unit(&self, unit_id: &str) -> Vec<&EventLogEntry> {
        self.event_log
            .iter()
            .filter(|e| e.unit.as_deref() == Some(unit_id))
            .collect()
    }

    fn run_pipeline(&mut self, config: &PlannerConfig, unit_id: &str) -> FunnelResult<UnitPlanOutput> {
        let unit = config.unit(unit_id)?.clone();
        let target = config.target_for(unit_id)?;
        let mut plan = UnitPlan::new(unit, target);
        let mut unit_events: Vec<PlanEvent> = Vec::new();

        // Execute each subsystem in registration order.
        // Each subsystem sees all events emitted so far for this unit.
        for subsystem in &mut self.subsystems {
            let new_events = subsystem.update(&mut plan, &unit_events)?;
            for event in &new_events {
                append_event(&mut self.event_log, &self.run_id, Some(unit_id), subsystem.name(), event)?;
                log::debug!("{unit_id} [{}] {}", subsystem.name(), event.type_name());
            }
            unit_events.extend(new_events);
        }

        let summary = aggregation::summarize(&plan.unit, &plan.records);
        log::info!(
            "{}: target {:.0}, to sell {:.0}, leads {}, investment {:.0}, ROI {:.2}",
            unit_id,
            summary.totals.total_target_revenue,
            summary.totals.total_revenue_to_sell,
            summary.totals.total_leads,
            summary.totals.total_investment,
            summary.totals.roi
        );

        let monthly = plan.monthly_target.unwrap_or([0.0; HORIZON]);
        Ok(UnitPlanOutput {
            unit_id:        unit_id.to_string(),
            label:          plan.unit.label.clone(),
            quarter_totals: quarter_totals(&monthly),
            records:        plan.records,
            summary,
        })
    }
}

fn append_event(
    entries: &mut Vec<EventLogEntry>,
    run_id: &str,
    unit: Option<&str>,
    subsystem: &str,
    event: &PlanEvent,
) -> FunnelResult<()> {
    entries.push(EventLogEntry {
        seq:        entries.len() as u64,
        run_id:     run_id.to_string(),
        unit:       unit.map(str::to_string),
        subsystem:  subsystem.to_string(),
        event_type: event.type_name().to_string(),
        payload:    serde_json::to_string(event)?,
    });
    Ok(())
}
