//! Plan events: what each pipeline stage did for a unit.
//!
//! RULE: Stages communicate their outcome through the UnitPlan they
//! write to; events are the audit trail of that outcome, never an input
//! to the numbers.

use crate::types::{MonthIndex, RunId, UnitId};
use serde::{Deserialize, Serialize};

/// Every event emitted during a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanEvent {
    // ── Distribution ───────────────────────────────
    TargetsDistributed {
        unit:         UnitId,
        strategy:     String,
        annual_total: f64,
    },

    // ── Recurrence ─────────────────────────────────
    RecurrenceSimulated {
        unit:             UnitId,
        final_base:       f64,
        total_to_sell:    f64,
        covered_months:   usize,
    },
    RecurrenceSkipped {
        unit: UnitId,
    },

    // ── Funnel ─────────────────────────────────────
    InvestmentFloorApplied {
        unit:  UnitId,
        month: MonthIndex,
        raw:   f64,
        floor: f64,
    },
    InitialInvestmentOverridden {
        unit:   UnitId,
        amount: f64,
        sales:  f64,
    },
    FunnelComputed {
        unit:             UnitId,
        total_leads:      u64,
        total_investment: f64,
    },

    // ── Engine ─────────────────────────────────────
    RunCompleted {
        run_id:     RunId,
        unit_count: usize,
    },
}

impl PlanEvent {
    /// Stable string name of the variant, for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            PlanEvent::TargetsDistributed { .. }          => "targets_distributed",
            PlanEvent::RecurrenceSimulated { .. }         => "recurrence_simulated",
            PlanEvent::RecurrenceSkipped { .. }           => "recurrence_skipped",
            PlanEvent::InvestmentFloorApplied { .. }      => "investment_floor_applied",
            PlanEvent::InitialInvestmentOverridden { .. } => "initial_investment_overridden",
            PlanEvent::FunnelComputed { .. }              => "funnel_computed",
            PlanEvent::RunCompleted { .. }                => "run_completed",
        }
    }
}

/// One row of the in-memory event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub seq:        u64,
    pub run_id:     RunId,
    pub unit:       Option<UnitId>,
    pub subsystem:  String,
    pub event_type: String,
    pub payload:    String,
}
