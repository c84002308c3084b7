//! Plan report: the full output of one planning run, serialisable to JSON.

use crate::{
    aggregation::{ConsolidatedMonth, PlanTotals, PublishedTargets, UnitSummary},
    error::FunnelResult,
    funnel_subsystem::MonthlyFunnelRecord,
    types::{RunId, UnitId, QUARTERS},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One unit's finished plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPlanOutput {
    pub unit_id:  UnitId,
    pub label:    String,
    /// Quarter totals of the distributed monthly targets.
    pub quarter_totals: [f64; QUARTERS],
    pub records:  Vec<MonthlyFunnelRecord>,
    pub summary:  UnitSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub run_id:              RunId,
    pub units:               BTreeMap<UnitId, UnitPlanOutput>,
    pub consolidated:        Vec<ConsolidatedMonth>,
    pub consolidated_totals: PlanTotals,
    pub published_targets:   PublishedTargets,
}

impl PlanReport {
    pub fn unit(&self, unit_id: &str) -> Option<&UnitPlanOutput> {
        self.units.get(unit_id)
    }

    pub fn to_json(&self) -> FunnelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> FunnelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
