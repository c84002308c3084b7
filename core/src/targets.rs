//! Target suppliers: where a unit's quarterly revenue goal comes from.
//!
//! The planner never reads spreadsheets itself. Whatever feeds it
//! (hardcoded defaults, a sheet export, a remote service) is wrapped in
//! a TargetSource and handed to PlannerConfig::with_targets.

use crate::{
    config::QuarterlyTarget,
    error::{FunnelError, FunnelResult},
    types::{month_from_label, quarter_of, UnitId, QUARTERS},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub trait TargetSource {
    fn quarterly_target(&self, unit_id: &str) -> FunnelResult<QuarterlyTarget>;
}

/// Literal per-unit quarterly targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticTargets(pub BTreeMap<UnitId, QuarterlyTarget>);

impl TargetSource for StaticTargets {
    fn quarterly_target(&self, unit_id: &str) -> FunnelResult<QuarterlyTarget> {
        self.0
            .get(unit_id)
            .copied()
            .ok_or_else(|| FunnelError::UnknownUnit { unit: unit_id.to_string() })
    }
}

/// Month-keyed revenue numbers per unit, the shape a sheet export arrives in:
/// `{ "saas": { "Jan": 1125000, "Fev": 1237500, ... } }`.
/// Months that are absent count as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthlyTargetSheet(pub BTreeMap<UnitId, BTreeMap<String, f64>>);

impl MonthlyTargetSheet {
    pub fn from_json(json: &str) -> FunnelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl TargetSource for MonthlyTargetSheet {
    fn quarterly_target(&self, unit_id: &str) -> FunnelResult<QuarterlyTarget> {
        let months = self
            .0
            .get(unit_id)
            .ok_or_else(|| FunnelError::UnknownUnit { unit: unit_id.to_string() })?;

        let mut quarters = [0.0; QUARTERS];
        for (label, value) in months {
            let month = month_from_label(label).ok_or_else(|| FunnelError::InvalidTarget {
                unit:   unit_id.to_string(),
                reason: format!("unknown month name '{label}'"),
            })?;
            quarters[quarter_of(month)] += value;
        }

        let target = QuarterlyTarget(quarters);
        target.validate(unit_id)?;
        Ok(target)
    }
}
