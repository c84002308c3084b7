//! Aggregation: per-unit totals, consolidated monthly view across units,
//! and the published unit → month → target map.
//!
//! Pure functions over finished funnel records. Nothing here feeds back
//! into the pipeline.

use crate::{
    config::BusinessUnitConfig,
    funnel_subsystem::MonthlyFunnelRecord,
    types::{MonthIndex, UnitId, HORIZON, MONTH_LABELS},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// unit → month name → target revenue, for reporting views that compare
/// implied targets against realised sales.
pub type PublishedTargets = BTreeMap<UnitId, BTreeMap<String, f64>>;

/// Totals and ratios over a set of months.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanTotals {
    pub total_investment:        f64,
    pub total_target_revenue:    f64,
    pub total_revenue_to_sell:   f64,
    pub total_sales:             f64,
    pub total_leads:             u64,
    pub total_mqls:              u64,
    /// Revenue to sell per unit of investment. 0 when nothing is invested.
    pub roi:                     f64,
    pub investment_pct_of_target: f64,
    pub investment_pct_of_gap:   f64,
}

impl PlanTotals {
    fn finish(mut self) -> Self {
        self.roi = roi(self.total_revenue_to_sell, self.total_investment);
        self.investment_pct_of_target = pct(self.total_investment, self.total_target_revenue);
        self.investment_pct_of_gap = pct(self.total_investment, self.total_revenue_to_sell);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSummary {
    pub unit_id:    UnitId,
    #[serde(flatten)]
    pub totals:     PlanTotals,
    /// Σ mql_count × cost_per_mql.
    pub mql_budget: f64,
    /// Target growth over the reference year, in percent.
    pub growth_vs_reference_pct: Option<f64>,
}

/// Element-wise month sums across units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedMonth {
    pub month:           MonthIndex,
    pub target_revenue:  f64,
    pub revenue_to_sell: f64,
    pub recurring_base:  f64,
    pub sales_count:     f64,
    pub mql_count:       u64,
    pub lead_count:      u64,
    pub investment:      f64,
}

pub fn roi(total_revenue_to_sell: f64, total_investment: f64) -> f64 {
    if total_investment > 0.0 {
        total_revenue_to_sell / total_investment
    } else {
        0.0
    }
}

fn pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

pub fn totals(records: &[MonthlyFunnelRecord]) -> PlanTotals {
    records
        .iter()
        .fold(PlanTotals::default(), |mut acc, r| {
            acc.total_investment += r.investment;
            acc.total_target_revenue += r.target_revenue;
            acc.total_revenue_to_sell += r.revenue_to_sell;
            acc.total_sales += r.sales_count;
            acc.total_leads += r.lead_count;
            acc.total_mqls += r.mql_count;
            acc
        })
        .finish()
}

pub fn summarize(unit: &BusinessUnitConfig, records: &[MonthlyFunnelRecord]) -> UnitSummary {
    let totals = totals(records);
    let mql_budget = totals.total_mqls as f64 * unit.cost_per_mql;
    let growth_vs_reference_pct = unit
        .reference_revenue
        .filter(|reference| *reference > 0.0)
        .map(|reference| (totals.total_target_revenue / reference - 1.0) * 100.0);

    UnitSummary {
        unit_id: unit.unit_id.clone(),
        totals,
        mql_budget,
        growth_vs_reference_pct,
    }
}

pub fn consolidate(units: &[&[MonthlyFunnelRecord]]) -> Vec<ConsolidatedMonth> {
    let mut months: Vec<ConsolidatedMonth> = (0..HORIZON)
        .map(|month| ConsolidatedMonth { month, ..ConsolidatedMonth::default() })
        .collect();

    for record in units.iter().flat_map(|records| records.iter()) {
        let Some(slot) = months.get_mut(record.month) else { continue };
        slot.target_revenue += record.target_revenue;
        slot.revenue_to_sell += record.revenue_to_sell;
        slot.recurring_base += record.recurring_base;
        slot.sales_count += record.sales_count;
        slot.mql_count += record.mql_count;
        slot.lead_count += record.lead_count;
        slot.investment += record.investment;
    }
    months
}

/// Totals over a consolidated view.
pub fn consolidated_totals(months: &[ConsolidatedMonth]) -> PlanTotals {
    months
        .iter()
        .fold(PlanTotals::default(), |mut acc, m| {
            acc.total_investment += m.investment;
            acc.total_target_revenue += m.target_revenue;
            acc.total_revenue_to_sell += m.revenue_to_sell;
            acc.total_sales += m.sales_count;
            acc.total_leads += m.lead_count;
            acc.total_mqls += m.mql_count;
            acc
        })
        .finish()
}

pub fn publish_targets<'a, I>(units: I) -> PublishedTargets
where
    I: IntoIterator<Item = (&'a str, &'a [MonthlyFunnelRecord])>,
{
    units
        .into_iter()
        .map(|(unit_id, records)| {
            let months = records
                .iter()
                .filter_map(|r| {
                    MONTH_LABELS
                        .get(r.month)
                        .map(|label| (label.to_string(), r.target_revenue))
                })
                .collect();
            (unit_id.to_string(), months)
        })
        .collect()
}
