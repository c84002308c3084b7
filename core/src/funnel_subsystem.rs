//! Reverse funnel: revenue to sell into stage volumes and investment.
//!
//! Per month, from the bottom of the funnel up:
//!   sales              = revenue_to_sell / ticket_price   (fractional)
//!   proposals          = ceil(sales / proposal_to_sale)
//!   meetings held      = ceil(proposals / rr_to_proposal)
//!   meetings scheduled = ceil(meetings held / rm_to_rr)
//!   mqls               = ceil(meetings scheduled / mql_to_rm)
//!   leads              = ceil(mqls / lead_to_mql)
//!
//! Investment:
//!   raw        = sales × cost_per_result
//!   committed  = max(raw, committed of the previous month)   never decreases
//!   reported   = committed of the NEXT month                 spend in month i
//!                                                            produces month i+1
//!   December keeps its own committed value.
//!
//! An initial investment override replaces month 0's reported investment
//! and re-derives that month's sales and stage counts from it.
//!
//! Rates and ticket price are assumed validated (see BusinessUnitConfig::validate).

use crate::{
    config::{BusinessUnitConfig, ConversionRates},
    error::FunnelResult,
    event::PlanEvent,
    subsystem::{PlanSubsystem, UnitPlan},
    types::{MonthIndex, MonthlySeries, HORIZON},
};
use serde::{Deserialize, Serialize};

/// Absorbs float noise so that e.g. 10.0000000001 meetings counts as 10.
const CEIL_TOLERANCE: f64 = 1e-9;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFunnelRecord {
    pub month:                    MonthIndex,
    pub target_revenue:           f64,
    pub revenue_to_sell:          f64,
    pub recurring_base:           f64,
    pub sales_count:              f64,
    pub proposal_count:           u64,
    pub meetings_held_count:      u64,
    pub meetings_scheduled_count: u64,
    pub mql_count:                u64,
    pub lead_count:               u64,
    /// sales × cost, before the floor.
    pub raw_investment:           f64,
    /// After the monotonic floor, before the one-month shift.
    pub committed_investment:     f64,
    /// Reported spend that produced this month's volume.
    pub investment:               f64,
}

/// Stage volumes needed to close a given number of sales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FunnelCounts {
    pub sales:              f64,
    pub proposals:          u64,
    pub meetings_held:      u64,
    pub meetings_scheduled: u64,
    pub mqls:               u64,
    pub leads:              u64,
}

/// Loop-carried state between months.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct FunnelState {
    prior_investment: f64,
}

/// Round a stage volume up to a whole count.
pub fn ceil_count(value: f64) -> u64 {
    if value <= CEIL_TOLERANCE {
        0
    } else {
        (value - CEIL_TOLERANCE).ceil() as u64
    }
}

/// Walk the funnel upwards from `sales`.
pub fn invert_funnel(sales: f64, rates: &ConversionRates) -> FunnelCounts {
    let proposals = ceil_count(sales / rates.proposal_to_sale);
    let meetings_held = ceil_count(proposals as f64 / rates.rr_to_proposal);
    let meetings_scheduled = ceil_count(meetings_held as f64 / rates.rm_to_rr);
    let mqls = ceil_count(meetings_scheduled as f64 / rates.mql_to_rm);
    let leads = ceil_count(mqls as f64 / rates.lead_to_mql);

    FunnelCounts { sales, proposals, meetings_held, meetings_scheduled, mqls, leads }
}

/// Hold each value at or above every value before it.
pub fn apply_investment_floor(raw: &[f64]) -> Vec<f64> {
    raw.iter()
        .scan(FunnelState::default(), |state, &value| {
            let committed = value.max(state.prior_investment);
            state.prior_investment = committed;
            Some(committed)
        })
        .collect()
}

/// Report each month with the following month's spend; the last month
/// keeps its own.
pub fn shift_investment(committed: &[f64]) -> Vec<f64> {
    (0..committed.len())
        .map(|i| committed.get(i + 1).copied().unwrap_or(committed[i]))
        .collect()
}

/// Build the twelve funnel records for a unit.
///
/// `recurring_base` is absent for units without a recurring component,
/// and `monthly_targets` falls back to `revenue_to_sell` when absent.
pub fn compute_funnel(
    revenue_to_sell: &MonthlySeries,
    unit: &BusinessUnitConfig,
    recurring_base: Option<&MonthlySeries>,
    monthly_targets: Option<&MonthlySeries>,
) -> Vec<MonthlyFunnelRecord> {
    let cost = unit.cost_per_result();
    let targets = monthly_targets.unwrap_or(revenue_to_sell);

    let mut records: Vec<MonthlyFunnelRecord> = (0..HORIZON)
        .map(|month| {
            let to_sell = revenue_to_sell[month];
            let counts = invert_funnel(to_sell / unit.ticket_price, &unit.conversion_rates);
            let raw_investment = counts.sales * cost;
            record_from(month, targets[month], to_sell, recurring_base, counts, raw_investment)
        })
        .collect();

    let raw: Vec<f64> = records.iter().map(|r| r.raw_investment).collect();
    let committed = apply_investment_floor(&raw);
    let reported = shift_investment(&committed);
    for (record, (committed, reported)) in records.iter_mut().zip(committed.into_iter().zip(reported)) {
        record.committed_investment = committed;
        record.investment = reported;
    }

    if let Some(amount) = unit.initial_investment_override {
        let first = &mut records[0];
        let counts = invert_funnel(amount / cost, &unit.conversion_rates);
        apply_counts(first, counts);
        first.investment = amount;
    }

    records
}

fn record_from(
    month: MonthIndex,
    target_revenue: f64,
    revenue_to_sell: f64,
    recurring_base: Option<&MonthlySeries>,
    counts: FunnelCounts,
    raw_investment: f64,
) -> MonthlyFunnelRecord {
    let mut record = MonthlyFunnelRecord {
        month,
        target_revenue,
        revenue_to_sell,
        recurring_base: recurring_base.map_or(0.0, |base| base[month]),
        sales_count: 0.0,
        proposal_count: 0,
        meetings_held_count: 0,
        meetings_scheduled_count: 0,
        mql_count: 0,
        lead_count: 0,
        raw_investment,
        committed_investment: raw_investment,
        investment: raw_investment,
    };
    apply_counts(&mut record, counts);
    record
}

fn apply_counts(record: &mut MonthlyFunnelRecord, counts: FunnelCounts) {
    record.sales_count = counts.sales;
    record.proposal_count = counts.proposals;
    record.meetings_held_count = counts.meetings_held;
    record.meetings_scheduled_count = counts.meetings_scheduled;
    record.mql_count = counts.mqls;
    record.lead_count = counts.leads;
}

// ── Subsystem ────────────────────────────────────────────────────────────────

pub struct FunnelSubsystem;

impl PlanSubsystem for FunnelSubsystem {
    fn name(&self) -> &'static str {
        "funnel"
    }

    fn update(
        &mut self,
        plan: &mut UnitPlan,
        _events_in: &[PlanEvent],
    ) -> FunnelResult<Vec<PlanEvent>> {
        let targets = *plan.monthly_target()?;
        let (revenue_to_sell, recurring_base) = match &plan.recurrence {
            Some(outcome) => (outcome.revenue_to_sell, Some(outcome.recurring_base)),
            None          => (targets, None),
        };

        let records = compute_funnel(&revenue_to_sell, &plan.unit, recurring_base.as_ref(), Some(&targets));
        let unit_id = plan.unit_id().to_string();
        let mut events = Vec::new();

        for record in records.iter().filter(|r| r.committed_investment > r.raw_investment) {
            log::warn!(
                "{} month {}: investment floor {:.0} lifts raw requirement {:.0}",
                unit_id,
                record.month,
                record.committed_investment,
                record.raw_investment
            );
            events.push(PlanEvent::InvestmentFloorApplied {
                unit:  unit_id.clone(),
                month: record.month,
                raw:   record.raw_investment,
                floor: record.committed_investment,
            });
        }

        if let Some(amount) = plan.unit.initial_investment_override {
            events.push(PlanEvent::InitialInvestmentOverridden {
                unit: unit_id.clone(),
                amount,
                sales: records[0].sales_count,
            });
        }

        let total_leads: u64 = records.iter().map(|r| r.lead_count).sum();
        let total_investment: f64 = records.iter().map(|r| r.investment).sum();
        log::debug!("{unit_id}: funnel needs {total_leads} leads, investment {total_investment:.0}");
        events.push(PlanEvent::FunnelComputed { unit: unit_id, total_leads, total_investment });

        plan.records = records;
        Ok(events)
    }
}
