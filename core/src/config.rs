use crate::{
    error::{FunnelError, FunnelResult},
    targets::TargetSource,
    types::{months_of, MonthlySeries, UnitId, HORIZON, MONTHS_PER_QUARTER, QUARTERS},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance when checking that intra-quarter fractions sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ── Funnel parameters ──────────────────────────────────────────────

/// Stage-to-stage conversion rates, each in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionRates {
    pub lead_to_mql:      f64,
    pub mql_to_rm:        f64,
    pub rm_to_rr:         f64,
    pub rr_to_proposal:   f64,
    pub proposal_to_sale: f64,
}

impl ConversionRates {
    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("lead_to_mql", self.lead_to_mql),
            ("mql_to_rm", self.mql_to_rm),
            ("rm_to_rr", self.rm_to_rr),
            ("rr_to_proposal", self.rr_to_proposal),
            ("proposal_to_sale", self.proposal_to_sale),
        ]
    }
}

/// Which unit cost turns required sales into required investment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBasis {
    #[default]
    PerSale,
    PerAcquisition,
}

// ── Period distribution ────────────────────────────────────────────

/// How a unit's quarterly target is spread over the twelve months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionStrategy {
    /// Relative monthly weights scaled by `baseline`, then rescaled so each
    /// quarter lands exactly on its target.
    SmoothCurve {
        weights:  MonthlySeries,
        baseline: f64,
    },
    /// Fixed units sold per month times a ticket price. The quarterly target
    /// is ignored; quarter totals fall out of the table.
    UnitBased {
        units:        [u32; HORIZON],
        ticket_price: f64,
    },
    /// Fixed fractions of each quarter's target, one row per quarter.
    ProportionalWeights {
        quarter_weights: [[f64; MONTHS_PER_QUARTER]; QUARTERS],
    },
}

impl DistributionStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            DistributionStrategy::SmoothCurve { .. }         => "smooth_curve",
            DistributionStrategy::UnitBased { .. }           => "unit_based",
            DistributionStrategy::ProportionalWeights { .. } => "proportional_weights",
        }
    }

    /// True when the strategy consumes the unit's quarterly target.
    pub fn uses_quarterly_target(&self) -> bool {
        !matches!(self, DistributionStrategy::UnitBased { .. })
    }

    fn validate(&self, unit: &str) -> FunnelResult<()> {
        match self {
            DistributionStrategy::SmoothCurve { weights, baseline } => {
                if !(baseline.is_finite() && *baseline > 0.0) {
                    return Err(invalid(unit, "baseline", format!("must be > 0, got {baseline}")));
                }
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(invalid(unit, "weights", "must be finite and non-negative".into()));
                }
                for quarter in 0..QUARTERS {
                    let raw: f64 = months_of(quarter).map(|m| weights[m] * baseline).sum();
                    if raw <= 0.0 {
                        return Err(FunnelError::DegenerateBaseline { quarter: quarter + 1 });
                    }
                }
            }
            DistributionStrategy::UnitBased { ticket_price, .. } => {
                check_positive(unit, "unit_based.ticket_price", *ticket_price)?;
            }
            DistributionStrategy::ProportionalWeights { quarter_weights } => {
                for (quarter, row) in quarter_weights.iter().enumerate() {
                    if row.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        return Err(invalid(
                            unit,
                            "quarter_weights",
                            format!("Q{} has a negative or non-finite fraction", quarter + 1),
                        ));
                    }
                    let sum: f64 = row.iter().sum();
                    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                        return Err(invalid(
                            unit,
                            "quarter_weights",
                            format!("Q{} fractions sum to {sum:.6}, expected 1", quarter + 1),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

// ── Recurring revenue ──────────────────────────────────────────────

/// Subscription-style recurring revenue parameters. Units without a
/// recurring component leave this out and feed targets straight into
/// the funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceParams {
    pub initial_base:   f64,
    /// Fraction of the recurring base lost each month, in [0, 1).
    pub churn_rate:     f64,
    /// Fraction of last month's new-sale value retained as recurring revenue, in [0, 1].
    pub retention_rate: f64,
    /// Pins month 0's revenue-to-sell; the implied base is back-solved from it.
    #[serde(default)]
    pub initial_gap_override: Option<f64>,
}

// ── Targets ────────────────────────────────────────────────────────

/// A unit's revenue goal per quarter, Q1..Q4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuarterlyTarget(pub [f64; QUARTERS]);

impl QuarterlyTarget {
    pub fn new(q1: f64, q2: f64, q3: f64, q4: f64) -> Self {
        Self([q1, q2, q3, q4])
    }

    pub fn quarter(&self, quarter: usize) -> f64 {
        self.0[quarter]
    }

    pub fn annual_total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn validate(&self, unit: &str) -> FunnelResult<()> {
        for (quarter, value) in self.0.iter().enumerate() {
            if !value.is_finite() || *value < 0.0 {
                return Err(FunnelError::InvalidTarget {
                    unit:   unit.to_string(),
                    reason: format!("Q{} must be a non-negative amount, got {value}", quarter + 1),
                });
            }
        }
        Ok(())
    }
}

// ── Business unit ──────────────────────────────────────────────────

/// Immutable parameter set for one business unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessUnitConfig {
    pub unit_id:              UnitId,
    pub label:                String,
    pub ticket_price:         f64,
    pub conversion_rates:     ConversionRates,
    pub cost_per_sale:        f64,
    pub cost_per_acquisition: f64,
    pub cost_per_mql:         f64,
    #[serde(default)]
    pub cost_basis:           CostBasis,
    /// Replaces the basis cost for this run when set.
    #[serde(default)]
    pub cost_per_sale_override: Option<f64>,
    /// Month 0 investment for units without recurring-revenue history.
    #[serde(default)]
    pub initial_investment_override: Option<f64>,
    pub distribution:         DistributionStrategy,
    #[serde(default)]
    pub recurrence:           Option<RecurrenceParams>,
    /// Prior-year realised revenue, for growth reporting only.
    #[serde(default)]
    pub reference_revenue:    Option<f64>,
}

impl BusinessUnitConfig {
    /// Cost of producing one sale under this unit's cost basis.
    pub fn cost_per_result(&self) -> f64 {
        if let Some(cost) = self.cost_per_sale_override {
            return cost;
        }
        match self.cost_basis {
            CostBasis::PerSale        => self.cost_per_sale,
            CostBasis::PerAcquisition => self.cost_per_acquisition,
        }
    }

    /// Reject anything that would make the funnel inversion divide by zero
    /// or produce NaN.
    pub fn validate(&self) -> FunnelResult<()> {
        let unit = self.unit_id.as_str();

        check_positive(unit, "ticket_price", self.ticket_price)?;

        for (field, rate) in self.conversion_rates.named() {
            if !(rate.is_finite() && rate > 0.0 && rate <= 1.0) {
                return Err(invalid(unit, field, format!("must be in (0, 1], got {rate}")));
            }
        }

        check_non_negative(unit, "cost_per_sale", self.cost_per_sale)?;
        check_non_negative(unit, "cost_per_acquisition", self.cost_per_acquisition)?;
        check_non_negative(unit, "cost_per_mql", self.cost_per_mql)?;
        if let Some(cost) = self.cost_per_sale_override {
            check_non_negative(unit, "cost_per_sale_override", cost)?;
        }
        if let Some(amount) = self.initial_investment_override {
            check_non_negative(unit, "initial_investment_override", amount)?;
            // Month 0 sales are derived as override / cost.
            check_positive(unit, "cost_per_result", self.cost_per_result())?;
        }
        if let Some(revenue) = self.reference_revenue {
            check_non_negative(unit, "reference_revenue", revenue)?;
        }

        if let Some(rec) = &self.recurrence {
            check_non_negative(unit, "initial_base", rec.initial_base)?;
            if !(rec.churn_rate.is_finite() && (0.0..1.0).contains(&rec.churn_rate)) {
                return Err(invalid(unit, "churn_rate", format!("must be in [0, 1), got {}", rec.churn_rate)));
            }
            if !(rec.retention_rate.is_finite() && (0.0..=1.0).contains(&rec.retention_rate)) {
                return Err(invalid(
                    unit,
                    "retention_rate",
                    format!("must be in [0, 1], got {}", rec.retention_rate),
                ));
            }
            if let Some(gap) = rec.initial_gap_override {
                check_non_negative(unit, "initial_gap_override", gap)?;
            }
        }

        self.distribution.validate(unit)
    }
}

fn invalid(unit: &str, field: &'static str, reason: String) -> FunnelError {
    FunnelError::InvalidConfig { unit: unit.to_string(), field, reason }
}

fn check_positive(unit: &str, field: &'static str, value: f64) -> FunnelResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(unit, field, format!("must be > 0, got {value}")))
    }
}

fn check_non_negative(unit: &str, field: &'static str, value: f64) -> FunnelResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(unit, field, format!("must be >= 0, got {value}")))
    }
}

// ── Planner config ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct BusinessUnitsFile {
    units: Vec<BusinessUnitConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct QuarterlyTargetsFile {
    targets: BTreeMap<UnitId, QuarterlyTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub units:   BTreeMap<UnitId, BusinessUnitConfig>,
    pub targets: BTreeMap<UnitId, QuarterlyTarget>,
}

impl PlannerConfig {
    /// Load from the data/ directory.
    /// In tests, use PlannerConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let units_path = format!("{data_dir}/units/business_units.json");
        let units_content = std::fs::read_to_string(&units_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {units_path}: {e}"))?;
        let units_file: BusinessUnitsFile = serde_json::from_str(&units_content)?;
        let units = units_file
            .units
            .into_iter()
            .map(|u| (u.unit_id.clone(), u))
            .collect();

        let targets_path = format!("{data_dir}/targets/quarterly_targets.json");
        let targets_content = std::fs::read_to_string(&targets_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {targets_path}: {e}"))?;
        let targets_file: QuarterlyTargetsFile = serde_json::from_str(&targets_content)?;

        let config = Self { units, targets: targets_file.targets };
        config.validate()?;
        Ok(config)
    }

    pub fn unit(&self, unit_id: &str) -> FunnelResult<&BusinessUnitConfig> {
        self.units
            .get(unit_id)
            .ok_or_else(|| FunnelError::UnknownUnit { unit: unit_id.to_string() })
    }

    /// Quarterly target for a unit. Units whose strategy ignores the
    /// target get zeros when none is configured.
    pub fn target_for(&self, unit_id: &str) -> FunnelResult<QuarterlyTarget> {
        let unit = self.unit(unit_id)?;
        match self.targets.get(unit_id) {
            Some(target) => Ok(*target),
            None if !unit.distribution.uses_quarterly_target() => Ok(QuarterlyTarget::default()),
            None => Err(FunnelError::InvalidTarget {
                unit:   unit_id.to_string(),
                reason: "no quarterly target configured".into(),
            }),
        }
    }

    pub fn validate(&self) -> FunnelResult<()> {
        for (unit_id, unit) in &self.units {
            if unit_id != &unit.unit_id {
                return Err(invalid(
                    unit_id,
                    "unit_id",
                    format!("key '{unit_id}' does not match unit_id '{}'", unit.unit_id),
                ));
            }
            unit.validate()?;
            self.target_for(unit_id)?.validate(unit_id)?;
        }
        if let Some(orphan) = self.targets.keys().find(|id| !self.units.contains_key(*id)) {
            return Err(FunnelError::UnknownUnit { unit: orphan.clone() });
        }
        Ok(())
    }

    /// Replace every target-driven unit's quarterly target with one drawn
    /// from an external supplier.
    pub fn with_targets(&self, source: &dyn TargetSource) -> FunnelResult<Self> {
        let mut next = self.clone();
        for (unit_id, unit) in &self.units {
            if unit.distribution.uses_quarterly_target() {
                next.targets.insert(unit_id.clone(), source.quarterly_target(unit_id)?);
            }
        }
        Ok(next)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let saas = BusinessUnitConfig {
            unit_id: "saas".into(),
            label: "SaaS Subscriptions".into(),
            ticket_price: 17_000.0,
            conversion_rates: ConversionRates {
                lead_to_mql:      0.35,
                mql_to_rm:        0.40,
                rm_to_rr:         0.70,
                rr_to_proposal:   0.60,
                proposal_to_sale: 0.30,
            },
            cost_per_sale: 3_500.0,
            cost_per_acquisition: 4_200.0,
            cost_per_mql: 120.0,
            cost_basis: CostBasis::PerSale,
            cost_per_sale_override: None,
            initial_investment_override: None,
            distribution: DistributionStrategy::ProportionalWeights {
                quarter_weights: [
                    [0.30, 0.33, 0.37],
                    [0.30, 0.33, 0.37],
                    [0.30, 0.33, 0.37],
                    [0.34, 0.36, 0.30],
                ],
            },
            recurrence: Some(RecurrenceParams {
                initial_base:   700_000.0,
                churn_rate:     0.06,
                retention_rate: 0.25,
                initial_gap_override: None,
            }),
            reference_revenue: Some(15_000_000.0),
        };

        let consulting = BusinessUnitConfig {
            unit_id: "consulting".into(),
            label: "Consulting Projects".into(),
            ticket_price: 54_000.0,
            conversion_rates: ConversionRates {
                lead_to_mql:      0.25,
                mql_to_rm:        0.50,
                rm_to_rr:         0.80,
                rr_to_proposal:   0.50,
                proposal_to_sale: 0.40,
            },
            cost_per_sale: 9_000.0,
            cost_per_acquisition: 11_000.0,
            cost_per_mql: 300.0,
            cost_basis: CostBasis::PerSale,
            cost_per_sale_override: None,
            initial_investment_override: Some(9_000.0),
            distribution: DistributionStrategy::UnitBased {
                units: [1, 2, 2, 5, 5, 5, 10, 10, 10, 15, 18, 17],
                ticket_price: 54_000.0,
            },
            recurrence: None,
            reference_revenue: None,
        };

        let education = BusinessUnitConfig {
            unit_id: "education".into(),
            label: "Education Programs".into(),
            ticket_price: 2_500.0,
            conversion_rates: ConversionRates {
                lead_to_mql:      0.50,
                mql_to_rm:        0.30,
                rm_to_rr:         0.60,
                rr_to_proposal:   0.80,
                proposal_to_sale: 0.50,
            },
            cost_per_sale: 400.0,
            cost_per_acquisition: 550.0,
            cost_per_mql: 35.0,
            cost_basis: CostBasis::PerAcquisition,
            cost_per_sale_override: None,
            initial_investment_override: None,
            distribution: DistributionStrategy::SmoothCurve {
                weights: [1.0, 1.1, 1.2, 1.3, 1.4, 1.5, 1.6, 1.7, 1.8, 1.9, 2.0, 1.6],
                baseline: 100_000.0,
            },
            recurrence: None,
            reference_revenue: Some(2_000_000.0),
        };

        let units = [saas, consulting, education]
            .into_iter()
            .map(|u| (u.unit_id.clone(), u))
            .collect();

        let targets = BTreeMap::from([
            ("saas".to_string(), QuarterlyTarget::new(3_750_000.0, 4_500_000.0, 6_000_000.0, 8_000_000.0)),
            ("education".to_string(), QuarterlyTarget::new(450_000.0, 600_000.0, 700_000.0, 750_000.0)),
        ]);

        Self { units, targets }
    }
}
