//! funnel-runner: headless runner for the reverse-funnel planner.
//!
//! Usage:
//!   funnel-runner --data-dir ./data
//!   funnel-runner --data-dir ./data --unit saas
//!   funnel-runner --data-dir ./data --json > plan.json

use anyhow::Result;
use funnel_core::{
    config::PlannerConfig,
    engine::PlanEngine,
    report::{PlanReport, UnitPlanOutput},
    types::MONTH_LABELS,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let json_mode = args.iter().any(|a| a == "--json");
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");
    let unit = arg_value(&args, "--unit");

    let config = PlannerConfig::load(data_dir)?;
    let run_id = format!("plan-{}", env!("CARGO_PKG_VERSION"));
    let mut engine = PlanEngine::build(run_id);

    if let Some(unit_id) = unit {
        let output = engine.run_unit(&config, unit_id)?;
        if json_mode {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_header(data_dir, config.units.len());
            print_unit(&output);
        }
        return Ok(());
    }

    let report = engine.run(&config)?;
    if json_mode {
        println!("{}", report.to_json()?);
    } else {
        print_header(data_dir, config.units.len());
        for output in report.units.values() {
            print_unit(output);
        }
        print_consolidated(&report);
    }

    log::debug!("{} events recorded", engine.event_log().len());
    Ok(())
}

fn print_header(data_dir: &str, unit_count: usize) {
    println!("Reverse-funnel planner: funnel-runner");
    println!("  data_dir:  {data_dir}");
    println!("  units:     {unit_count}");
    println!();
}

fn print_unit(output: &UnitPlanOutput) {
    let totals = &output.summary.totals;

    println!("=== {} ({}) ===", output.label, output.unit_id);
    println!(
        "  {:<4} {:>12} {:>12} {:>12} {:>8} {:>6} {:>6} {:>6} {:>6} {:>7} {:>12}",
        "mon", "target", "to sell", "recurring", "sales", "prop", "held", "sched", "mql", "leads", "investment"
    );
    for r in &output.records {
        println!(
            "  {:<4} {:>12.0} {:>12.0} {:>12.0} {:>8.2} {:>6} {:>6} {:>6} {:>6} {:>7} {:>12.0}",
            MONTH_LABELS.get(r.month).copied().unwrap_or("?"),
            r.target_revenue,
            r.revenue_to_sell,
            r.recurring_base,
            r.sales_count,
            r.proposal_count,
            r.meetings_held_count,
            r.meetings_scheduled_count,
            r.mql_count,
            r.lead_count,
            r.investment
        );
    }
    println!(
        "  quarters:   Q1 {:.0} | Q2 {:.0} | Q3 {:.0} | Q4 {:.0}",
        output.quarter_totals[0], output.quarter_totals[1], output.quarter_totals[2], output.quarter_totals[3]
    );
    println!(
        "  totals:     target ${:.0} | to sell ${:.0} | investment ${:.0} | ROI {:.2}",
        totals.total_target_revenue, totals.total_revenue_to_sell, totals.total_investment, totals.roi
    );
    println!(
        "  ratios:     {:.1}% of target | {:.1}% of gap | MQL budget ${:.0}",
        totals.investment_pct_of_target, totals.investment_pct_of_gap, output.summary.mql_budget
    );
    if let Some(growth) = output.summary.growth_vs_reference_pct {
        println!("  growth:     {growth:+.1}% vs reference year");
    }
    println!();
}

fn print_consolidated(report: &PlanReport) {
    let totals = &report.consolidated_totals;

    println!("=== CONSOLIDATED ===");
    for m in &report.consolidated {
        println!(
            "  {:<4} target ${:>12.0} | to sell ${:>12.0} | leads {:>6} | investment ${:>10.0}",
            MONTH_LABELS.get(m.month).copied().unwrap_or("?"),
            m.target_revenue,
            m.revenue_to_sell,
            m.lead_count,
            m.investment
        );
    }
    println!(
        "  total: investment ${:.0} | to sell ${:.0} | ROI {:.2}",
        totals.total_investment, totals.total_revenue_to_sell, totals.roi
    );
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
