//! Reverse-funnel revenue planner.
//!
//! Turns a business unit's quarterly revenue target into the monthly
//! lead, meeting, proposal and sales volumes needed to hit it, and into
//! the marketing investment that produces those volumes.

pub mod aggregation;
pub mod config;
pub mod distribution_subsystem;
pub mod engine;
pub mod error;
pub mod event;
pub mod funnel_subsystem;
pub mod recurrence_subsystem;
pub mod report;
pub mod subsystem;
pub mod targets;
pub mod types;
