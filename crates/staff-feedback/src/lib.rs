//! Supervisor feedback intake for instructional staff.
//!
//! A session loads the unit catalog once, resolves a unit to its staff roster,
//! collects one rating per evaluation criterion, and submits the result to the
//! primary store before mirroring it to the reporting spreadsheet.

pub mod config;
pub mod error;
pub mod integrations;
pub mod telemetry;
pub mod workflows;
