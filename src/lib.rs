//! Country and sector summaries of coral reef conservation project reports.
//!
//! Pulls project-level indicator tables from the reporting provider,
//! assigns each project to a platform region, and reduces the indicators
//! into wide tables keyed by country and by sector.

pub mod config;
pub mod countries;
pub mod diagnostics;
pub mod error;
pub mod loader;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod reports;
pub mod table;
pub mod types;
pub mod util;

pub use error::{Error, Result};
