//! Pipeline entry points for collector operations.
//!
//! - `run_harvest`: Load the directory, fetch every community, persist the summary
//! - `run_render`: Produce GeoJSON / HTML outputs from the persisted summary

pub mod harvest;
pub mod render;

pub use harvest::{HarvestReport, run_harvest};
pub use render::{RenderTargets, run_render};
