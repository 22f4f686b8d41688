// src/models/mod.rs

//! Domain models for the collector.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod directory;
mod record;

// Re-export all public types
pub use config::{Config, DirectoryConfig, HarvestConfig, LoggingConfig, PathsConfig, RenderConfig};
pub use directory::Directory;
pub use record::{CommunityRecord, Firmware, GeoCode, Location, Routing, State, TechDetails};

/// The summary cache: record id to record, kept in key order.
pub type Summary = std::collections::BTreeMap<String, CommunityRecord>;
