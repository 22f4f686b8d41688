//! Service layer for the collector.
//!
//! This module contains the business logic for:
//! - Directory loading (`DirectoryLoader`)
//! - Community fetching (`Harvester`)
//! - Additional location expansion (`locations`)

mod directory;
mod harvester;
pub mod locations;

pub use directory::DirectoryLoader;
pub use harvester::Harvester;
