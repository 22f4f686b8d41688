//! Renderers over the persisted summary cache.
//!
//! - `geojson`: map feed with one point per community
//! - `table`: sortable HTML community table

pub mod geojson;
pub mod table;

pub use geojson::feature_collection;
pub use table::html_table;
