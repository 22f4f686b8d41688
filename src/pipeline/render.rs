// src/pipeline/render.rs

//! Render outputs from the persisted summary cache.

use crate::error::Result;
use crate::models::Config;
use crate::render;
use crate::storage::SummaryStore;
use crate::utils::to_pretty_json;

/// Which outputs to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderTargets {
    pub geojson: bool,
    pub table: bool,
}

impl RenderTargets {
    pub fn any(&self) -> bool {
        self.geojson || self.table
    }
}

/// Read the cache file from disk and write the requested outputs.
pub async fn run_render(config: &Config, targets: RenderTargets) -> Result<()> {
    if !targets.any() {
        return Ok(());
    }

    let summary = SummaryStore::from_config(&config.paths).load().await?;

    if targets.geojson {
        let collection = render::feature_collection(&summary);
        tokio::fs::write(&config.paths.geojson, to_pretty_json(&collection)?).await?;
        log::info!(
            "GeoJSON with {} features written to {}",
            collection.features.len(),
            config.paths.geojson.display()
        );
    }

    if targets.table {
        let html = render::html_table(&summary, &config.render);
        tokio::fs::write(&config.paths.html_table, html).await?;
        log::info!(
            "HTML table with {} rows written to {}",
            summary.len(),
            config.paths.html_table.display()
        );
    }

    Ok(())
}
