//! Resolving the configured region choice into a geometry.

use crate::config::RegionChoice;
use kdss_core::region::{Region, RegionCatalog};
use kdss_core::PipelineError;
use std::path::Path;

/// Load the region named by `choice`.
///
/// Uploaded files must be GeoJSON. Zipped Shapefiles are recognised by
/// extension and rejected.
pub fn resolve_region(choice: &RegionChoice) -> anyhow::Result<Region> {
    let region = match choice {
        RegionChoice::Default => RegionCatalog::default_region()?,
        RegionChoice::Named { name } => RegionCatalog::lookup(name)?,
        RegionChoice::Uploaded { path } => load_uploaded(path)?,
    };
    log::info!(
        "region: using {} ({} polygons)",
        region.name,
        region.polygons.len()
    );
    Ok(region)
}

fn load_uploaded(path: &Path) -> anyhow::Result<Region> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if extension == "zip" || extension == "shp" {
        return Err(PipelineError::MalformedInput(format!(
            "{}: Shapefile uploads are not supported, upload GeoJSON instead",
            path.display()
        ))
        .into());
    }
    let text = std::fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("uploaded");
    Ok(Region::from_geojson(name, &text)?)
}
