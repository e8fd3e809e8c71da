//! Dashboard configuration, loaded from JSON and overridden by CLI flags.

use crate::retry::RetryPolicy;
use kdss_core::month_range::YearRange;
use kdss_core::PipelineError;
use kdss_data::aggregate::DEFAULT_SCALE_METERS;
use kdss_data::dashboard::{DashboardRequest, LayerToggles};
use kdss_data::pipeline::PipelineSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the target region comes from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionChoice {
    /// The catalog's default region (Kajiado).
    #[default]
    Default,
    /// A named region from the catalog.
    Named { name: String },
    /// A user-supplied GeoJSON file.
    Uploaded { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub year: i32,
    pub month: u32,
    pub region: RegionChoice,
    pub layers: LayerToggles,
    pub series_years: YearRange,
    pub reference_years: YearRange,
    pub analysis_years: YearRange,
    /// Reduction scale for charts, in metres.
    pub scale: f64,
    pub retry: RetryPolicy,
    pub timeout_secs: u64,
    /// URL template for the `fetch` command.
    pub source_url: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let settings = PipelineSettings::default();
        DashboardConfig {
            year: 2023,
            month: 3,
            region: RegionChoice::Default,
            layers: LayerToggles::default(),
            series_years: settings.series_years,
            reference_years: settings.reference_years,
            analysis_years: settings.analysis_years,
            scale: DEFAULT_SCALE_METERS,
            retry: RetryPolicy::default(),
            timeout_secs: 60,
            source_url: None,
        }
    }
}

impl DashboardConfig {
    /// Read a JSON config file; missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: DashboardConfig = serde_json::from_str(&text)
            .map_err(|e| PipelineError::MalformedInput(format!("{}: {}", path.display(), e)))?;
        log::info!("config: loaded {}", path.display());
        Ok(config)
    }

    /// The defaults, or the file at `path` when one is given.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => DashboardConfig::load(path),
            None => Ok(DashboardConfig::default()),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(1..=12).contains(&self.month) {
            return Err(PipelineError::InvalidArgument(format!(
                "month must be 1-12, got {}",
                self.month
            )));
        }
        for (label, range) in [
            ("series", self.series_years),
            ("reference", self.reference_years),
            ("analysis", self.analysis_years),
        ] {
            if range.is_empty() {
                return Err(PipelineError::InvalidArgument(format!(
                    "{} years {}-{} are empty",
                    label, range.start, range.end
                )));
            }
        }
        if !self.analysis_years.contains(self.year) {
            return Err(PipelineError::InvalidArgument(format!(
                "year {} is outside the analysis years {}-{}",
                self.year, self.analysis_years.start, self.analysis_years.end
            )));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(PipelineError::InvalidArgument(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if self.retry.max_tries == 0 {
            return Err(PipelineError::InvalidArgument(
                "retry.max_tries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            series_years: self.series_years,
            reference_years: self.reference_years,
            analysis_years: self.analysis_years,
        }
    }

    pub fn request(&self) -> DashboardRequest {
        DashboardRequest {
            year: self.year,
            month: self.month,
            analysis_years: self.analysis_years,
            toggles: self.layers,
            scale: self.scale,
        }
    }
}
