//! Deferred pipeline: describe the computation first, evaluate it explicitly.

use crate::aggregate::{reduce_region_mean, RegionScalarSeries};
use crate::baseline::{build_baseline, Baseline};
use crate::events::{build_annual_events, AnnualEvent};
use crate::heavy_rain::{build_heavy_rain, HeavyRainYear};
use crate::indicator::{build_indicator, Indicator, IndicatorKind};
use crate::series::{build_monthly_series, PRECIPITATION_BAND};
use kdss_core::month_range::YearRange;
use kdss_core::record::MonthlySeries;
use kdss_core::region::Region;
use kdss_core::source::DailySource;
use kdss_core::PipelineError;
use log::info;
use serde::{Deserialize, Serialize};

/// Year windows for the three pipeline phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Years summed into the monthly series.
    pub series_years: YearRange,
    /// Climatological reference window.
    pub reference_years: YearRange,
    /// Years for which indicators and events are derived.
    pub analysis_years: YearRange,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            series_years: YearRange::new(1981, 2025),
            reference_years: YearRange::new(1981, 2015),
            analysis_years: YearRange::new(2015, 2025),
        }
    }
}

/// Identity of a pipeline evaluation, for memoisation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    region: String,
    settings: PipelineSettings,
}

/// Every collection the dashboard reads, materialised once.
#[derive(Debug, Clone, PartialEq)]
pub struct Collections {
    pub monthly: MonthlySeries,
    pub baseline: Baseline,
    pub anomaly: Vec<Indicator>,
    pub pnr: Vec<Indicator>,
    pub spi: Vec<Indicator>,
    pub heavy_rain: Vec<HeavyRainYear>,
    pub annual: Vec<AnnualEvent>,
}

impl Collections {
    pub fn indicators(&self, kind: IndicatorKind) -> &[Indicator] {
        match kind {
            IndicatorKind::Anomaly => &self.anomaly,
            IndicatorKind::Pnr => &self.pnr,
            IndicatorKind::Spi => &self.spi,
        }
    }

    /// Monthly precipitation means over `region` for `years`, trying
    /// `precipitation` first and then `sum`.
    pub fn rainfall_series(
        &self,
        region: &Region,
        years: YearRange,
        scale: f64,
    ) -> Result<RegionScalarSeries, PipelineError> {
        let series = reduce_region_mean(self.monthly.in_years(years), region, PRECIPITATION_BAND, scale)?;
        if !series.is_empty() {
            return Ok(series);
        }
        reduce_region_mean(self.monthly.in_years(years), region, "sum", scale)
    }
}

/// A description of one full pipeline run over a region.
///
/// Building and configuring a pipeline does no work; [`evaluate`](Self::evaluate)
/// runs every stage against a source.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    region: Region,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(region: Region) -> Self {
        Pipeline {
            region,
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn series_years(mut self, years: YearRange) -> Self {
        self.settings.series_years = years;
        self
    }

    pub fn reference_years(mut self, years: YearRange) -> Self {
        self.settings.reference_years = years;
        self
    }

    pub fn analysis_years(mut self, years: YearRange) -> Self {
        self.settings.analysis_years = years;
        self
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn key(&self) -> PipelineKey {
        PipelineKey {
            region: self.region.fingerprint(),
            settings: self.settings,
        }
    }

    /// Run every stage. Source failures propagate unchanged; empty windows
    /// produce empty collections.
    pub fn evaluate<S: DailySource + ?Sized>(&self, source: &S) -> Result<Collections, PipelineError> {
        let s = &self.settings;
        info!(
            "pipeline: evaluating {} (series {}-{}, reference {}-{}, analysis {}-{})",
            self.region.name,
            s.series_years.start,
            s.series_years.end,
            s.reference_years.start,
            s.reference_years.end,
            s.analysis_years.start,
            s.analysis_years.end
        );
        let monthly = build_monthly_series(source, &self.region, s.series_years, 1..=12)?;
        let baseline = build_baseline(&monthly, s.reference_years)?;
        let anomaly = build_indicator(&monthly, &baseline, s.analysis_years, IndicatorKind::Anomaly)?;
        let pnr = build_indicator(&monthly, &baseline, s.analysis_years, IndicatorKind::Pnr)?;
        let spi = build_indicator(&monthly, &baseline, s.analysis_years, IndicatorKind::Spi)?;
        let heavy_rain = build_heavy_rain(source, &self.region, s.analysis_years)?;
        let annual = build_annual_events(&spi, s.analysis_years)?;
        Ok(Collections {
            monthly,
            baseline,
            anomaly,
            pnr,
            spi,
            heavy_rain,
            annual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DEFAULT_SCALE_METERS;
    use crate::testing::{failing_source, monthly_total, test_region};
    use chrono::NaiveDate;
    use kdss_core::source::{DailyRaster, MemorySource};

    /// January totals of 100 mm for 1981-2015 with 1990 missing, plus 50 mm
    /// in January 2020.
    fn january_source() -> MemorySource {
        let mut days: Vec<DailyRaster> = (1981..=2015)
            .filter(|y| *y != 1990)
            .map(|y| monthly_total(y, 1, 100.0))
            .collect();
        days.push(monthly_total(2020, 1, 50.0));
        MemorySource::new(days)
    }

    #[test]
    fn test_january_anomaly_scenario() {
        let collections = Pipeline::new(test_region()).evaluate(&january_source()).unwrap();
        assert_eq!(collections.monthly.len(), 35);
        let jan_2020 = collections
            .anomaly
            .iter()
            .find(|i| i.year == 2020 && i.month == 1)
            .unwrap();
        let expected = 50.0 - 100.0;
        for v in &jan_2020.raster.first_band().unwrap().values {
            assert!((v - expected).abs() < 1e-6);
        }
        // Identical reference values: stddev 0, SPI is unbounded.
        let spi = collections
            .spi
            .iter()
            .find(|i| i.year == 2020 && i.month == 1)
            .unwrap();
        assert!(spi.raster.first_band().unwrap().values[0].is_infinite());
    }

    #[test]
    fn test_unbounded_spi_is_dropped_from_charts() {
        let collections = Pipeline::new(test_region()).evaluate(&january_source()).unwrap();
        let spi_chart =
            reduce_region_mean(&collections.spi, &test_region(), "spi", DEFAULT_SCALE_METERS).unwrap();
        assert!(spi_chart.is_empty());
        let anomaly_chart =
            reduce_region_mean(&collections.anomaly, &test_region(), "anomaly", DEFAULT_SCALE_METERS)
                .unwrap();
        // January 2015 (anomaly 0) and January 2020 (anomaly -50).
        assert_eq!(anomaly_chart.len(), 2);
        assert_eq!(anomaly_chart.points()[1].date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert!((anomaly_chart.points()[1].value + 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_analysis_window() {
        let collections = Pipeline::new(test_region())
            .analysis_years(YearRange::new(2030, 2032))
            .evaluate(&january_source())
            .unwrap();
        assert!(collections.spi.is_empty());
        assert!(collections.annual.is_empty());
        let series =
            reduce_region_mean(&collections.annual, &test_region(), "drought_freq", DEFAULT_SCALE_METERS)
                .unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_rainfall_series_restricted_to_years() {
        let collections = Pipeline::new(test_region()).evaluate(&january_source()).unwrap();
        let rain = collections
            .rainfall_series(&test_region(), YearRange::new(2015, 2025), DEFAULT_SCALE_METERS)
            .unwrap();
        assert_eq!(rain.len(), 2);
        assert!((rain.points()[1].value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_source_failure_propagates() {
        let result = Pipeline::new(test_region()).evaluate(&failing_source());
        assert!(matches!(result, Err(PipelineError::SourceUnavailable(_))));
    }

    #[test]
    fn test_key_depends_on_region_and_settings() {
        let a = Pipeline::new(test_region());
        let b = Pipeline::new(test_region()).analysis_years(YearRange::new(2016, 2025));
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), Pipeline::new(test_region()).key());
    }
}
