//! Command implementations for the KDSS CLI.
//!
//! Provides subcommands for downloading daily precipitation, building the
//! dashboard model and exporting individual chart series.

use clap::{Args, Subcommand};
use config::{DashboardConfig, RegionChoice};
use kdss_core::region::RegionCatalog;
use std::path::PathBuf;
use std::time::Duration;

pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod region;
pub mod retry;

/// Options shared by every command that reads a config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON dashboard config; defaults apply when omitted
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// GeoJSON file to use as the region instead of the configured one
    #[arg(long)]
    pub region_file: Option<PathBuf>,

    /// Region name from the built-in catalog
    #[arg(long, conflicts_with = "region_file")]
    pub region: Option<String>,
}

impl ConfigArgs {
    /// Load the config and apply the region flags on top of it.
    pub fn resolve(&self) -> anyhow::Result<DashboardConfig> {
        let mut config = DashboardConfig::load_or_default(self.config.as_deref())?;
        if let Some(path) = &self.region_file {
            config.region = RegionChoice::Uploaded { path: path.clone() };
        } else if let Some(name) = &self.region {
            config.region = RegionChoice::Named { name: name.clone() };
        }
        Ok(config)
    }
}

/// Grid and daily precipitation CSV inputs.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Grid placement CSV (ORIGIN_LON,ORIGIN_LAT,PIXEL_SIZE,ROWS,COLS)
    #[arg(short = 'g', long)]
    pub grid_csv: String,

    /// Daily precipitation CSV (date,row,col,value; no headers)
    #[arg(short = 'd', long)]
    pub daily_csv: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download daily precipitation for the region's bounding box
    Fetch {
        /// Output path for the daily precipitation CSV
        #[arg(short = 'o', long)]
        output: String,

        /// First day to fetch (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Day after the last day to fetch (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// URL template; overrides `source_url` from the config
        #[arg(long)]
        url: Option<String>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Build the dashboard layers and charts as JSON
    Dashboard {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        config: ConfigArgs,

        /// Selected year; must lie in the analysis years
        #[arg(long)]
        year: Option<i32>,

        /// Selected month (1-12)
        #[arg(long)]
        month: Option<u32>,

        /// Output path for the dashboard JSON
        #[arg(short = 'o', long)]
        output: String,
    },

    /// Export one chart series (anomaly, spi, pnr or rainfall) as CSV
    Series {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        config: ConfigArgs,

        /// Series to export
        #[arg(short = 'k', long, default_value = "anomaly")]
        kind: String,

        /// Output path for the date,value CSV
        #[arg(short = 'o', long)]
        output: String,
    },

    /// List the regions available without an upload
    Regions,
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Fetch {
            output,
            start,
            end,
            url,
            config,
        } => {
            let config = config.resolve()?;
            let template = url.or(config.source_url.clone()).ok_or_else(|| {
                anyhow::anyhow!("no source URL: pass --url or set source_url in the config")
            })?;
            let region = region::resolve_region(&config.region)?;
            let start = kdss_utils::dates::parse_date(&start)?;
            let end = kdss_utils::dates::parse_date(&end)?;
            fetch::run_fetch(
                &output,
                &template,
                &region,
                start,
                end,
                &config.retry,
                Duration::from_secs(config.timeout_secs),
            )
            .await
        }
        Command::Dashboard {
            data,
            config,
            year,
            month,
            output,
        } => {
            let mut config = config.resolve()?;
            if let Some(year) = year {
                config.year = year;
            }
            if let Some(month) = month {
                config.month = month;
            }
            dashboard::run_dashboard(&data.grid_csv, &data.daily_csv, &config, &output).await
        }
        Command::Series {
            data,
            config,
            kind,
            output,
        } => {
            let config = config.resolve()?;
            let kind: dashboard::SeriesKind = kind.parse()?;
            dashboard::run_series(&data.grid_csv, &data.daily_csv, &config, kind, &output).await
        }
        Command::Regions => {
            for name in RegionCatalog::names() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_flags_override_config() {
        let args = ConfigArgs {
            region_file: Some(PathBuf::from("farm.geojson")),
            ..ConfigArgs::default()
        };
        assert_eq!(
            args.resolve().unwrap().region,
            RegionChoice::Uploaded {
                path: PathBuf::from("farm.geojson")
            }
        );

        let args = ConfigArgs {
            region: Some("Kajiado".to_string()),
            ..ConfigArgs::default()
        };
        assert_eq!(
            args.resolve().unwrap().region,
            RegionChoice::Named {
                name: "Kajiado".to_string()
            }
        );
        assert_eq!(ConfigArgs::default().resolve().unwrap().region, RegionChoice::Default);
    }
}
