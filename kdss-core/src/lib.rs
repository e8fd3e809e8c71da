//! Core types for the Kenya drought and flood decision-support engine.
//!
//! Rasters, region geometries, monthly records and the daily
//! precipitation source abstraction shared by the pipeline crates.

pub mod error;
pub mod month_range;
pub mod raster;
pub mod record;
pub mod region;
pub mod source;

pub use error::PipelineError;
