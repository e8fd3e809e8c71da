//! Climatology and anomaly engine for daily precipitation.
//!
//! Stages run strictly forward: monthly series, baseline, derived
//! indicators, annual drought/flood events. The region aggregator reduces
//! the output of any stage to a chartable `(date, value)` series.
//! [`pipeline::Pipeline`] wires the stages together and
//! [`session::Session`] memoises whole evaluations per region and settings.

pub mod aggregate;
pub mod baseline;
pub mod dashboard;
pub mod events;
pub mod heavy_rain;
pub mod indicator;
pub mod pipeline;
pub mod series;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
