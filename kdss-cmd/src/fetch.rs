//! Download daily precipitation for a region's bounding box.
//!
//! The remote service is addressed through a URL template with `{start}`,
//! `{end}` (YYYY-MM-DD, end exclusive) and `{west}`, `{south}`, `{east}`,
//! `{north}` placeholders. It must answer with headerless
//! `date(YYYYMMDD),row,col,value` CSV, the same format `Database::load_daily`
//! reads.

use crate::retry::{retry_with_backoff, RetryPolicy};
use chrono::NaiveDate;
use kdss_core::region::{Bounds, Region};
use kdss_core::PipelineError;
use kdss_utils::dates::format_date;
use log::info;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Substitute the placeholders of `template`.
pub fn expand_template(template: &str, start: NaiveDate, end: NaiveDate, bounds: &Bounds) -> String {
    template
        .replace("{start}", &format_date(&start))
        .replace("{end}", &format_date(&end))
        .replace("{west}", &bounds.west.to_string())
        .replace("{south}", &bounds.south.to_string())
        .replace("{east}", &bounds.east.to_string())
        .replace("{north}", &bounds.north.to_string())
}

/// Count the data rows of a response body, ignoring blank lines.
fn count_rows(body: &str) -> usize {
    body.lines().filter(|l| !l.trim().is_empty()).count()
}

/// One request for `url`. Transport failures, bad statuses and empty bodies
/// are all reported as [`PipelineError::SourceUnavailable`].
async fn fetch_once(client: &Client, url: &str) -> anyhow::Result<String> {
    let unavailable = |msg: String| anyhow::Error::from(PipelineError::SourceUnavailable(msg));
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| unavailable(format!("Request failed: {}", e)))?;
    if response.status() != StatusCode::OK {
        return Err(unavailable(format!("Bad response status: {}", response.status())));
    }
    let body = response
        .text()
        .await
        .map_err(|e| unavailable(format!("Failed to read response body: {}", e)))?;
    if count_rows(&body) == 0 {
        return Err(unavailable("Empty response".to_string()));
    }
    Ok(body)
}

/// Download `[start, end)` over the bounding box of `region` and write the
/// CSV body to `output`.
pub async fn run_fetch(
    output: &str,
    template: &str,
    region: &Region,
    start: NaiveDate,
    end: NaiveDate,
    policy: &RetryPolicy,
    timeout: Duration,
) -> anyhow::Result<()> {
    if start >= end {
        return Err(PipelineError::InvalidArgument(format!(
            "start {} must be before end {}",
            start, end
        ))
        .into());
    }
    let bounds = region.bounds().ok_or_else(|| {
        PipelineError::MalformedInput(format!("region {} has no geometry", region.name))
    })?;
    let url = expand_template(template, start, end, &bounds);
    let client = Client::builder().timeout(timeout).build()?;

    info!("Fetching {} from {} to {}", region.name, start, end);
    let body = retry_with_backoff(policy, || fetch_once(&client, &url)).await?;
    std::fs::write(output, &body)?;

    info!(
        "Fetch complete. {} rows written to {}",
        count_rows(&body),
        output
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_template() {
        let bounds = Bounds {
            west: 36.0,
            south: -3.5,
            east: 38.25,
            north: -1.0,
        };
        let url = expand_template(
            "https://example.org/chirps?from={start}&to={end}&bbox={west},{south},{east},{north}",
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
            &bounds,
        );
        assert_eq!(
            url,
            "https://example.org/chirps?from=2020-01-01&to=2020-02-01&bbox=36,-3.5,38.25,-1"
        );
    }

    #[test]
    fn test_count_rows() {
        assert_eq!(count_rows(""), 0);
        assert_eq!(count_rows("\n \n"), 0);
        assert_eq!(count_rows("20200101,0,0,1.0\n20200101,0,1,2.0\n"), 2);
    }

    #[tokio::test]
    async fn test_unreachable_source_is_unavailable() {
        let region = kdss_core::region::RegionCatalog::default_region().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("daily.csv");
        let policy = RetryPolicy {
            max_tries: 2,
            initial_backoff_ms: 0,
        };
        let err = run_fetch(
            output.to_str().unwrap(),
            "http://127.0.0.1:9/daily?start={start}",
            &region,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
            &policy,
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::SourceUnavailable(_))
        ));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_rejects_reversed_window() {
        let region = kdss_core::region::RegionCatalog::default_region().unwrap();
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let err = run_fetch("unused.csv", "http://localhost/", &region, day, day, &RetryPolicy::default(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidArgument(_))
        ));
    }
}
