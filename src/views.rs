use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::github::GithubClient;
use crate::resolve::RepositoryRef;

/// GitHub keeps traffic data for 14 days.
pub const DEFAULT_RETENTION_DAYS: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    #[default]
    Day,
    Week,
}

impl Granularity {
    fn as_query(self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            other => Err(format!("unknown granularity {other:?} (expected day or week)")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ViewsOptions {
    pub granularity: Granularity,
    /// Keep at most this many of the most recent series points.
    pub retention_days: usize,
}

impl Default for ViewsOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::Day,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPoint {
    pub timestamp: String,
    pub count: u64,
    pub uniques: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewsReport {
    pub repository: RepositoryRef,
    pub total_count: u64,
    pub unique_count: u64,
    pub series: Vec<ViewPoint>,
}

/// Body of `GET /repos/{owner}/{repo}/traffic/views`.
#[derive(Deserialize)]
struct TrafficViews {
    count: u64,
    uniques: u64,
    #[serde(default)]
    views: Vec<ViewPoint>,
}

/// Fetch the traffic views of `repo` over the API's retention window.
///
/// Requires a token with push access to the repository; GitHub answers 403
/// otherwise, reported as `NotFound`.
pub async fn fetch_views(
    client: &GithubClient,
    repo: &RepositoryRef,
    options: ViewsOptions,
) -> Result<ViewsReport> {
    let path = format!("repos/{}/{}/traffic/views", repo.owner, repo.name);
    let body: TrafficViews = client
        .rest_get(repo, &path, &[("per", options.granularity.as_query())])
        .await?;

    let mut series = body.views;
    let excess = series.len().saturating_sub(options.retention_days);
    series.drain(..excess);

    info!(
        repository = %repo,
        total = body.count,
        uniques = body.uniques,
        points = series.len(),
        "fetched traffic views"
    );

    Ok(ViewsReport {
        repository: repo.clone(),
        total_count: body.count,
        unique_count: body.uniques,
        series,
    })
}
