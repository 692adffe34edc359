use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Api, Result, StatsError};
use crate::resolve::{AccessToken, RepositoryRef};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("forge-stats/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Base URLs of the two APIs. Overridable so tests and GitHub Enterprise
/// installs can point elsewhere.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_url: String,
    pub graphql_url: String,
}

#[derive(Clone)]
pub struct GithubClient {
    token: Arc<AccessToken>,
    http: Arc<Client>,
    endpoints: Arc<Endpoints>,
    timeout: Duration,
}

impl GithubClient {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(token: AccessToken, endpoints: Endpoints, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| StatsError::Client { source })?;

        Ok(Self {
            token: Arc::new(token),
            http: Arc::new(http),
            endpoints: Arc::new(endpoints),
            timeout,
        })
    }

    /// Authenticated GET of `{api_url}/{path}`, parsed as `T`.
    pub async fn rest_get<T: DeserializeOwned>(
        &self,
        repo: &RepositoryRef,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!(
            "{}/{}",
            self.endpoints.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        let req = self
            .http
            .get(&url)
            .bearer_auth(self.token.secret())
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .query(query);

        let (json, _) = self.send(repo, Api::Rest, req).await?;
        serde_json::from_value(json).map_err(|e| StatsError::MalformedResponse {
            repo: repo.to_string(),
            detail: e.to_string(),
        })
    }

    /// GraphQL POST returning the raw envelope, `errors` included.
    pub async fn graphql_envelope(
        &self,
        repo: &RepositoryRef,
        query: &str,
        variables: Value,
    ) -> Result<GraphQlResponse> {
        let req = self
            .http
            .post(&self.endpoints.graphql_url)
            .bearer_auth(self.token.secret())
            .json(&serde_json::json!({ "query": query, "variables": variables }));

        let (json, retry_after) = self.send(repo, Api::GraphQl, req).await?;
        let mut envelope: GraphQlResponse =
            serde_json::from_value(json).map_err(|e| StatsError::MalformedResponse {
                repo: repo.to_string(),
                detail: format!("not a GraphQL response: {e}"),
            })?;
        envelope.retry_after = retry_after;
        Ok(envelope)
    }

    /// GraphQL POST whose `data` is parsed as `T`. Any `errors` entry fails the
    /// call, even when the server answered 200 with partial data.
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        repo: &RepositoryRef,
        query: &str,
        variables: Value,
    ) -> Result<T> {
        self.graphql_envelope(repo, query, variables)
            .await?
            .into_data(repo)
    }

    /// Send, map the status, parse JSON. Shared by both APIs.
    ///
    /// Also returns the rate-limit hint carried by the headers of a successful
    /// response: GraphQL reports an exhausted cost quota as a 200 whose body
    /// holds a `RATE_LIMITED` error.
    async fn send(
        &self,
        repo: &RepositoryRef,
        api: Api,
        req: RequestBuilder,
    ) -> Result<(Value, Option<u64>)> {
        let started = Instant::now();

        let resp = req
            .send()
            .await
            .map_err(|e| self.transport_error(repo, e))?;

        let status = resp.status();
        debug!(
            repository = %repo,
            api = %api,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "GitHub API responded"
        );

        if !status.is_success() {
            let err = classify_status(repo, api, status, resp.headers(), Utc::now());
            warn!(
                repository = %repo,
                api = %api,
                status = status.as_u16(),
                kind = err.kind(),
                "request failed"
            );
            return Err(err);
        }

        let hint = retry_after(resp.headers(), Utc::now());

        let body = resp
            .bytes()
            .await
            .map_err(|e| self.transport_error(repo, e))?;

        let json = serde_json::from_slice(&body).map_err(|e| StatsError::MalformedResponse {
            repo: repo.to_string(),
            detail: format!("invalid JSON body: {e}"),
        })?;
        Ok((json, hint))
    }

    fn transport_error(&self, repo: &RepositoryRef, source: reqwest::Error) -> StatsError {
        if source.is_timeout() {
            StatsError::RequestTimeout {
                repo: repo.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else {
            StatsError::Transport {
                repo: repo.to_string(),
                source,
            }
        }
    }
}

/// Map a non-success status to the error taxonomy.
///
/// GitHub signals an exhausted primary quota with 403 and
/// `x-ratelimit-remaining: 0`, secondary limits with 403/429 and `Retry-After`.
/// A plain 403 means the token cannot see the resource.
pub fn classify_status(
    repo: &RepositoryRef,
    api: Api,
    status: StatusCode,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> StatsError {
    let repo = repo.to_string();
    let rate_limited = || StatsError::RateLimited {
        repo: repo.clone(),
        api,
        retry_after: retry_after(headers, now),
    };

    match status {
        StatusCode::UNAUTHORIZED => StatsError::AuthenticationFailed { repo: repo.clone() },
        StatusCode::TOO_MANY_REQUESTS => rate_limited(),
        StatusCode::FORBIDDEN => {
            let exhausted = header_str(headers, "x-ratelimit-remaining") == Some("0");
            if exhausted || headers.contains_key(RETRY_AFTER) {
                rate_limited()
            } else {
                StatsError::NotFound { repo: repo.clone() }
            }
        }
        StatusCode::NOT_FOUND => StatsError::NotFound { repo: repo.clone() },
        other => StatsError::Http {
            repo: repo.clone(),
            status: other.as_u16(),
        },
    }
}

/// Seconds to wait, from `Retry-After` or else the `x-ratelimit-reset` epoch.
fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<u64> {
    if let Some(secs) = header_str(headers, RETRY_AFTER.as_str()).and_then(|s| s.parse().ok()) {
        return Some(secs);
    }

    header_str(headers, "x-ratelimit-reset")
        .and_then(|s| s.parse::<i64>().ok())
        .map(|reset| reset.saturating_sub(now.timestamp()).max(0) as u64)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorEntry>,
    /// From the response headers; reported if `errors` holds `RATE_LIMITED`.
    #[serde(skip)]
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlErrorEntry {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl GraphQlResponse {
    /// `data` as `T`, failing on any `errors` entry.
    pub fn into_data<T: DeserializeOwned>(self, repo: &RepositoryRef) -> Result<T> {
        if let Some(err) = errors_to_error(repo, &self.errors, self.retry_after) {
            return Err(err);
        }
        parse_data(repo, self.data)
    }

    /// Like [`into_data`](Self::into_data) but tolerates `NOT_FOUND` entries,
    /// which GitHub emits beside a `null` field for an unknown login.
    pub fn into_data_allowing_missing<T: DeserializeOwned>(
        mut self,
        repo: &RepositoryRef,
    ) -> Result<T> {
        self.errors
            .retain(|e| e.kind.as_deref() != Some("NOT_FOUND"));
        self.into_data(repo)
    }
}

fn errors_to_error(
    repo: &RepositoryRef,
    errors: &[GraphQlErrorEntry],
    retry_after: Option<u64>,
) -> Option<StatsError> {
    if errors.is_empty() {
        return None;
    }

    let has = |kind: &str| errors.iter().any(|e| e.kind.as_deref() == Some(kind));
    let repo = repo.to_string();

    let err = if has("RATE_LIMITED") {
        StatsError::RateLimited {
            repo,
            api: Api::GraphQl,
            retry_after,
        }
    } else if has("NOT_FOUND") {
        StatsError::NotFound { repo }
    } else {
        StatsError::GraphQl {
            repo,
            messages: errors.iter().map(|e| e.message.clone()).collect(),
        }
    };
    Some(err)
}

fn parse_data<T: DeserializeOwned>(repo: &RepositoryRef, data: Option<Value>) -> Result<T> {
    let data = data.ok_or_else(|| StatsError::MalformedResponse {
        repo: repo.to_string(),
        detail: "GraphQL response has neither data nor errors".to_string(),
    })?;

    serde_json::from_value(data).map_err(|e| StatsError::MalformedResponse {
        repo: repo.to_string(),
        detail: format!("unexpected GraphQL data shape: {e}"),
    })
}
