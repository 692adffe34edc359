//! Scores the people around a repository: a one-page sample of stargazers,
//! watchers and fork owners, each looked up for recent activity and employer.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Result, StatsError};
use crate::github::GithubClient;
use crate::resolve::RepositoryRef;

const AUDIENCE_QUERY: &str = r#"
query Audience($owner: String!, $name: String!, $sampleSize: Int!) {
    repository(owner: $owner, name: $name) {
        stargazers(first: $sampleSize) {
            nodes { login }
        }
        watchers(first: $sampleSize) {
            nodes { login }
        }
        forks(first: $sampleSize) {
            nodes { owner { login } }
        }
    }
}
"#;

const PROFILE_QUERY: &str = r#"
query Profile($login: String!, $from: DateTime!, $to: DateTime!) {
    user(login: $login) {
        company
        repositories {
            totalCount
        }
        contributionsCollection(from: $from, to: $to) {
            contributionCalendar {
                totalContributions
            }
        }
    }
}
"#;

#[derive(Debug, Clone)]
pub struct AudienceOptions {
    /// Nodes requested from each of stargazers, watchers and forks.
    pub sample_size: u32,
    /// Case-insensitive substring of a profile's company marking it affiliated.
    pub org_keyword: String,
    pub min_contributions: u64,
    pub min_repositories: u64,
}

impl Default for AudienceOptions {
    fn default() -> Self {
        Self {
            sample_size: 100,
            org_keyword: "microsoft".to_string(),
            min_contributions: 50,
            min_repositories: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudienceReport {
    pub repository: RepositoryRef,
    pub org_keyword: String,
    pub sampled_users: u64,
    pub significant_users: u64,
    pub affiliated_users: u64,
    pub power_user_rate: f64,
    pub affiliated_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub company: Option<String>,
    pub public_repositories: u64,
    pub contributions_last_year: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Affiliated,
    Significant,
    Ordinary,
}

impl Standing {
    pub fn is_significant(self) -> bool {
        !matches!(self, Standing::Ordinary)
    }
}

/// Affiliation is checked first; an affiliated user counts as significant
/// regardless of activity.
pub fn classify(profile: &Profile, options: &AudienceOptions) -> Standing {
    let keyword = options.org_keyword.trim().to_lowercase();
    let affiliated = !keyword.is_empty()
        && profile
            .company
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(&keyword));

    if affiliated {
        Standing::Affiliated
    } else if profile.contributions_last_year >= options.min_contributions
        && profile.public_repositories >= options.min_repositories
    {
        Standing::Significant
    } else {
        Standing::Ordinary
    }
}

#[derive(Deserialize)]
struct AudienceData {
    repository: Option<AudienceRepo>,
}

#[derive(Deserialize)]
struct AudienceRepo {
    stargazers: LoginNodes,
    watchers: LoginNodes,
    forks: ForkNodes,
}

#[derive(Deserialize)]
struct LoginNodes {
    #[serde(default)]
    nodes: Vec<LoginNode>,
}

#[derive(Deserialize)]
struct LoginNode {
    login: String,
}

#[derive(Deserialize)]
struct ForkNodes {
    #[serde(default)]
    nodes: Vec<ForkNode>,
}

#[derive(Deserialize)]
struct ForkNode {
    owner: LoginNode,
}

#[derive(Deserialize)]
struct ProfileData {
    user: Option<UserNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserNode {
    company: Option<String>,
    repositories: CountObj,
    contributions_collection: ContributionsCollection,
}

#[derive(Deserialize)]
struct CountObj {
    #[serde(rename = "totalCount")]
    total_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsCollection {
    contribution_calendar: ContributionCalendar,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionCalendar {
    total_contributions: u64,
}

/// Sample the audience of `repo` and score it against `options`.
///
/// Issues one query for the sample and then one query per distinct login,
/// sequentially. Contributions are counted over the year ending on `today`.
pub async fn fetch_audience(
    client: &GithubClient,
    repo: &RepositoryRef,
    options: &AudienceOptions,
    today: NaiveDate,
) -> Result<AudienceReport> {
    let logins = fetch_sample(client, repo, options.sample_size.clamp(1, 100)).await?;

    let from = today.checked_sub_days(Days::new(365)).unwrap_or(today);
    let mut significant = 0u64;
    let mut affiliated = 0u64;

    for login in &logins {
        let profile = fetch_profile(client, repo, login, from, today).await?;
        let standing = profile
            .as_ref()
            .map(|p| classify(p, options))
            .unwrap_or(Standing::Ordinary);
        debug!(login = %login, standing = ?standing, "scored audience member");

        if standing.is_significant() {
            significant += 1;
        }
        if standing == Standing::Affiliated {
            affiliated += 1;
        }
    }

    let sampled = logins.len() as u64;
    info!(
        repository = %repo,
        sampled,
        significant,
        affiliated,
        "scored repository audience"
    );

    Ok(AudienceReport {
        repository: repo.clone(),
        org_keyword: options.org_keyword.clone(),
        sampled_users: sampled,
        significant_users: significant,
        affiliated_users: affiliated,
        power_user_rate: rate(significant, sampled),
        affiliated_rate: rate(affiliated, sampled),
    })
}

async fn fetch_sample(
    client: &GithubClient,
    repo: &RepositoryRef,
    sample_size: u32,
) -> Result<BTreeSet<String>> {
    let variables = json!({
        "owner": repo.owner,
        "name": repo.name,
        "sampleSize": sample_size,
    });

    let data: AudienceData = client.graphql(repo, AUDIENCE_QUERY, variables).await?;
    let node = data.repository.ok_or_else(|| StatsError::NotFound {
        repo: repo.to_string(),
    })?;

    let mut logins = BTreeSet::new();
    logins.extend(node.stargazers.nodes.into_iter().map(|n| n.login));
    logins.extend(node.watchers.nodes.into_iter().map(|n| n.login));
    logins.extend(node.forks.nodes.into_iter().map(|n| n.owner.login));
    Ok(logins)
}

/// `None` when the login no longer resolves to a user (deleted account,
/// organisation owning a fork).
async fn fetch_profile(
    client: &GithubClient,
    repo: &RepositoryRef,
    login: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Option<Profile>> {
    let variables = json!({
        "login": login,
        "from": format!("{from}T00:00:00Z"),
        "to": format!("{to}T23:59:59Z"),
    });

    let data: ProfileData = client
        .graphql_envelope(repo, PROFILE_QUERY, variables)
        .await?
        .into_data_allowing_missing(repo)?;

    Ok(data.user.map(|u| {
        let calendar = u.contributions_collection.contribution_calendar;
        Profile {
            company: u.company,
            public_repositories: u.repositories.total_count,
            contributions_last_year: calendar.total_contributions,
        }
    }))
}

fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
