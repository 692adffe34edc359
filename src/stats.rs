//! Stars, forks, watchers and the most active committers of a repository,
//! from a single GraphQL query.
//!
//! GitHub's GraphQL API has no contributor list, so contributors are counted
//! from the author logins of the default branch's most recent commits. Only one
//! page of history is read: the ranking reflects that window
//! ([`RepoStats::sampled_commits`]), not the full project history.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::{Result, StatsError};
use crate::github::GithubClient;
use crate::resolve::RepositoryRef;

pub const DEFAULT_TOP_N: usize = 10;
/// GitHub caps a connection page at 100 nodes.
pub const MAX_HISTORY_SIZE: u32 = 100;

const STATS_QUERY: &str = r#"
query RepoStats($owner: String!, $name: String!, $historySize: Int!) {
    repository(owner: $owner, name: $name) {
        stargazerCount
        forkCount
        watchers {
            totalCount
        }
        defaultBranchRef {
            target {
                ... on Commit {
                    history(first: $historySize) {
                        nodes {
                            author {
                                user {
                                    login
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
"#;

#[derive(Debug, Clone, Copy)]
pub struct StatsOptions {
    /// How many contributors to keep after ranking.
    pub top_n: usize,
    /// How many recent commits to attribute; clamped to 1..=100.
    pub history_size: u32,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            history_size: MAX_HISTORY_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contributor {
    pub login: String,
    pub contribution_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoStats {
    pub repository: RepositoryRef,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    /// Ordered by `contribution_count` descending, then `login` ascending.
    pub significant_users: Vec<Contributor>,
    /// Commits inspected to build `significant_users`.
    pub sampled_commits: u64,
}

#[derive(Deserialize)]
struct StatsData {
    repository: Option<RepositoryNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    stargazer_count: u64,
    fork_count: u64,
    watchers: CountObj,
    default_branch_ref: Option<DefaultBranchRef>,
}

#[derive(Deserialize)]
struct CountObj {
    #[serde(rename = "totalCount")]
    total_count: u64,
}

#[derive(Deserialize)]
struct DefaultBranchRef {
    target: Option<TargetCommit>,
}

#[derive(Deserialize)]
struct TargetCommit {
    history: Option<CommitHistory>,
}

#[derive(Deserialize)]
struct CommitHistory {
    #[serde(default)]
    nodes: Vec<HistoryNode>,
}

#[derive(Deserialize)]
struct HistoryNode {
    author: Option<CommitAuthor>,
}

#[derive(Deserialize)]
struct CommitAuthor {
    user: Option<UserLogin>,
}

#[derive(Deserialize)]
struct UserLogin {
    login: Option<String>,
}

/// Fetch star, fork and watcher counts plus the top committers of `repo`.
///
/// The contributor ranking covers at most `options.history_size` recent
/// commits on the default branch; no further pages are requested.
pub async fn fetch_stats(
    client: &GithubClient,
    repo: &RepositoryRef,
    options: StatsOptions,
) -> Result<RepoStats> {
    let history_size = options.history_size.clamp(1, MAX_HISTORY_SIZE);
    let variables = json!({
        "owner": repo.owner,
        "name": repo.name,
        "historySize": history_size,
    });

    let data: StatsData = client.graphql(repo, STATS_QUERY, variables).await?;
    let node = data.repository.ok_or_else(|| StatsError::NotFound {
        repo: repo.to_string(),
    })?;

    let nodes = node
        .default_branch_ref
        .and_then(|b| b.target)
        .and_then(|t| t.history)
        .map(|h| h.nodes)
        .unwrap_or_default();

    let sampled_commits = nodes.len() as u64;
    let logins = nodes
        .into_iter()
        .filter_map(|n| n.author.and_then(|a| a.user).and_then(|u| u.login));
    let significant_users = rank_contributors(logins, options.top_n);

    info!(
        repository = %repo,
        stars = node.stargazer_count,
        forks = node.fork_count,
        sampled_commits,
        contributors = significant_users.len(),
        "fetched repository stats"
    );

    Ok(RepoStats {
        repository: repo.clone(),
        stars: node.stargazer_count,
        forks: node.fork_count,
        watchers: node.watchers.total_count,
        significant_users,
        sampled_commits,
    })
}

/// Count occurrences per login and keep the `top_n` largest, ties broken by
/// login so the output does not depend on the API's node order.
pub fn rank_contributors<I>(logins: I, top_n: usize) -> Vec<Contributor>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, u64> = HashMap::new();
    for login in logins {
        *counts.entry(login).or_insert(0) += 1;
    }

    let mut ranked: Vec<Contributor> = counts
        .into_iter()
        .map(|(login, contribution_count)| Contributor {
            login,
            contribution_count,
        })
        .collect();
    sort_contributors(&mut ranked);
    ranked.truncate(top_n);
    ranked
}

pub fn sort_contributors(contributors: &mut [Contributor]) {
    contributors.sort_by(|a, b| {
        b.contribution_count
            .cmp(&a.contribution_count)
            .then_with(|| a.login.cmp(&b.login))
    });
}
