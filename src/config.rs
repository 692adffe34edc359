//! Command-line and environment configuration shared by both binaries.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::audience::AudienceOptions;
use crate::error::Result;
use crate::github::{
    DEFAULT_API_URL, DEFAULT_GRAPHQL_URL, DEFAULT_TIMEOUT_SECS, Endpoints, GithubClient,
};
use crate::render::Format;
use crate::resolve::{AccessToken, InputSource, Injected, Layered, Prompt};
use crate::stats::{DEFAULT_TOP_N, MAX_HISTORY_SIZE, StatsOptions};
use crate::views::{DEFAULT_RETENTION_DAYS, Granularity, ViewsOptions};

/// Fallback variable for the token, as read by the `gh` CLI and most scripts.
pub const FALLBACK_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Args)]
pub struct CommonArgs {
    /// Repository URL, e.g. https://github.com/owner/repo
    #[arg(long, env = "REPO_URL")]
    pub repo_url: Option<String>,

    /// Personal access token (falls back to GITHUB_TOKEN)
    #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Never prompt; fail if the URL or token is not supplied
    #[arg(long)]
    pub no_prompt: bool,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    #[arg(long, env = "GITHUB_GRAPHQL_URL", default_value = DEFAULT_GRAPHQL_URL)]
    pub graphql_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    pub format: Format,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Args, Debug)]
pub struct ViewsArgs {
    /// Number of most recent series points to keep
    #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS)]
    pub retention_days: usize,

    /// Series bucket size: day or week
    #[arg(long, default_value = "day")]
    pub granularity: Granularity,
}

impl ViewsArgs {
    pub fn options(&self) -> ViewsOptions {
        ViewsOptions {
            granularity: self.granularity,
            retention_days: self.retention_days,
        }
    }
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Number of contributors to list
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Recent commits to attribute (at most 100)
    #[arg(long, default_value_t = MAX_HISTORY_SIZE)]
    pub history_size: u32,

    /// Also write dark_mode.svg and light_mode.svg cards into this directory
    #[arg(long)]
    pub svg_dir: Option<PathBuf>,

    /// Score stargazers, watchers and fork owners (one query per user)
    #[arg(long)]
    pub audience: bool,

    /// Users sampled from each of stargazers, watchers and forks (at most 100)
    #[arg(long, default_value_t = 100)]
    pub sample_size: u32,

    /// Company substring that marks a user as affiliated
    #[arg(long, default_value = "microsoft")]
    pub org_keyword: String,

    #[arg(long, default_value_t = 50)]
    pub min_contributions: u64,

    #[arg(long, default_value_t = 5)]
    pub min_repositories: u64,
}

impl StatsArgs {
    pub fn options(&self) -> StatsOptions {
        StatsOptions {
            top_n: self.top_n,
            history_size: self.history_size,
        }
    }

    pub fn audience_options(&self) -> Option<AudienceOptions> {
        self.audience.then(|| AudienceOptions {
            sample_size: self.sample_size,
            org_keyword: self.org_keyword.clone(),
            min_contributions: self.min_contributions,
            min_repositories: self.min_repositories,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Prompt on the terminal for whatever was not supplied.
    Interactive,
    /// Use supplied values only.
    Injected,
}

pub struct Settings {
    repo_url: Option<String>,
    token: Option<String>,
    pub input: InputMode,
    pub endpoints: Endpoints,
    pub timeout: Duration,
    pub format: Format,
    pub log_level: String,
}

impl Settings {
    pub fn from_args(mut args: CommonArgs) -> Self {
        let token = non_blank(args.token.take())
            .or_else(|| non_blank(std::env::var(FALLBACK_TOKEN_ENV).ok()));
        Self::new(args, token)
    }

    fn new(args: CommonArgs, token: Option<String>) -> Self {
        let repo_url = non_blank(args.repo_url);
        let input = if args.no_prompt || (repo_url.is_some() && token.is_some()) {
            InputMode::Injected
        } else {
            InputMode::Interactive
        };

        Self {
            repo_url,
            token,
            input,
            endpoints: Endpoints {
                api_url: args.api_url,
                graphql_url: args.graphql_url,
            },
            timeout: Duration::from_secs(args.timeout_secs),
            format: args.format,
            log_level: args.log_level,
        }
    }

    /// The input source for this run. Prompts go to stderr; on a terminal the
    /// token is read without echo.
    pub fn input_source(&self) -> Box<dyn InputSource> {
        let injected = Injected {
            repo_url: self.repo_url.clone(),
            token: self.token.clone(),
        };

        match self.input {
            InputMode::Injected => Box::new(injected),
            InputMode::Interactive => {
                let tty = io::stdin().is_terminal();
                let mut prompt = Prompt::new(io::stdin().lock(), io::stderr());
                if tty {
                    prompt = prompt.with_secret_reader(|q| rpassword::prompt_password(q));
                }
                Box::new(Layered {
                    injected,
                    fallback: prompt,
                })
            }
        }
    }

    pub fn client(&self, token: AccessToken) -> Result<GithubClient> {
        GithubClient::new(token, self.endpoints.clone(), self.timeout)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
