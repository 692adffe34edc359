use std::fmt;

use thiserror::Error;

/// Which API a rate limit came from. GitHub meters REST calls per request and
/// GraphQL calls by query cost, so the two are reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    Rest,
    GraphQl,
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Api::Rest => f.write_str("REST"),
            Api::GraphQl => f.write_str("GraphQL"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("InvalidRepositoryURL: {url:?} is not of the form https://host/owner/name")]
    InvalidRepositoryUrl { url: String },

    #[error("MissingCredential: no access token provided ({hint})")]
    MissingCredential { hint: &'static str },

    #[error("AuthenticationFailed: {repo}: the access token was rejected")]
    AuthenticationFailed { repo: String },

    #[error("NotFound: {repo}: repository does not exist or the token lacks access")]
    NotFound { repo: String },

    #[error("RateLimited: {repo}: {api} quota exhausted{}", retry_hint(.retry_after))]
    RateLimited {
        repo: String,
        api: Api,
        retry_after: Option<u64>,
    },

    #[error("GraphQLError: {repo}: {}", join_messages(.messages))]
    GraphQl { repo: String, messages: Vec<String> },

    #[error("MalformedResponse: {repo}: {detail}")]
    MalformedResponse { repo: String, detail: String },

    #[error("RequestTimeout: {repo}: no response within {secs}s")]
    RequestTimeout { repo: String, secs: u64 },

    #[error("HttpError: {repo}: unexpected status {status}")]
    Http { repo: String, status: u16 },

    #[error("Transport: {repo}: request failed")]
    Transport {
        repo: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Input: could not read input")]
    Input {
        #[from]
        source: std::io::Error,
    },

    #[error("ClientBuild: could not build the HTTP client")]
    Client {
        #[source]
        source: reqwest::Error,
    },
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

fn join_messages(messages: &[String]) -> String {
    messages.join("; ")
}

impl StatsError {
    /// Taxonomy name of the error, as printed at the start of its message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRepositoryUrl { .. } => "InvalidRepositoryURL",
            Self::MissingCredential { .. } => "MissingCredential",
            Self::AuthenticationFailed { .. } => "AuthenticationFailed",
            Self::NotFound { .. } => "NotFound",
            Self::RateLimited { .. } => "RateLimited",
            Self::GraphQl { .. } => "GraphQLError",
            Self::MalformedResponse { .. } => "MalformedResponse",
            Self::RequestTimeout { .. } => "RequestTimeout",
            Self::Http { .. } => "HttpError",
            Self::Transport { .. } => "Transport",
            Self::Input { .. } => "Input",
            Self::Client { .. } => "ClientBuild",
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T, E = StatsError> = std::result::Result<T, E>;
