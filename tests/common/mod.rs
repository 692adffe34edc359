#![allow(dead_code)]

use std::time::Duration;

use forge_stats::github::{Endpoints, GithubClient};
use forge_stats::{AccessToken, RepositoryRef};
use wiremock::MockServer;

pub const TOKEN: &str = "ghp_test_token";

pub fn repo() -> RepositoryRef {
    RepositoryRef::parse("https://github.com/acme/widget").unwrap()
}

pub fn endpoints(server: &MockServer) -> Endpoints {
    Endpoints {
        api_url: server.uri(),
        graphql_url: format!("{}/graphql", server.uri()),
    }
}

pub fn client(server: &MockServer) -> GithubClient {
    client_with_timeout(server, Duration::from_secs(5))
}

pub fn client_with_timeout(server: &MockServer, timeout: Duration) -> GithubClient {
    GithubClient::new(AccessToken::new(TOKEN).unwrap(), endpoints(server), timeout).unwrap()
}
