mod common;

use chrono::NaiveDate;
use forge_stats::StatsError;
use forge_stats::audience::{AudienceOptions, fetch_audience};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

async fn mount_sample(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "variables": { "owner": "acme", "name": "widget", "sampleSize": 100 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_profile(server: &MockServer, login: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "variables": {
                "login": login,
                "from": "2023-07-01T00:00:00Z",
                "to": "2024-06-30T23:59:59Z"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

fn user(company: Option<&str>, repositories: u64, contributions: u64) -> Value {
    json!({
        "data": {
            "user": {
                "company": company,
                "repositories": { "totalCount": repositories },
                "contributionsCollection": {
                    "contributionCalendar": { "totalContributions": contributions }
                }
            }
        }
    })
}

#[tokio::test]
async fn scores_unique_audience_members() {
    let server = MockServer::start().await;
    mount_sample(
        &server,
        json!({
            "data": {
                "repository": {
                    "stargazers": { "nodes": [{ "login": "alice" }, { "login": "bob" }] },
                    "watchers": { "nodes": [{ "login": "alice" }] },
                    "forks": { "nodes": [
                        { "owner": { "login": "carol" } },
                        { "owner": { "login": "dave" } }
                    ] }
                }
            }
        }),
    )
    .await;

    mount_profile(&server, "alice", user(Some("@microsoft"), 1, 3)).await;
    mount_profile(&server, "bob", user(Some("Acme"), 10, 60)).await;
    mount_profile(&server, "carol", user(None, 2, 400)).await;
    mount_profile(
        &server,
        "dave",
        json!({
            "data": { "user": null },
            "errors": [{
                "type": "NOT_FOUND",
                "message": "Could not resolve to a User with the login of 'dave'."
            }]
        }),
    )
    .await;

    let report = fetch_audience(
        &common::client(&server),
        &common::repo(),
        &AudienceOptions::default(),
        today(),
    )
    .await
    .unwrap();

    assert_eq!(report.sampled_users, 4);
    assert_eq!(report.significant_users, 2);
    assert_eq!(report.affiliated_users, 1);
    assert_eq!(report.power_user_rate, 0.5);
    assert_eq!(report.affiliated_rate, 0.25);
}

#[tokio::test]
async fn empty_audience_scores_zero() {
    let server = MockServer::start().await;
    mount_sample(
        &server,
        json!({
            "data": {
                "repository": {
                    "stargazers": { "nodes": [] },
                    "watchers": { "nodes": [] },
                    "forks": { "nodes": [] }
                }
            }
        }),
    )
    .await;

    let report = fetch_audience(
        &common::client(&server),
        &common::repo(),
        &AudienceOptions::default(),
        today(),
    )
    .await
    .unwrap();

    assert_eq!(report.sampled_users, 0);
    assert_eq!(report.power_user_rate, 0.0);
    assert_eq!(report.affiliated_rate, 0.0);
}

#[tokio::test]
async fn profile_errors_fail_fast() {
    let server = MockServer::start().await;
    mount_sample(
        &server,
        json!({
            "data": {
                "repository": {
                    "stargazers": { "nodes": [{ "login": "alice" }] },
                    "watchers": { "nodes": [] },
                    "forks": { "nodes": [] }
                }
            }
        }),
    )
    .await;
    mount_profile(
        &server,
        "alice",
        json!({ "errors": [{ "type": "RATE_LIMITED", "message": "API rate limit exceeded" }] }),
    )
    .await;

    let err = fetch_audience(
        &common::client(&server),
        &common::repo(),
        &AudienceOptions::default(),
        today(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StatsError::RateLimited { .. }), "{err}");
}
