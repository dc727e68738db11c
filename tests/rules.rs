mod common;

use std::sync::Arc;

use httpmock::MockServer;
use reqwest::StatusCode;
use serde_json::json;
use twitter_client_sdk::error::Kind;
use twitter_client_sdk::filtered_stream::{RuleLookup, RuleSpec};
use twitter_client_sdk::types::NumericId;
use twitter_client_sdk::{Client, Config};

use crate::common::{CountingRetryer, ImmediateRetryer, RefuseRetryer, bearer_header, client};

const RULES_PATH: &str = "/2/tweets/search/stream/rules";

#[tokio::test]
async fn get_rules_should_succeed() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server.base_url());

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::GET)
            .path(RULES_PATH)
            .header("authorization", bearer_header());
        then.status(StatusCode::OK).json_body(json!({
            "data": [
                { "id": "1166895166390583299", "value": "cat has:images", "tag": "cats" }
            ],
            "meta": { "sent": "2019-08-29T01:12:10.729Z" }
        }));
    });

    let response = client.get_rules(&RuleLookup::default()).await?;

    assert_eq!(response.data.len(), 1);
    assert_eq!(response.data[0].id.as_str(), "1166895166390583299");
    assert_eq!(response.data[0].value, "cat has:images");
    assert_eq!(response.data[0].tag.as_deref(), Some("cats"));
    assert!(response.meta.sent.is_some());
    mock.assert();

    Ok(())
}

#[tokio::test]
async fn get_rules_by_id_should_join_ids() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server.base_url());

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::GET)
            .path(RULES_PATH)
            .query_param("ids", "123,456");
        then.status(StatusCode::OK)
            .json_body(json!({ "data": [] }));
    });

    let lookup = RuleLookup {
        ids: vec![NumericId::new("123"), NumericId::new("456")],
    };
    client.get_rules(&lookup).await?;
    mock.assert();

    Ok(())
}

#[tokio::test]
async fn create_rules_should_succeed() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server.base_url());

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path(RULES_PATH)
            .header("content-type", "application/json")
            .json_body(json!({
                "add": [{ "value": "cat has:images", "tag": "cats" }]
            }));
        then.status(StatusCode::CREATED).json_body(json!({
            "data": [
                { "id": "1166895166390583299", "value": "cat has:images", "tag": "cats" }
            ],
            "meta": {
                "sent": "2019-08-29T01:12:10.729Z",
                "summary": { "created": 1, "not_created": 0 }
            }
        }));
    });

    let response = client
        .create_rules(&[RuleSpec::new("cat has:images").with_tag("cats")])
        .await?;

    assert_eq!(response.data.len(), 1);
    assert_eq!(response.meta.summary.created, 1);
    mock.assert();

    Ok(())
}

#[tokio::test]
async fn validate_rules_should_dry_run() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server.base_url());

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path(RULES_PATH)
            .query_param("dry_run", "true")
            .json_body(json!({ "add": [{ "value": "cat has:images" }] }));
        then.status(StatusCode::OK).json_body(json!({
            "meta": {
                "sent": "2019-08-29T01:12:10.729Z",
                "summary": { "valid": 1, "invalid": 0 }
            }
        }));
    });

    let response = client
        .validate_rules(&[RuleSpec::new("cat has:images")])
        .await?;

    assert!(response.data.is_empty());
    assert_eq!(response.meta.summary.valid, 1);
    mock.assert();

    Ok(())
}

#[tokio::test]
async fn delete_rules_should_succeed() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server.base_url());

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path(RULES_PATH)
            .json_body(json!({ "delete": { "ids": ["1166895166390583299"] } }));
        then.status(StatusCode::OK).json_body(json!({
            "meta": {
                "sent": "2019-08-29T01:12:10.729Z",
                "summary": { "deleted": 1, "not_deleted": 0 }
            }
        }));
    });

    let response = client
        .delete_rules(&[NumericId::new("1166895166390583299")])
        .await?;

    assert_eq!(response.meta.summary.deleted, 1);
    mock.assert();

    Ok(())
}

#[tokio::test]
async fn filed_diagnostic_should_surface_as_status_error() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server.base_url());

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::GET).path(RULES_PATH);
        then.status(StatusCode::FORBIDDEN).json_body(json!({
            "title": "Client Forbidden",
            "detail": "This client is not enrolled in the filtered stream",
            "type": "https://api.twitter.com/2/problems/client-forbidden"
        }));
    });

    let error = client
        .get_rules(&RuleLookup::default())
        .await
        .expect_err("filed diagnostic");

    assert_eq!(error.kind(), Kind::Status);
    assert_eq!(error.status_code(), Some(StatusCode::FORBIDDEN));
    assert!(error.to_string().contains("not enrolled"));
    mock.assert();

    Ok(())
}

#[tokio::test]
async fn unfiled_error_status_should_fall_through() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server.base_url());

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::GET).path(RULES_PATH);
        then.status(StatusCode::NOT_FOUND).body("");
    });

    // the API filed no diagnostic, so there is nothing to report; the empty
    // body decodes to the default output
    let response = client.get_rules(&RuleLookup::default()).await?;

    assert!(response.data.is_empty());
    assert!(response.errors.is_empty());
    mock.assert();

    Ok(())
}

#[tokio::test]
async fn retries_should_be_bounded_by_the_budget() -> anyhow::Result<()> {
    let server = MockServer::start();
    let config = Config::new()
        .with_credentials(twitter_client_sdk::credentials::Credentials::new(
            common::BEARER_TOKEN,
        ))
        .with_retryer(Arc::new(ImmediateRetryer { max: 2 }));
    let client = Client::with_endpoint(config, &server.base_url());

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::GET).path(RULES_PATH);
        then.status(StatusCode::INTERNAL_SERVER_ERROR)
            .json_body(json!({ "title": "Internal Error", "detail": "upstream" }));
    });

    let error = client
        .get_rules(&RuleLookup::default())
        .await
        .expect_err("exhausted retries");

    assert_eq!(error.kind(), Kind::Status);
    // initial attempt plus two retries
    mock.assert_hits(3);

    Ok(())
}

#[tokio::test]
async fn html_error_body_should_still_be_retried() -> anyhow::Result<()> {
    let server = MockServer::start();
    let config = Config::new()
        .with_credentials(twitter_client_sdk::credentials::Credentials::new(
            common::BEARER_TOKEN,
        ))
        .with_retryer(Arc::new(ImmediateRetryer { max: 2 }));
    let client = Client::with_endpoint(config, &server.base_url());

    // a proxy answering for the API does not speak its JSON error format
    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::GET).path(RULES_PATH);
        then.status(StatusCode::BAD_GATEWAY)
            .header("content-type", "text/html")
            .body("<html><body>502 Bad Gateway</body></html>");
    });

    let error = client
        .get_rules(&RuleLookup::default())
        .await
        .expect_err("exhausted retries");

    assert_eq!(error.kind(), Kind::Status);
    assert_eq!(error.status_code(), Some(StatusCode::BAD_GATEWAY));
    // initial attempt plus two retries
    mock.assert_hits(3);

    Ok(())
}

#[tokio::test]
async fn transport_failures_should_be_retried() -> anyhow::Result<()> {
    let retryer = Arc::new(CountingRetryer {
        max: 2,
        ..Default::default()
    });
    let config = Config::new()
        .with_credentials(twitter_client_sdk::credentials::Credentials::new(
            common::BEARER_TOKEN,
        ))
        .with_retryer(Arc::clone(&retryer) as Arc<dyn twitter_client_sdk::retry::Retryer>);
    // nothing listens on port 1, so every attempt is refused
    let client = Client::with_endpoint(config, "http://127.0.0.1:1");

    let error = client
        .get_rules(&RuleLookup::default())
        .await
        .expect_err("connection refused");

    assert_eq!(error.kind(), Kind::Transport);
    assert!(error.status_code().is_none());
    // the policy is consulted for the two in-budget retries; the third
    // attempt exceeds the budget before the policy is asked
    assert_eq!(retryer.consulted.load(std::sync::atomic::Ordering::SeqCst), 2);

    Ok(())
}

#[tokio::test]
async fn policy_refusal_should_stop_after_one_attempt() -> anyhow::Result<()> {
    let server = MockServer::start();
    let config = Config::new()
        .with_credentials(twitter_client_sdk::credentials::Credentials::new(
            common::BEARER_TOKEN,
        ))
        .with_retryer(Arc::new(RefuseRetryer { max: 5 }));
    let client = Client::with_endpoint(config, &server.base_url());

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::GET).path(RULES_PATH);
        then.status(StatusCode::INTERNAL_SERVER_ERROR)
            .json_body(json!({ "title": "Internal Error" }));
    });

    client
        .get_rules(&RuleLookup::default())
        .await
        .expect_err("policy refused retry");
    mock.assert_hits(1);

    Ok(())
}

#[tokio::test]
async fn missing_credentials_should_make_no_network_call() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = Client::with_endpoint(Config::new(), &server.base_url());

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::GET).path(RULES_PATH);
        then.status(StatusCode::OK).json_body(json!({}));
    });

    let error = client
        .get_rules(&RuleLookup::default())
        .await
        .expect_err("empty credentials");

    assert_eq!(error.kind(), Kind::Credentials);
    mock.assert_hits(0);

    Ok(())
}
