// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end authentication against a mock Access team domain.

mod common;

use std::sync::Arc;
use std::time::Duration;

use access_gate::api::router;
use access_gate::auth::extractor::{ASSERTION_HEADER, IDENTITY_HEADER};
use access_gate::auth::jwks::MAX_KEY_SET_BYTES;
use access_gate::auth::{AuthError, Authenticator, IdentitySource};
use access_gate::state::AppState;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::json;
use tower::ServiceExt;
use wiremock::ResponseTemplate;

use common::*;

fn assertion_headers(assertion: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ASSERTION_HEADER, HeaderValue::from_str(assertion).unwrap());
    headers
}

#[tokio::test]
async fn identity_header_is_returned_without_network() {
    let server = access_server(0).await;
    let mut headers = assertion_headers(&sign(&claims(&server.uri(), "someone-else@example.com")));
    headers.insert(IDENTITY_HEADER, HeaderValue::from_static("alice@example.com"));

    let user = authenticator().authenticate(&headers).await.unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.source, IdentitySource::Header);
}

#[tokio::test]
async fn request_without_credentials_is_rejected() {
    let err = authenticator().authenticate(&HeaderMap::new()).await.unwrap_err();
    assert_eq!(err.reason(), &AuthError::NoCredentials);
}

#[tokio::test]
async fn valid_assertion_yields_email() {
    let server = access_server(1).await;
    let assertion = sign(&claims(&server.uri(), "alice@example.com"));

    let user = authenticator()
        .authenticate(&assertion_headers(&assertion))
        .await
        .unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.source, IdentitySource::Assertion);
}

#[tokio::test]
async fn assertion_signed_with_rotated_key_is_accepted() {
    let server = access_server(1).await;
    let assertion = sign_with(OTHER_KEY_PEM, Some("previous"), &claims(&server.uri(), "bob@example.com"));

    let user = authenticator()
        .authenticate(&assertion_headers(&assertion))
        .await
        .unwrap();
    assert_eq!(user.email, "bob@example.com");
}

#[tokio::test]
async fn garbage_assertion_is_malformed() {
    for garbage in ["garbage", "a.b", "a.b.c", "....."] {
        let err = authenticator()
            .authenticate(&assertion_headers(garbage))
            .await
            .unwrap_err();
        assert!(
            matches!(err.reason(), AuthError::MalformedToken(_)),
            "{garbage:?} gave {:?}",
            err.reason()
        );
    }
}

#[tokio::test]
async fn unsigned_assertion_is_invalid_signature() {
    let server = access_server(1).await;
    let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "none", "kid": SIGNING_KID }).to_string());
    let payload = URL_SAFE_NO_PAD.encode(claims(&server.uri(), "mallory@example.com").to_string());
    let assertion = format!("{header}.{payload}.");

    let err = authenticator()
        .authenticate(&assertion_headers(&assertion))
        .await
        .unwrap_err();
    assert!(matches!(err.reason(), AuthError::InvalidSignature(_)));
}

#[tokio::test]
async fn assertion_from_unknown_key_is_invalid_signature() {
    let server = access_server(1).await;
    let assertion = sign_with(SIGNING_KEY_PEM, Some("retired"), &claims(&server.uri(), "alice@example.com"));

    let err = authenticator()
        .authenticate(&assertion_headers(&assertion))
        .await
        .unwrap_err();
    assert_eq!(
        err.reason(),
        &AuthError::InvalidSignature("unknown key 'retired'".to_string())
    );
}

#[tokio::test]
async fn expired_assertion_is_rejected() {
    let server = access_server(1).await;
    let mut claims = claims(&server.uri(), "alice@example.com");
    claims["iat"] = json!(now() - 10_800);
    claims["nbf"] = json!(now() - 10_800);
    claims["exp"] = json!(now() - 7_200);

    let err = authenticator()
        .authenticate(&assertion_headers(&sign(&claims)))
        .await
        .unwrap_err();
    assert!(matches!(err.reason(), AuthError::Expired(_)));
}

#[tokio::test]
async fn key_endpoint_error_fails_closed() {
    let server = access_server_with(ResponseTemplate::new(500), 1).await;
    let assertion = sign(&claims(&server.uri(), "alice@example.com"));

    let err = authenticator()
        .authenticate(&assertion_headers(&assertion))
        .await
        .unwrap_err();
    assert!(matches!(err.reason(), AuthError::KeyDiscoveryFailed(_)));
    assert_eq!(err.to_string(), "Authentication required");
}

#[tokio::test]
async fn key_endpoint_without_rsa_keys_fails_closed() {
    let body = json!({ "keys": [{ "kty": "EC", "kid": "ec", "crv": "P-256", "x": "AA", "y": "AA" }] });
    let server = access_server_with(ResponseTemplate::new(200).set_body_json(body), 1).await;
    let assertion = sign(&claims(&server.uri(), "alice@example.com"));

    let err = authenticator()
        .authenticate(&assertion_headers(&assertion))
        .await
        .unwrap_err();
    assert_eq!(
        err.reason(),
        &AuthError::KeyDiscoveryFailed("no usable keys".to_string())
    );
}

#[tokio::test]
async fn key_endpoint_with_invalid_document_fails_closed() {
    let server = access_server_with(ResponseTemplate::new(200).set_body_string("<html>"), 1).await;
    let assertion = sign(&claims(&server.uri(), "alice@example.com"));

    let err = authenticator()
        .authenticate(&assertion_headers(&assertion))
        .await
        .unwrap_err();
    assert!(matches!(err.reason(), AuthError::KeyDiscoveryFailed(_)));
}

fn padded_key_document(padding: usize) -> serde_json::Value {
    let mut document = jwks_document();
    document["padding"] = json!("x".repeat(padding));
    document
}

#[tokio::test]
async fn oversized_key_document_is_rejected() {
    let body = padded_key_document(MAX_KEY_SET_BYTES + 1);
    let server = access_server_with(ResponseTemplate::new(200).set_body_json(body), 1).await;
    let assertion = sign(&claims(&server.uri(), "alice@example.com"));

    let err = authenticator()
        .authenticate(&assertion_headers(&assertion))
        .await
        .unwrap_err();
    assert_eq!(
        err.reason(),
        &AuthError::KeyDiscoveryFailed("key set document too large".to_string())
    );
}

#[tokio::test]
async fn key_document_under_size_cap_is_accepted() {
    let body = padded_key_document(MAX_KEY_SET_BYTES / 2);
    let server = access_server_with(ResponseTemplate::new(200).set_body_json(body), 1).await;
    let assertion = sign(&claims(&server.uri(), "alice@example.com"));

    let user = authenticator()
        .authenticate(&assertion_headers(&assertion))
        .await
        .unwrap();
    assert_eq!(user.email, "alice@example.com");
}

#[tokio::test]
async fn slow_key_endpoint_times_out() {
    let server = access_server_with(
        ResponseTemplate::new(200)
            .set_body_json(jwks_document())
            .set_delay(Duration::from_secs(2)),
        1,
    )
    .await;
    let auth = Authenticator::new(AUDIENCE, fetcher(Duration::from_millis(200)));
    let assertion = sign(&claims(&server.uri(), "alice@example.com"));

    let started = std::time::Instant::now();
    let err = auth
        .authenticate(&assertion_headers(&assertion))
        .await
        .unwrap_err();
    assert!(matches!(err.reason(), AuthError::KeyDiscoveryFailed(_)));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn unconfigured_audience_rejects_valid_assertions() {
    let server = access_server(0).await;
    let auth = Authenticator::new("", fetcher(Duration::from_secs(5)));
    let assertion = sign(&claims(&server.uri(), "alice@example.com"));

    let err = auth
        .authenticate(&assertion_headers(&assertion))
        .await
        .unwrap_err();
    assert_eq!(err.reason(), &AuthError::NotConfigured);
}

#[tokio::test]
async fn team_domain_pin_rejects_other_issuers() {
    let server = access_server(0).await;
    let auth = authenticator().with_team_domain("team.cloudflareaccess.com");
    let assertion = sign(&claims(&server.uri(), "alice@example.com"));

    let err = auth
        .authenticate(&assertion_headers(&assertion))
        .await
        .unwrap_err();
    assert!(matches!(err.reason(), AuthError::IssuerMismatch { .. }));
}

#[tokio::test]
async fn keys_are_refetched_without_cache() {
    let server = access_server(2).await;
    let auth = authenticator();
    let headers = assertion_headers(&sign(&claims(&server.uri(), "alice@example.com")));

    auth.authenticate(&headers).await.unwrap();
    auth.authenticate(&headers).await.unwrap();
}

#[tokio::test]
async fn cached_keys_are_reused_within_ttl() {
    let server = access_server(1).await;
    let auth = Authenticator::new(
        AUDIENCE,
        fetcher(Duration::from_secs(5)).with_cache_ttl(Duration::from_secs(60)),
    );
    let headers = assertion_headers(&sign(&claims(&server.uri(), "alice@example.com")));

    auth.authenticate(&headers).await.unwrap();
    auth.authenticate(&headers).await.unwrap();
}

#[tokio::test]
async fn expired_cache_entry_is_refetched() {
    let server = access_server(2).await;
    let auth = Authenticator::new(
        AUDIENCE,
        fetcher(Duration::from_secs(5)).with_cache_ttl(Duration::from_millis(50)),
    );
    let headers = assertion_headers(&sign(&claims(&server.uri(), "alice@example.com")));

    auth.authenticate(&headers).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    auth.authenticate(&headers).await.unwrap();
}

#[tokio::test]
async fn failed_fetch_is_not_cached() {
    let server = access_server_with(ResponseTemplate::new(503), 2).await;
    let auth = Authenticator::new(
        AUDIENCE,
        fetcher(Duration::from_secs(5)).with_cache_ttl(Duration::from_secs(60)),
    );
    let headers = assertion_headers(&sign(&claims(&server.uri(), "alice@example.com")));

    assert!(auth.authenticate(&headers).await.is_err());
    assert!(auth.authenticate(&headers).await.is_err());
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    let server = access_server(8).await;
    let auth = Arc::new(authenticator());

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..8 {
        let auth = Arc::clone(&auth);
        let email = format!("user{i}@example.com");
        let headers = assertion_headers(&sign(&claims(&server.uri(), &email)));
        tasks.spawn(async move { (email, auth.authenticate(&headers).await) });
    }

    while let Some(joined) = tasks.join_next().await {
        let (email, result) = joined.unwrap();
        assert_eq!(result.unwrap().email, email);
    }
}

#[tokio::test]
async fn info_endpoint_accepts_assertions() {
    let server = access_server(1).await;
    let app = router(AppState::new(authenticator()));
    let assertion = sign(&claims(&server.uri(), "carol@example.com"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/info")
                .header(ASSERTION_HEADER, assertion)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["email"], "carol@example.com");
    assert_eq!(body["message"], "This is a Forge test application.");
}

#[tokio::test]
async fn info_endpoint_hides_failure_reason() {
    let server = access_server_with(ResponseTemplate::new(500), 1).await;
    let app = router(AppState::new(authenticator()));
    let assertion = sign(&claims(&server.uri(), "carol@example.com"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/info")
                .header(ASSERTION_HEADER, assertion)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        body,
        json!({ "error": "Authentication required", "error_code": "unauthenticated" })
    );
}
