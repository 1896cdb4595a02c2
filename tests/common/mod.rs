// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared helpers: a mock Access key endpoint and assertion minting.

#![allow(dead_code)]

use std::time::Duration;

use access_gate::auth::{Authenticator, KeySetFetcher};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SIGNING_KEY_PEM: &str = include_str!("../fixtures/signing.pem");
pub const SIGNING_KEY_N: &str = include_str!("../fixtures/signing.n");
pub const OTHER_KEY_PEM: &str = include_str!("../fixtures/other.pem");
pub const OTHER_KEY_N: &str = include_str!("../fixtures/other.n");

pub const SIGNING_KID: &str = "signing";
pub const AUDIENCE: &str = "4714c1358e65fe4b408ad6d432a5f878f08194bdb4752441fd56faefa9b2b6f2";
pub const CERTS_PATH: &str = "/cdn-cgi/access/certs";

pub fn jwks_document() -> Value {
    json!({
        "keys": [
            { "kty": "RSA", "kid": SIGNING_KID, "alg": "RS256", "use": "sig", "n": SIGNING_KEY_N, "e": "AQAB" },
            { "kty": "RSA", "kid": "previous", "alg": "RS256", "use": "sig", "n": OTHER_KEY_N, "e": "AQAB" },
        ]
    })
}

/// Mock team domain serving the key set, expecting `calls` fetches.
pub async fn access_server(calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document()))
        .expect(calls)
        .mount(&server)
        .await;
    server
}

/// Mock team domain answering every request with `response`.
pub async fn access_server_with(response: ResponseTemplate, calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CERTS_PATH))
        .respond_with(response)
        .expect(calls)
        .mount(&server)
        .await;
    server
}

pub fn fetcher(timeout: Duration) -> KeySetFetcher {
    KeySetFetcher::new(timeout).unwrap().allow_http()
}

pub fn authenticator() -> Authenticator {
    Authenticator::new(AUDIENCE, fetcher(Duration::from_secs(5)))
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Claims for an assertion issued by `issuer` for `email`, valid for an hour.
pub fn claims(issuer: &str, email: &str) -> Value {
    let now = now();
    json!({
        "iss": issuer,
        "aud": [AUDIENCE],
        "sub": "7335d417-61da-459d-899c-0a01c76a2f94",
        "email": email,
        "iat": now,
        "nbf": now,
        "exp": now + 3600,
        "type": "app",
        "identity_nonce": "6ei69kawdKzMIAPF",
        "country": "GB",
    })
}

pub fn sign(claims: &Value) -> String {
    sign_with(SIGNING_KEY_PEM, Some(SIGNING_KID), claims)
}

pub fn sign_with(pem: &str, kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_owned);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}
