// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token minting helpers shared by the auth unit tests.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use super::jwks::{parse_key_set, KeySet};

pub const SIGNING_KEY_PEM: &str = include_str!("../../tests/fixtures/signing.pem");
pub const SIGNING_KEY_N: &str = include_str!("../../tests/fixtures/signing.n");
pub const OTHER_KEY_PEM: &str = include_str!("../../tests/fixtures/other.pem");

pub const SIGNING_KID: &str = "signing";
pub const ISSUER: &str = "https://team.cloudflareaccess.com";
pub const AUDIENCE: &str = "4714c1358e65fe4b408ad6d432a5f878f08194bdb4752441fd56faefa9b2b6f2";

/// Claims of a token issued at `now`, valid for an hour.
pub fn claims_at(now: i64) -> Value {
    json!({
        "iss": ISSUER,
        "aud": [AUDIENCE],
        "sub": "7335d417-61da-459d-899c-0a01c76a2f94",
        "email": "alice@example.com",
        "iat": now,
        "nbf": now,
        "exp": now + 3600,
        "type": "app",
        "identity_nonce": "6ei69kawdKzMIAPF",
        "country": "GB",
        "custom": { "team": "infra" },
    })
}

/// Sign with the fixture key using RS256.
pub fn sign(claims: &Value, kid: Option<&str>) -> String {
    sign_with(Algorithm::RS256, SIGNING_KEY_PEM, kid, claims)
}

pub fn sign_with(alg: Algorithm, pem: &str, kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(alg);
    header.kid = kid.map(str::to_owned);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Key-set document publishing the fixture signing key.
pub fn jwks_document() -> Value {
    json!({
        "keys": [
            { "kty": "RSA", "kid": SIGNING_KID, "alg": "RS256", "use": "sig", "n": SIGNING_KEY_N, "e": "AQAB" },
        ]
    })
}

pub fn key_set() -> KeySet {
    parse_key_set(jwks_document()).unwrap()
}
