// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Unverified peek into a compact JWT.
//!
//! Nothing returned from here is trusted. [`UnverifiedClaims`] only tells us
//! where to look for keys and lets us reject a token for the wrong audience
//! before doing any network I/O. The verifier re-checks everything.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::AuthError;

/// Issuer and audiences read without checking the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedClaims {
    issuer: String,
    audiences: Vec<String>,
}

impl UnverifiedClaims {
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audiences(&self) -> &[String] {
        &self.audiences
    }

    pub fn has_audience(&self, audience: &str) -> bool {
        self.audiences.iter().any(|a| a == audience)
    }
}

/// JOSE header fields needed to pick a verification key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    #[serde(default)]
    pub kid: Option<String>,
}

/// Split a compact token into its three segments.
fn segments(token: &str) -> Result<[&str; 3], AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    match parts.as_slice() {
        [header, payload, signature] => Ok([*header, *payload, *signature]),
        _ => Err(AuthError::MalformedToken(format!(
            "expected 3 segments, found {}",
            parts.len()
        ))),
    }
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::MalformedToken(format!("{name} is not base64url: {e}")))
}

/// Read the header segment.
pub fn decode_header(token: &str) -> Result<TokenHeader, AuthError> {
    let [header, _, _] = segments(token)?;
    let bytes = decode_segment(header, "header")?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::MalformedToken(format!("header is not valid JSON: {e}")))
}

/// Read issuer and audiences from the payload segment.
pub fn decode(token: &str) -> Result<UnverifiedClaims, AuthError> {
    let [_, payload, _] = segments(token)?;
    let bytes = decode_segment(payload, "payload")?;
    let claims: Map<String, Value> = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::MalformedToken(format!("payload is not a JSON object: {e}")))?;

    let issuer = match claims.get("iss") {
        Some(Value::String(iss)) if !iss.is_empty() => iss.clone(),
        _ => return Err(AuthError::MissingClaims("iss".to_string())),
    };
    let audiences = parse_audiences(claims.get("aud"))?;

    Ok(UnverifiedClaims { issuer, audiences })
}

/// Normalize an `aud` claim that may be a string or an array of strings.
///
/// Empty strings are dropped. Any other shape, or nothing left, is an error.
pub(crate) fn parse_audiences(aud: Option<&Value>) -> Result<Vec<String>, AuthError> {
    let missing = || AuthError::MissingClaims("aud".to_string());

    let audiences: Vec<String> = match aud {
        Some(Value::String(single)) => vec![single.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_owned).ok_or_else(missing))
            .collect::<Result<_, _>>()?,
        _ => return Err(missing()),
    };

    let audiences: Vec<String> = audiences.into_iter().filter(|a| !a.is_empty()).collect();
    if audiences.is_empty() {
        return Err(missing());
    }
    Ok(audiences)
}
