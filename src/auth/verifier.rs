// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access assertion verification.
//!
//! Checks run in a fixed order: algorithm family, key id, signature, issuer,
//! audience, validity window. The algorithm is checked against a closed set
//! before any key is looked up, so a token can never pick a different
//! verification mechanism than RSA.

use std::str::FromStr;

use jsonwebtoken::{errors::ErrorKind, Algorithm, Validation};

use super::claims::{numeric_date, text, AccessClaims, VerifiedClaims};
use super::jwks::KeySet;
use super::token::{decode_header, parse_audiences};
use super::AuthError;

/// Clock skew tolerance (60 seconds), applied to both `exp` and `nbf`.
pub const CLOCK_SKEW_LEEWAY: i64 = 60;

/// Signing algorithms accepted for Access assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaAlgorithm {
    RS256,
    RS384,
    RS512,
    PS256,
    PS384,
    PS512,
}

impl FromStr for RsaAlgorithm {
    type Err = AuthError;

    fn from_str(alg: &str) -> Result<Self, Self::Err> {
        match alg {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "PS256" => Ok(Self::PS256),
            "PS384" => Ok(Self::PS384),
            "PS512" => Ok(Self::PS512),
            other => Err(AuthError::InvalidSignature(format!(
                "unsupported algorithm '{other}'"
            ))),
        }
    }
}

impl From<RsaAlgorithm> for Algorithm {
    fn from(alg: RsaAlgorithm) -> Self {
        match alg {
            RsaAlgorithm::RS256 => Algorithm::RS256,
            RsaAlgorithm::RS384 => Algorithm::RS384,
            RsaAlgorithm::RS512 => Algorithm::RS512,
            RsaAlgorithm::PS256 => Algorithm::PS256,
            RsaAlgorithm::PS384 => Algorithm::PS384,
            RsaAlgorithm::PS512 => Algorithm::PS512,
        }
    }
}

/// Verify a token against a key set using the current time.
pub fn verify(
    token: &str,
    keys: &KeySet,
    expected_issuer: &str,
    expected_audience: &str,
) -> Result<VerifiedClaims, AuthError> {
    verify_at(
        token,
        keys,
        expected_issuer,
        expected_audience,
        chrono::Utc::now().timestamp(),
    )
}

/// Verify a token against a key set as of `now` (Unix seconds).
pub fn verify_at(
    token: &str,
    keys: &KeySet,
    expected_issuer: &str,
    expected_audience: &str,
    now: i64,
) -> Result<VerifiedClaims, AuthError> {
    let header = decode_header(token)?;
    let algorithm: RsaAlgorithm = header.alg.parse()?;

    let kid = header
        .kid
        .as_deref()
        .filter(|kid| !kid.is_empty())
        .ok_or_else(|| AuthError::InvalidSignature("token header has no key id".to_string()))?;
    let key = keys
        .get(kid)
        .ok_or_else(|| AuthError::InvalidSignature(format!("unknown key '{kid}'")))?;

    // Signature only; claim checks below keep their own error kinds and order.
    let mut validation = Validation::new(algorithm.into());
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    let claims = jsonwebtoken::decode::<AccessClaims>(token, &key.decoding_key(), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                AuthError::MalformedToken(e.to_string())
            }
            _ => AuthError::InvalidSignature(e.to_string()),
        })?
        .claims;

    let issuer = text(claims.iss.as_ref())
        .filter(|iss| !iss.is_empty())
        .ok_or_else(|| AuthError::MissingClaims("iss".to_string()))?;
    if issuer != expected_issuer {
        return Err(AuthError::IssuerMismatch {
            expected: expected_issuer.to_string(),
            found: issuer,
        });
    }

    let audiences = parse_audiences(claims.aud.as_ref())?;
    if !audiences.iter().any(|aud| aud == expected_audience) {
        return Err(AuthError::AudienceMismatch);
    }

    let exp = numeric_date(claims.exp.as_ref(), "exp")?;
    let nbf = numeric_date(claims.nbf.as_ref(), "nbf")?;
    check_validity_window(exp, nbf, now)?;

    // iat is informational only; a malformed value is dropped.
    let iat = numeric_date(claims.iat.as_ref(), "iat").ok().flatten();

    Ok(VerifiedClaims {
        issuer,
        audiences,
        subject: text(claims.sub.as_ref()),
        email: text(claims.email.as_ref()),
        expires_at: exp.map(whole_seconds),
        not_before: nbf.map(whole_seconds),
        issued_at: iat.map(whole_seconds),
        token_type: text(claims.token_type.as_ref()),
        identity_nonce: text(claims.identity_nonce.as_ref()),
        country: text(claims.country.as_ref()),
        extra: claims.extra,
    })
}

fn check_validity_window(exp: Option<f64>, nbf: Option<f64>, now: i64) -> Result<(), AuthError> {
    let leeway = CLOCK_SKEW_LEEWAY as f64;
    let current = now as f64;
    if let Some(exp) = exp {
        if current > exp + leeway {
            return Err(AuthError::Expired(format!("expired at {exp}, now {now}")));
        }
    }
    if let Some(nbf) = nbf {
        if current + leeway < nbf {
            return Err(AuthError::Expired(format!("not valid before {nbf}, now {now}")));
        }
    }
    Ok(())
}

fn whole_seconds(date: f64) -> i64 {
    date.floor() as i64
}
