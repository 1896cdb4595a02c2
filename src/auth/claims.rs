// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified Access claims and the authenticated user representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::AuthError;

/// Claims as they appear in an Access assertion payload.
///
/// Only deserialized after the signature has been checked. Every modelled
/// claim stays loosely typed so that an odd value is reported as a missing
/// claim (or dropped, for claims nothing depends on) rather than failing the
/// whole decode.
/// See: https://developers.cloudflare.com/cloudflare-one/identity/authorization-cookie/application-token/
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccessClaims {
    #[serde(default)]
    pub iss: Option<Value>,
    #[serde(default)]
    pub aud: Option<Value>,
    #[serde(default)]
    pub sub: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub exp: Option<Value>,
    #[serde(default)]
    pub nbf: Option<Value>,
    #[serde(default)]
    pub iat: Option<Value>,
    /// "app" for user tokens, "service-token" style values otherwise
    #[serde(default, rename = "type")]
    pub token_type: Option<Value>,
    #[serde(default)]
    pub identity_nonce: Option<Value>,
    #[serde(default)]
    pub country: Option<Value>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// String value of an optional claim; other JSON types read as absent.
pub(crate) fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_owned)
}

/// A NumericDate claim (RFC 7519 §2): any JSON number, fractions allowed.
pub(crate) fn numeric_date(value: Option<&Value>, name: &str) -> Result<Option<f64>, AuthError> {
    match value {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| AuthError::MissingClaims(name.to_string())),
    }
}

/// Claims from a token whose signature, issuer, audience and validity window
/// have all been checked. Only the verifier constructs this.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedClaims {
    pub(crate) issuer: String,
    pub(crate) audiences: Vec<String>,
    pub(crate) subject: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) expires_at: Option<i64>,
    pub(crate) not_before: Option<i64>,
    pub(crate) issued_at: Option<i64>,
    pub(crate) token_type: Option<String>,
    pub(crate) identity_nonce: Option<String>,
    pub(crate) country: Option<String>,
    pub(crate) extra: HashMap<String, Value>,
}

impl VerifiedClaims {
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audiences(&self) -> &[String] {
        &self.audiences
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The email claim, trimmed, if present and non-blank.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    pub fn not_before(&self) -> Option<i64> {
        self.not_before
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.issued_at
    }

    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    pub fn identity_nonce(&self) -> Option<&str> {
        self.identity_nonce.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// Any claim not modelled above.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}

/// Where an identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Gateway-set identity header
    Header,
    /// Verified Access assertion
    Assertion,
}

/// Authenticated user information.
///
/// This is the type handlers receive for the user making a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Email address of the user
    pub email: String,

    /// How the identity was established
    pub source: IdentitySource,
}

impl AuthenticatedUser {
    pub fn from_header(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            source: IdentitySource::Header,
        }
    }

    pub fn from_assertion(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            source: IdentitySource::Assertion,
        }
    }
}
