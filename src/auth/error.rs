// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! [`AuthError`] is the internal taxonomy used while decoding and verifying
//! an Access assertion. Callers outside the auth module only ever see
//! [`Unauthenticated`], which keeps the reason for server-side logs and
//! renders the same 401 body whatever went wrong.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Internal authentication failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Token is not three base64url segments of JSON
    #[error("Token is malformed: {0}")]
    MalformedToken(String),
    /// A required claim is absent or has the wrong shape
    #[error("Token is missing required claims: {0}")]
    MissingClaims(String),
    /// The issuer's key set could not be retrieved or had no usable keys
    #[error("Failed to fetch signing keys: {0}")]
    KeyDiscoveryFailed(String),
    /// Algorithm, key id, or signature check failed
    #[error("Token signature is invalid: {0}")]
    InvalidSignature(String),
    /// Token issuer is not the one expected
    #[error("Token issuer mismatch (expected '{expected}', found '{found}')")]
    IssuerMismatch { expected: String, found: String },
    /// Expected audience is not among the token audiences
    #[error("Token audience does not include this application")]
    AudienceMismatch,
    /// Token is outside its validity window
    #[error("Token is not within its validity period: {0}")]
    Expired(String),
    /// No expected audience is configured
    #[error("Access audience is not configured")]
    NotConfigured,
    /// Neither identity header nor assertion present
    #[error("No credentials were presented")]
    NoCredentials,
    /// Verified token carries no usable email
    #[error("Token is missing the email claim")]
    MissingEmail,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::MissingClaims(_) => "missing_claims",
            AuthError::KeyDiscoveryFailed(_) => "key_discovery_failed",
            AuthError::InvalidSignature(_) => "invalid_signature",
            AuthError::IssuerMismatch { .. } => "issuer_mismatch",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::Expired(_) => "expired",
            AuthError::NotConfigured => "not_configured",
            AuthError::NoCredentials => "no_credentials",
            AuthError::MissingEmail => "missing_email",
        }
    }
}

/// The only authentication failure visible to callers.
///
/// Wraps the internal [`AuthError`] so it can be logged, while the HTTP
/// response stays the same for every reason.
#[derive(Debug)]
pub struct Unauthenticated {
    reason: AuthError,
}

impl Unauthenticated {
    pub fn new(reason: AuthError) -> Self {
        Self { reason }
    }

    /// The internal reason. For diagnostics only, never for responses.
    pub fn reason(&self) -> &AuthError {
        &self.reason
    }
}

impl From<AuthError> for Unauthenticated {
    fn from(reason: AuthError) -> Self {
        Self::new(reason)
    }
}

impl std::fmt::Display for Unauthenticated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Authentication required")
    }
}

impl std::error::Error for Unauthenticated {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl IntoResponse for Unauthenticated {
    fn into_response(self) -> Response {
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: "unauthenticated".to_string(),
        });
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}
