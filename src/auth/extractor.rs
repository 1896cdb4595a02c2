// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request authentication and the Axum extractor built on it.
//!
//! Use the `Identity` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Identity(user): Identity) -> impl IntoResponse {
//!     // user.email is the authenticated address
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use super::jwks::KeySetFetcher;
use super::{token, verifier, AuthError, AuthenticatedUser, Unauthenticated};
use crate::config::AccessConfig;
use crate::state::AppState;

/// Email header set by Cloudflare Access on requests it let through.
pub const IDENTITY_HEADER: &str = "cf-access-authenticated-user-email";

/// Signed assertion header set by Cloudflare Access.
pub const ASSERTION_HEADER: &str = "cf-access-jwt-assertion";

/// Authenticates requests arriving through Cloudflare Access.
///
/// Holds no per-request state; share it behind an `Arc`.
#[derive(Clone)]
pub struct Authenticator {
    /// Expected audience (Access application AUD tag)
    audience: String,
    /// Issuer pinned by the configured team domain
    team_issuer: Option<String>,
    /// Key discovery
    keys: KeySetFetcher,
}

impl Authenticator {
    pub fn new(audience: impl Into<String>, keys: KeySetFetcher) -> Self {
        Self {
            audience: audience.into().trim().to_string(),
            team_issuer: None,
            keys,
        }
    }

    /// Build from configuration.
    pub fn from_config(config: &AccessConfig) -> Result<Self, reqwest::Error> {
        let keys = KeySetFetcher::new(config.fetch_timeout)?.with_cache_ttl(config.cache_ttl);
        let authenticator = Self::new(config.audience.clone(), keys);
        Ok(match config.team_domain.as_deref() {
            Some(domain) => authenticator.with_team_domain(domain),
            None => authenticator,
        })
    }

    /// Only accept assertions issued for this team domain.
    ///
    /// Accepts `team.cloudflareaccess.com` or a full `https://` URL.
    pub fn with_team_domain(mut self, domain: &str) -> Self {
        let domain = domain.trim().trim_end_matches('/');
        self.team_issuer = if domain.is_empty() {
            None
        } else if domain.contains("://") {
            Some(domain.to_string())
        } else {
            Some(format!("https://{domain}"))
        };
        self
    }

    /// Whether the token path can succeed at all.
    pub fn is_configured(&self) -> bool {
        !self.audience.is_empty()
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn team_issuer(&self) -> Option<&str> {
        self.team_issuer.as_deref()
    }

    pub fn key_fetcher(&self) -> &KeySetFetcher {
        &self.keys
    }

    /// Authenticate a request from its headers.
    ///
    /// Every failure becomes [`Unauthenticated`]; the reason is logged here
    /// and kept on the error for diagnostics.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, Unauthenticated> {
        match self.identify(headers).await {
            Ok(user) => {
                tracing::debug!(email = %user.email, source = ?user.source, "Request authenticated");
                Ok(user)
            }
            Err(reason) => {
                tracing::warn!(
                    error_code = reason.error_code(),
                    reason = %reason,
                    "Request authentication failed"
                );
                Err(Unauthenticated::new(reason))
            }
        }
    }

    async fn identify(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        // Trusted only because the gateway strips and sets this header.
        if let Some(email) = identity_header(headers) {
            return Ok(AuthenticatedUser::from_header(email));
        }

        let assertion = headers
            .get(ASSERTION_HEADER)
            .ok_or(AuthError::NoCredentials)?
            .to_str()
            .map_err(|_| AuthError::MalformedToken("assertion header is not visible ASCII".to_string()))?
            .trim();
        if assertion.is_empty() {
            return Err(AuthError::NoCredentials);
        }

        let email = self.verify_assertion(assertion).await?;
        Ok(AuthenticatedUser::from_assertion(email))
    }

    /// Verify an Access assertion and return the email it carries.
    pub async fn verify_assertion(&self, assertion: &str) -> Result<String, AuthError> {
        let unverified = token::decode(assertion)?;

        if self.audience.is_empty() {
            return Err(AuthError::NotConfigured);
        }
        if !unverified.has_audience(&self.audience) {
            return Err(AuthError::AudienceMismatch);
        }
        if let Some(expected) = &self.team_issuer {
            if unverified.issuer().trim_end_matches('/') != expected.as_str() {
                return Err(AuthError::IssuerMismatch {
                    expected: expected.clone(),
                    found: unverified.issuer().to_string(),
                });
            }
        }

        // The unverified issuer only selects where keys come from; the
        // verifier binds it to the signature and re-checks it.
        let keys = self.keys.key_set(unverified.issuer()).await?;
        let claims = verifier::verify(assertion, &keys, unverified.issuer(), &self.audience)?;

        claims
            .email()
            .map(str::to_owned)
            .ok_or(AuthError::MissingEmail)
    }
}

fn identity_header(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(IDENTITY_HEADER)?.to_str().ok()?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Extractor for authenticated users.
///
/// Uses the user placed in request extensions by
/// [`require_identity`](super::middleware::require_identity) when present,
/// otherwise authenticates the request itself.
///
/// # Example
///
/// ```rust,ignore
/// async fn info(Identity(user): Identity) -> Json<InfoResponse> {
///     // user.email contains the authenticated user's address
/// }
/// ```
pub struct Identity(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Identity {
    type Rejection = Unauthenticated;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the user
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Identity(user));
        }

        let user = state.authenticator.authenticate(&parts.headers).await?;
        Ok(Identity(user))
    }
}
