// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! This module authenticates requests that arrive through Cloudflare Access.
//!
//! ## Auth Flow
//!
//! 1. If the gateway set `Cf-Access-Authenticated-User-Email`, that email is
//!    the identity (no network access)
//! 2. Otherwise the `Cf-Access-Jwt-Assertion` token is required:
//!    - Issuer and audience are read without trust
//!    - The audience is checked against the configured AUD tag
//!    - Keys are fetched from `<issuer>/cdn-cgi/access/certs` via HTTPS
//!    - Signature, issuer, audience and validity window are verified
//!    - `email` is the identity
//!
//! ## Security
//!
//! - Only RSA signature algorithms are accepted, checked before key lookup
//! - A missing audience configuration fails closed
//! - Key discovery times out after 5 seconds and is never retried
//! - Callers only see `Unauthenticated`; the reason goes to the logs
//! - Clock skew tolerance is 60 seconds

pub mod cache;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod token;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use claims::{AuthenticatedUser, IdentitySource, VerifiedClaims};
pub use error::{AuthError, Unauthenticated};
pub use extractor::{Authenticator, Identity};
pub use jwks::{KeySet, KeySetFetcher};
pub use token::UnverifiedClaims;
