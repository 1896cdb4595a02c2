// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Authenticates once per request for a whole router subtree and stores the
//! [`AuthenticatedUser`](super::AuthenticatedUser) in request extensions, where the `Identity`
//! extractor picks it up.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Reject unauthenticated requests with 401, otherwise attach the user.
///
/// # Usage
///
/// ```rust,ignore
/// let api = Router::new()
///     .route("/info", get(info))
///     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_identity));
/// ```
pub async fn require_identity(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match state.authenticator.authenticate(request.headers()).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
