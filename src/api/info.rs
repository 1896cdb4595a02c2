// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Info endpoint.

use std::collections::BTreeMap;

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::Identity;
use crate::environment;

pub const INFO_MESSAGE: &str = "This is a Forge test application.";

/// Response for GET /api/info
#[derive(Debug, Serialize, ToSchema)]
pub struct InfoResponse {
    pub message: String,
    /// Email of the authenticated caller
    pub email: String,
    /// Process environment
    pub env: BTreeMap<String, String>,
}

/// Describe the application and the authenticated caller.
#[utoipa::path(
    get,
    path = "/api/info",
    tag = "Info",
    params(
        ("Cf-Access-Jwt-Assertion" = Option<String>, Header, description = "Cloudflare Access assertion"),
    ),
    responses(
        (status = 200, description = "Application info", body = InfoResponse),
        (status = 401, description = "Unauthorized - no valid Access identity"),
    )
)]
pub async fn info(Identity(user): Identity) -> Json<InfoResponse> {
    Json(InfoResponse {
        message: INFO_MESSAGE.to_string(),
        email: user.email,
        env: environment::snapshot(),
    })
}
