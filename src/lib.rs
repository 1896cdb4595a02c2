// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access Gate - Cloudflare Access identity service
//!
//! This crate provides an API-only service that sits behind Cloudflare
//! Access and authenticates every request from the Access identity header or
//! the signed Access assertion.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Access assertion decoding, key discovery and verification
//! - `config` - Environment configuration
//! - `environment` - Process environment snapshot for `/api/info`

pub mod api;
pub mod auth;
pub mod config;
pub mod environment;
pub mod error;
pub mod state;
