// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process environment snapshot reported by `/api/info`.
//!
//! Kept apart from authentication: nothing here reads or affects auth state.

use std::collections::BTreeMap;
use std::ffi::OsString;

/// All environment variables with UTF-8 names and values, sorted by name.
pub fn snapshot() -> BTreeMap<String, String> {
    collect(std::env::vars_os())
}

fn collect(vars: impl IntoIterator<Item = (OsString, OsString)>) -> BTreeMap<String, String> {
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}
