// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded-input validation and prefix-based ID resolution.

use crate::error::ToolError;
use std::collections::HashMap;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 5_000;
pub const MAX_CONTEXT_LEN: usize = 5_000;
pub const MAX_RESULT_LEN: usize = 5_000;
pub const MAX_MESSAGE_LEN: usize = 10_000;
pub const MAX_POLICY_MARKDOWN_LEN: usize = 200_000;

/// Maximum sample keys returned in an `ambiguous_id` error.
pub const AMBIGUOUS_SAMPLE_CAP: usize = 8;

pub fn check_len(field: &str, value: &str, max: usize) -> Result<(), ToolError> {
    if value.len() > max {
        return Err(ToolError::new(
            crate::error::ErrorKind::ValidationExceeded,
            format!("{field} exceeds {max} bytes ({} bytes)", value.len()),
        ));
    }
    Ok(())
}

pub fn check_finite(field: &str, value: f64) -> Result<(), ToolError> {
    if !value.is_finite() {
        return Err(ToolError::invalid(format!("{field} must be a finite number")));
    }
    Ok(())
}

/// Resolve a needle (exact key, key prefix, or `value.id` prefix) against a
/// map of entities to a unique key.
///
/// Resolution order: (1) exact key match, (2) unique key-prefix match,
/// (3) unique `value.id` prefix match. Multiple matches at any stage return
/// `ambiguous_id` carrying up to [`AMBIGUOUS_SAMPLE_CAP`] sample keys.
pub fn resolve_key<'a, V>(
    entities: &'a HashMap<String, V>,
    needle: &str,
    id_of: impl Fn(&V) -> &str,
) -> Result<&'a str, ToolError> {
    if let Some((k, _)) = entities.get_key_value(needle) {
        return Ok(k.as_str());
    }

    let key_matches: Vec<&str> =
        entities.keys().filter(|k| k.starts_with(needle)).map(String::as_str).collect();
    match key_matches.len() {
        1 => return Ok(key_matches[0]),
        n if n > 1 => return Err(ambiguous(needle, key_matches)),
        _ => {}
    }

    let id_matches: Vec<&str> = entities
        .iter()
        .filter(|(_, v)| id_of(v).starts_with(needle))
        .map(|(k, _)| k.as_str())
        .collect();
    match id_matches.len() {
        1 => Ok(id_matches[0]),
        0 => Err(ToolError::not_found(needle)),
        _ => Err(ambiguous(needle, id_matches)),
    }
}

fn ambiguous(needle: &str, mut matches: Vec<&str>) -> ToolError {
    matches.truncate(AMBIGUOUS_SAMPLE_CAP);
    ToolError::ambiguous(
        format!("\"{needle}\" matches multiple entries"),
        matches.into_iter().map(str::to_string).collect(),
    )
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
