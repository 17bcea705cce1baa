// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Guards every file path derived from configuration or request input
//! against escaping the state directory.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathGuardError {
    #[error("io error resolving path: {0}")]
    Io(#[from] std::io::Error),
    #[error("path escapes state directory")]
    Traversal,
}

/// Resolve `name` against `base`, rejecting any result that doesn't stay
/// under `base` once both are canonicalized. `base` must already exist;
/// `name`'s parent directories must exist too, since canonicalization
/// requires a real path — callers creating a new file should canonicalize
/// the parent directory and join the file name back on.
pub fn resolve_within(base: &Path, name: &str) -> Result<PathBuf, PathGuardError> {
    let base = base.canonicalize()?;
    let candidate = base.join(name);
    let parent = candidate.parent().ok_or(PathGuardError::Traversal)?;
    let canon_parent = parent.canonicalize().unwrap_or_else(|_| parent.to_path_buf());
    if !canon_parent.starts_with(&base) {
        return Err(PathGuardError::Traversal);
    }
    let file_name = candidate.file_name().ok_or(PathGuardError::Traversal)?;
    Ok(canon_parent.join(file_name))
}

#[cfg(test)]
#[path = "path_guard_tests.rs"]
mod tests;
