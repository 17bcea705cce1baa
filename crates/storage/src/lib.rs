// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for the replicated document: a single file under the
//! state directory, written atomically and debounced so frequent local
//! mutations don't hammer disk.

mod path_guard;
mod snapshot;

pub use path_guard::{resolve_within, PathGuardError};
pub use snapshot::{
    read, write, Snapshot, SnapshotError, SnapshotWriter, CURRENT_SNAPSHOT_VERSION, MAX_SNAPSHOT_BYTES,
};
