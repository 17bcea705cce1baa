// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mesh daemon library: configuration loading, process lifecycle (lock file,
//! snapshot persistence, ordered shutdown), doc-membership admission, and the
//! logging stand-in for the host plugin boundary. The binary entry point in
//! `main.rs` wires these together with `mesh-transport` and `mesh-coordinator`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod admission;
pub mod config;
pub mod lifecycle;
pub mod runtime;

pub use admission::{is_admin_caller, AdmissionGate};
pub use config::{AuthMode, Config, LockSweepConfig, SlaSweepConfig};
pub use lifecycle::{state_dir, LifecycleError, Process};
pub use runtime::LoggingHostRuntime;
