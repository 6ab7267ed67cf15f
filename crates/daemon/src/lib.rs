// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ebld internals: project file, startup and the ingestion endpoint

pub mod config;
pub mod lifecycle;
pub mod server;

pub use config::{Args, ConfigFileError, ProjectFile, DEFAULT_CONFIG_FILE};
pub use lifecycle::{startup, startup_with, Daemon, LifecycleError, Mode};
pub use server::{router, ServerError};
