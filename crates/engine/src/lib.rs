// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Event routing engine: dispatch, channel consumption and schedules

mod consumer;
mod dispatcher;
mod error;
mod scheduler;

pub use consumer::Consumer;
pub use dispatcher::{BatchReport, Dispatcher, DispatcherConfig, Invocation, InvocationReport};
pub use error::DispatchError;
pub use scheduler::{next_firing, ScheduleRunner};
