// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: handler execution and the broadcast channel

pub mod invoke;
pub mod pubsub;
pub mod traced;

pub use invoke::{CommandInvoker, HandlerInvoker, InvokeError};
pub use pubsub::{
    is_port_in_use, BrokerServer, ChannelError, EntryChannel, EntryReceiver, InMemoryChannel,
    TcpChannel,
};
pub use traced::{TracedChannel, TracedInvoker};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use invoke::{FakeInvoker, InvokeCall};
