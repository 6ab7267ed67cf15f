// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler invocation adapters

mod command;

pub use command::{CommandInvoker, FUNCTION_KEY_ENV};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeInvoker, InvokeCall};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors from invoking a handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    #[error("no handler registered for function {0}")]
    UnknownFunction(String),
    #[error("failed to start handler: {0}")]
    SpawnFailed(String),
    #[error("handler exited with {status}: {stderr}")]
    HandlerFailed { status: String, stderr: String },
    #[error("handler failed: {0}")]
    Failed(String),
}

/// Adapter that runs one function's handler with a payload
#[async_trait]
pub trait HandlerInvoker: Clone + Send + Sync + 'static {
    /// Invoke the handler once; retries are the caller's concern
    async fn invoke(&self, function_key: &str, payload: &Value) -> Result<(), InvokeError>;
}
