// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake invoker for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{HandlerInvoker, InvokeError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Recorded invocation
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeCall {
    pub function_key: String,
    pub payload: Value,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<InvokeCall>,
    /// When each call arrived, on the tokio clock
    times: Vec<Instant>,
    /// Remaining failures to return, per function
    failures: HashMap<String, u32>,
}

/// Fake invoker that records calls and fails on demand
#[derive(Clone, Default)]
pub struct FakeInvoker {
    state: Arc<Mutex<FakeState>>,
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` invocations of `function_key` fail
    pub fn fail_times(&self, function_key: &str, count: u32) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .failures
            .insert(function_key.to_string(), count);
    }

    /// Make every invocation of `function_key` fail
    pub fn fail_always(&self, function_key: &str) {
        self.fail_times(function_key, u32::MAX);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<InvokeCall> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Arrival time of every recorded call, in call order
    pub fn call_times(&self) -> Vec<Instant> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .times
            .clone()
    }

    /// Recorded calls for one function
    pub fn calls_for(&self, function_key: &str) -> Vec<InvokeCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.function_key == function_key)
            .collect()
    }
}

#[async_trait]
impl HandlerInvoker for FakeInvoker {
    async fn invoke(&self, function_key: &str, payload: &Value) -> Result<(), InvokeError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(InvokeCall {
            function_key: function_key.to_string(),
            payload: payload.clone(),
        });
        state.times.push(Instant::now());

        let attempt = state.calls.iter().filter(|c| c.function_key == function_key).count();
        match state.failures.get_mut(function_key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(InvokeError::Failed(format!(
                    "scripted failure #{} for {}",
                    attempt, function_key
                )))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
