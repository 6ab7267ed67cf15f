// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for dispatch

use ebl_adapters::InvokeError;
use thiserror::Error;

/// Errors from delivering one entry to one handler
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{function_key}: gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        function_key: String,
        attempts: u32,
        #[source]
        source: InvokeError,
    },
    #[error("invocation task failed: {0}")]
    TaskFailed(String),
}

impl DispatchError {
    pub fn function_key(&self) -> Option<&str> {
        match self {
            DispatchError::RetriesExhausted { function_key, .. } => Some(function_key),
            DispatchError::TaskFailed(_) => None,
        }
    }
}
