// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-backed invoker
//!
//! Each function maps to an argv list. The payload is written to the
//! child's stdin as JSON and the function key is exported as
//! `EBL_FUNCTION_KEY`.

use super::{HandlerInvoker, InvokeError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Environment variable carrying the invoked function's key
pub const FUNCTION_KEY_ENV: &str = "EBL_FUNCTION_KEY";

/// Runs a configured command per function
#[derive(Clone, Debug, Default)]
pub struct CommandInvoker {
    commands: Arc<HashMap<String, Vec<String>>>,
    cwd: Option<PathBuf>,
}

impl CommandInvoker {
    pub fn new(commands: HashMap<String, Vec<String>>) -> Self {
        Self {
            commands: Arc::new(commands),
            cwd: None,
        }
    }

    /// Run handlers from `cwd` instead of the daemon's directory
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[async_trait]
impl HandlerInvoker for CommandInvoker {
    async fn invoke(&self, function_key: &str, payload: &Value) -> Result<(), InvokeError> {
        let (program, args) = self
            .commands
            .get(function_key)
            .and_then(|argv| argv.split_first())
            .ok_or_else(|| InvokeError::UnknownFunction(function_key.to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env(FUNCTION_KEY_ENV, function_key)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| InvokeError::SpawnFailed(format!("{}: {}", program, e)))?;

        let body = payload.to_string();
        let stdin = child.stdin.take();
        // Feed stdin while stderr drains
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // A handler that exits without reading stdin is judged by its status
                if let Err(e) = stdin.write_all(body.as_bytes()).await {
                    tracing::debug!(function_key, error = %e, "handler closed stdin early");
                }
            }
        };
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| InvokeError::Failed(e.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(InvokeError::HandlerFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
