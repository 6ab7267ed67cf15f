// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Emulator settings
//!
//! Keys follow the camelCase names users already write for the serverless
//! plugin (`pubSubPort`, `retryDelayMs`, ...), with `imported-event-buses`
//! kept hyphenated.

use crate::entry::EventContext;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid size `{0}` (expected e.g. `10mb`, `512kb` or a byte count)")]
    InvalidSize(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Ingestion (`PutEvents`) listen port
    pub port: u16,
    /// Host both the broker and the ingestion server bind to
    pub hostname: String,
    /// Broker port
    pub pub_sub_port: u16,
    pub account: String,
    pub region: String,
    /// Verbose logging
    pub debug: bool,
    /// Export name -> bus name for `Fn::ImportValue` references
    #[serde(rename = "imported-event-buses")]
    pub imported_event_buses: HashMap<String, String>,
    /// Ingestion body size cap
    pub payload_size_limit: String,
    pub maximum_retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// Whether to stand up the local broker and ingestion server
    pub mock_event_bridge_server: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5010,
            hostname: "127.0.0.1".to_string(),
            pub_sub_port: 5011,
            account: "000000000000".to_string(),
            region: "us-east-1".to_string(),
            debug: false,
            imported_event_buses: HashMap::new(),
            payload_size_limit: "10mb".to_string(),
            maximum_retry_attempts: 10,
            retry_delay_ms: 500,
            mock_event_bridge_server: true,
        }
    }
}

impl Config {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.maximum_retry_attempts,
            Duration::from_millis(self.retry_delay_ms),
        )
    }

    pub fn event_context(&self) -> EventContext {
        EventContext {
            account: self.account.clone(),
            region: self.region.clone(),
        }
    }

    pub fn payload_limit_bytes(&self) -> Result<usize, ConfigError> {
        parse_byte_size(&self.payload_size_limit)
    }

    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.hostname, self.pub_sub_port)
    }
}

/// Parse sizes like `10mb`, `512kb`, `1gb` or `2048` (bytes)
pub fn parse_byte_size(size: &str) -> Result<usize, ConfigError> {
    let invalid = || ConfigError::InvalidSize(size.to_string());
    let lower = size.trim().to_ascii_lowercase();
    let split = lower
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(lower.len());
    let (number, unit) = lower.split_at(split);

    let number: f64 = number.parse().map_err(|_| invalid())?;
    let multiplier = match unit.trim() {
        "" | "b" => 1.0,
        "kb" => 1024.0,
        "mb" => 1024.0 * 1024.0,
        "gb" => 1024.0 * 1024.0 * 1024.0,
        _ => return Err(invalid()),
    };
    Ok((number * multiplier) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.port, 5010);
        assert_eq!(config.pub_sub_port, 5011);
        assert_eq!(config.hostname, "127.0.0.1");
        assert_eq!(config.region, "us-east-1");
        assert!(config.mock_event_bridge_server);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.broker_addr(), "127.0.0.1:5011");
    }

    #[test]
    fn deserializes_plugin_style_keys() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "pubSubPort": 6000,
            "retryDelayMs": 20,
            "maximumRetryAttempts": 2,
            "mockEventBridgeServer": false,
            "imported-event-buses": { "SharedBus": "shared" }
        }))
        .unwrap();

        assert_eq!(config.pub_sub_port, 6000);
        assert_eq!(config.port, 5010);
        assert!(!config.mock_event_bridge_server);
        assert_eq!(config.imported_event_buses["SharedBus"], "shared");
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(2, Duration::from_millis(20))
        );
    }

    #[parameterized(
        megabytes = { "10mb", 10 * 1024 * 1024 },
        kilobytes = { "512KB", 512 * 1024 },
        bytes = { "2048", 2048 },
        fractional = { "1.5kb", 1536 },
    )]
    fn parses_sizes(size: &str, expected: usize) {
        assert_eq!(parse_byte_size(size), Ok(expected));
    }

    #[test]
    fn rejects_unknown_size_units() {
        assert!(parse_byte_size("10 parsecs").is_err());
        assert!(parse_byte_size("mb").is_err());
    }
}
