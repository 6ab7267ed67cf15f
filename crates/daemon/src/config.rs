// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project file loading and command-line overrides

use clap::Parser;
use ebl_core::{Config, FunctionDef, ResourceDef};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Project file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "ebl.toml";

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid project file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// The project file: emulator settings, functions and resources
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFile {
    #[serde(rename = "eventBridge", default)]
    pub event_bridge: Config,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionDef>,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceDef>,
}

impl ProjectFile {
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Handler command per function; functions without one are left out
    pub fn commands(&self) -> HashMap<String, Vec<String>> {
        self.functions
            .iter()
            .filter(|(_, function)| !function.command.is_empty())
            .map(|(key, function)| (key.clone(), function.command.clone()))
            .collect()
    }
}

/// ebld - local EventBridge emulator
#[derive(Debug, Parser)]
#[command(name = "ebld", version, about = "Local EventBridge emulator")]
pub struct Args {
    /// Project file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Ingestion port
    #[arg(long)]
    pub port: Option<u16>,

    /// Broker port
    #[arg(long)]
    pub pub_sub_port: Option<u16>,

    /// Host for the broker and ingestion listeners
    #[arg(long)]
    pub hostname: Option<String>,

    /// Verbose logging
    #[arg(long)]
    pub debug: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Never start the broker or ingestion server; join an existing broker
    #[arg(long)]
    pub no_server: bool,
}

impl Args {
    /// Apply command-line overrides on top of the project file settings
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(port) = self.pub_sub_port {
            config.pub_sub_port = port;
        }
        if let Some(hostname) = &self.hostname {
            config.hostname = hostname.clone();
        }
        if self.debug {
            config.debug = true;
        }
        if self.no_server {
            config.mock_event_bridge_server = false;
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
