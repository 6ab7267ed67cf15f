// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Function definitions and the subscription registry
//!
//! Every function may declare `eventBridge` triggers. A trigger with a
//! `schedule` becomes a [`ScheduledEvent`]; any other trigger becomes a
//! [`Subscriber`] filtered by bus and pattern. The registry is built once
//! at startup and never mutated afterwards.

use crate::bus::{BusReference, BusRegistry};
use crate::entry::{Delivery, EventEntry};
use crate::pattern::{FilterPattern, MatchError, PatternError};
use crate::schedule::{translate, CronSpec};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// A declared function
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FunctionDef {
    /// Program and arguments that run the handler
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub events: Vec<FunctionEvent>,
}

/// One trigger of a function; non-EventBridge triggers are ignored
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FunctionEvent {
    #[serde(rename = "eventBridge", default)]
    pub event_bridge: Option<EventBridgeDef>,
}

/// An `eventBridge` trigger declaration
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBridgeDef {
    #[serde(default)]
    pub event_bus: Option<BusReference>,
    #[serde(default)]
    pub pattern: Option<Value>,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub input_path: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// Errors building the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("function {function_key}: invalid pattern: {source}")]
    InvalidPattern {
        function_key: String,
        #[source]
        source: PatternError,
    },
    #[error("function {function_key}: unsupported filter operator `{operator}` on `{path}`")]
    UnsupportedOperator {
        function_key: String,
        operator: String,
        path: String,
    },
}

/// Per-target payload overrides
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Target {
    /// Constant JSON delivered instead of the event
    pub input: Option<Value>,
    /// `$`-rooted dot path selecting part of the event
    pub input_path: Option<String>,
}

impl Target {
    /// The payload a handler receives for a converted delivery
    pub fn payload(&self, delivery: &Delivery) -> Value {
        if let Some(input) = &self.input {
            return input.clone();
        }
        let event = delivery.to_value();
        match &self.input_path {
            Some(path) => select(&event, path),
            None => event,
        }
    }
}

fn select(value: &Value, path: &str) -> Value {
    let Some(rest) = path.trim().strip_prefix('$') else {
        return Value::Null;
    };
    rest.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| current.get(segment))
        .cloned()
        .unwrap_or(Value::Null)
}

/// A handler bound to entries by bus and pattern
#[derive(Clone, Debug, PartialEq)]
pub struct Subscriber {
    pub function_key: String,
    pub bus: Option<BusReference>,
    pub pattern: Option<FilterPattern>,
    pub target: Target,
}

impl Subscriber {
    /// Whether this subscriber should receive `entry`.
    ///
    /// The bus constraint only applies when the entry names a bus; a
    /// subscriber without bus or pattern matches everything.
    pub fn matches(&self, entry: &EventEntry, buses: &BusRegistry) -> Result<bool, MatchError> {
        let content = match &self.pattern {
            Some(pattern) => pattern.matches_entry(entry)?,
            None => true,
        };
        if !content {
            return Ok(false);
        }

        let bus_name = entry.event_bus_name.as_deref().filter(|name| !name.is_empty());
        Ok(match (&self.bus, bus_name) {
            (Some(reference), Some(name)) => buses.matches(reference, name),
            _ => true,
        })
    }
}

/// A handler fired on a recurring trigger
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledEvent {
    pub function_key: String,
    /// The expression as declared
    pub expression: String,
    pub trigger: CronSpec,
    pub target: Target,
}

/// All subscriptions and schedules, plus the bus tables they resolve against
#[derive(Clone, Debug, Default)]
pub struct SubscriptionRegistry {
    subscribers: Vec<Subscriber>,
    scheduled: Vec<ScheduledEvent>,
    buses: BusRegistry,
}

impl SubscriptionRegistry {
    /// Derive subscribers and scheduled events from function definitions.
    ///
    /// Patterns using operators the matcher cannot evaluate are rejected.
    /// Schedules that do not translate are dropped with a warning.
    pub fn build(
        functions: &BTreeMap<String, FunctionDef>,
        buses: BusRegistry,
    ) -> Result<Self, RegistryError> {
        let mut subscribers = Vec::new();
        let mut scheduled = Vec::new();

        for (function_key, function) in functions {
            for def in functions_bridges(function) {
                let target = Target {
                    input: def.input.clone(),
                    input_path: def.input_path.clone(),
                };

                if let Some(expression) = &def.schedule {
                    if !def.enabled {
                        tracing::debug!(function_key, expression, "schedule disabled");
                        continue;
                    }
                    if def.pattern.is_some() {
                        tracing::warn!(function_key, "pattern ignored on scheduled trigger");
                    }
                    match translate(expression) {
                        Some(trigger) => {
                            tracing::debug!(function_key, expression, cron = %trigger, "schedule registered");
                            scheduled.push(ScheduledEvent {
                                function_key: function_key.clone(),
                                expression: expression.clone(),
                                trigger,
                                target,
                            });
                        }
                        None => tracing::warn!(
                            function_key,
                            expression,
                            "unsupported schedule expression, skipping"
                        ),
                    }
                    continue;
                }

                let pattern = def
                    .pattern
                    .as_ref()
                    .map(|value| parse_pattern(function_key, value))
                    .transpose()?;

                subscribers.push(Subscriber {
                    function_key: function_key.clone(),
                    bus: def.event_bus.clone(),
                    pattern,
                    target,
                });
            }
        }

        tracing::info!(
            subscribers = subscribers.len(),
            scheduled = scheduled.len(),
            buses = buses.local_count(),
            "subscription registry built"
        );

        Ok(Self {
            subscribers,
            scheduled,
            buses,
        })
    }

    pub fn subscribers(&self) -> &[Subscriber] {
        &self.subscribers
    }

    pub fn scheduled(&self) -> &[ScheduledEvent] {
        &self.scheduled
    }

    pub fn buses(&self) -> &BusRegistry {
        &self.buses
    }
}

fn functions_bridges(function: &FunctionDef) -> impl Iterator<Item = &EventBridgeDef> {
    function.events.iter().filter_map(|e| e.event_bridge.as_ref())
}

fn parse_pattern(function_key: &str, value: &Value) -> Result<FilterPattern, RegistryError> {
    let pattern = FilterPattern::parse(value).map_err(|source| RegistryError::InvalidPattern {
        function_key: function_key.to_string(),
        source,
    })?;

    if let Some((path, operator)) = pattern.unsupported_operators().into_iter().next() {
        return Err(RegistryError::UnsupportedOperator {
            function_key: function_key.to_string(),
            operator,
            path,
        });
    }
    for field in &pattern.ignored_fields {
        tracing::warn!(function_key, field, "pattern field is not filtered on");
    }
    Ok(pattern)
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
