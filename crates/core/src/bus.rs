// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus references and their resolution
//!
//! A subscription may name its bus directly, point at a bus declared in the
//! local infrastructure resources (`Ref` / `Fn::GetAtt`), or import one from
//! another stack (`Fn::ImportValue`). Imports cannot be resolved locally, so
//! their names come from configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Resource type whose declarations populate the local bus table
pub const EVENT_BUS_RESOURCE_TYPE: &str = "AWS::Events::EventBus";

/// A declared infrastructure resource
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceDef {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Option<Value>,
}

/// How a subscription refers to its event bus
#[derive(Clone, Debug, PartialEq)]
pub enum BusReference {
    Name(String),
    /// `Ref` or `Fn::GetAtt` pointing at a local resource id
    Local(String),
    /// `Fn::ImportValue` export name
    Import(String),
    /// Anything else; never matches
    Unknown(Value),
}

impl BusReference {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(name) => BusReference::Name(name.clone()),
            Value::Object(map) => {
                if let Some(Value::String(id)) = map.get("Ref") {
                    return BusReference::Local(id.clone());
                }
                if let Some(target) = map.get("Fn::GetAtt") {
                    let id = match target {
                        Value::Array(parts) => parts.first().and_then(Value::as_str),
                        Value::String(dotted) => dotted.split('.').next(),
                        _ => None,
                    };
                    if let Some(id) = id {
                        return BusReference::Local(id.to_string());
                    }
                }
                if let Some(Value::String(name)) = map.get("Fn::ImportValue") {
                    return BusReference::Import(name.clone());
                }
                BusReference::Unknown(value.clone())
            }
            other => BusReference::Unknown(other.clone()),
        }
    }
}

impl<'de> Deserialize<'de> for BusReference {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|v| BusReference::from_value(&v))
    }
}

/// Resolves bus references to concrete bus names
#[derive(Clone, Debug, Default)]
pub struct BusRegistry {
    local: HashMap<String, String>,
    imported: HashMap<String, String>,
}

impl BusRegistry {
    /// Build the local table from declared resources.
    ///
    /// A bus without `Properties.Name` is named after its resource id.
    pub fn new(
        resources: &BTreeMap<String, ResourceDef>,
        imported: HashMap<String, String>,
    ) -> Self {
        let local = resources
            .iter()
            .filter(|(_, resource)| resource.kind == EVENT_BUS_RESOURCE_TYPE)
            .map(|(id, resource)| {
                let name = resource
                    .properties
                    .as_ref()
                    .and_then(|p| p.get("Name"))
                    .and_then(Value::as_str)
                    .unwrap_or(id.as_str());
                (id.clone(), name.to_string())
            })
            .collect();

        Self { local, imported }
    }

    pub fn local_count(&self) -> usize {
        self.local.len()
    }

    /// Concrete bus name for a reference, if it can be resolved
    pub fn resolve<'a>(&'a self, reference: &'a BusReference) -> Option<&'a str> {
        match reference {
            BusReference::Name(name) => Some(name.as_str()),
            BusReference::Local(id) => self.local.get(id).map(String::as_str),
            BusReference::Import(name) => self.imported.get(name).map(String::as_str),
            BusReference::Unknown(_) => None,
        }
    }

    /// Lenient name comparison: either name may contain the other
    /// (`my-bus` matches `arn:...:event-bus/my-bus` and `my-bus-dev`).
    /// Unresolvable references never match.
    pub fn matches(&self, reference: &BusReference, bus_name: &str) -> bool {
        match self.resolve(reference) {
            Some(resolved) => resolved.contains(bus_name) || bus_name.contains(resolved),
            None => {
                tracing::debug!(?reference, bus_name, "unresolvable bus reference");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
