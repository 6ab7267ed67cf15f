// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event entries and the events delivered to handlers
//!
//! An [`EventEntry`] is what a client submits through `PutEvents`. Before a
//! handler sees it, it is converted into an [`Event`] carrying the envelope
//! fields EventBridge adds (id, account, region, time).

use crate::clock::Clock;
use crate::id::IdGen;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of a `PutEvents` request
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventEntry {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_type: Option<String>,
    /// JSON-encoded detail object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_bus_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl EventEntry {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_detail_type(mut self, detail_type: impl Into<String>) -> Self {
        self.detail_type = Some(detail_type.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_bus(mut self, bus: impl Into<String>) -> Self {
        self.event_bus_name = Some(bus.into());
        self
    }

    pub fn with_resources(mut self, resources: Vec<String>) -> Self {
        self.resources = resources;
        self
    }

    /// The entry synthesized each time a scheduled function fires
    pub fn scheduled(function_key: &str) -> Self {
        let source = format!("Scheduled function {}", function_key);
        let detail = serde_json::json!({ "name": source }).to_string();
        Self::new(source).with_detail(detail)
    }
}

/// The envelope delivered to a handler
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub version: String,
    pub id: String,
    #[serde(rename = "detail-type", default, skip_serializing_if = "Option::is_none")]
    pub detail_type: Option<String>,
    pub source: String,
    pub account: String,
    pub time: String,
    pub region: String,
    pub resources: Vec<String>,
    pub detail: Value,
}

/// An entry that could not be converted, passed through with an injected id
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDelivery {
    #[serde(flatten)]
    pub entry: EventEntry,
    pub id: String,
}

/// What a handler actually receives
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Delivery {
    Event(Event),
    Raw(RawDelivery),
}

impl Delivery {
    pub fn id(&self) -> &str {
        match self {
            Delivery::Event(event) => &event.id,
            Delivery::Raw(raw) => &raw.id,
        }
    }

    pub fn to_value(&self) -> Value {
        // Both variants are plain structs of strings and JSON values
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Account and region stamped on every converted event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub account: String,
    pub region: String,
}

/// Convert an entry into the event a handler receives.
///
/// Never fails: a `Detail` that is missing or not valid JSON yields
/// [`Delivery::Raw`] instead.
pub fn convert_entry(
    entry: &EventEntry,
    context: &EventContext,
    clock: &impl Clock,
    ids: &impl IdGen,
) -> Delivery {
    let id = ids.event_id();

    let detail = match entry.detail.as_deref().map(serde_json::from_str::<Value>) {
        Some(Ok(detail)) => detail,
        Some(Err(e)) => {
            tracing::debug!(source = %entry.source, error = %e, "detail is not valid JSON, delivering raw entry");
            return raw(entry, id);
        }
        None => {
            tracing::debug!(source = %entry.source, "entry has no detail, delivering raw entry");
            return raw(entry, id);
        }
    };

    Delivery::Event(Event {
        version: "0".to_string(),
        id,
        detail_type: entry.detail_type.clone(),
        source: entry.source.clone(),
        account: context.account.clone(),
        time: event_time(entry.time.as_deref(), clock),
        region: context.region.clone(),
        resources: entry.resources.clone(),
        detail,
    })
}

fn raw(entry: &EventEntry, id: String) -> Delivery {
    Delivery::Raw(RawDelivery {
        entry: entry.clone(),
        id,
    })
}

fn event_time(requested: Option<&str>, clock: &impl Clock) -> String {
    let time = requested
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| clock.now());
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Body of a `PutEvents` call
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutEventsRequest {
    #[serde(default)]
    pub entries: Vec<EventEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutEventsResultEntry {
    pub event_id: String,
}

/// `PutEvents` response: one id per accepted entry, in request order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutEventsResponse {
    pub entries: Vec<PutEventsResultEntry>,
    pub failed_entry_count: u32,
}

impl PutEventsResponse {
    pub fn accepted(entries: &[EventEntry], ids: &impl IdGen) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|_| PutEventsResultEntry {
                    event_id: ids.event_id(),
                })
                .collect(),
            failed_entry_count: 0,
        }
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
