// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ebl-core: routing model for the local EventBridge emulator
//!
//! This crate provides:
//! - Entry and event types, plus entry-to-event conversion
//! - Content-based filter patterns and the matcher
//! - Event bus reference resolution
//! - Schedule expression translation and cron evaluation
//! - The immutable subscription registry built at startup
//! - Retry policy and configuration types

pub mod bus;
pub mod clock;
pub mod config;
pub mod entry;
pub mod id;
pub mod pattern;
pub mod retry;
pub mod schedule;
pub mod subscription;

pub use bus::{BusReference, BusRegistry, ResourceDef, EVENT_BUS_RESOURCE_TYPE};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{parse_byte_size, Config, ConfigError};
pub use entry::{
    convert_entry, Delivery, Event, EventContext, EventEntry, PutEventsRequest,
    PutEventsResponse, PutEventsResultEntry, RawDelivery,
};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use pattern::{
    flatten, flatten_pattern, Alternative, FilterPattern, Leaf, MatchError, PatternError,
    PatternNode,
};
pub use retry::RetryPolicy;
pub use schedule::{translate, CronParseError, CronSpec, RateUnit, ScheduleExpression};
pub use subscription::{
    EventBridgeDef, FunctionDef, FunctionEvent, RegistryError, ScheduledEvent, Subscriber,
    SubscriptionRegistry, Target,
};
