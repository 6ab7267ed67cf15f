// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event id generation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Produces the synthetic ids stamped on delivered events and
/// returned from `PutEvents`
pub trait IdGen: Clone + Send + Sync + 'static {
    fn event_id(&self) -> String;
}

/// Random UUID v4 ids, as EventBridge hands out
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn event_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic ids (`evt-1`, `evt-2`, ...) for tests
#[derive(Clone, Debug)]
pub struct SequentialIdGen {
    prefix: &'static str,
    next: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("evt")
    }
}

impl IdGen for SequentialIdGen {
    fn event_id(&self) -> String {
        format!("{}-{}", self.prefix, self.next.fetch_add(1, Ordering::SeqCst))
    }
}
