// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup and shutdown.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ebl_adapters::{
    is_port_in_use, BrokerServer, ChannelError, CommandInvoker, EntryChannel, HandlerInvoker,
    TcpChannel, TracedChannel, TracedInvoker,
};
use ebl_core::{
    BusRegistry, Clock, Config, ConfigError, FunctionDef, IdGen, RegistryError, ResourceDef,
    SubscriptionRegistry, SystemClock, UuidIdGen,
};
use ebl_engine::{Consumer, Dispatcher, DispatcherConfig, ScheduleRunner};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ProjectFile;
use crate::server;

/// How this process takes part in the shared channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Runs the broker and the ingestion endpoint
    Server { ingest_addr: SocketAddr },
    /// Consumes from a broker owned by another process
    Client,
}

/// A running daemon; dropping it leaves the tasks running, call
/// [`Daemon::shutdown`] to stop them
#[derive(Debug)]
pub struct Daemon {
    pub mode: Mode,
    pub broker_addr: String,
    pub subscriber_id: String,
    pub schedules: usize,
    tasks: Vec<JoinHandle<()>>,
}

impl Daemon {
    pub fn shutdown(self) {
        info!(tasks = self.tasks.len(), "shutting down");
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Registry(#[from] RegistryError),

    #[error("broker error: {0}")]
    Channel(#[from] ChannelError),

    #[error("failed to bind ingestion server at {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon for a project, running handlers from `project_dir`
pub async fn startup(project: &ProjectFile, project_dir: &Path) -> Result<Daemon, LifecycleError> {
    let invoker = TracedInvoker::new(CommandInvoker::new(project.commands()).with_cwd(project_dir));
    startup_with(
        &project.event_bridge,
        &project.functions,
        &project.resources,
        invoker,
        SystemClock,
        UuidIdGen,
    )
    .await
}

/// Start the daemon with explicit collaborators
pub async fn startup_with<I, C, G>(
    config: &Config,
    functions: &BTreeMap<String, FunctionDef>,
    resources: &BTreeMap<String, ResourceDef>,
    invoker: I,
    clock: C,
    ids: G,
) -> Result<Daemon, LifecycleError>
where
    I: HandlerInvoker,
    C: Clock,
    G: IdGen,
{
    let body_limit = config.payload_limit_bytes()?;

    let buses = BusRegistry::new(resources, config.imported_event_buses.clone());
    let registry = Arc::new(SubscriptionRegistry::build(functions, buses)?);
    let dispatcher = Dispatcher::new(
        registry,
        invoker,
        clock,
        ids.clone(),
        DispatcherConfig {
            context: config.event_context(),
            retry: config.retry_policy(),
        },
    );

    let broker_addr = config.broker_addr();
    let subscriber_id = next_subscriber_id();
    let mut tasks = Vec::new();

    let serve = if !config.mock_event_bridge_server {
        info!(broker_addr, "mock server disabled, running as broker client");
        false
    } else if is_port_in_use(&broker_addr).await {
        info!(broker_addr, "broker port in use, joining the existing broker as a client");
        false
    } else {
        true
    };

    let mode = if serve {
        // Bind both listeners before spawning anything
        let broker = BrokerServer::bind(&broker_addr).await?;
        let ingest_addr = format!("{}:{}", config.hostname, config.port);
        let listener = TcpListener::bind(&ingest_addr)
            .await
            .map_err(|source| LifecycleError::BindFailed {
                addr: ingest_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let channel = TracedChannel::new(broker.channel());
        tasks.push(start_consumer(dispatcher.clone(), &channel, &subscriber_id).await?);
        tasks.push(broker.spawn());

        let app = server::router(channel, ids, body_limit);
        tasks.push(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "ingestion server stopped");
            }
        }));
        info!(addr = %local_addr, broker_addr, "ingestion server listening");

        Mode::Server {
            ingest_addr: local_addr,
        }
    } else {
        let channel = TracedChannel::new(TcpChannel::new(broker_addr.clone()));
        tasks.push(start_consumer(dispatcher.clone(), &channel, &subscriber_id).await?);
        Mode::Client
    };

    let schedules = ScheduleRunner::new(dispatcher).spawn_all();
    let schedule_count = schedules.len();
    tasks.extend(schedules);

    info!(?mode, subscriber_id, schedules = schedule_count, "daemon ready");
    Ok(Daemon {
        mode,
        broker_addr,
        subscriber_id,
        schedules: schedule_count,
        tasks,
    })
}

/// Unique per startup, so every dispatcher in every process gets each batch
fn next_subscriber_id() -> String {
    static STARTS: AtomicU64 = AtomicU64::new(0);
    let n = STARTS.fetch_add(1, Ordering::Relaxed);
    format!("dispatcher-{}-{}", std::process::id(), n)
}

async fn start_consumer<I, C, G, Ch>(
    dispatcher: Dispatcher<I, C, G>,
    channel: &Ch,
    subscriber_id: &str,
) -> Result<JoinHandle<()>, ChannelError>
where
    I: HandlerInvoker,
    C: Clock,
    G: IdGen,
    Ch: EntryChannel,
{
    Consumer::new(dispatcher).start(channel, subscriber_id).await
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
