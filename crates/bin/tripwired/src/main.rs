//! # tripwired: tripwire daemon
//!
//! Composition root that wires the hub, the device cache and the events
//! services together, then runs the automations until interrupted.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize structured logging
//! - Construct the events services and register them with the automations registry
//! - Connect the hub adapter, load the devices and keep them fresh
//! - Register automations
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no rule logic belongs here.

mod automations;
mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;
use tripwire_adapter_virtual::VirtualHub;
use tripwire_app::automation::Automation;
use tripwire_app::dispatcher::DeviceEventDispatcher;
use tripwire_app::scheduler::TimerScheduler;
use tripwire_app::services::{AutomationsService, DeviceCache};

use automations::{MirrorSwitch, TemperatureAlert, TemperatureDrift};
use config::Config;

const UPDATE_BUFFER: usize = 64;
const ALERT_THRESHOLD: f64 = 25.0;
const DRIFT_EVERY_SECONDS: u32 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).context("parsing log filter")?,
        )
        .init();

    // Events services
    let dispatcher = Arc::new(DeviceEventDispatcher::new());
    let scheduler = Arc::new(TimerScheduler::new(config.scheduler_config()));

    let service = AutomationsService::new();
    for err in service
        .register_events_service(dispatcher.clone())
        .into_iter()
        .chain(service.register_events_service(scheduler.clone()))
    {
        tracing::error!(error = %err, "events service registration failed");
    }

    // Hub and automations
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    if config.integrations.virtual_enabled {
        let (hub, updates) = VirtualHub::new(UPDATE_BUFFER);
        let hub = Arc::new(hub);
        let cache = Arc::new(DeviceCache::new(Arc::clone(&hub), Arc::clone(&dispatcher)));

        let loaded = cache.reload_all().await.context("loading devices")?;
        tracing::info!(devices = loaded, "virtual hub connected");

        tasks.push(cache.spawn_update_listener(updates));
        tasks.push(cache.spawn_periodic_reload(config.reload_interval()));

        let automations: Vec<Arc<dyn Automation>> = vec![
            Arc::new(MirrorSwitch::new(Arc::clone(&cache))),
            Arc::new(TemperatureAlert::new(ALERT_THRESHOLD)),
            Arc::new(TemperatureDrift::new(hub, DRIFT_EVERY_SECONDS)?),
        ];
        for automation in automations {
            service
                .register_automation(automation)
                .context("registering automation")?;
        }
    } else {
        tracing::warn!("no integration enabled, nothing to automate");
    }

    tracing::info!(
        automations = service.registered_count(),
        services = service.services_count(),
        "tripwired running"
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    tracing::info!("shutting down");
    scheduler.shutdown();
    for task in tasks {
        task.abort();
    }
    Ok(())
}
