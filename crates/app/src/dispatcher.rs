//! Device event dispatcher.
//!
//! Looks up candidates in the [`SubscriptionIndex`], re-matches them against
//! their full rules, and runs every matching handler on its own task. One
//! failing (or panicking) handler never prevents delivery to the others;
//! failures are logged one by one and summarized in a [`DispatchError`].

use std::sync::Arc;

use parking_lot::RwLock;
use tripwire_domain::event::{AutomationEvent, DeviceEvent};

use crate::automation::RegisteredAutomation;
use crate::error::{DispatchError, RegistrationError};
use crate::index::SubscriptionIndex;
use crate::ports::EventsService;

/// Routes device events to the automations whose triggers select them.
#[derive(Debug, Default)]
pub struct DeviceEventDispatcher {
    index: RwLock<SubscriptionIndex>,
}

impl DeviceEventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of automations with at least one device trigger.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.index.read().len()
    }

    /// Deliver `event` to every matching automation, at most once each.
    ///
    /// Timer events are ignored. Handlers run concurrently; this waits for all
    /// of them before returning.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HandlerFailed`] when at least one handler
    /// returned an error or panicked, after every handler has finished.
    pub async fn dispatch(&self, event: &AutomationEvent) -> Result<(), DispatchError> {
        let Some(device_event) = event.as_device() else {
            tracing::trace!(kind = %event.kind(), "ignoring event of another kind");
            return Ok(());
        };
        let matched = self.index.read().matching(device_event);
        if matched.is_empty() {
            tracing::trace!(
                device_id = %device_event.device_id,
                attribute = %device_event.attribute_name,
                "no automation matched"
            );
            return Ok(());
        }

        let running: Vec<_> = matched
            .into_iter()
            .map(|automation| {
                let event = event.clone();
                let name = Arc::clone(automation.name());
                let handle = tokio::spawn(async move { automation.handle(event).await });
                (name, handle)
            })
            .collect();

        let mut failed = Vec::new();
        for (name, handle) in running {
            match handle.await {
                Ok(Ok(())) => {
                    tracing::debug!(automation = %name, "automation handled device event");
                }
                Ok(Err(err)) => {
                    log_failure(&name, device_event, &format!("{err:#}"));
                    failed.push(name.to_string());
                }
                Err(err) => {
                    log_failure(&name, device_event, &err.to_string());
                    failed.push(name.to_string());
                }
            }
        }

        match failed.first() {
            None => Ok(()),
            Some(first) => Err(DispatchError::HandlerFailed {
                automation: first.clone(),
                failed,
            }),
        }
    }
}

fn log_failure(name: &str, event: &DeviceEvent, error: &str) {
    tracing::error!(
        automation = %name,
        device_id = %event.device_id,
        attribute = %event.attribute_name,
        new_value = ?event.new_value,
        previous_value = ?event.previous_value,
        error = %error,
        "automation failed to handle device event"
    );
}

impl EventsService for DeviceEventDispatcher {
    fn name(&self) -> &'static str {
        "device"
    }

    #[tracing::instrument(skip_all, fields(automation = %automation.name()))]
    fn register_automation(&self, automation: Arc<RegisteredAutomation>) -> Result<(), RegistrationError> {
        if self.index.write().insert(&automation)? {
            tracing::info!("automation subscribed to device events");
        } else {
            tracing::debug!("automation has no indexable device trigger");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn unregister_automation(&self, name: &str) -> bool {
        let removed = self.index.write().remove(name);
        if removed {
            tracing::info!("automation unsubscribed from device events");
        }
        removed
    }

    fn is_registered(&self, name: &str) -> bool {
        self.index.read().contains(name)
    }
}
