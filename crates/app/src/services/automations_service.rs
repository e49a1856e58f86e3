//! Automations registry: fans automations out to every events service.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::automation::{Automation, RegisteredAutomation};
use crate::error::RegistrationError;
use crate::ports::EventsService;

/// Keeps every automation and every events service, and keeps them paired.
///
/// Registering an automation registers it on every known service;
/// registering a service replays every known automation into it.
#[derive(Default)]
pub struct AutomationsService {
    automations: RwLock<BTreeMap<Arc<str>, Arc<RegisteredAutomation>>>,
    services: RwLock<Vec<Arc<dyn EventsService>>>,
}

impl AutomationsService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the automation's triggers and register it everywhere.
    ///
    /// The registration is all or nothing: if a service rejects the
    /// automation, services that accepted it are rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::AlreadyRegistered`] for a known name, or
    /// the first error raised by a service.
    #[tracing::instrument(skip_all, fields(automation = %automation.name()))]
    pub fn register_automation(
        &self,
        automation: Arc<dyn Automation>,
    ) -> Result<Arc<RegisteredAutomation>, RegistrationError> {
        let registered = Arc::new(RegisteredAutomation::new(automation));
        let name = Arc::clone(registered.name());

        let mut automations = self.automations.write();
        if automations.contains_key(&name) {
            return Err(RegistrationError::AlreadyRegistered {
                name: name.to_string(),
            });
        }

        if !registered.triggers().is_empty() {
            let services = self.services.read();
            for (position, service) in services.iter().enumerate() {
                if let Err(err) = service.register_automation(Arc::clone(&registered)) {
                    tracing::error!(service = service.name(), error = %err, "registration rejected");
                    for accepted in &services[..position] {
                        accepted.unregister_automation(&name);
                    }
                    return Err(err);
                }
            }
        }

        tracing::info!(triggers = registered.triggers().len(), "automation registered");
        automations.insert(name, Arc::clone(&registered));
        Ok(registered)
    }

    /// Add an events service and replay every known automation into it.
    ///
    /// Returns the registrations the service rejected; each is also logged.
    #[tracing::instrument(skip_all, fields(service = service.name()))]
    pub fn register_events_service(&self, service: Arc<dyn EventsService>) -> Vec<RegistrationError> {
        let automations = self.automations.read();
        let mut rejected = Vec::new();
        for automation in automations.values() {
            if let Err(err) = service.register_automation(Arc::clone(automation)) {
                tracing::error!(automation = %automation.name(), error = %err, "replay rejected");
                rejected.push(err);
            }
        }
        tracing::info!(replayed = automations.len() - rejected.len(), "events service registered");
        self.services.write().push(service);
        rejected
    }

    /// Remove the automation named `name` from the registry and every service.
    #[tracing::instrument(skip(self))]
    pub fn unregister_automation(&self, name: &str) -> bool {
        let Some(automation) = self.automations.write().remove(name) else {
            return false;
        };
        for service in self.services.read().iter() {
            service.unregister_automation(automation.name());
        }
        tracing::info!("automation unregistered");
        true
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<RegisteredAutomation>> {
        self.automations.read().get(name).cloned()
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.automations.read().contains_key(name)
    }

    /// Registered automations, ordered by name.
    #[must_use]
    pub fn automations(&self) -> Vec<Arc<RegisteredAutomation>> {
        self.automations.read().values().cloned().collect()
    }

    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.automations.read().len()
    }

    #[must_use]
    pub fn services_count(&self) -> usize {
        self.services.read().len()
    }
}
