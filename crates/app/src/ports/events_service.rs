//! Events service port: a source of events automations subscribe to.

use std::sync::Arc;

use crate::automation::RegisteredAutomation;
use crate::error::RegistrationError;

/// Delivers one kind of event to registered automations.
pub trait EventsService: Send + Sync {
    /// Short name used in logs (e.g. `"device"`).
    fn name(&self) -> &'static str;

    /// Start delivering events to `automation`.
    ///
    /// Automations without a trigger for this service are accepted and
    /// ignored.
    ///
    /// # Errors
    ///
    /// Fails when the automation is already registered or its triggers
    /// cannot be served.
    fn register_automation(&self, automation: Arc<RegisteredAutomation>) -> Result<(), RegistrationError>;

    /// Stop delivering events to the automation named `name`.
    ///
    /// Returns whether it was registered. Handlers already running are not
    /// interrupted.
    fn unregister_automation(&self, name: &str) -> bool;

    fn is_registered(&self, name: &str) -> bool;
}

impl<T: EventsService + ?Sized> EventsService for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn register_automation(&self, automation: Arc<RegisteredAutomation>) -> Result<(), RegistrationError> {
        (**self).register_automation(automation)
    }

    fn unregister_automation(&self, name: &str) -> bool {
        (**self).unregister_automation(name)
    }

    fn is_registered(&self, name: &str) -> bool {
        (**self).is_registered(name)
    }
}
