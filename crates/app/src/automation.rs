//! The automation contract and its registered form.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tripwire_domain::event::{AutomationEvent, EventKind};
use tripwire_domain::trigger::TriggerDefinition;

/// A named unit of user logic reacting to events.
///
/// `name` identifies the automation: two automations with the same name
/// cannot be registered on the same events service.
#[async_trait]
pub trait Automation: Send + Sync {
    fn name(&self) -> &str;

    /// Rules selecting the events this automation wants.
    ///
    /// Called once, when the automation is registered.
    fn triggers(&self) -> Vec<TriggerDefinition>;

    /// React to one event.
    ///
    /// # Errors
    ///
    /// Any error is logged with the automation name; it never prevents
    /// delivery to other automations.
    async fn handle_event(&self, event: AutomationEvent) -> anyhow::Result<()>;
}

/// An automation together with the triggers built at registration.
pub struct RegisteredAutomation {
    name: Arc<str>,
    triggers: Vec<TriggerDefinition>,
    automation: Arc<dyn Automation>,
}

impl RegisteredAutomation {
    /// Build the automation's triggers once.
    pub fn new(automation: Arc<dyn Automation>) -> Self {
        Self {
            name: Arc::from(automation.name()),
            triggers: automation.triggers(),
            automation,
        }
    }

    #[must_use]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    #[must_use]
    pub fn triggers(&self) -> &[TriggerDefinition] {
        &self.triggers
    }

    /// Triggers reacting to `kind` events.
    pub fn triggers_of(&self, kind: EventKind) -> impl Iterator<Item = &TriggerDefinition> {
        self.triggers
            .iter()
            .filter(move |trigger| trigger.kind() == kind)
    }

    /// Whether any trigger selects `event`.
    #[must_use]
    pub fn matches(&self, event: &AutomationEvent) -> bool {
        self.triggers.iter().any(|trigger| trigger.matches(event))
    }

    /// Forward an event to the user handler.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler returns.
    pub async fn handle(&self, event: AutomationEvent) -> anyhow::Result<()> {
        self.automation.handle_event(event).await
    }
}

impl fmt::Debug for RegisteredAutomation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredAutomation")
            .field("name", &self.name)
            .field("triggers", &self.triggers.len())
            .finish_non_exhaustive()
    }
}
