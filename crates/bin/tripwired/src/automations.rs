//! Demo automations wired against the virtual hub.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tripwire_adapter_virtual::VirtualHub;
use tripwire_app::automation::Automation;
use tripwire_app::ports::HubClient;
use tripwire_app::services::DeviceCache;
use tripwire_domain::error::BuilderError;
use tripwire_domain::event::{AutomationEvent, DeviceEvent};
use tripwire_domain::id::DeviceId;
use tripwire_domain::trigger::{
    Buildable, DeviceTrigger, IntervalUnit, TimerTrigger, TriggerDefinition,
};

pub const LIGHT: DeviceId = DeviceId::new(1);
pub const SENSOR: DeviceId = DeviceId::new(2);
pub const SWITCH: DeviceId = DeviceId::new(3);

/// Turns the light on and off with the switch.
pub struct MirrorSwitch<H> {
    cache: Arc<DeviceCache<H>>,
}

impl<H> MirrorSwitch<H> {
    pub fn new(cache: Arc<DeviceCache<H>>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl<H: HubClient + 'static> Automation for MirrorSwitch<H> {
    fn name(&self) -> &str {
        "mirror-switch"
    }

    fn triggers(&self) -> Vec<TriggerDefinition> {
        vec![
            DeviceTrigger::for_device(SWITCH)
                .attribute("switch")
                .changes()
                .build(),
        ]
    }

    async fn handle_event(&self, event: AutomationEvent) -> anyhow::Result<()> {
        let event = DeviceEvent::try_from(event)?;
        let command = match event.new_value.as_deref() {
            Some("on") => "on",
            Some("off") => "off",
            other => anyhow::bail!("unexpected switch value {other:?}"),
        };
        self.cache.send_command(LIGHT, command, None).await?;
        Ok(())
    }
}

/// Warns when the temperature crosses a threshold upwards.
pub struct TemperatureAlert {
    threshold: f64,
}

impl TemperatureAlert {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

#[async_trait]
impl Automation for TemperatureAlert {
    fn name(&self) -> &str {
        "temperature-alert"
    }

    fn triggers(&self) -> Vec<TriggerDefinition> {
        vec![
            DeviceTrigger::for_device(SENSOR)
                .attribute("temperature")
                .is_greater_than(self.threshold)
                .and()
                .was_lesser_than(self.threshold)
                .build(),
        ]
    }

    async fn handle_event(&self, event: AutomationEvent) -> anyhow::Result<()> {
        let event = DeviceEvent::try_from(event)?;
        tracing::warn!(
            device_id = %event.device_id,
            temperature = ?event.new_value,
            threshold = self.threshold,
            "temperature above threshold"
        );
        Ok(())
    }
}

/// Moves the sensor reading along a sawtooth between 20 °C and 25.5 °C.
pub struct TemperatureDrift {
    hub: Arc<VirtualHub>,
    trigger: TriggerDefinition,
    ticks: AtomicU32,
}

impl TemperatureDrift {
    /// # Errors
    ///
    /// Returns [`BuilderError::NonPositiveInterval`] when `every_seconds` is zero.
    pub fn new(hub: Arc<VirtualHub>, every_seconds: u32) -> Result<Self, BuilderError> {
        let trigger = TimerTrigger::every(every_seconds, IntervalUnit::Seconds)?.build();
        Ok(Self {
            hub,
            trigger,
            ticks: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl Automation for TemperatureDrift {
    fn name(&self) -> &str {
        "temperature-drift"
    }

    fn triggers(&self) -> Vec<TriggerDefinition> {
        vec![self.trigger.clone()]
    }

    async fn handle_event(&self, _event: AutomationEvent) -> anyhow::Result<()> {
        let step = self.ticks.fetch_add(1, Ordering::Relaxed) % 12;
        self.hub.set_temperature(20.0 + f64::from(step) * 0.5).await?;
        Ok(())
    }
}
