//! # tripwire-adapter-virtual
//!
//! Virtual hub that provides simulated devices for testing and
//! demonstration purposes.
//!
//! ## Provided devices
//!
//! | Device | Id | Attributes | Commands |
//! |--------|----|------------|----------|
//! | Virtual Light | `1` | `switch`, `level` | `on` / `off` / `toggle` / `setLevel` |
//! | Virtual Sensor | `2` | `temperature` | `refresh` |
//! | Virtual Switch | `3` | `switch` | `on` / `off` / `toggle` |
//!
//! Every command publishes the resulting attribute values as
//! [`DeviceUpdate`]s on the channel returned by [`VirtualHub::new`], the way
//! a real hub pushes its event stream.
//!
//! ## Dependency rule
//!
//! Depends on `tripwire-app` (port traits) and `tripwire-domain` only.

mod devices;

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tripwire_app::error::HubError;
use tripwire_app::ports::HubClient;
use tripwire_domain::device::{DeviceInfo, DeviceSummary, DeviceUpdate};
use tripwire_domain::id::DeviceId;

use devices::{VirtualDevice, VirtualLight, VirtualSensor, VirtualSwitch};

/// Hub simulating a fixed set of devices.
pub struct VirtualHub {
    devices: BTreeMap<DeviceId, VirtualDevice>,
    updates: mpsc::Sender<DeviceUpdate>,
}

impl VirtualHub {
    /// Create the hub and the receiving end of its update stream.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DeviceUpdate>) {
        let (updates, receiver) = mpsc::channel(capacity);
        let devices = [
            VirtualDevice::Light(VirtualLight::new(DeviceId::new(1))),
            VirtualDevice::Sensor(VirtualSensor::new(DeviceId::new(2))),
            VirtualDevice::Switch(VirtualSwitch::new(DeviceId::new(3))),
        ]
        .into_iter()
        .map(|device| (device.id(), device))
        .collect();
        (Self { devices, updates }, receiver)
    }

    /// Simulate a new reading of the temperature sensor.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Transport`] when nobody listens to the update
    /// stream anymore.
    pub async fn set_temperature(&self, celsius: f64) -> Result<(), HubError> {
        let changes = self
            .devices
            .values()
            .filter_map(|device| match device {
                VirtualDevice::Sensor(sensor) => Some((sensor.id(), sensor.set_temperature(celsius))),
                VirtualDevice::Light(_) | VirtualDevice::Switch(_) => None,
            })
            .collect::<Vec<_>>();
        for (id, change) in changes {
            self.publish(id, change).await?;
        }
        Ok(())
    }

    async fn publish(&self, id: DeviceId, (name, value): (String, String)) -> Result<(), HubError> {
        tracing::debug!(device_id = %id, attribute = %name, value = %value, "virtual update");
        self.updates
            .send(DeviceUpdate {
                device_id: id.to_string(),
                name,
                value: Some(value),
            })
            .await
            .map_err(|_| HubError::Transport("update stream closed".to_string()))
    }

    fn device(&self, id: DeviceId) -> Result<&VirtualDevice, HubError> {
        self.devices.get(&id).ok_or(HubError::UnknownDevice(id))
    }
}

impl HubClient for VirtualHub {
    async fn list_devices(&self) -> Result<Vec<DeviceSummary>, HubError> {
        Ok(self
            .devices
            .values()
            .map(|device| {
                let info = device.info();
                DeviceSummary {
                    id: info.id,
                    name: info.name,
                    label: info.label,
                }
            })
            .collect())
    }

    async fn device_info(&self, id: DeviceId) -> Result<DeviceInfo, HubError> {
        Ok(self.device(id)?.info())
    }

    async fn send_command(
        &self,
        id: DeviceId,
        command: &str,
        value: Option<&str>,
    ) -> Result<(), HubError> {
        let changes = self.device(id)?.handle_command(command, value)?;
        for change in changes {
            self.publish(id, change).await?;
        }
        Ok(())
    }
}
