//! Hub port: the device hub the runtime reads devices from and sends
//! commands to.
//!
//! Implementations live in adapter crates (e.g. `tripwire-adapter-virtual`). Attribute
//! updates pushed by the hub travel separately, on a channel handed to
//! [`DeviceCache::spawn_update_listener`](crate::services::DeviceCache::spawn_update_listener).

use std::future::Future;

use tripwire_domain::device::{DeviceInfo, DeviceSummary};
use tripwire_domain::id::DeviceId;

use crate::error::HubError;

/// Client of a device hub.
pub trait HubClient: Send + Sync {
    /// List every device the hub knows.
    fn list_devices(&self) -> impl Future<Output = Result<Vec<DeviceSummary>, HubError>> + Send;

    /// Fetch the full description of one device.
    fn device_info(&self, id: DeviceId) -> impl Future<Output = Result<DeviceInfo, HubError>> + Send;

    /// Ask the hub to run `command` on a device, with an optional argument.
    fn send_command(
        &self,
        id: DeviceId,
        command: &str,
        value: Option<&str>,
    ) -> impl Future<Output = Result<(), HubError>> + Send;
}

impl<T: HubClient> HubClient for std::sync::Arc<T> {
    fn list_devices(&self) -> impl Future<Output = Result<Vec<DeviceSummary>, HubError>> + Send {
        (**self).list_devices()
    }

    fn device_info(&self, id: DeviceId) -> impl Future<Output = Result<DeviceInfo, HubError>> + Send {
        (**self).device_info(id)
    }

    fn send_command(
        &self,
        id: DeviceId,
        command: &str,
        value: Option<&str>,
    ) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).send_command(id, command, value)
    }
}
