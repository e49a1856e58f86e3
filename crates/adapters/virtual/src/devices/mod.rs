//! Simulated devices exposed by the virtual hub.

mod light;
mod sensor;
mod switch;

pub use light::VirtualLight;
pub use sensor::VirtualSensor;
pub use switch::VirtualSwitch;

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tripwire_app::error::HubError;
use tripwire_domain::device::{AttributeDataType, DeviceInfo, DeviceInfoAttribute};
use tripwire_domain::id::DeviceId;

/// Attribute name and new value produced by a command.
pub type Change = (String, String);

/// Wrapper enum so the hub can keep a heterogeneous device map.
pub enum VirtualDevice {
    Light(VirtualLight),
    Sensor(VirtualSensor),
    Switch(VirtualSwitch),
}

impl VirtualDevice {
    pub fn id(&self) -> DeviceId {
        match self {
            Self::Light(d) => d.id(),
            Self::Sensor(d) => d.id(),
            Self::Switch(d) => d.id(),
        }
    }

    pub fn info(&self) -> DeviceInfo {
        match self {
            Self::Light(d) => d.info(),
            Self::Sensor(d) => d.info(),
            Self::Switch(d) => d.info(),
        }
    }

    pub fn handle_command(
        &self,
        command: &str,
        value: Option<&str>,
    ) -> Result<Vec<Change>, HubError> {
        match self {
            Self::Light(d) => d.handle_command(command, value),
            Self::Sensor(d) => d.handle_command(command),
            Self::Switch(d) => d.handle_command(command),
        }
    }
}

/// Lock a device state, recovering from poisoning.
fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unsupported(id: DeviceId, command: &str) -> HubError {
    HubError::UnsupportedCommand {
        device: id,
        command: command.to_string(),
    }
}

fn switch_value(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn attribute(name: &str, value: Value, data_type: AttributeDataType) -> DeviceInfoAttribute {
    let values = (data_type == AttributeDataType::Enum)
        .then(|| vec!["on".to_string(), "off".to_string()]);
    DeviceInfoAttribute {
        name: name.to_string(),
        current_value: value,
        data_type: Some(data_type),
        values,
    }
}

fn info(
    id: DeviceId,
    label: &str,
    capabilities: &[&str],
    attributes: Vec<DeviceInfoAttribute>,
    commands: &[&str],
) -> DeviceInfo {
    DeviceInfo {
        id: id.to_string(),
        name: label.to_lowercase().replace(' ', "_"),
        label: label.to_string(),
        capabilities: capabilities
            .iter()
            .map(|name| Value::String((*name).to_string()))
            .collect(),
        attributes,
        commands: commands.iter().map(|name| (*name).to_string()).collect(),
    }
}
