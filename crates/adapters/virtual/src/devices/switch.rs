//! Virtual switch: responds to `on`, `off`, `toggle`.

use std::sync::Mutex;

use serde_json::Value;
use tripwire_app::error::HubError;
use tripwire_domain::device::{AttributeDataType, DeviceInfo};
use tripwire_domain::id::DeviceId;

use super::{Change, attribute, info, lock, switch_value, unsupported};

/// A simulated on/off switch.
pub struct VirtualSwitch {
    id: DeviceId,
    on: Mutex<bool>,
}

impl VirtualSwitch {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            on: Mutex::new(false),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn info(&self) -> DeviceInfo {
        let on = *lock(&self.on);
        info(
            self.id,
            "Virtual Switch",
            &["Switch"],
            vec![attribute("switch", Value::from(switch_value(on)), AttributeDataType::Enum)],
            &["on", "off", "toggle"],
        )
    }

    pub fn handle_command(&self, command: &str) -> Result<Vec<Change>, HubError> {
        let mut on = lock(&self.on);
        match command {
            "on" => *on = true,
            "off" => *on = false,
            "toggle" => *on = !*on,
            _ => return Err(unsupported(self.id, command)),
        }
        Ok(vec![("switch".to_string(), switch_value(*on).to_string())])
    }
}
