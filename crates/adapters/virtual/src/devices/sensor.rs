//! Virtual temperature sensor: reports a settable reading.

use std::sync::Mutex;

use serde_json::Value;
use tripwire_app::error::HubError;
use tripwire_domain::device::{AttributeDataType, DeviceInfo};
use tripwire_domain::id::DeviceId;

use super::{Change, attribute, info, lock, unsupported};

const INITIAL_TEMPERATURE: f64 = 21.5;

/// A simulated temperature sensor.
pub struct VirtualSensor {
    id: DeviceId,
    temperature: Mutex<f64>,
}

impl VirtualSensor {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            temperature: Mutex::new(INITIAL_TEMPERATURE),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn info(&self) -> DeviceInfo {
        let temperature = *lock(&self.temperature);
        info(
            self.id,
            "Virtual Sensor",
            &["TemperatureMeasurement", "Refresh"],
            vec![attribute(
                "temperature",
                Value::from(temperature),
                AttributeDataType::Number,
            )],
            &["refresh"],
        )
    }

    /// Store a new reading and return the change to publish.
    pub fn set_temperature(&self, celsius: f64) -> Change {
        *lock(&self.temperature) = celsius;
        ("temperature".to_string(), celsius.to_string())
    }

    pub fn handle_command(&self, command: &str) -> Result<Vec<Change>, HubError> {
        match command {
            "refresh" => {
                let temperature = *lock(&self.temperature);
                Ok(vec![("temperature".to_string(), temperature.to_string())])
            }
            _ => Err(unsupported(self.id, command)),
        }
    }
}
