//! Virtual light: responds to `on`, `off`, `toggle` and `setLevel`.

use std::sync::Mutex;

use serde_json::Value;
use tripwire_app::error::HubError;
use tripwire_domain::device::{AttributeDataType, DeviceInfo};
use tripwire_domain::id::DeviceId;

use super::{Change, attribute, info, lock, switch_value, unsupported};

struct LightState {
    on: bool,
    level: u8,
}

/// A simulated dimmable light.
pub struct VirtualLight {
    id: DeviceId,
    state: Mutex<LightState>,
}

impl VirtualLight {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            state: Mutex::new(LightState { on: false, level: 0 }),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn info(&self) -> DeviceInfo {
        let state = lock(&self.state);
        info(
            self.id,
            "Virtual Light",
            &["Switch", "SwitchLevel", "Refresh"],
            vec![
                attribute("switch", Value::from(switch_value(state.on)), AttributeDataType::Enum),
                attribute("level", Value::from(state.level), AttributeDataType::Number),
            ],
            &["on", "off", "toggle", "setLevel", "refresh"],
        )
    }

    /// Apply a command and return the attributes it changed.
    ///
    /// A positive `setLevel` also turns the light on.
    pub fn handle_command(
        &self,
        command: &str,
        value: Option<&str>,
    ) -> Result<Vec<Change>, HubError> {
        let mut state = lock(&self.state);
        let mut changes = Vec::new();
        match command {
            "on" => state.on = true,
            "off" => state.on = false,
            "toggle" => state.on = !state.on,
            "refresh" => {}
            "setLevel" => {
                let level = parse_level(command, value)?;
                state.level = level;
                changes.push(("level".to_string(), level.to_string()));
                if level > 0 {
                    state.on = true;
                }
            }
            _ => return Err(unsupported(self.id, command)),
        }
        changes.push(("switch".to_string(), switch_value(state.on).to_string()));
        Ok(changes)
    }
}

fn parse_level(command: &str, value: Option<&str>) -> Result<u8, HubError> {
    let raw = value.unwrap_or_default();
    raw.trim()
        .parse::<u8>()
        .ok()
        .filter(|level| *level <= 100)
        .ok_or_else(|| HubError::InvalidCommandValue {
            command: command.to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> VirtualLight {
        VirtualLight::new(DeviceId::new(1))
    }

    #[test]
    fn should_start_off() {
        let info = light().info();
        assert_eq!(info.attributes[0].current_value, Value::from("off"));
        assert_eq!(info.attributes[1].current_value, Value::from(0));
    }

    #[test]
    fn should_toggle_switch() {
        let light = light();
        let changes = light.handle_command("toggle", None).unwrap();
        assert_eq!(changes, [("switch".to_string(), "on".to_string())]);
        let changes = light.handle_command("toggle", None).unwrap();
        assert_eq!(changes, [("switch".to_string(), "off".to_string())]);
    }

    #[test]
    fn should_keep_light_off_when_level_is_zero() {
        let light = light();
        let changes = light.handle_command("setLevel", Some("0")).unwrap();
        assert_eq!(
            changes,
            [
                ("level".to_string(), "0".to_string()),
                ("switch".to_string(), "off".to_string()),
            ]
        );
    }

    #[test]
    fn should_reject_out_of_range_level() {
        let err = light().handle_command("setLevel", Some("150")).unwrap_err();
        assert_eq!(
            err,
            HubError::InvalidCommandValue {
                command: "setLevel".to_string(),
                value: "150".to_string(),
            }
        );
        assert!(light().handle_command("setLevel", None).is_err());
    }

    #[test]
    fn should_reject_unknown_command() {
        let err = light().handle_command("blink", None).unwrap_err();
        assert!(matches!(err, HubError::UnsupportedCommand { .. }));
    }
}
