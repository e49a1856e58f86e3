//! Device snapshot as reported by a hub.
//!
//! Hubs describe devices with loosely typed JSON ([`DeviceInfo`]). A
//! [`Device`] is the normalized snapshot kept in memory: ids are parsed,
//! attribute values are stringified, and capability objects without a name
//! are dropped. Setting an attribute yields the [`DeviceEvent`] to announce.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{DeviceMismatchError, InvalidDeviceError};
use crate::event::DeviceEvent;
use crate::id::DeviceId;

/// Entry of the hub's device list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub label: String,
}

/// Declared type of a hub attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeDataType {
    Enum,
    JsonObject,
    Number,
    String,
}

/// Attribute entry of a [`DeviceInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfoAttribute {
    pub name: String,
    #[serde(default)]
    pub current_value: serde_json::Value,
    pub data_type: Option<AttributeDataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl DeviceInfoAttribute {
    /// Current value as the string the rule engine compares against.
    #[must_use]
    pub fn value_as_string(&self) -> Option<String> {
        match &self.current_value {
            serde_json::Value::Null => None,
            serde_json::Value::String(value) => Some(value.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Full device description returned by a hub.
///
/// `capabilities` mixes plain names with capability objects; only the names
/// are kept when building a [`Device`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub capabilities: Vec<serde_json::Value>,
    #[serde(default)]
    pub attributes: Vec<DeviceInfoAttribute>,
    #[serde(default)]
    pub commands: Vec<String>,
}

/// A raw attribute update pushed by a hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpdate {
    pub device_id: String,
    pub name: String,
    pub value: Option<String>,
}

/// In-memory snapshot of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub label: String,
    capabilities: BTreeSet<String>,
    attributes: BTreeMap<String, Option<String>>,
    commands: BTreeSet<String>,
}

impl Device {
    /// Value of an attribute, `None` when unknown or null.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Option::as_deref)
    }

    /// Attribute names with their values.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Attribute parsed as a decimal, `None` when missing or unparsable.
    #[must_use]
    pub fn attribute_as_f64(&self, name: &str) -> Option<f64> {
        self.attribute(name)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
    }

    /// Attribute parsed as an integer; decimals are truncated.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn attribute_as_i64(&self, name: &str) -> Option<i64> {
        let raw = self.attribute(name)?.trim();
        raw.parse::<i64>()
            .ok()
            .or_else(|| self.attribute_as_f64(name).map(|value| value.trunc() as i64))
    }

    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Whether every capability in `capabilities` is present.
    pub fn has_capabilities<'a>(&self, capabilities: impl IntoIterator<Item = &'a str>) -> bool {
        capabilities
            .into_iter()
            .all(|capability| self.has_capability(capability))
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(String::as_str)
    }

    #[must_use]
    pub fn has_command(&self, command: &str) -> bool {
        self.commands.contains(command)
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }

    /// Store an attribute value.
    ///
    /// Returns the event to announce, or `None` when the value is unchanged
    /// and `force` is not set.
    pub fn set_attribute(
        &mut self,
        name: &str,
        value: Option<String>,
        force: bool,
    ) -> Option<DeviceEvent> {
        let previous = self.attributes.get(name).cloned().flatten();
        if !force && self.attributes.contains_key(name) && previous == value {
            return None;
        }
        self.attributes.insert(name.to_string(), value.clone());
        Some(DeviceEvent {
            device_id: self.id,
            attribute_name: name.to_string(),
            new_value: value,
            previous_value: previous,
        })
    }

    /// Copy metadata and attributes from a fresh snapshot of the same device.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceMismatchError`] when `source` describes another device.
    pub fn update_from(
        &mut self,
        source: Device,
        force: bool,
    ) -> Result<Vec<DeviceEvent>, DeviceMismatchError> {
        if source.id != self.id {
            return Err(DeviceMismatchError {
                target: self.id,
                source_id: source.id,
            });
        }
        self.name = source.name;
        self.label = source.label;
        self.capabilities = source.capabilities;
        self.commands = source.commands;
        Ok(source
            .attributes
            .into_iter()
            .filter_map(|(name, value)| self.set_attribute(&name, value, force))
            .collect())
    }
}

impl TryFrom<DeviceInfo> for Device {
    type Error = InvalidDeviceError;

    fn try_from(info: DeviceInfo) -> Result<Self, Self::Error> {
        let id = info.id.parse::<DeviceId>()?;
        let capabilities = info
            .capabilities
            .into_iter()
            .filter_map(|capability| match capability {
                serde_json::Value::String(name) => Some(name),
                _ => None,
            })
            .collect();
        let attributes = info
            .attributes
            .iter()
            .map(|attribute| (attribute.name.clone(), attribute.value_as_string()))
            .collect();
        Ok(Self {
            id,
            name: info.name,
            label: info.label,
            capabilities,
            attributes,
            commands: info.commands.into_iter().collect(),
        })
    }
}
