//! Device-list snapshot decoding.
//!
//! The gateway periodically publishes a full JSON array describing every
//! device it knows, including the capability exposure tree for devices that
//! have completed interview. See
//! https://www.zigbee2mqtt.io/guide/usage/exposes.html for the exposure
//! format.

use serde::Deserialize;

/// Access bitmask of a capability.
///
/// bit 0: the device publishes the value in its state, bit 1: the value can
/// be set by the user, bit 2: the value can be retrieved on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct Access(pub u8);

impl Access {
    const PUBLISHED: u8 = 1;
    const SETTABLE: u8 = 2;
    const RETRIEVABLE: u8 = 4;

    pub fn is_published(self) -> bool {
        self.0 & Self::PUBLISHED != 0
    }

    pub fn is_readonly(self) -> bool {
        self.0 & Self::SETTABLE == 0
    }

    /// Retrievable on demand but never actively published: the value only
    /// becomes available after an explicit get-request.
    pub fn is_only_retrievable(self) -> bool {
        self.0 & (Self::RETRIEVABLE | Self::PUBLISHED) == Self::RETRIEVABLE
    }
}

/// One capability descriptor from a device's exposure tree.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Expose {
    /// Capability type: binary, numeric, enum, text, or a composite kind.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// State-object key this capability is published under.
    #[serde(default)]
    pub property: Option<String>,

    #[serde(default)]
    pub access: Access,

    /// Lower bound for numeric capabilities.
    #[serde(default)]
    pub value_min: Option<f64>,

    /// Upper bound for numeric capabilities.
    #[serde(default)]
    pub value_max: Option<f64>,

    /// Domain label published for the "on" state of binary capabilities
    /// (e.g. "ON", "LOCK", true).
    #[serde(default)]
    pub value_on: Option<serde_json::Value>,

    /// Domain label published for the "off" state.
    #[serde(default)]
    pub value_off: Option<serde_json::Value>,

    /// Allowed values for enum capabilities.
    #[serde(default)]
    pub values: Option<Vec<String>>,

    /// Physical unit for numeric capabilities.
    #[serde(default)]
    pub unit: Option<String>,

    /// Sub-capabilities of composite capabilities.
    #[serde(default)]
    pub features: Option<Vec<Expose>>,
}

impl Expose {
    /// On/off labels as published on the wire. Defaults to "true"/"false"
    /// when the capability declares none.
    pub fn binary_labels(&self) -> (String, String) {
        let on = self
            .value_on
            .as_ref()
            .map(label_string)
            .unwrap_or_else(|| "true".to_string());
        let off = self
            .value_off
            .as_ref()
            .map(label_string)
            .unwrap_or_else(|| "false".to_string());
        (on, off)
    }
}

/// Binary labels are usually strings but booleans and numbers appear too.
fn label_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Vendor-declared device definition, present once a device is interviewed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub exposes: Vec<Expose>,
}

/// One entry of the device-list snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    #[serde(default)]
    pub friendly_name: Option<String>,

    #[serde(default)]
    pub ieee_address: Option<String>,

    /// Device role: "Coordinator", "Router" or "EndDevice".
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub definition: Option<Definition>,
}

impl DeviceEntry {
    pub fn is_coordinator(&self) -> bool {
        self.kind.as_deref() == Some("Coordinator")
    }

    /// Stable identity key: the friendly name when one is assigned, else the
    /// hardware address. `None` for entries carrying neither.
    pub fn stable_key(&self) -> Option<&str> {
        match self.friendly_name.as_deref() {
            Some(name) if !name.is_empty() => Some(name),
            _ => self.ieee_address.as_deref().filter(|a| !a.is_empty()),
        }
    }
}

/// Decode a full `bridge/devices` snapshot.
pub fn decode_device_list(payload: &str) -> crate::error::Result<Vec<DeviceEntry>> {
    Ok(serde_json::from_str(payload)?)
}
