//! Device/control store abstraction.
//!
//! The host automation runtime owns the actual store; the bridge only talks
//! to it through this trait. Writes can suppress the change notification so
//! gateway state echoes are never mistaken for user commands.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::Display;

/// Semantic type of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ControlType {
    /// Boolean on/off control.
    Switch,
    /// Bounded numeric control.
    Range,
    /// Unbounded numeric control.
    Value,
    /// Opaque text control.
    Text,
    /// Momentary trigger control.
    Pushbutton,
}

/// A control's current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Full description of one control: type, access, value and metadata.
///
/// Also returned from [`DeviceStore::control`] as a snapshot of the stored
/// control, with `value` holding the current value.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub name: String,
    pub kind: ControlType,
    pub readonly: bool,
    pub value: Value,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: Option<String>,
    pub description: Option<String>,
}

impl ControlSpec {
    pub fn switch(name: impl Into<String>, readonly: bool) -> Self {
        Self {
            name: name.into(),
            kind: ControlType::Switch,
            readonly,
            value: Value::Bool(false),
            min: None,
            max: None,
            unit: None,
            description: None,
        }
    }

    pub fn range(name: impl Into<String>, readonly: bool, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            kind: ControlType::Range,
            readonly,
            value: Value::Number(0.0),
            min: Some(min),
            max: Some(max),
            unit: None,
            description: None,
        }
    }

    pub fn value(name: impl Into<String>, initial: f64) -> Self {
        Self {
            name: name.into(),
            kind: ControlType::Value,
            readonly: true,
            value: Value::Number(initial),
            min: None,
            max: None,
            unit: None,
            description: None,
        }
    }

    pub fn text(name: impl Into<String>, readonly: bool, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ControlType::Text,
            readonly,
            value: Value::Text(value.into()),
            min: None,
            max: None,
            unit: None,
            description: None,
        }
    }

    pub fn pushbutton(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ControlType::Pushbutton,
            readonly: false,
            value: Value::Bool(false),
            min: None,
            max: None,
            unit: None,
            description: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Notification that a control's value was changed by user action.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlChange {
    pub device: String,
    pub control: String,
    pub value: Value,
}

/// Callback invoked for notifying value writes.
pub type ChangeListener = Box<dyn Fn(ControlChange) + Send + Sync>;

/// Host-side device/control store.
///
/// All methods are synchronous: the bridge mutates the store directly from
/// within its event callbacks, one event at a time.
pub trait DeviceStore {
    /// Create (or overwrite) a bridge-owned virtual device.
    fn define_device(&self, id: &str, title: &str);

    /// Whether any entity with this name exists.
    fn has_device(&self, id: &str) -> bool;

    /// Whether the named entity exists and is one of this bridge's devices.
    fn is_bridge_device(&self, id: &str) -> bool;

    /// Names of all controls currently attached to a device.
    fn control_names(&self, device: &str) -> Vec<String>;

    fn has_control(&self, device: &str, control: &str) -> bool;

    fn add_control(&self, device: &str, spec: ControlSpec);

    fn remove_control(&self, device: &str, control: &str);

    /// Snapshot of a control, including its current value.
    fn control(&self, device: &str, control: &str) -> Option<ControlSpec>;

    /// Write a control's value. With `notify` false the change notification
    /// is suppressed and no user-change callback fires.
    fn set_value(&self, device: &str, control: &str, value: Value, notify: bool);
}
