//! State Tracker / Value Coercer.
//!
//! Applies a device's flat state object to its controls. Fields without a
//! control yet get one, typed by the well-known-field table below; existing
//! controls are updated in place with the change notification suppressed, so
//! a gateway echo never re-triggers the write rule that caused it.

use super::Bridge;
use crate::host::{ControlSpec, ControlType, DeviceStore, Value};
use log::{debug, warn};

impl<S: DeviceStore> Bridge<S> {
    pub(crate) fn handle_device_state(&mut self, dev_name: &str, payload: &str) {
        let fields: serde_json::Map<String, serde_json::Value> =
            match serde_json::from_str(payload) {
                Ok(fields) => fields,
                Err(e) => {
                    warn!("Dropping malformed state for [{}]: {}", dev_name, e);
                    return;
                }
            };

        // A state message can outrun the snapshot that announced the device
        if !self.store.is_bridge_device(dev_name) {
            self.store.define_device(dev_name, dev_name);
        }

        for (key, value) in &fields {
            if key.is_empty() {
                continue;
            }

            if self.store.has_control(dev_name, key) {
                self.update_state_control(dev_name, key, value);
            } else {
                self.replace_control(dev_name, infer_control(key, value), None);
            }
        }
    }

    fn update_state_control(&mut self, dev_name: &str, key: &str, value: &serde_json::Value) {
        let Some(control) = self.store.control(dev_name, key) else {
            return;
        };
        let Some(coerced) = coerce(&control, value) else {
            debug!(
                "Ignoring uncoercible value {} for [{}/{}]",
                value, dev_name, key
            );
            return;
        };
        self.store.set_value(dev_name, key, coerced, false);
    }
}

/// Build a control for a state field seen before any capability description.
///
/// Well-known fields get their semantic display type; everything else lands
/// as opaque text.
fn infer_control(key: &str, value: &serde_json::Value) -> ControlSpec {
    let numeric = |unit: Option<&str>| {
        let mut spec = ControlSpec::value(key, value.as_f64().unwrap_or(0.0));
        if let Some(unit) = unit {
            spec = spec.with_unit(unit);
        }
        spec
    };

    match key {
        "battery" | "humidity" | "soil_moisture" => numeric(Some("%")),
        "linkquality" => numeric(Some("lqi")),
        "temperature" | "device_temperature" | "local_temperature" => numeric(Some("°C")),
        "pressure" => numeric(Some("hPa")),
        "co2" => numeric(Some("ppm")),
        "voc" => numeric(Some("ppb")),
        "illuminance" | "illuminance_lux" => numeric(Some("lx")),
        "noise" => numeric(Some("dBA")),
        "power" => numeric(Some("W")),
        "voltage" => numeric(Some("V")),
        "current" => numeric(Some("A")),
        "energy" => numeric(Some("kWh")),
        "occupancy" | "contact" | "tamper" | "vibration" | "water_leak" => {
            let mut spec = ControlSpec::switch(key, true);
            spec.value = Value::Bool(value.as_bool().unwrap_or(false));
            spec
        }
        _ => ControlSpec::text(key, true, stringify(value)),
    }
}

/// Coerce a raw state value onto an existing control's type. `None` means
/// the value cannot be represented and the field is dropped.
fn coerce(control: &ControlSpec, value: &serde_json::Value) -> Option<Value> {
    match control.kind {
        ControlType::Switch => match value {
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::String(s) => coerce_label(control, s),
            _ => None,
        },
        ControlType::Range | ControlType::Value => value.as_f64().map(Value::Number),
        ControlType::Text | ControlType::Pushbutton => Some(Value::Text(stringify(value))),
    }
}

/// Match a state label against the switch's configured "off,on" pair.
fn coerce_label(control: &ControlSpec, label: &str) -> Option<Value> {
    let mut labels = control.description.as_deref()?.splitn(2, ',');
    let value_off = labels.next()?;
    let value_on = labels.next()?;

    if label.eq_ignore_ascii_case(value_on) {
        Some(Value::Bool(true))
    } else if label.eq_ignore_ascii_case(value_off) {
        Some(Value::Bool(false))
    } else {
        None
    }
}

/// Textual form of an arbitrary state value: nulls become empty text,
/// objects and arrays their JSON form.
fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
