//! In-memory device store.
//!
//! Stands in for the host runtime's store when the bridge runs on its own,
//! and backs the unit tests. Thread-safe so store handles can be read from
//! other tasks, though the bridge itself only writes from its event loop.

use super::store::{ChangeListener, ControlChange, ControlSpec, DeviceStore, Value};
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;

struct DeviceRecord {
    title: String,
    /// False for entities that pre-exist the bridge (seeded by the host).
    bridge_owned: bool,
    /// Insertion-ordered control names; the specs hold the current values.
    order: Vec<String>,
    controls: HashMap<String, ControlSpec>,
}

/// In-process implementation of [`DeviceStore`].
pub struct MemoryStore {
    devices: RwLock<HashMap<String, DeviceRecord>>,
    listener: RwLock<Option<ChangeListener>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            listener: RwLock::new(None),
        }
    }

    /// Register the callback invoked on notifying value writes.
    pub fn set_change_listener(&self, listener: ChangeListener) {
        *self.listener.write() = Some(listener);
    }

    /// Seed an entity that does not belong to the bridge, as the host
    /// runtime would for its own devices.
    pub fn seed_foreign_device(&self, id: &str, title: &str) {
        self.devices.write().insert(
            id.to_string(),
            DeviceRecord {
                title: title.to_string(),
                bridge_owned: false,
                order: Vec::new(),
                controls: HashMap::new(),
            },
        );
    }

    pub fn device_title(&self, id: &str) -> Option<String> {
        self.devices.read().get(id).map(|d| d.title.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceStore for MemoryStore {
    fn define_device(&self, id: &str, title: &str) {
        debug!("defining device [{}]", id);
        self.devices.write().insert(
            id.to_string(),
            DeviceRecord {
                title: title.to_string(),
                bridge_owned: true,
                order: Vec::new(),
                controls: HashMap::new(),
            },
        );
    }

    fn has_device(&self, id: &str) -> bool {
        self.devices.read().contains_key(id)
    }

    fn is_bridge_device(&self, id: &str) -> bool {
        self.devices.read().get(id).is_some_and(|d| d.bridge_owned)
    }

    fn control_names(&self, device: &str) -> Vec<String> {
        self.devices
            .read()
            .get(device)
            .map(|d| d.order.clone())
            .unwrap_or_default()
    }

    fn has_control(&self, device: &str, control: &str) -> bool {
        self.devices
            .read()
            .get(device)
            .is_some_and(|d| d.controls.contains_key(control))
    }

    fn add_control(&self, device: &str, spec: ControlSpec) {
        let mut devices = self.devices.write();
        let Some(record) = devices.get_mut(device) else {
            debug!("add_control on unknown device [{}]", device);
            return;
        };
        if !record.controls.contains_key(&spec.name) {
            record.order.push(spec.name.clone());
        }
        record.controls.insert(spec.name.clone(), spec);
    }

    fn remove_control(&self, device: &str, control: &str) {
        let mut devices = self.devices.write();
        if let Some(record) = devices.get_mut(device) {
            record.controls.remove(control);
            record.order.retain(|name| name != control);
        }
    }

    fn control(&self, device: &str, control: &str) -> Option<ControlSpec> {
        self.devices
            .read()
            .get(device)
            .and_then(|d| d.controls.get(control))
            .cloned()
    }

    fn set_value(&self, device: &str, control: &str, value: Value, notify: bool) {
        {
            let mut devices = self.devices.write();
            let Some(spec) = devices.get_mut(device).and_then(|d| d.controls.get_mut(control))
            else {
                debug!("set_value on unknown control [{}/{}]", device, control);
                return;
            };
            spec.value = value.clone();
        }

        if notify
            && let Some(listener) = self.listener.read().as_ref()
        {
            listener(ControlChange {
                device: device.to_string(),
                control: control.to_string(),
                value,
            });
        }
    }
}
