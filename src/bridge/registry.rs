//! Device Registry Synchronizer.
//!
//! Consumes the gateway's full device-list snapshot and reconciles it
//! against the host store: missing devices are created, every announced
//! device's control set is rebuilt from its latest capability description,
//! and a state subscription is registered per device.

use super::{Bridge, single_key_object};
use crate::host::{ControlSpec, DeviceStore};
use crate::protocol::{Definition, DeviceEntry, decode_device_list};
use log::{debug, info, warn};

impl<S: DeviceStore> Bridge<S> {
    /// Apply one full device-list snapshot.
    ///
    /// Each entry is applied independently: a bad entry aborts nothing but
    /// itself. Devices absent from a later snapshot are deliberately never
    /// retired; the host store outlives gateway knowledge.
    pub(crate) fn handle_device_list(&mut self, payload: &str) {
        if payload.is_empty() {
            return;
        }

        let entries = match decode_device_list(payload) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Dropping malformed device list: {}", e);
                return;
            }
        };

        info!("Device list update started ({} entries)", entries.len());
        for entry in &entries {
            self.sync_device(entry);
        }
        info!("Device list update done");
    }

    fn sync_device(&mut self, entry: &DeviceEntry) {
        // The coordinator is the gateway itself; devices without a
        // definition have not been interviewed yet
        if entry.is_coordinator() {
            return;
        }
        let Some(definition) = &entry.definition else {
            return;
        };
        let Some(zb_name) = entry.stable_key() else {
            debug!("Skipping device entry without name or address");
            return;
        };

        let zb_name = zb_name.to_string();
        let dev_name = format!("{}{}", self.config.device_prefix, zb_name);

        // A same-named foreign entity is overwritten: the gateway's claim
        // on the name wins
        if !self.store.is_bridge_device(&dev_name) {
            self.store.define_device(&dev_name, &dev_name);
        }

        self.replace_capability_set(&zb_name, &dev_name, definition);
        self.track_device_state(&zb_name, &dev_name);
    }

    /// Swap the device's whole control set for the one declared by the
    /// latest capability description. The previous shape is discarded, not
    /// diffed; the description is authoritative and may change across
    /// gateway firmware versions.
    fn replace_capability_set(&mut self, zb_name: &str, dev_name: &str, definition: &Definition) {
        self.clear_device_controls(dev_name);

        for expose in &definition.exposes {
            // Values the device never publishes on its own have to be asked
            // for once, or their controls would stay empty forever
            if expose.access.is_only_retrievable()
                && let Some(property) = expose.property.as_deref()
            {
                self.publish(self.get_topic(zb_name), single_key_object(property, "".into()));
            }

            self.map_capability(zb_name, dev_name, expose);
        }

        for (name, text) in [
            ("vendor", definition.vendor.as_deref()),
            ("model", definition.model.as_deref()),
            ("description", definition.description.as_deref()),
        ] {
            self.replace_control(
                dev_name,
                ControlSpec::text(name, true, text.unwrap_or_default()),
                None,
            );
        }
    }

    /// Subscribe to the device's flat state topic. Idempotent across
    /// snapshots: re-announcing a device never stacks subscriptions.
    fn track_device_state(&mut self, zb_name: &str, dev_name: &str) {
        let topic = format!("{}/{}", self.config.base_topic, zb_name);
        if self.state_topics.contains_key(&topic) {
            return;
        }
        self.state_topics.insert(topic.clone(), dev_name.to_string());
        self.subscribe(topic);
    }
}
