//! Bridge core: event dispatch, write-rule table and topic routing.
//!
//! All gateway reconciliation happens here, one event at a time. The
//! components live in their own modules but share the [`Bridge`] context:
//! status tracking ([`status`]), device-list synchronization ([`registry`]),
//! capability mapping ([`mapper`]) and state coercion ([`state`]).

mod mapper;
mod registry;
mod state;
mod status;

pub use status::STATUS_DEVICE;

use crate::config::BridgeConfig;
use crate::host::{ControlChange, ControlSpec, DeviceStore};
use crate::mqtt::Command;
use crate::protocol::{self, GatewayTopic};
use log::{debug, warn};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// One unit of work for the bridge. Events are dispatched sequentially;
/// each handler runs to completion before the next event is looked at.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// Inbound MQTT message.
    Message { topic: String, payload: String },
    /// A user changed a control's value in the host store.
    ControlChanged(ControlChange),
}

/// Command-publishing rule bound to one writable control.
///
/// A rule exists for a control exactly when the control is not read-only;
/// [`Bridge::replace_control`] maintains that pairing.
#[derive(Debug, Clone)]
enum WriteRule {
    /// Publish the configured on/off domain label for the new boolean value.
    SetBinary {
        set_topic: String,
        property: String,
        value_on: String,
        value_off: String,
    },
    /// Publish the raw numeric value under the property key.
    SetNumber { set_topic: String, property: String },
    /// Publish the text value under the property key.
    SetText { set_topic: String, property: String },
    /// Advance the paired enum control to the next allowed value, wrapping
    /// to the first after the last.
    AdvanceEnum {
        set_topic: String,
        property: String,
        value_control: String,
        values: Vec<String>,
    },
    /// Ask the gateway for a fresh device-list snapshot.
    RefreshDevices,
    /// Ask the gateway to change pairing mode.
    SetPermitJoin,
}

/// The bridge context: host store handle, outbound command queue,
/// configuration, and the synchronization state (rule table plus state-topic
/// routing). One instance lives for the process lifetime.
pub struct Bridge<S: DeviceStore> {
    store: S,
    commands: mpsc::UnboundedSender<Command>,
    config: BridgeConfig,
    rules: HashMap<(String, String), WriteRule>,
    /// Per-device state topic → host device name.
    state_topics: HashMap<String, String>,
}

impl<S: DeviceStore> Bridge<S> {
    pub fn new(store: S, commands: mpsc::UnboundedSender<Command>, config: BridgeConfig) -> Self {
        Self {
            store,
            commands,
            config,
            rules: HashMap::new(),
            state_topics: HashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Define the status device and subscribe to the gateway's bridge
    /// topics (every generation's variants).
    pub fn start(&mut self) {
        self.init_status_device();

        for topic in [
            "bridge/state",
            "bridge/log",
            "bridge/logging",
            "bridge/config",
            "bridge/info",
            "bridge/response/permit_join",
            "bridge/devices",
        ] {
            self.subscribe(format!("{}/{}", self.config.base_topic, topic));
        }
    }

    pub fn handle_event(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::Message { topic, payload } => self.handle_message(&topic, &payload),
            BridgeEvent::ControlChanged(change) => self.handle_control_change(change),
        }
    }

    fn handle_message(&mut self, topic: &str, payload: &str) {
        // Per-device state topics are routed by subscription, not by shape
        if let Some(dev_name) = self.state_topics.get(topic).cloned() {
            self.handle_device_state(&dev_name, payload);
            return;
        }

        match protocol::classify(&self.config.base_topic, topic) {
            Some(GatewayTopic::State) => self.handle_bridge_state(payload),
            Some(GatewayTopic::Log) => self.handle_bridge_log(payload),
            Some(GatewayTopic::Info) => self.handle_bridge_info(payload),
            Some(GatewayTopic::PermitJoinAck) => self.handle_permit_join_ack(payload),
            Some(GatewayTopic::DeviceList) => self.handle_device_list(payload),
            Some(GatewayTopic::Other) | None => {
                debug!("Ignoring message on unhandled topic {}", topic);
            }
        }
    }

    fn handle_control_change(&mut self, change: ControlChange) {
        let key = (change.device.clone(), change.control.clone());
        let Some(rule) = self.rules.get(&key).cloned() else {
            debug!("No rule for control [{}/{}]", change.device, change.control);
            return;
        };

        match rule {
            WriteRule::SetBinary {
                set_topic,
                property,
                value_on,
                value_off,
            } => {
                let Some(on) = change.value.as_bool() else {
                    debug!("Non-boolean write to switch [{}]", change.control);
                    return;
                };
                let label = if on { value_on } else { value_off };
                self.publish(set_topic, single_key_object(&property, label.into()));
            }
            WriteRule::SetNumber {
                set_topic,
                property,
            } => {
                let Some(n) = change.value.as_number() else {
                    debug!("Non-numeric write to [{}]", change.control);
                    return;
                };
                let Some(n) = serde_json::Number::from_f64(n) else {
                    return;
                };
                self.publish(set_topic, single_key_object(&property, n.into()));
            }
            WriteRule::SetText {
                set_topic,
                property,
            } => {
                self.publish(
                    set_topic,
                    single_key_object(&property, change.value.to_string().into()),
                );
            }
            WriteRule::AdvanceEnum {
                set_topic,
                property,
                value_control,
                values,
            } => {
                let current = self
                    .store
                    .control(&change.device, &value_control)
                    .map(|c| c.value.to_string())
                    .unwrap_or_default();
                // Unknown current value restarts the cycle at the first option
                let next = match values.iter().position(|v| *v == current) {
                    Some(i) => (i + 1) % values.len(),
                    None => 0,
                };
                self.publish(
                    set_topic,
                    single_key_object(&property, values[next].clone().into()),
                );
            }
            WriteRule::RefreshDevices => {
                self.publish(
                    format!("{}/bridge/devices/get", self.config.base_topic),
                    String::new(),
                );
            }
            WriteRule::SetPermitJoin => {
                let value = change.value.as_bool().unwrap_or(false);
                self.publish(
                    format!("{}/bridge/request/permit_join", self.config.base_topic),
                    serde_json::json!({ "value": value }).to_string(),
                );
            }
        }
    }

    /// Replace a control and its write rule together, keeping the
    /// rule-iff-writable pairing intact. The previous control of the same
    /// name, if any, is discarded entirely.
    fn replace_control(&mut self, dev_name: &str, spec: ControlSpec, rule: Option<WriteRule>) {
        debug_assert_eq!(rule.is_some(), !spec.readonly);
        debug!("Adding {} control [{}/{}]", spec.kind, dev_name, spec.name);

        let key = (dev_name.to_string(), spec.name.clone());
        if self.store.has_control(dev_name, &spec.name) {
            self.store.remove_control(dev_name, &spec.name);
        }
        self.rules.remove(&key);

        self.store.add_control(dev_name, spec);
        if let Some(rule) = rule {
            self.rules.insert(key, rule);
        }
    }

    /// Drop every control and rule a device currently has.
    fn clear_device_controls(&mut self, dev_name: &str) {
        for name in self.store.control_names(dev_name) {
            self.store.remove_control(dev_name, &name);
        }
        self.rules.retain(|(device, _), _| device.as_str() != dev_name);
    }

    fn publish(&self, topic: String, payload: String) {
        if self
            .commands
            .send(Command::Publish { topic, payload })
            .is_err()
        {
            warn!("Command channel closed, dropping publish");
        }
    }

    fn subscribe(&self, topic: String) {
        if self.commands.send(Command::Subscribe { topic }).is_err() {
            warn!("Command channel closed, dropping subscribe");
        }
    }

    fn set_topic(&self, zb_name: &str) -> String {
        format!("{}/{}/set", self.config.base_topic, zb_name)
    }

    fn get_topic(&self, zb_name: &str) -> String {
        format!("{}/{}/get", self.config.base_topic, zb_name)
    }
}

/// `{"<key>": <value>}` — the single-key shape of gateway set/get commands.
fn single_key_object(key: &str, value: serde_json::Value) -> String {
    let mut obj = serde_json::Map::new();
    obj.insert(key.to_string(), value);
    serde_json::Value::Object(obj).to_string()
}
