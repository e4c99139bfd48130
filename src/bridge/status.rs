//! Bridge Status Tracker.
//!
//! Mirrors the gateway's own state — connection, firmware version, log
//! stream, pairing flag — into one fixed status device, and exposes the
//! "Update devices" and "Permit join" user actions.

use super::{Bridge, WriteRule};
use crate::host::{ControlSpec, DeviceStore, Value};
use crate::mqtt::Command;
use crate::protocol::{
    ConnectionState, decode_connection_state, decode_gateway_info, decode_log,
    decode_permit_join_ack,
};
use log::{debug, warn};
use std::time::Duration;

/// Name of the fixed status device in the host store.
pub const STATUS_DEVICE: &str = "zigbee2mqtt";

const STATE: &str = "State";
const PERMIT_JOIN: &str = "Permit join";
const UPDATE_DEVICES: &str = "Update devices";
const VERSION: &str = "Version";
const LOG_LEVEL: &str = "Log level";
const LOG: &str = "Log";

impl<S: DeviceStore> Bridge<S> {
    /// Define the status device with its fixed control set.
    pub(crate) fn init_status_device(&mut self) {
        if !self.store.is_bridge_device(STATUS_DEVICE) {
            self.store.define_device(STATUS_DEVICE, "Zigbee2mqtt");
        }

        self.replace_control(STATUS_DEVICE, ControlSpec::text(STATE, true, ""), None);
        self.replace_control(
            STATUS_DEVICE,
            ControlSpec::switch(PERMIT_JOIN, false),
            Some(WriteRule::SetPermitJoin),
        );
        self.replace_control(
            STATUS_DEVICE,
            ControlSpec::pushbutton(UPDATE_DEVICES),
            Some(WriteRule::RefreshDevices),
        );
        self.replace_control(STATUS_DEVICE, ControlSpec::text(VERSION, true, ""), None);
        self.replace_control(STATUS_DEVICE, ControlSpec::text(LOG_LEVEL, true, ""), None);
        self.replace_control(STATUS_DEVICE, ControlSpec::text(LOG, true, ""), None);
    }

    pub(crate) fn handle_bridge_state(&mut self, payload: &str) {
        let state = decode_connection_state(payload);
        self.store
            .set_value(STATUS_DEVICE, STATE, Value::from(state.to_string()), false);

        if state == ConnectionState::Online {
            self.schedule_device_refresh();
        }
    }

    /// Fire-and-forget: request the device list once the gateway has had
    /// time to finish its own startup enumeration. There is no cancellation;
    /// a second online transition before the timer fires just queues a
    /// duplicate, idempotent request.
    fn schedule_device_refresh(&self) {
        let commands = self.commands.clone();
        let topic = format!("{}/bridge/devices/get", self.config.base_topic);
        let delay = Duration::from_secs(self.config.refresh_delay_secs);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("Requesting device list after reconnect");
            let _ = commands.send(Command::Publish {
                topic,
                payload: String::new(),
            });
        });
    }

    pub(crate) fn handle_bridge_log(&mut self, payload: &str) {
        if payload.is_empty() {
            return;
        }
        let record = decode_log(payload);
        self.store
            .set_value(STATUS_DEVICE, LOG, Value::from(record.message), false);
    }

    pub(crate) fn handle_bridge_info(&mut self, payload: &str) {
        if payload.is_empty() {
            return;
        }
        let info = match decode_gateway_info(payload) {
            Ok(info) => info,
            Err(e) => {
                warn!("Dropping malformed gateway info: {}", e);
                return;
            }
        };

        if let Some(version) = info.version.as_deref() {
            self.store
                .set_value(STATUS_DEVICE, VERSION, Value::from(version), false);
        }
        if let Some(level) = info.effective_log_level() {
            self.store
                .set_value(STATUS_DEVICE, LOG_LEVEL, Value::from(level), false);
        }
        if let Some(permit) = info.permit_join {
            self.store
                .set_value(STATUS_DEVICE, PERMIT_JOIN, Value::Bool(permit), false);
        }
    }

    /// Pairing mode is only reflected once the gateway confirms it; the
    /// user's own toggle is never applied optimistically.
    pub(crate) fn handle_permit_join_ack(&mut self, payload: &str) {
        if payload.is_empty() {
            return;
        }
        let Some(value) = decode_permit_join_ack(payload) else {
            debug!("Permit-join response without a value, ignoring");
            return;
        };
        self.store
            .set_value(STATUS_DEVICE, PERMIT_JOIN, Value::Bool(value), false);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{bridge, published};
    use super::*;
    use crate::bridge::BridgeEvent;
    use crate::host::{ControlChange, ControlType};

    #[test]
    fn test_status_device_control_set() {
        let (mut bridge, _rx) = bridge();
        bridge.init_status_device();

        let store = bridge.store();
        assert!(store.is_bridge_device(STATUS_DEVICE));
        assert_eq!(
            store.control_names(STATUS_DEVICE),
            vec![STATE, PERMIT_JOIN, UPDATE_DEVICES, VERSION, LOG_LEVEL, LOG]
        );
        assert_eq!(
            store.control(STATUS_DEVICE, PERMIT_JOIN).unwrap().kind,
            ControlType::Switch
        );
        assert!(store.control(STATUS_DEVICE, STATE).unwrap().readonly);
    }

    #[tokio::test(start_paused = true)]
    async fn test_online_transition_schedules_refresh() {
        let (mut bridge, mut rx) = bridge();
        bridge.init_status_device();
        bridge.handle_bridge_state("online");

        assert!(published(&mut rx).is_empty());

        // Paused time auto-advances past the 5s settle delay
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(
            published(&mut rx),
            vec![("zigbee2mqtt/bridge/devices/get".to_string(), String::new())]
        );
        assert_eq!(
            bridge.store().control(STATUS_DEVICE, STATE).unwrap().value,
            Value::Text("online".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_online_transition_requests_twice() {
        let (mut bridge, mut rx) = bridge();
        bridge.init_status_device();
        bridge.handle_bridge_state(r#"{"state":"online"}"#);
        bridge.handle_bridge_state(r#"{"state":"online"}"#);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(published(&mut rx).len(), 2);
    }

    #[test]
    fn test_offline_does_not_schedule_refresh() {
        let (mut bridge, mut rx) = bridge();
        bridge.init_status_device();
        bridge.handle_bridge_state("offline");

        assert!(published(&mut rx).is_empty());
        assert_eq!(
            bridge.store().control(STATUS_DEVICE, STATE).unwrap().value,
            Value::Text("offline".to_string())
        );
    }

    #[test]
    fn test_log_and_info_update_status_controls() {
        let (mut bridge, _rx) = bridge();
        bridge.init_status_device();

        bridge.handle_bridge_log(r#"{"level":"info","message":"joining disabled"}"#);
        bridge.handle_bridge_info(r#"{"version":"1.30.2","log_level":"debug"}"#);

        let store = bridge.store();
        assert_eq!(
            store.control(STATUS_DEVICE, LOG).unwrap().value,
            Value::Text("joining disabled".to_string())
        );
        assert_eq!(
            store.control(STATUS_DEVICE, VERSION).unwrap().value,
            Value::Text("1.30.2".to_string())
        );
        assert_eq!(
            store.control(STATUS_DEVICE, LOG_LEVEL).unwrap().value,
            Value::Text("debug".to_string())
        );
    }

    #[test]
    fn test_pairing_follows_ack_not_user_toggle() {
        let (mut bridge, mut rx) = bridge();
        bridge.init_status_device();

        // User enables pairing: a request goes out, the local flag stays put
        bridge.handle_event(BridgeEvent::ControlChanged(ControlChange {
            device: STATUS_DEVICE.to_string(),
            control: PERMIT_JOIN.to_string(),
            value: Value::Bool(true),
        }));
        assert_eq!(
            published(&mut rx),
            vec![(
                "zigbee2mqtt/bridge/request/permit_join".to_string(),
                r#"{"value":true}"#.to_string()
            )]
        );
        assert_eq!(
            bridge.store().control(STATUS_DEVICE, PERMIT_JOIN).unwrap().value,
            Value::Bool(false)
        );

        // The gateway's echo is what flips it
        bridge.handle_permit_join_ack(r#"{"data":{"value":true},"status":"ok"}"#);
        assert_eq!(
            bridge.store().control(STATUS_DEVICE, PERMIT_JOIN).unwrap().value,
            Value::Bool(true)
        );
        // And the echo itself publishes nothing back
        assert!(published(&mut rx).is_empty());
    }

    #[test]
    fn test_update_devices_button_requests_list() {
        let (mut bridge, mut rx) = bridge();
        bridge.init_status_device();

        bridge.handle_event(BridgeEvent::ControlChanged(ControlChange {
            device: STATUS_DEVICE.to_string(),
            control: UPDATE_DEVICES.to_string(),
            value: Value::Bool(true),
        }));
        assert_eq!(
            published(&mut rx),
            vec![("zigbee2mqtt/bridge/devices/get".to_string(), String::new())]
        );
    }
}
