//! Wire protocol for the zigbee2mqtt gateway.
//!
//! All inbound payloads are decoded here, once, at the boundary; the rest of
//! the pipeline works on typed records. The gateway has shipped several
//! incompatible topic/payload shapes over its lifetime, so the decoders
//! accept every generation still seen in the field.

mod devices;
mod status;

pub use devices::{Access, Definition, DeviceEntry, Expose, decode_device_list};
pub use status::{
    ConnectionState, GatewayInfo, LogRecord, decode_connection_state, decode_gateway_info,
    decode_log, decode_permit_join_ack,
};

/// Kind of gateway-level message, classified by topic under the base topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayTopic {
    /// `bridge/state` — connection state.
    State,
    /// `bridge/log` (legacy) or `bridge/logging` (current) — log stream.
    Log,
    /// `bridge/config` (legacy) or `bridge/info` (current) — gateway metadata.
    Info,
    /// `bridge/response/permit_join` — pairing-mode acknowledgment.
    PermitJoinAck,
    /// `bridge/devices` — full device-list snapshot.
    DeviceList,
    /// Anything else under `bridge/`.
    Other,
}

/// Classify a gateway-level topic. Returns `None` for topics outside the
/// base topic's `bridge/` subtree (per-device topics are routed separately
/// by subscription).
pub fn classify(base_topic: &str, topic: &str) -> Option<GatewayTopic> {
    let rest = topic
        .strip_prefix(base_topic)
        .and_then(|t| t.strip_prefix('/'))?;

    let kind = match rest {
        "bridge/state" => GatewayTopic::State,
        "bridge/log" | "bridge/logging" => GatewayTopic::Log,
        "bridge/config" | "bridge/info" => GatewayTopic::Info,
        "bridge/response/permit_join" => GatewayTopic::PermitJoinAck,
        "bridge/devices" => GatewayTopic::DeviceList,
        _ if rest.starts_with("bridge/") => GatewayTopic::Other,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_bridge_topics() {
        assert_eq!(
            classify("zigbee2mqtt", "zigbee2mqtt/bridge/state"),
            Some(GatewayTopic::State)
        );
        assert_eq!(
            classify("zigbee2mqtt", "zigbee2mqtt/bridge/log"),
            Some(GatewayTopic::Log)
        );
        assert_eq!(
            classify("zigbee2mqtt", "zigbee2mqtt/bridge/logging"),
            Some(GatewayTopic::Log)
        );
        assert_eq!(
            classify("zigbee2mqtt", "zigbee2mqtt/bridge/config"),
            Some(GatewayTopic::Info)
        );
        assert_eq!(
            classify("zigbee2mqtt", "zigbee2mqtt/bridge/info"),
            Some(GatewayTopic::Info)
        );
        assert_eq!(
            classify("zigbee2mqtt", "zigbee2mqtt/bridge/response/permit_join"),
            Some(GatewayTopic::PermitJoinAck)
        );
        assert_eq!(
            classify("zigbee2mqtt", "zigbee2mqtt/bridge/devices"),
            Some(GatewayTopic::DeviceList)
        );
        assert_eq!(
            classify("zigbee2mqtt", "zigbee2mqtt/bridge/extensions"),
            Some(GatewayTopic::Other)
        );
    }

    #[test]
    fn test_classify_rejects_other_trees() {
        assert_eq!(classify("zigbee2mqtt", "zigbee2mqtt/Kitchen Lamp"), None);
        assert_eq!(classify("zigbee2mqtt", "homeassistant/status"), None);
        assert_eq!(classify("zigbee2mqtt", "zigbee2mqtt"), None);
    }

    #[test]
    fn test_classify_honors_base_topic() {
        assert_eq!(
            classify("z2m", "z2m/bridge/state"),
            Some(GatewayTopic::State)
        );
        assert_eq!(classify("z2m", "zigbee2mqtt/bridge/state"), None);
    }
}
