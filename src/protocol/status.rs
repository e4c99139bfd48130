//! Gateway status, log and info decoding.
//!
//! Every decoder here tolerates both payload generations the gateway has
//! used: the older plain-string/`bridge/config` shapes and the newer
//! JSON-object/`bridge/info` shapes.

use serde::Deserialize;
use std::fmt;

/// Gateway connection state as reported on `bridge/state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Online,
    Offline,
    /// Anything the gateway reports that this bridge does not recognize.
    Other(String),
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Online => write!(f, "online"),
            ConnectionState::Offline => write!(f, "offline"),
            ConnectionState::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ConnectionState {
    fn from(s: &str) -> Self {
        match s {
            "online" => ConnectionState::Online,
            "offline" => ConnectionState::Offline,
            other => ConnectionState::Other(other.to_string()),
        }
    }
}

/// Decode a `bridge/state` payload.
///
/// Older gateways publish the bare string (`online`), newer ones a JSON
/// object (`{"state":"online"}`).
pub fn decode_connection_state(payload: &str) -> ConnectionState {
    #[derive(Deserialize)]
    struct StatePayload {
        state: String,
    }

    if let Ok(obj) = serde_json::from_str::<StatePayload>(payload) {
        return ConnectionState::from(obj.state.as_str());
    }
    ConnectionState::from(payload.trim())
}

/// One gateway log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Option<String>,
    pub message: String,
}

/// Decode a `bridge/log` / `bridge/logging` payload.
///
/// The legacy stream wraps the line as `{"type":...,"message":...}`, the
/// current one as `{"level":...,"message":...}`; anything unparseable is
/// taken as the raw log line itself.
pub fn decode_log(payload: &str) -> LogRecord {
    #[derive(Deserialize)]
    struct LogPayload {
        level: Option<String>,
        /// Level field name in the legacy stream.
        #[serde(rename = "type")]
        kind: Option<String>,
        message: serde_json::Value,
    }

    if let Ok(obj) = serde_json::from_str::<LogPayload>(payload) {
        let message = match obj.message {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        return LogRecord {
            level: obj.level.or(obj.kind),
            message,
        };
    }

    LogRecord {
        level: None,
        message: payload.to_string(),
    }
}

/// Gateway metadata from `bridge/config` (legacy) or `bridge/info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayInfo {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub permit_join: Option<bool>,
    #[serde(default)]
    config: Option<NestedConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct NestedConfig {
    #[serde(default)]
    advanced: Option<AdvancedConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AdvancedConfig {
    #[serde(default)]
    log_level: Option<String>,
}

impl GatewayInfo {
    /// Log level, wherever the reporting generation put it.
    pub fn effective_log_level(&self) -> Option<&str> {
        self.log_level
            .as_deref()
            .or_else(|| self.config.as_ref()?.advanced.as_ref()?.log_level.as_deref())
    }
}

/// Decode a `bridge/config` / `bridge/info` payload.
pub fn decode_gateway_info(payload: &str) -> crate::error::Result<GatewayInfo> {
    Ok(serde_json::from_str(payload)?)
}

/// Decode a `bridge/response/permit_join` acknowledgment.
///
/// The gateway has echoed the accepted value both bare (`{"value":true}`)
/// and wrapped (`{"data":{"value":true},"status":"ok"}`).
pub fn decode_permit_join_ack(payload: &str) -> Option<bool> {
    #[derive(Deserialize)]
    struct AckData {
        value: Option<bool>,
    }

    #[derive(Deserialize)]
    struct Ack {
        value: Option<bool>,
        data: Option<AckData>,
    }

    let ack: Ack = serde_json::from_str(payload).ok()?;
    ack.data.and_then(|d| d.value).or(ack.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_both_generations() {
        assert_eq!(decode_connection_state("online"), ConnectionState::Online);
        assert_eq!(decode_connection_state("offline"), ConnectionState::Offline);
        assert_eq!(
            decode_connection_state(r#"{"state":"online"}"#),
            ConnectionState::Online
        );
        assert_eq!(
            decode_connection_state(r#"{"state":"offline"}"#),
            ConnectionState::Offline
        );
        assert_eq!(
            decode_connection_state("starting"),
            ConnectionState::Other("starting".to_string())
        );
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Online.to_string(), "online");
        assert_eq!(
            ConnectionState::Other("starting".to_string()).to_string(),
            "starting"
        );
    }

    #[test]
    fn test_log_current_generation() {
        let rec = decode_log(r#"{"level":"info","message":"Zigbee: disabling joining"}"#);
        assert_eq!(rec.level.as_deref(), Some("info"));
        assert_eq!(rec.message, "Zigbee: disabling joining");
    }

    #[test]
    fn test_log_legacy_generation() {
        let rec = decode_log(r#"{"type":"device_connected","message":{"friendly_name":"0x1"}}"#);
        assert_eq!(rec.level.as_deref(), Some("device_connected"));
        assert_eq!(rec.message, r#"{"friendly_name":"0x1"}"#);
    }

    #[test]
    fn test_log_raw_line() {
        let rec = decode_log("Zigbee2MQTT started");
        assert_eq!(rec.level, None);
        assert_eq!(rec.message, "Zigbee2MQTT started");
    }

    #[test]
    fn test_gateway_info_legacy_config_blob() {
        let info =
            decode_gateway_info(r#"{"log_level":"debug","permit_join":false,"version":"1.13.0"}"#)
                .unwrap();
        assert_eq!(info.version.as_deref(), Some("1.13.0"));
        assert_eq!(info.effective_log_level(), Some("debug"));
        assert_eq!(info.permit_join, Some(false));
    }

    #[test]
    fn test_gateway_info_current_record() {
        let info = decode_gateway_info(
            r#"{"version":"1.30.2","permit_join":true,"config":{"advanced":{"log_level":"warn"}}}"#,
        )
        .unwrap();
        assert_eq!(info.version.as_deref(), Some("1.30.2"));
        assert_eq!(info.effective_log_level(), Some("warn"));
        assert_eq!(info.permit_join, Some(true));
    }

    #[test]
    fn test_permit_join_ack_both_shapes() {
        assert_eq!(decode_permit_join_ack(r#"{"value":true}"#), Some(true));
        assert_eq!(
            decode_permit_join_ack(r#"{"data":{"value":false},"status":"ok"}"#),
            Some(false)
        );
        assert_eq!(decode_permit_join_ack(r#"{"status":"error"}"#), None);
        assert_eq!(decode_permit_join_ack("garbage"), None);
    }
}
