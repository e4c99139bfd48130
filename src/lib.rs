//! Virtual Zigbee Bridge library.
//!
//! Mirrors devices announced by a zigbee2mqtt gateway into a
//! home-automation controller's virtual device/control store, and relays
//! user commands back to the gateway over MQTT.

pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod mqtt;
pub mod protocol;
