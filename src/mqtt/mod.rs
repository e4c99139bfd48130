//! MQTT transport for gateway communication.

mod client;

pub use client::{MqttClient, MqttMessage};

use log::warn;
use rumqttc::{AsyncClient, QoS};
use tokio::sync::mpsc;

/// Outbound request queued by the bridge for the MQTT task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Publish { topic: String, payload: String },
    Subscribe { topic: String },
}

/// Drain bridge commands and execute them against the broker.
///
/// Runs until the command channel closes. Failures are logged and dropped;
/// the bridge neither retries nor correlates responses.
pub async fn run_commands(client: AsyncClient, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Publish { topic, payload } => {
                if let Err(e) = client
                    .publish(&topic, QoS::AtMostOnce, false, payload.as_bytes())
                    .await
                {
                    warn!("[MQTT] Failed to publish to {}: {:?}", topic, e);
                }
            }
            Command::Subscribe { topic } => {
                if let Err(e) = client.subscribe(&topic, QoS::AtMostOnce).await {
                    warn!("[MQTT] Failed to subscribe to {}: {:?}", topic, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::MqttOptions;

    #[test]
    fn test_run_commands_ends_when_channel_closes() {
        let (client, _event_loop) = AsyncClient::new(MqttOptions::new("test", "localhost", 1883), 10);
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(Command::Subscribe {
            topic: "zigbee2mqtt/bridge/state".to_string(),
        })
        .unwrap();
        drop(tx);

        // Queued commands drain into the client's request buffer, then the
        // closed channel terminates the pump
        tokio_test::block_on(run_commands(client, rx));
    }
}
