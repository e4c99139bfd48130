use clap::Parser;
use log::info;
use tokio::signal;
use tokio::sync::mpsc;

use virtual_zigbee_bridge::bridge::{Bridge, BridgeEvent};
use virtual_zigbee_bridge::config::Config;
use virtual_zigbee_bridge::host::MemoryStore;
use virtual_zigbee_bridge::mqtt::{self, MqttClient};

/// Bridge zigbee2mqtt devices into a virtual device/control store.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// MQTT broker host
    #[arg(long, env = "MQTT_BROKER_HOST")]
    broker_host: Option<String>,

    /// MQTT broker port
    #[arg(long, env = "MQTT_BROKER_PORT")]
    broker_port: Option<u16>,

    /// Base topic the gateway publishes under
    #[arg(long, env = "ZIGBEE_BASE_TOPIC")]
    base_topic: Option<String>,

    /// Prefix prepended to created device names
    #[arg(long, env = "ZIGBEE_DEVICE_PREFIX")]
    device_prefix: Option<String>,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    virtual_zigbee_bridge::config::load_dotenv();
    init_logger();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(host) = cli.broker_host {
        config.mqtt.broker_host = host;
    }
    if let Some(port) = cli.broker_port {
        config.mqtt.broker_port = port;
    }
    if let Some(base_topic) = cli.base_topic {
        config.bridge.base_topic = base_topic;
    }
    if let Some(prefix) = cli.device_prefix {
        config.bridge.device_prefix = prefix;
    }

    info!("Starting Virtual Zigbee Bridge");
    info!(
        "  Broker: {}:{}",
        config.mqtt.broker_host, config.mqtt.broker_port
    );
    info!("  Base topic: {}", config.bridge.base_topic);

    // One event queue: MQTT messages and user control changes both land
    // here, and the bridge consumes them strictly one at a time
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<BridgeEvent>();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let store = MemoryStore::new();
    let change_tx = event_tx.clone();
    store.set_change_listener(Box::new(move |change| {
        let _ = change_tx.send(BridgeEvent::ControlChanged(change));
    }));

    let mqtt_client = MqttClient::new(&config.mqtt);
    let async_client = mqtt_client.client();

    let (msg_tx, mut msg_rx) = mpsc::channel(100);
    let mqtt_loop = tokio::spawn(async move {
        mqtt_client.run(msg_tx).await;
    });
    let command_pump = tokio::spawn(mqtt::run_commands(async_client, command_rx));
    let forwarder = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if event_tx
                .send(BridgeEvent::Message {
                    topic: msg.topic,
                    payload: msg.payload,
                })
                .is_err()
            {
                break;
            }
        }
    });

    let mut bridge = Bridge::new(store, command_tx, config.bridge);
    bridge.start();

    info!("Virtual Zigbee Bridge is running");
    info!("  - Press Ctrl+C to exit");

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                match event {
                    Some(event) => bridge.handle_event(event),
                    None => break,
                }
            }
            _ = signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    mqtt_loop.abort();
    command_pump.abort();
    forwarder.abort();

    info!("Virtual Zigbee Bridge stopped");
}
