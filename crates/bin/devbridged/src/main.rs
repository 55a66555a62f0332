//! # devbridged — device bridge daemon
//!
//! Composition root that wires all adapters together and runs the bridge.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Register every codec constructor in the factory
//! - Build one bridge per configured device, with the stock logging and
//!   canonical republish processors attached
//! - Start the gateway discoverers when enabled
//! - Start the MQTT transport (or the in-memory bus in dry-run mode) and
//!   run the supervisor loop
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no bridging logic belongs here.

mod config;

use std::sync::Arc;

use devbridge_adapter_mqtt_rumqttc::MqttTransport;
use devbridge_app::bridge::Bridge;
use devbridge_app::discovery::Discoverer;
use devbridge_app::factory::CodecFactory;
use devbridge_app::memory_bus::MemoryBus;
use devbridge_app::ports::{BusEvent, SharedBus};
use devbridge_app::processor::{
    AvailabilityLogger, AvailabilityPublisher, DeviceLogger, DiscoveryLogger, PropertyPublisher,
};
use devbridge_app::supervisor::Supervisor;
use tokio::sync::mpsc;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_new(
            &config.logging.filter,
        )?)
        .init();

    let mut factory = CodecFactory::new();
    devbridge_adapter_z2m::register_codecs(&mut factory);
    devbridge_adapter_tasmota::register_codecs(&mut factory);

    let transport = if config.dry_run {
        tracing::warn!("dry-run mode: outbound traffic is recorded, not sent");
        None
    } else {
        Some(Arc::new(MqttTransport::new(config.mqtt.clone())))
    };
    let bus: SharedBus = match &transport {
        Some(transport) => transport.clone(),
        None => Arc::new(MemoryBus::new()),
    };

    let mut supervisor = Supervisor::new(bus.clone());
    for entry in &config.devices {
        let codec = factory.create(entry.model, entry.protocol, &entry.codec_config()?)?;
        let mut bridge = Bridge::new(bus.clone(), codec);
        bridge.availability_processor_append(Box::new(AvailabilityLogger));
        bridge.availability_processor_append(Box::new(AvailabilityPublisher::new(
            config.canonical.base_topic.as_str(),
        )));
        for device in bridge.devices() {
            device.processor_append(Arc::new(DeviceLogger))?;
            device.processor_append(Arc::new(PropertyPublisher::new(
                config.canonical.base_topic.as_str(),
            )))?;
        }
        tracing::info!(
            device = entry.resolved_name(),
            model = %entry.model,
            protocol = %entry.protocol,
            "bridge configured"
        );
        supervisor.bridge_append(bridge);
    }

    if config.discovery.enabled {
        let mut zigbee = Discoverer::new(Box::new(devbridge_adapter_z2m::ZigbeeDiscoveryParser::new(
            config.discovery.zigbee_base_topic.as_str(),
        )));
        zigbee.processor_append(Box::new(DiscoveryLogger));
        supervisor.discoverer_append(zigbee);

        let mut tasmota =
            Discoverer::new(Box::new(devbridge_adapter_tasmota::TasmotaDiscoveryParser::new()));
        tasmota.processor_append(Box::new(DiscoveryLogger));
        supervisor.discoverer_append(tasmota);
    }

    let (events, receiver) = mpsc::channel(256);
    let pump = match &transport {
        Some(transport) => Some(transport.start(events.clone())),
        None => {
            // No broker to wait for; subscribe everything immediately.
            events
                .send(BusEvent::Connected)
                .await
                .map_err(|_| anyhow::anyhow!("event channel closed before startup"))?;
            None
        }
    };

    let supervisor_task = tokio::spawn(supervisor.run(receiver));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    if let Some(pump) = pump {
        pump.abort();
    }
    drop(events);
    supervisor_task.await?;

    Ok(())
}
