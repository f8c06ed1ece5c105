use infrastructure::EventBus;
use settings::Settings;
use tokio_util::sync::CancellationToken;

use crate::security_system::{SecuritySystem, StatePoller};

mod alarm;
mod frontends;
mod security_system;
mod settings;

#[tokio::main(flavor = "current_thread")]
pub async fn main() {
    let settings = Settings::new().expect("Error reading configuration");

    let monitoring = settings.monitoring.init().expect("Error initializing monitoring");

    let result = run(settings).await;
    if let Err(e) = &result {
        tracing::error!("Bridge stopped with error: {:?}", e);
    }

    drop(monitoring);
    if result.is_err() {
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let mut mqtt_client = settings.mqtt.new_client();
    let state_events = EventBus::new(16);

    let security_system = SecuritySystem::new(
        &settings.accessory,
        settings.sector.new_client(),
        settings.sector.credentials(),
        settings.sector.code.clone(),
        state_events.emitter(),
    );

    let homebridge_runner = settings
        .homebridge
        .new_runner(&mut mqtt_client, &security_system, state_events.subscribe())
        .await?;

    let cancel = CancellationToken::new();
    let poller = StatePoller::new(settings.accessory.poll_interval());
    let polling = async {
        if security_system.is_polling() {
            poller.run(&security_system, cancel.clone()).await;
        } else {
            tracing::info!("Polling disabled, state is read on request");
            cancel.cancelled().await;
        }
    };

    tracing::info!("Starting main loop for {}", security_system.name());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Error waiting for shutdown signal: {:?}", e);
        }
        tracing::info!("Shutdown requested");
        cancel.cancel();
    };

    tokio::select!(
        _ = mqtt_client.run() => {},
        _ = homebridge_runner.run() => {},
        _ = async { tokio::join!(polling, shutdown) } => {},
    );

    Ok(())
}
