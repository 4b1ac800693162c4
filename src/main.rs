use color_eyre::{eyre::eyre, Result};
use gecko_eye::animation::{EyeAnimator, HeadlessRenderer, RunOutcome, SystemClock};
use gecko_eye::config::EyeConfig;
use gecko_eye::controller::DeviceHandle;
use gecko_eye::mapping::{DeviceInput, DeviceNormalizer, InputFeed, NetworkInput};
use gecko_eye::wearables::{ReceiverHandle, SyncPublisher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let path = EyeConfig::config_path();
    let mut config = EyeConfig::load_or_create(&path).await?;
    config
        .apply_env()
        .map_err(|e| eyre!("Invalid environment: {}", e))?;
    info!(
        "Starting with profile {} (demo: {})",
        config.default_profile, config.demo
    );

    let cancel = CancellationToken::new();
    let mut feeds: Vec<Box<dyn InputFeed + Send>> = Vec::new();

    let device_handle = if config.input.enabled {
        let normalizer = DeviceNormalizer::new(&config.input.bindings)
            .map_err(|e| eyre!("Invalid button bindings: {}", e))?;
        let (device_tx, device_rx) = mpsc::channel(config.input.queue_capacity);
        feeds.push(Box::new(DeviceInput::device(device_rx, normalizer)));
        Some(DeviceHandle::spawn(
            config.input.collector_settings(),
            device_tx,
            cancel.clone(),
        ))
    } else {
        info!("Local device input disabled");
        None
    };

    let network = config.network.clone();
    let rebind_interval = Duration::from_secs(network.rebind_interval_secs);
    let mut receivers = Vec::new();
    for (name, channel) in [("wearables", &network.wearables), ("sync", &network.sync)] {
        if !channel.enabled {
            info!("{} receiver disabled", name);
            continue;
        }
        let (message_tx, message_rx) = mpsc::channel(network.queue_capacity);
        feeds.push(Box::new(NetworkInput::network(message_rx)));
        receivers.push((
            name,
            ReceiverHandle::spawn(
                name,
                channel.clone(),
                rebind_interval,
                message_tx,
                cancel.clone(),
            ),
        ));
    }

    let sync_sender = network.publish_sync.then(|| {
        SyncPublisher::spawn(network.sync.clone(), network.queue_capacity, cancel.clone())
    });

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                ctrl_c_cancel.cancel();
            }
            Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
        }
    });

    // The animation loop blocks between frames, so it gets its own thread
    let animator_cancel = cancel.clone();
    let frames = tokio::task::spawn_blocking(move || {
        let renderer = HeadlessRenderer::new(&config.render);
        let profile = config.default_profile;
        let mut animator = EyeAnimator::new(
            config,
            profile,
            Arc::new(SystemClock::new()),
            Box::new(renderer),
            animator_cancel,
        );
        for feed in feeds {
            animator.add_feed(feed);
        }
        if let Some(sender) = sync_sender {
            animator.set_sync_sender(sender);
        }

        loop {
            match animator.run() {
                RunOutcome::Exit => break,
                RunOutcome::SwitchProfile(next) => animator.activate_profile(next),
            }
        }
        animator.frames_rendered()
    })
    .await
    .map_err(|e| eyre!("Animation task failed: {}", e))?;

    cancel.cancel();
    for (name, receiver) in &receivers {
        let status = receiver.status();
        info!(
            "{} receiver: {} messages, {} malformed, state {:?}",
            name, status.messages_received, status.malformed_dropped, status.connection_state
        );
    }
    if let Some(handle) = device_handle {
        handle.join().await;
    }

    info!("Stopped after {} frames", frames);
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| value.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
