//! `reelwatch-tracker` -- desktop video job tracker.
//!
//! Polls the job API for the configured scope, plays a sound and shows a
//! desktop notification when a video becomes ready for review, and accepts
//! control commands on stdin (see [`reelwatch_tracker::commands`]).
//! Configuration is read from the environment, see
//! [`TrackerConfig::from_env`].

use std::sync::Arc;

use anyhow::Context;
use reelwatch_client::{JobsApi, PushEnrollment};
use reelwatch_engine::{EngineConfig, JsonFileSettingsStore, TrackerEngine};
use reelwatch_events::{NotificationCenter, PermissionGate};
use reelwatch_tracker::commands::Command;
use reelwatch_tracker::config::{LogFormat, TrackerConfig};
use reelwatch_tracker::desktop::{
    CommandSoundPlayer, LoggingNotificationCenter, NotifySendCenter, TerminalBell,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = TrackerConfig::from_env().context("Invalid configuration")?;
    init_tracing(config.log_format);

    tracing::info!(
        api_url = %config.api_url,
        scope = %config.scope,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        settings_path = %config.settings_path.display(),
        "Starting reelwatch-tracker",
    );

    let mut api = JobsApi::new(&config.api_url, config.request_timeout)
        .context("Failed to create job API client")?;
    if let Some(token) = &config.api_token {
        api = api.with_token(token.clone());
    }
    let api = Arc::new(api);
    let push = Arc::new(PushEnrollment::new(api.clone(), config.push_token.clone()));

    let (center, gate): (Arc<dyn NotificationCenter>, Arc<dyn PermissionGate>) =
        if NotifySendCenter::is_available().await {
            let center = Arc::new(NotifySendCenter::new());
            (center.clone(), center)
        } else {
            tracing::warn!("notify-send not found, notifications will only be logged");
            let center = Arc::new(LoggingNotificationCenter);
            (center.clone(), center)
        };

    let mut builder = TrackerEngine::builder(api.clone(), api)
        .config(EngineConfig::default().with_poll_interval(config.poll_interval))
        .settings_store(Arc::new(JsonFileSettingsStore::new(&config.settings_path)))
        .notification_center(center)
        .permission_gate(gate)
        .push_registrar(push)
        .on_transition(|event| {
            tracing::debug!(job_id = %event.job_id, from = %event.from, to = %event.to, "Transition");
        });
    match CommandSoundPlayer::new(&config.sound_command) {
        Some(player) => builder = builder.sound_player(Arc::new(player)),
        None => tracing::warn!("REELWATCH_SOUND_COMMAND is empty, using the terminal bell"),
    }
    let engine = builder.sound_player(Arc::new(TerminalBell)).build().await;

    let settings = engine.settings();
    tracing::info!(
        sound = settings.sound_enabled,
        browser = settings.browser_enabled,
        push = settings.push_enabled,
        "Notification settings loaded",
    );

    if !engine.activate_key(&config.scope) {
        tracing::info!("No scope configured, polling is inactive until `scope <key>`");
    }

    let mut views = engine.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                tracing::debug!(
                    jobs = view.jobs.len(),
                    active = view.active_count,
                    limit = view.active_limit,
                    loading = view.loading,
                    "Jobs updated",
                );
                if let Some(error) = &view.error {
                    tracing::warn!(error = %error, "Initial job load failed");
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match Command::parse(&line) {
                    Ok(Some(command)) => command.execute(&engine).await,
                    Ok(None) => {}
                    Err(e) => tracing::warn!("{e}"),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin, commands disabled");
                    stdin_open = false;
                }
            },
        }
    }

    engine.shutdown().await;
    tracing::info!("reelwatch-tracker stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "reelwatch=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
