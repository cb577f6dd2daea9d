use acsgw::api::create_app;
use acsgw::config::{load_config_or_default, Secrets};
use acsgw::devlog::DeviceLog;
use acsgw::notify::{Notifier, NullNotifier, SlackNotifier};
use acsgw::relay::Relay;
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "acsgw=info".into()),
        )
        .init();

    info!("ACS gateway starting...");

    let config_path = std::env::var("ACSGW_CONFIG").unwrap_or_else(|_| "acsgw.toml".to_string());
    let config = load_config_or_default(&config_path)
        .map_err(|e| anyhow!("Failed to load config from {}: {}", config_path, e))?;

    info!(
        config = %config_path,
        bind = %config.server.bind,
        status_dir = %config.storage.status_dir.display(),
        main_door = %config.space.main_door,
        "Configuration loaded"
    );

    let secrets = Secrets::from_env();
    for name in secrets.missing() {
        warn!(variable = name, "Credential not set; requests needing it will be rejected");
    }
    info!(
        acs_users = secrets.acs_action_users.len(),
        cam_users = secrets.cam_action_users.len(),
        "Chat allow-lists loaded"
    );

    let notifier: Arc<dyn Notifier> = match (&secrets.slack_write_token, config.notify.enabled) {
        (Some(token), true) => {
            info!(channel = %config.notify.channel, "Chat notifications enabled");
            Arc::new(SlackNotifier::new(token.clone(), config.notify.clone()))
        }
        _ => {
            info!("Chat notifications disabled");
            Arc::new(NullNotifier)
        }
    };

    let relay = Arc::new(Relay::from_config(&config, notifier).context("Failed to initialize relay")?);
    info!(records = relay.status.read_all().len(), "Status records loaded");

    let device_log = Arc::new(DeviceLog::new(config.storage.log_dir.clone()));
    let app = create_app(relay, &secrets, device_log);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(bind = %config.server.bind, "ACS gateway listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("ACS gateway stopped");

    Ok(())
}
