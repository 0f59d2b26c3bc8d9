use anyhow::Result;
use std::sync::Arc;

use drf_social_client::auth::{SessionManager, TokenTimestamp};
use drf_social_client::config::Config;
use drf_social_client::http_client::ApiClient;
use drf_social_client::navigation::History;
use drf_social_client::profiles::ProfileStore;
use drf_social_client::ui::{Document, NavBar};

mod shell;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Client starting against {}", config.base_url);
    tracing::debug!("State directory: {}", config.state_dir.display());

    let api = Arc::new(ApiClient::new(
        &config.base_url,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?);
    let timestamp = Arc::new(TokenTimestamp::load(config.timestamp_path()));
    let history = Arc::new(History::default());

    let session = Arc::new(SessionManager::new(
        api,
        timestamp,
        history.clone(),
        config.token_refresh_window,
    ));

    // Best effort: stay signed out if there is no session cookie
    if let Ok(user) = session.init().await {
        tracing::info!("Signed in as {}", user.username);
    }

    let profiles = Arc::new(ProfileStore::new(Arc::clone(&session)));
    let leaderboard_watcher = profiles.watch_session();

    let document = Arc::new(Document::new());
    let nav_node = document.create_element(Document::ROOT);
    let nav = NavBar::mount(&document, nav_node, Arc::clone(&session));

    let app = shell::App {
        session,
        profiles,
        nav,
        history,
    };

    let result = match command {
        Some(command) => app.run(command).await,
        None => app.run_shell().await,
    };

    leaderboard_watcher.abort();
    tracing::debug!("Shutdown complete");

    result
}
