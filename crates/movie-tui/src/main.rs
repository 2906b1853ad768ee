mod action;
mod app;
mod app_state;
mod component;
mod components;
mod core;
mod image;
mod intent;
mod navigation;
mod row;
mod theme;
mod widgets;

use tokio::sync::{broadcast, mpsc};

/// What the CatalogCore broadcasts to the TUI.
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    /// The catalog changed; receivers should fetch a snapshot from the store.
    StateUpdated,
    /// A command was rejected.  `movie_id` is set for favourite commands.
    CommandFailed {
        movie_id: Option<String>,
        reason: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = movie_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("reel.log");
    let ui_state_path = data_dir.join("ui_state.json");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("reel log: {}", log_path.display());

    tracing::info!("reel starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match movie_proto::config::Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("config: {}; using defaults", e);
            movie_proto::config::Config::default()
        }
    };

    // ── Broadcast channel (CatalogCore → TUI) ───────────────────────────────
    let (broadcast_tx, broadcast_rx) = broadcast::channel::<BroadcastMessage>(1024);

    // ── CatalogEvent channel (TUI → CatalogCore) ────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<core::CatalogEvent>(1024);

    // ── Build CatalogCore ────────────────────────────────────────────────────
    let catalog_core = core::CatalogCore::new(config.clone(), broadcast_tx.clone())?;
    let store = catalog_core.store();

    // ── Send initial state so movies appear immediately ─────────────────────
    let _ = broadcast_tx.send(BroadcastMessage::StateUpdated);

    // ── Spawn CatalogCore event loop ─────────────────────────────────────────
    tokio::spawn(async move {
        if let Err(e) = catalog_core.run(event_rx).await {
            tracing::error!("CatalogCore exited with error: {}", e);
        }
    });

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(store, event_tx, &config.ui, ui_state_path);
    app.run(broadcast_rx).await?;

    Ok(())
}
