/// CatalogCore — single-owner event loop for catalog mutations.
///
/// Runs embedded in the TUI process.  The UI never flips a favourite flag
/// itself: it sends a `CatalogEvent::ClientCommand` here, the store applies
/// and persists it, and the result is broadcast to every listener as
/// `BroadcastMessage::StateUpdated` (or `CommandFailed`).  Screens re-render
/// from the observed snapshot.
use std::sync::Arc;

use movie_proto::config::Config;
use movie_proto::error::StoreError;
use movie_proto::protocol::{Command, Movie};
use movie_proto::store::{default_movies, load_catalog, CatalogStore};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use crate::BroadcastMessage;

// ── CatalogEvent ──────────────────────────────────────────────────────────────

/// All inputs into the CatalogCore loop.
#[derive(Debug)]
pub enum CatalogEvent {
    /// A command from the TUI.
    ClientCommand(Command),
    /// Shutdown requested.
    Shutdown,
}

// ── CatalogCore ───────────────────────────────────────────────────────────────

pub struct CatalogCore {
    config: Config,
    store: Arc<CatalogStore>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
}

impl CatalogCore {
    pub fn new(
        config: Config,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
    ) -> anyhow::Result<Self> {
        let movies = load_movies(&config)?;
        let store = Arc::new(CatalogStore::new(
            config.catalog.favourites_file.clone(),
            movies,
        ));
        Ok(Self {
            config,
            store,
            broadcast_tx,
        })
    }

    /// Shared handle to the store (the App reads snapshots through it).
    pub fn store(&self) -> Arc<CatalogStore> {
        Arc::clone(&self.store)
    }

    /// Run the core event loop.  Returns when a `Shutdown` event is received
    /// or the event channel is closed (TUI exited).
    pub async fn run(self, mut event_rx: mpsc::Receiver<CatalogEvent>) -> anyhow::Result<()> {
        info!("CatalogCore: starting event loop");

        loop {
            match event_rx.recv().await {
                None => {
                    info!("CatalogCore: event channel closed, shutting down");
                    break;
                }

                Some(CatalogEvent::Shutdown) => {
                    info!("CatalogCore: shutdown requested");
                    break;
                }

                Some(CatalogEvent::ClientCommand(cmd)) => {
                    info!("CatalogCore: command {:?}", cmd);
                    let movie_id = cmd.movie_id().map(str::to_string);
                    if let Err(e) = self.handle_command(cmd).await {
                        error!("CatalogCore: command error: {}", e);
                        let _ = self.broadcast_tx.send(BroadcastMessage::CommandFailed {
                            movie_id,
                            reason: e.to_string(),
                        });
                    }
                    // The store may have reverted a flag; observers always
                    // re-read after a command.
                    let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
                }
            }
        }

        Ok(())
    }

    async fn handle_command(&self, cmd: Command) -> anyhow::Result<()> {
        match cmd {
            Command::ToggleFavourite { movie_id } => {
                let favoured = self.store.toggle_favourite(&movie_id).await?;
                info!("favourite {} -> {}", movie_id, favoured);
            }
            Command::SetFavourite { movie_id, favoured } => {
                self.store.set_favourite(&movie_id, favoured).await?;
            }
            Command::Reload => {
                let movies = load_catalog(&self.config.catalog.catalog_toml)?;
                info!("catalog reloaded: {} movies", movies.len());
                self.store.replace_movies(movies).await;
            }
        }
        Ok(())
    }
}

/// Configured catalog file, or the embedded catalog when it is missing or
/// unreadable.
pub fn load_movies(config: &Config) -> Result<Vec<Movie>, StoreError> {
    let path = &config.catalog.catalog_toml;
    match load_catalog(path) {
        Ok(movies) => {
            info!("Loaded {} movies (catalog {})", movies.len(), path.display());
            Ok(movies)
        }
        Err(e) => {
            warn!("Failed to load catalog {}: {}; using embedded", path.display(), e);
            default_movies()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movie_proto::config::CatalogConfig;
    use std::path::Path;

    fn config(dir: &Path) -> Config {
        Config {
            catalog: CatalogConfig {
                catalog_toml: dir.join("movies.toml"),
                favourites_file: dir.join("fav").join("favourites.json"),
            },
            ..Config::default()
        }
    }

    async fn start(
        cfg: Config,
    ) -> (
        Arc<CatalogStore>,
        mpsc::Sender<CatalogEvent>,
        broadcast::Receiver<BroadcastMessage>,
        tokio::task::JoinHandle<anyhow::Result<()>>,
    ) {
        let (btx, brx) = broadcast::channel(16);
        let (etx, erx) = mpsc::channel(16);
        let core = CatalogCore::new(cfg, btx).unwrap();
        let store = core.store();
        let handle = tokio::spawn(core.run(erx));
        (store, etx, brx, handle)
    }

    #[tokio::test]
    async fn test_toggle_broadcasts_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let (store, tx, mut rx, _h) = start(config(dir.path())).await;
        let id = store.get_state().await.movies[0].id.clone();

        tx.send(CatalogEvent::ClientCommand(Command::ToggleFavourite {
            movie_id: id.clone(),
        }))
        .await
        .unwrap();

        assert!(matches!(rx.recv().await.unwrap(), BroadcastMessage::StateUpdated));
        assert!(store.get_state().await.movie(&id).unwrap().favoured);
        assert!(dir.path().join("fav").join("favourites.json").exists());
    }

    #[tokio::test]
    async fn test_unknown_movie_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, tx, mut rx, _h) = start(config(dir.path())).await;

        tx.send(CatalogEvent::ClientCommand(Command::ToggleFavourite {
            movie_id: "nope".into(),
        }))
        .await
        .unwrap();

        match rx.recv().await.unwrap() {
            BroadcastMessage::CommandFailed { movie_id, reason } => {
                assert_eq!(movie_id.as_deref(), Some("nope"));
                assert!(reason.contains("nope"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(rx.recv().await.unwrap(), BroadcastMessage::StateUpdated));
    }

    #[tokio::test]
    async fn test_reload_reads_catalog_file_and_keeps_favourites() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        std::fs::write(
            &cfg.catalog.catalog_toml,
            "[[movie]]\nid = \"a\"\ntitle = \"A\"\n\n[[movie]]\nid = \"b\"\ntitle = \"B\"\n",
        )
        .unwrap();
        let (store, tx, mut rx, _h) = start(cfg.clone()).await;
        assert_eq!(store.get_state().await.movies.len(), 2);

        store.set_favourite("a", true).await.unwrap();
        std::fs::write(
            &cfg.catalog.catalog_toml,
            "[[movie]]\nid = \"a\"\ntitle = \"A\"\n\n[[movie]]\nid = \"c\"\ntitle = \"C\"\n",
        )
        .unwrap();
        tx.send(CatalogEvent::ClientCommand(Command::Reload))
            .await
            .unwrap();
        assert!(matches!(rx.recv().await.unwrap(), BroadcastMessage::StateUpdated));

        let state = store.get_state().await;
        let ids: Vec<_> = state.movies.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(state.movie("a").unwrap().favoured);
    }

    #[tokio::test]
    async fn test_broken_catalog_falls_back_to_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        std::fs::write(&cfg.catalog.catalog_toml, "not [ toml").unwrap();
        let movies = load_movies(&cfg).unwrap();
        assert_eq!(movies, default_movies().unwrap());
    }

    #[tokio::test]
    async fn test_shutdown_ends_loop() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, tx, _rx, handle) = start(config(dir.path())).await;
        tx.send(CatalogEvent::Shutdown).await.unwrap();
        assert!(handle.await.unwrap().is_ok());
    }
}
