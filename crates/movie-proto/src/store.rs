use crate::error::StoreError;
use crate::protocol::{CatalogState, Movie};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Catalog shipped with the binary, used when no catalog file is configured.
const DEFAULT_CATALOG: &str = include_str!("../data/movies.toml");

/// What survives a restart: the set of favoured movie ids.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistentFavourites {
    #[serde(default)]
    pub favourites: BTreeSet<String>,
}

/// Owner of the observed movie collection and its favourite flags.
pub struct CatalogStore {
    state: RwLock<CatalogState>,
    favourites_file: PathBuf,
}

impl CatalogStore {
    pub fn new(favourites_file: PathBuf, mut movies: Vec<Movie>) -> Self {
        let persistent = Self::load_persistent(&favourites_file);
        for m in &mut movies {
            m.favoured = persistent.favourites.contains(&m.id);
        }

        Self {
            state: RwLock::new(CatalogState { rev: 1, movies }),
            favourites_file,
        }
    }

    pub async fn get_state(&self) -> CatalogState {
        self.state.read().await.clone()
    }

    pub async fn favourites(&self) -> Vec<Movie> {
        self.state.read().await.favourites().cloned().collect()
    }

    /// Flip the favourite flag of `movie_id` and persist.  Returns the new flag.
    ///
    /// If the favourites file cannot be written the flag is flipped back, so
    /// observers never see a value that would be lost on restart.
    pub async fn toggle_favourite(&self, movie_id: &str) -> Result<bool, StoreError> {
        let favoured = {
            let state = self.state.read().await;
            let movie = state
                .movie(movie_id)
                .ok_or_else(|| StoreError::UnknownMovie(movie_id.to_string()))?;
            !movie.favoured
        };
        self.set_favourite(movie_id, favoured).await?;
        Ok(favoured)
    }

    pub async fn set_favourite(&self, movie_id: &str, favoured: bool) -> Result<(), StoreError> {
        let previous = {
            let mut state = self.state.write().await;
            let movie = state
                .movies
                .iter_mut()
                .find(|m| m.id == movie_id)
                .ok_or_else(|| StoreError::UnknownMovie(movie_id.to_string()))?;
            let previous = movie.favoured;
            if previous == favoured {
                return Ok(());
            }
            movie.favoured = favoured;
            state.rev += 1;
            previous
        };

        if let Err(e) = self.save().await {
            warn!("favourites: persist failed for {}: {}", movie_id, e);
            let mut state = self.state.write().await;
            if let Some(movie) = state.movies.iter_mut().find(|m| m.id == movie_id) {
                movie.favoured = previous;
            }
            state.rev += 1;
            return Err(e);
        }
        debug!("favourites: {} -> {}", movie_id, favoured);
        Ok(())
    }

    /// Swap in a freshly loaded catalog, carrying favourite flags over by id.
    pub async fn replace_movies(&self, mut movies: Vec<Movie>) {
        let mut state = self.state.write().await;
        let favoured: HashSet<&str> = state
            .favourites()
            .map(|m| m.id.as_str())
            .collect();
        for m in &mut movies {
            m.favoured = favoured.contains(m.id.as_str());
        }
        state.movies = movies;
        state.rev += 1;
    }

    async fn save(&self) -> Result<(), StoreError> {
        let persistent = {
            let state = self.state.read().await;
            PersistentFavourites {
                favourites: state.favourites().map(|m| m.id.clone()).collect(),
            }
        };

        if let Some(parent) = self.favourites_file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StoreError::Persist)?;
        }

        let json = serde_json::to_string_pretty(&persistent)?;
        tokio::fs::write(&self.favourites_file, json)
            .await
            .map_err(StoreError::Persist)?;
        Ok(())
    }

    fn load_persistent(favourites_file: &Path) -> PersistentFavourites {
        if let Ok(content) = std::fs::read_to_string(favourites_file) {
            if let Ok(persistent) = serde_json::from_str::<PersistentFavourites>(&content) {
                return persistent;
            }
            warn!(
                "favourites: ignoring unreadable file {}",
                favourites_file.display()
            );
        }
        PersistentFavourites::default()
    }
}

// ── TOML catalog loader ───────────────────────────────────────────────────────

/// Intermediate struct that matches the TOML `[[movie]]` table.
/// Kept apart from `Movie` so the file never carries a `favoured` flag;
/// favourites live in their own file.
#[derive(Debug, serde::Deserialize)]
struct TomlCatalogFile {
    #[serde(default)]
    movie: Vec<TomlMovie>,
}

#[derive(Debug, serde::Deserialize)]
struct TomlMovie {
    id: String,
    title: String,
    #[serde(default)]
    year: String,
    #[serde(default)]
    genre: String,
    #[serde(default)]
    director: String,
    #[serde(default)]
    actors: String,
    #[serde(default)]
    plot: String,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    rating: f32,
}

pub fn load_movies_from_toml(path: &Path) -> Result<Vec<Movie>, StoreError> {
    let content = std::fs::read_to_string(path)?;
    parse_movies_from_toml_str(&content)
}

pub fn parse_movies_from_toml_str(content: &str) -> Result<Vec<Movie>, StoreError> {
    let file: TomlCatalogFile = toml::from_str(content)?;
    let mut seen = HashSet::new();
    let mut movies = Vec::with_capacity(file.movie.len());
    for m in file.movie {
        if !seen.insert(m.id.clone()) {
            return Err(StoreError::DuplicateId(m.id));
        }
        movies.push(Movie {
            id: m.id,
            title: m.title,
            year: m.year,
            genre: m.genre,
            director: m.director,
            actors: m.actors,
            plot: m.plot,
            images: m.images,
            rating: m.rating,
            favoured: false,
        });
    }
    Ok(movies)
}

/// The embedded catalog.
pub fn default_movies() -> Result<Vec<Movie>, StoreError> {
    parse_movies_from_toml_str(DEFAULT_CATALOG)
}

/// Load the configured catalog file, falling back to the embedded one when
/// the file does not exist.
pub fn load_catalog(path: &Path) -> Result<Vec<Movie>, StoreError> {
    if path.exists() {
        load_movies_from_toml(path)
    } else {
        debug!("catalog: {} not found, using embedded catalog", path.display());
        default_movies()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: &str) -> Movie {
        Movie {
            id: id.to_string(),
            title: format!("title {}", id),
            ..Movie::default()
        }
    }

    #[test]
    fn test_default_catalog_parses() {
        let movies = default_movies().unwrap();
        assert!(!movies.is_empty());
        assert!(movies.iter().all(|m| !m.images.is_empty()));
        assert!(movies.iter().all(|m| !m.favoured));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let toml = r#"
            [[movie]]
            id = "a"
            title = "A"
            [[movie]]
            id = "a"
            title = "Again"
        "#;
        match parse_movies_from_toml_str(toml) {
            Err(StoreError::DuplicateId(id)) => assert_eq!(id, "a"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_toggle_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favourites.json");

        let store = CatalogStore::new(path.clone(), vec![movie("a"), movie("b")]);
        let rev0 = store.get_state().await.rev;
        assert!(store.toggle_favourite("b").await.unwrap());
        let state = store.get_state().await;
        assert!(state.rev > rev0);
        assert_eq!(state.favourite_count(), 1);

        let reloaded = CatalogStore::new(path, vec![movie("a"), movie("b")]);
        let favs = reloaded.favourites().await;
        assert_eq!(favs.len(), 1);
        assert_eq!(favs[0].id, "b");

        assert!(!reloaded.toggle_favourite("b").await.unwrap());
        assert!(reloaded.favourites().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_movie() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("f.json"), vec![movie("a")]);
        assert!(matches!(
            store.toggle_favourite("zzz").await,
            Err(StoreError::UnknownMovie(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_persist_reverts_flag() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the write fail.
        let path = dir.path().join("favourites.json");
        std::fs::create_dir_all(&path).unwrap();

        let store = CatalogStore::new(path, vec![movie("a")]);
        let err = store.toggle_favourite("a").await.unwrap_err();
        assert!(matches!(err, StoreError::Persist(_)));
        assert_eq!(store.get_state().await.favourite_count(), 0);
    }

    #[tokio::test]
    async fn test_replace_keeps_favourites() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("f.json"), vec![movie("a"), movie("b")]);
        store.set_favourite("a", true).await.unwrap();
        store.replace_movies(vec![movie("c"), movie("a")]).await;
        let state = store.get_state().await;
        assert_eq!(state.movies.len(), 2);
        assert_eq!(state.movie("a").map(|m| m.favoured), Some(true));
        assert_eq!(state.movie("c").map(|m| m.favoured), Some(false));
    }
}
