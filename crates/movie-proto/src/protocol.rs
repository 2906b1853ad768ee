use serde::{Deserialize, Serialize};

/// Requests sent from the UI to the catalog core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    ToggleFavourite { movie_id: String },
    SetFavourite { movie_id: String, favoured: bool },
    /// Re-read the catalog file, keeping favourites.
    Reload,
}

impl Command {
    /// The movie a command targets, if any.
    pub fn movie_id(&self) -> Option<&str> {
        match self {
            Command::ToggleFavourite { movie_id } | Command::SetFavourite { movie_id, .. } => {
                Some(movie_id)
            }
            Command::Reload => None,
        }
    }
}

/// The observed catalog.  `rev` is a monotonically increasing counter
/// incremented every time the collection changes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogState {
    #[serde(default)]
    pub rev: u64,
    pub movies: Vec<Movie>,
}

impl CatalogState {
    pub fn movie(&self, id: &str) -> Option<&Movie> {
        self.movies.iter().find(|m| m.id == id)
    }

    pub fn favourites(&self) -> impl Iterator<Item = &Movie> {
        self.movies.iter().filter(|m| m.favoured)
    }

    pub fn favourite_count(&self) -> usize {
        self.favourites().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Movie {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub director: String,
    #[serde(default)]
    pub actors: String,
    #[serde(default)]
    pub plot: String,
    /// Image references (URLs or local paths), displayed one at a time.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub favoured: bool,
}

impl Movie {
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Image reference at `idx`, if the movie has one.
    pub fn image(&self, idx: usize) -> Option<&str> {
        self.images.get(idx).map(String::as_str)
    }

    /// Whitespace-separated terms must all appear in title, year, genre,
    /// director or actors (case-insensitive).
    pub fn matches(&self, query: &str) -> bool {
        if query.trim().is_empty() {
            return true;
        }
        let text = format!(
            "{} {} {} {} {}",
            self.title, self.year, self.genre, self.director, self.actors
        )
        .to_lowercase();
        query
            .to_lowercase()
            .split_whitespace()
            .all(|term| text.contains(term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avatar() -> Movie {
        Movie {
            id: "tt0499549".into(),
            title: "Avatar".into(),
            year: "2009".into(),
            genre: "Action, Adventure, Fantasy".into(),
            director: "James Cameron".into(),
            actors: "Sam Worthington, Zoe Saldana".into(),
            images: vec!["a.jpg".into(), "b.jpg".into()],
            ..Movie::default()
        }
    }

    #[test]
    fn test_command_json_tag() {
        let cmd = Command::ToggleFavourite {
            movie_id: "tt1".into(),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"cmd\":\"ToggleFavourite\""));
        assert_eq!(cmd.movie_id(), Some("tt1"));
        assert_eq!(Command::Reload.movie_id(), None);
    }

    #[test]
    fn test_movie_matches() {
        let m = avatar();
        assert!(m.matches(""));
        assert!(m.matches("cameron 2009"));
        assert!(m.matches("AVATAR"));
        assert!(!m.matches("cameron 1997"));
    }

    #[test]
    fn test_catalog_lookup() {
        let mut fav = avatar();
        fav.id = "tt2".into();
        fav.favoured = true;
        let state = CatalogState {
            rev: 1,
            movies: vec![avatar(), fav],
        };
        assert_eq!(state.movie("tt2").map(|m| m.favoured), Some(true));
        assert!(state.movie("nope").is_none());
        assert_eq!(state.favourite_count(), 1);
        assert_eq!(avatar().image(1), Some("b.jpg"));
        assert_eq!(avatar().image(2), None);
    }
}
