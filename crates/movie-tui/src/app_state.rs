//! AppState — shared read-only data passed to all components during render/event.
//!
//! Components read this but never mutate it.  The App event loop is the only
//! writer.

use std::collections::HashMap;

use movie_proto::protocol::{CatalogState, Movie};
use movie_proto::route::Destination;

use crate::image::{ImageCache, ImageStatus};
use crate::intent::FavouriteHint;
use crate::widgets::status_bar::InputMode;

pub struct AppState {
    /// Last observed catalog snapshot.
    pub catalog: CatalogState,
    /// Top of the navigation stack.
    pub destination: Destination,
    pub breadcrumbs: Vec<&'static str>,
    pub input_mode: InputMode,
    /// Outstanding favourite toggles, keyed by movie id.
    pub favourite_hints: HashMap<String, FavouriteHint>,
    pub images: ImageCache,
    /// Advances every UI tick; drives spinners.
    pub frame_counter: usize,
}

impl AppState {
    pub fn new(images: ImageCache) -> Self {
        Self {
            catalog: CatalogState::default(),
            destination: Destination::Home,
            breadcrumbs: vec![Destination::Home.route().title()],
            input_mode: InputMode::Normal,
            favourite_hints: HashMap::new(),
            images,
            frame_counter: 0,
        }
    }

    pub fn movie(&self, id: &str) -> Option<&Movie> {
        self.catalog.movie(id)
    }

    pub fn favourite_hint(&self, movie_id: &str) -> Option<FavouriteHint> {
        self.favourite_hints.get(movie_id).copied()
    }

    pub fn image_status(&self, reference: Option<&str>) -> Option<&ImageStatus> {
        reference.and_then(|r| self.images.status(r))
    }
}
