//! MovieList component — the Home and Favourites screens.
//!
//! Each movie is drawn as a card (see `widgets::movie_card`).  The list owns
//! one `RowState` per expanded card; a row state is dropped, and its cycle
//! timer cancelled, as soon as its card is no longer drawn.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::Style,
    text::Span,
    widgets::Paragraph,
    Frame,
};
use tracing::debug;

use movie_proto::protocol::Movie;
use movie_proto::route::detail_path;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    row::{CycleFired, CycleScheduler, RowState, RowTiming},
    theme::{C_FAVOURITE, C_MUTED},
    widgets::{
        filter_input::{FilterAction, FilterInput},
        movie_card::{card_height, current_image, draw_card, CardHit, CardView},
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Every movie in the catalog.
    All,
    /// Only favoured movies.
    Favourites,
}

pub struct MovieList {
    mode: ListMode,
    pub list: ScrollableList<Movie>,
    pub filter_input: FilterInput,
    rows: HashMap<String, RowState>,
    timing: RowTiming,
    scheduler: Arc<dyn CycleScheduler>,
    rng: StdRng,
    /// Cards drawn last frame: (filtered position, areas).
    hits: Vec<(usize, CardHit)>,
    image_requests: Vec<String>,
}

impl MovieList {
    pub fn new(mode: ListMode, timing: RowTiming, scheduler: Arc<dyn CycleScheduler>) -> Self {
        Self {
            mode,
            list: ScrollableList::new(|movie: &Movie, q: &str| movie.matches(q)),
            filter_input: FilterInput::new("title, year, genre, director, actors…"),
            rows: HashMap::new(),
            timing,
            scheduler,
            rng: StdRng::from_entropy(),
            hits: Vec::new(),
            image_requests: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn mode(&self) -> ListMode {
        self.mode
    }

    /// Rebuild items from the catalog, keeping the cursor on the same movie.
    pub fn sync_movies(&mut self, state: &AppState) {
        let movies: Vec<Movie> = match self.mode {
            ListMode::All => state.catalog.movies.clone(),
            ListMode::Favourites => state.catalog.favourites().cloned().collect(),
        };
        let present: HashMap<&str, usize> = movies
            .iter()
            .map(|m| (m.id.as_str(), m.image_count()))
            .collect();
        self.rows.retain(|id, _| present.contains_key(id.as_str()));
        for (id, row) in self.rows.iter_mut() {
            if let Some(count) = present.get(id.as_str()) {
                row.clamp_images(*count);
            }
        }
        self.list.set_items_keeping(movies, |a, b| a.id == b.id);
    }

    pub fn selected_movie_id(&self) -> Option<String> {
        self.list.selected_item().map(|m| m.id.clone())
    }

    pub fn select_movie(&mut self, movie_id: &str) -> bool {
        self.list.select_where(|m| m.id == movie_id)
    }

    pub fn row(&self, movie_id: &str) -> Option<&RowState> {
        self.rows.get(movie_id)
    }

    pub fn is_filter_active(&self) -> bool {
        self.filter_input.is_active()
    }

    fn toggle_row(&mut self, movie_id: &str) {
        let timing = self.timing;
        let row = self
            .rows
            .entry(movie_id.to_string())
            .or_insert_with(|| RowState::new(movie_id, timing));
        row.toggle(self.scheduler.as_ref());
        debug!(
            "row {}: expanded={} pending={}",
            movie_id,
            row.is_expanded(),
            row.has_pending_timer()
        );
    }

    fn is_expanded(&self, movie_id: &str) -> bool {
        self.rows
            .get(movie_id)
            .map(RowState::is_expanded)
            .unwrap_or(false)
    }

    fn title(&self) -> &'static str {
        match self.mode {
            ListMode::All => "movies",
            ListMode::Favourites => "favourites",
        }
    }

    fn empty_message(&self, state: &AppState) -> &'static str {
        if !self.list.filter.is_empty() && self.list.total_len() > 0 {
            return "  no movies match filter";
        }
        match self.mode {
            ListMode::All if state.catalog.movies.is_empty() => "  catalog is empty",
            ListMode::All => "  no movies",
            ListMode::Favourites => "  no favourites yet, press f on a movie",
        }
    }
}

fn hit(r: Rect, col: u16, row: u16) -> bool {
    r.width > 0
        && r.height > 0
        && col >= r.x
        && col < r.x + r.width
        && row >= r.y
        && row < r.y + r.height
}

impl Component for MovieList {
    fn id(&self) -> ComponentId {
        match self.mode {
            ListMode::All => ComponentId::HomeList,
            ListMode::Favourites => ComponentId::FavouritesList,
        }
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }

        // Filter mode input
        if self.filter_input.is_active() {
            match key.code {
                KeyCode::Up => {
                    self.list.select_up(1);
                    return vec![];
                }
                KeyCode::Down => {
                    self.list.select_down(1);
                    return vec![];
                }
                _ => {}
            }
            return match self.filter_input.handle_key(key) {
                FilterAction::Changed(q) => {
                    self.list.set_filter(&q);
                    vec![]
                }
                FilterAction::Confirmed => vec![Action::CloseFilter],
                FilterAction::Cancelled => {
                    self.list.set_filter("");
                    vec![Action::CloseFilter]
                }
                FilterAction::None => vec![],
            };
        }

        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            5
        } else {
            1
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(step),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(step),
            KeyCode::PageUp => self.list.select_up(5),
            KeyCode::PageDown => self.list.select_down(5),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),

            KeyCode::Char(' ') | KeyCode::Char('e') => {
                if let Some(id) = self.selected_movie_id() {
                    self.toggle_row(&id);
                }
            }
            KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
                if let Some(id) = self.selected_movie_id() {
                    return vec![Action::Navigate(detail_path(&id))];
                }
            }
            KeyCode::Char('f') | KeyCode::Char('*') => {
                if let Some(id) = self.selected_movie_id() {
                    return vec![Action::ToggleFavourite(id)];
                }
            }
            KeyCode::Char('/') => {
                self.filter_input.activate();
                return vec![Action::OpenFilter];
            }
            KeyCode::Esc if !self.list.filter.is_empty() => {
                self.filter_input.clear();
                self.list.set_filter("");
            }
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                let (col, row) = (event.column, event.row);
                let Some((pos, card)) = self
                    .hits
                    .iter()
                    .find(|(_, h)| hit(h.card, col, row))
                    .copied()
                else {
                    return vec![];
                };
                self.list.select_position(pos);
                let Some(id) = self.selected_movie_id() else {
                    return vec![];
                };
                if hit(card.heart, col, row) {
                    return vec![Action::ToggleFavourite(id)];
                }
                if hit(card.header, col, row) {
                    self.toggle_row(&id);
                    return vec![];
                }
                return vec![Action::Navigate(detail_path(&id))];
            }
            _ => {}
        }
        vec![]
    }

    fn tick(&mut self, _state: &AppState) -> bool {
        let now = Instant::now();
        self.rows.values().any(|r| r.is_animating(now))
    }

    fn on_cycle_fired(&mut self, fired: &CycleFired, _state: &AppState) -> bool {
        let Some(row) = self.rows.get_mut(&fired.row_key) else {
            return false;
        };
        let count = self
            .list
            .items
            .iter()
            .find(|m| m.id == fired.row_key)
            .map(Movie::image_count)
            .unwrap_or(0);
        row.on_cycle_fired(fired.timer_id, count, &mut self.rng, self.scheduler.as_ref())
    }

    fn on_catalog_updated(&mut self, state: &AppState) {
        self.sync_movies(state);
    }

    fn on_leave(&mut self) {
        if !self.rows.is_empty() {
            debug!("{}: dropping {} row states", self.title(), self.rows.len());
        }
        self.rows.clear();
        self.hits.clear();
    }

    fn take_image_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.image_requests)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let badge_text;
        let badge = match self.mode {
            ListMode::Favourites => {
                badge_text = format!("♥ {}", self.list.total_len());
                Some(Badge {
                    text: &badge_text,
                    color: C_FAVOURITE,
                })
            }
            ListMode::All => None,
        };
        let footer = (!self.list.is_empty())
            .then(|| format!("{}/{}", self.list.selected + 1, self.list.len()));
        let block = pane_chrome(self.title(), focused, badge, footer);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        self.hits.clear();

        let mut content = inner;
        if self.filter_input.is_active() && inner.height > 1 {
            content.height -= 1;
            let filter_area = Rect {
                y: inner.y + inner.height - 1,
                height: 1,
                ..inner
            };
            self.filter_input
                .draw(frame, filter_area, self.list.len(), self.list.total_len());
        }

        if self.list.is_empty() {
            self.rows.clear();
            frame.render_widget(
                Paragraph::new(Span::styled(
                    self.empty_message(state),
                    Style::default().fg(C_MUTED),
                )),
                content,
            );
            return;
        }

        // ── Layout: variable-height cards, keep the selection on screen ──
        let width = content.width;
        let heights: Vec<u16> = (0..self.list.len())
            .map(|pos| match self.list.item_at(pos) {
                Some(m) => card_height(m, self.is_expanded(&m.id), width),
                None => 0,
            })
            .collect();
        self.list
            .ensure_visible_by(content.height as usize, |pos| heights[pos] as usize);

        let now = Instant::now();
        let bottom = content.y + content.height;
        let mut y = content.y;
        let mut visible: HashSet<String> = HashSet::new();

        for pos in self.list.scroll_offset..self.list.len() {
            if y >= bottom {
                break;
            }
            let Some(movie) = self.list.item_at(pos) else {
                break;
            };
            let card_area = Rect {
                x: content.x,
                y,
                width,
                height: heights[pos].min(bottom - y),
            };
            y = y.saturating_add(heights[pos]);

            let row = self.rows.get(&movie.id);
            let reference = current_image(movie, row);
            let image = state.image_status(reference);
            if image.is_none() {
                if let Some(r) = reference {
                    self.image_requests.push(r.to_string());
                }
            }
            let view = CardView {
                movie,
                row,
                selected: pos == self.list.selected,
                image,
                favourite: state.favourite_hint(&movie.id),
                frame_counter: state.frame_counter,
                now,
            };
            let card_hit = draw_card(frame, card_area, &view);
            self.hits.push((pos, card_hit));
            visible.insert(movie.id.clone());
        }

        // Rows scrolled out of view are disposed.
        self.rows.retain(|id, _| visible.contains(id));
    }
}
