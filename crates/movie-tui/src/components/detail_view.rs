//! DetailView component — the Detail screen for one movie.
//!
//! Shows the movie card (with its own row state) and a gallery listing every
//! image reference with its load status.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use movie_proto::protocol::Movie;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    image::ImageStatus,
    row::{CycleFired, CycleScheduler, RowState, RowTiming},
    theme::{C_ACCENT, C_IMAGE, C_MUTED, C_PRIMARY, C_SECONDARY, C_SELECTION_BG},
    widgets::{
        movie_card::{card_height, current_image, draw_card, ellipsize, CardHit, CardView},
        pane_chrome::pane_chrome,
        toast::spinner_glyph,
    },
};

pub struct DetailView {
    movie_id: Option<String>,
    row: Option<RowState>,
    gallery_selected: usize,
    timing: RowTiming,
    scheduler: Arc<dyn CycleScheduler>,
    rng: StdRng,
    card_hit: CardHit,
    /// First gallery row on screen, for click hit-testing.
    gallery_area: Rect,
    image_requests: Vec<String>,
}

impl DetailView {
    pub fn new(timing: RowTiming, scheduler: Arc<dyn CycleScheduler>) -> Self {
        Self {
            movie_id: None,
            row: None,
            gallery_selected: 0,
            timing,
            scheduler,
            rng: StdRng::from_entropy(),
            card_hit: CardHit::default(),
            gallery_area: Rect::default(),
            image_requests: Vec::new(),
        }
    }

    /// Point the screen at a movie id (or none).  Any previous row state is
    /// dropped, cancelling its timer.
    pub fn set_movie(&mut self, movie_id: Option<String>) {
        if self.movie_id == movie_id && self.row.is_some() {
            return;
        }
        self.row = movie_id
            .as_deref()
            .map(|id| RowState::new(id, self.timing));
        self.movie_id = movie_id;
        self.gallery_selected = 0;
        self.card_hit = CardHit::default();
        self.gallery_area = Rect::default();
    }

    pub fn movie_id(&self) -> Option<&str> {
        self.movie_id.as_deref()
    }

    pub fn row(&self) -> Option<&RowState> {
        self.row.as_ref()
    }

    fn movie<'a>(&self, state: &'a AppState) -> Option<&'a Movie> {
        self.movie_id.as_deref().and_then(|id| state.movie(id))
    }

    fn toggle_row(&mut self) {
        if let Some(row) = self.row.as_mut() {
            row.toggle(self.scheduler.as_ref());
        }
    }

    fn draw_gallery(&mut self, frame: &mut Frame, area: Rect, movie: &Movie, state: &AppState) {
        if area.height < 2 {
            return;
        }
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" images ({})", movie.image_count()),
                Style::default().fg(C_MUTED).add_modifier(Modifier::BOLD),
            )),
            Rect { height: 1, ..area },
        );
        self.gallery_area = Rect {
            y: area.y + 1,
            height: area.height - 1,
            ..area
        };
        if movie.images.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no images", Style::default().fg(C_MUTED))),
                self.gallery_area,
            );
            return;
        }

        let shown = self.row.as_ref().map(RowState::image_index).unwrap_or(0);
        let width = area.width as usize;
        let visible = self.gallery_area.height as usize;
        let offset = self.gallery_selected.saturating_sub(visible.saturating_sub(1));

        let mut lines = Vec::new();
        for (i, reference) in movie.images.iter().enumerate().skip(offset).take(visible) {
            let status = state.images.status(reference);
            if status.is_none() {
                self.image_requests.push(reference.clone());
            }
            let marker = if i == shown { "●" } else { " " };
            let (icon, text, color) = match status {
                None | Some(ImageStatus::Loading) => (
                    spinner_glyph(state.frame_counter),
                    reference.clone(),
                    C_MUTED,
                ),
                Some(ImageStatus::Ready(info)) => {
                    ("▣", format!("{}  {}", info.name, info.source), C_SECONDARY)
                }
                Some(ImageStatus::Failed(e)) => ("▨", e.to_string(), C_ACCENT),
            };
            let prefix = format!(" {} {:>2}. ", marker, i + 1);
            let text = ellipsize(&text, width.saturating_sub(prefix.chars().count() + 2));
            let row_style = if i == self.gallery_selected {
                Style::default().bg(C_SELECTION_BG)
            } else {
                Style::default()
            };
            lines.push(
                Line::from(vec![
                    Span::styled(prefix, Style::default().fg(C_PRIMARY)),
                    Span::styled(format!("{} ", icon), Style::default().fg(C_IMAGE)),
                    Span::styled(text, Style::default().fg(color)),
                ])
                .style(row_style),
            );
        }
        frame.render_widget(Paragraph::new(lines), self.gallery_area);
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

impl Component for DetailView {
    fn id(&self) -> ComponentId {
        ComponentId::DetailView
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let Some(movie) = self.movie(state) else {
            return vec![];
        };
        let count = movie.image_count();
        let id = movie.id.clone();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.gallery_selected = self.gallery_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.gallery_selected + 1 < count {
                    self.gallery_selected += 1;
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('e') => self.toggle_row(),
            KeyCode::Char('f') | KeyCode::Char('*') => {
                return vec![Action::ToggleFavourite(id)];
            }
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        let count = self.movie(state).map(Movie::image_count).unwrap_or(0);
        match event.kind {
            MouseEventKind::ScrollUp => {
                self.gallery_selected = self.gallery_selected.saturating_sub(1);
            }
            MouseEventKind::ScrollDown => {
                if self.gallery_selected + 1 < count {
                    self.gallery_selected += 1;
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let (col, row) = (event.column, event.row);
                if hit(self.card_hit.heart, col, row) {
                    if let Some(id) = self.movie_id.clone() {
                        return vec![Action::ToggleFavourite(id)];
                    }
                } else if hit(self.card_hit.header, col, row) {
                    self.toggle_row();
                } else if hit(self.gallery_area, col, row) {
                    let visible = self.gallery_area.height as usize;
                    let offset = self.gallery_selected.saturating_sub(visible.saturating_sub(1));
                    let target = offset + (row - self.gallery_area.y) as usize;
                    if target < count {
                        self.gallery_selected = target;
                    }
                }
            }
            _ => {}
        }
        vec![]
    }

    fn tick(&mut self, _state: &AppState) -> bool {
        self.row
            .as_ref()
            .map(|r| r.is_animating(Instant::now()))
            .unwrap_or(false)
    }

    fn on_cycle_fired(&mut self, fired: &CycleFired, state: &AppState) -> bool {
        let count = self.movie(state).map(Movie::image_count).unwrap_or(0);
        match self.row.as_mut() {
            Some(row) if row.key() == fired.row_key => {
                row.on_cycle_fired(fired.timer_id, count, &mut self.rng, self.scheduler.as_ref())
            }
            _ => false,
        }
    }

    fn on_catalog_updated(&mut self, state: &AppState) {
        let count = self.movie(state).map(Movie::image_count).unwrap_or(0);
        if let Some(row) = self.row.as_mut() {
            row.clamp_images(count);
        }
        if self.gallery_selected >= count {
            self.gallery_selected = count.saturating_sub(1);
        }
    }

    fn on_leave(&mut self) {
        self.row = None;
        self.movie_id = None;
        self.card_hit = CardHit::default();
        self.gallery_area = Rect::default();
    }

    fn take_image_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.image_requests)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let title = self
            .movie(state)
            .map(|m| m.title.clone())
            .unwrap_or_else(|| "detail".to_string());
        let block = pane_chrome(&title, focused, None, Some("esc back".to_string()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(movie) = self.movie(state) else {
            self.card_hit = CardHit::default();
            self.gallery_area = Rect::default();
            let msg = match self.movie_id.as_deref() {
                None => "  no movie selected".to_string(),
                Some(id) => format!("  movie not found: {}", id),
            };
            frame.render_widget(
                Paragraph::new(Span::styled(msg, Style::default().fg(C_MUTED))),
                inner,
            );
            return;
        };

        let expanded = self.row.as_ref().map(RowState::is_expanded).unwrap_or(false);
        let card_h = card_height(movie, expanded, inner.width).min(inner.height);
        let card_area = Rect {
            height: card_h,
            ..inner
        };
        let row = self.row.as_ref();
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
            selected: true,
            image,
            favourite: state.favourite_hint(&movie.id),
            frame_counter: state.frame_counter,
            now: Instant::now(),
        };
        self.card_hit = draw_card(frame, card_area, &view);

        let gallery = Rect {
            y: inner.y + card_h,
            height: inner.height - card_h,
            ..inner
        };
        self.draw_gallery(frame, gallery, movie, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageCache;
    use crate::row::tests::ManualScheduler;
    use movie_proto::protocol::CatalogState;
    use ratatui::crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn state() -> AppState {
        let (tx, _rx) = mpsc::channel(1);
        let mut s = AppState::new(ImageCache::new(tx));
        s.catalog = CatalogState {
            rev: 1,
            movies: vec![Movie {
                id: "tt0816692".into(),
                title: "Interstellar".into(),
                images: vec!["a.jpg".into(), "b.jpg".into(), "c.jpg".into()],
                ..Movie::default()
            }],
        };
        s
    }

    fn view(sched: &Arc<ManualScheduler>) -> DetailView {
        let scheduler: Arc<dyn CycleScheduler> = sched.clone();
        DetailView::new(RowTiming::default(), scheduler)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn render(v: &mut DetailView, s: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(50, 16)).unwrap();
        terminal
            .draw(|f| v.draw(f, Rect::new(0, 0, 50, 16), true, s))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..16 {
            for x in 0..50 {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_unknown_movie_renders_not_found() {
        let sched = Arc::new(ManualScheduler::default());
        let mut v = view(&sched);
        let s = state();
        v.set_movie(Some("tt_missing".into()));
        assert!(render(&mut v, &s).contains("movie not found: tt_missing"));

        v.set_movie(None);
        assert!(render(&mut v, &s).contains("no movie selected"));
        assert!(v.handle_key(key(KeyCode::Char('f')), &s).is_empty());
    }

    #[test]
    fn test_detail_card_and_gallery() {
        let sched = Arc::new(ManualScheduler::default());
        let mut v = view(&sched);
        let s = state();
        v.set_movie(Some("tt0816692".into()));
        let screen = render(&mut v, &s);
        assert!(screen.contains("Interstellar"));
        assert!(screen.contains("images (3)"));
        assert_eq!(v.take_image_requests().len(), 4, "card + three gallery rows");
    }

    #[test]
    fn test_expand_cycles_and_set_movie_cancels() {
        let sched = Arc::new(ManualScheduler::default());
        let mut v = view(&sched);
        let s = state();
        v.set_movie(Some("tt0816692".into()));
        v.handle_key(key(KeyCode::Char(' ')), &s);
        assert!(v.row().unwrap().has_pending_timer());

        let fired = CycleFired {
            row_key: "tt0816692".into(),
            timer_id: sched.last_id().unwrap(),
        };
        assert!(v.on_cycle_fired(&fired, &s));
        assert!(v.row().unwrap().image_index() < 3);

        v.set_movie(Some("other".into()));
        assert!(!v.row().unwrap().has_pending_timer());
        assert!(!v.on_cycle_fired(&fired, &s));

        v.on_leave();
        assert!(v.row().is_none());
    }

    #[test]
    fn test_gallery_keys_and_favourite() {
        let sched = Arc::new(ManualScheduler::default());
        let mut v = view(&sched);
        let s = state();
        v.set_movie(Some("tt0816692".into()));
        for _ in 0..5 {
            v.handle_key(key(KeyCode::Char('j')), &s);
        }
        assert_eq!(v.gallery_selected, 2);
        assert_eq!(
            v.handle_key(key(KeyCode::Char('f')), &s),
            vec![Action::ToggleFavourite("tt0816692".into())]
        );
    }
}
