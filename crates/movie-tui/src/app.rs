//! App — component-based event loop.
//!
//! Architecture:
//! - `App` owns the screens, the navigation host and `AppState` (shared
//!   read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background
//!   tasks: terminal input, catalog broadcasts, row timers, image loads.
//! - The event loop draws each frame, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Commands to the catalog core flow out through `cmd_tx`.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use movie_proto::config::UiConfig;
use movie_proto::protocol::{CatalogState, Command};
use movie_proto::route::{Destination, Route};
use movie_proto::store::CatalogStore;

use crate::core::CatalogEvent;
use crate::BroadcastMessage;

use crate::{
    action::Action,
    app_state::AppState,
    component::Component,
    components::{
        detail_view::DetailView,
        help_overlay::HelpOverlay,
        movie_list::{ListMode, MovieList},
    },
    image::{ImageCache, ImageResolved},
    intent::FavouriteIntents,
    navigation::NavHost,
    row::{CycleFired, CycleScheduler, RowTiming, TokioCycleScheduler},
    widgets::{
        status_bar::{self, InputMode},
        toast::{Severity, ToastManager},
    },
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    StateUpdated(CatalogState),
    CommandFailed {
        movie_id: Option<String>,
        reason: String,
    },
    /// An expanded row's image-cycle delay elapsed.
    CycleFired(CycleFired),
    ImageResolved(ImageResolved),
}

// ── Persistence serde structs ─────────────────────────────────────────────────

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
struct UiSessionState {
    /// Path of the screen on top of the back stack.
    #[serde(default)]
    path: String,
    #[serde(default)]
    selected_movie_id: Option<String>,
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    state: AppState,
    nav: NavHost,

    // Screens
    home: MovieList,
    favourites: MovieList,
    detail: DetailView,
    help_overlay: HelpOverlay,

    toast: ToastManager,
    intents: FavouriteIntents,

    store: Arc<CatalogStore>,
    cmd_tx: mpsc::Sender<CatalogEvent>,
    cycle_rx: Option<mpsc::Receiver<CycleFired>>,
    image_rx: Option<mpsc::Receiver<ImageResolved>>,

    show_keys_bar: bool,
    /// Body area of the last frame; mouse events are routed into it.
    screen_area: Rect,
    /// Movie to re-select once the first catalog snapshot arrives.
    pending_selection: Option<String>,
    reload_pending: bool,
    ui_state_path: PathBuf,
    should_quit: bool,
}

impl App {
    pub fn new(
        store: Arc<CatalogStore>,
        cmd_tx: mpsc::Sender<CatalogEvent>,
        ui: &UiConfig,
        ui_state_path: PathBuf,
    ) -> Self {
        let (cycle_tx, cycle_rx) = mpsc::channel::<CycleFired>(256);
        let (image_tx, image_rx) = mpsc::channel::<ImageResolved>(256);
        let scheduler: Arc<dyn CycleScheduler> = TokioCycleScheduler::new(cycle_tx);
        let timing = RowTiming::from(ui);

        let mut app = Self {
            state: AppState::new(ImageCache::new(image_tx)),
            nav: NavHost::new(),
            home: MovieList::new(ListMode::All, timing, Arc::clone(&scheduler)),
            favourites: MovieList::new(ListMode::Favourites, timing, Arc::clone(&scheduler)),
            detail: DetailView::new(timing, scheduler),
            help_overlay: HelpOverlay::new(),
            toast: ToastManager::new(),
            intents: FavouriteIntents::new(),
            store,
            cmd_tx,
            cycle_rx: Some(cycle_rx),
            image_rx: Some(image_rx),
            show_keys_bar: ui.show_keys_bar,
            screen_area: Rect::default(),
            pending_selection: None,
            reload_pending: false,
            ui_state_path,
            should_quit: false,
        };

        // Restore the last screen and selection
        let session = load_ui_session_state(&app.ui_state_path);
        if !session.path.is_empty() {
            app.nav.restore(&session.path);
        }
        app.pending_selection = session.selected_movie_id;
        app.sync_destination();
        info!("session restored at {}", app.nav.current_path());

        app
    }

    pub async fn run(
        mut self,
        mut broadcast_rx: broadcast::Receiver<BroadcastMessage>,
    ) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (CatalogCore → AppMessage) ─────
        let bc_tx = tx.clone();
        let bc_store = Arc::clone(&self.store);
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(msg) => {
                        let app_msg = match msg {
                            BroadcastMessage::StateUpdated => {
                                AppMessage::StateUpdated(bc_store.get_state().await)
                            }
                            BroadcastMessage::CommandFailed { movie_id, reason } => {
                                AppMessage::CommandFailed { movie_id, reason }
                            }
                        };
                        if bc_tx.send(app_msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("broadcast receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // ── Background tasks: row timers and image loads ──────────────────────
        if let Some(mut cycle_rx) = self.cycle_rx.take() {
            let cycle_tx = tx.clone();
            tokio::spawn(async move {
                while let Some(fired) = cycle_rx.recv().await {
                    if cycle_tx.send(AppMessage::CycleFired(fired)).await.is_err() {
                        break;
                    }
                }
            });
        }
        if let Some(mut image_rx) = self.image_rx.take() {
            let image_tx = tx.clone();
            tokio::spawn(async move {
                while let Some(resolved) = image_rx.recv().await {
                    if image_tx.send(AppMessage::ImageResolved(resolved)).await.is_err() {
                        break;
                    }
                }
            });
        }

        // ── Periodic timers ───────────────────────────────────────────────────
        // Toast expiry + intent timeouts + spinner animation
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Arrow rotation and loader spinners.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(50));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
                self.request_images();
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    const MAX_DRAIN: usize = 256;
                    let mut redraw = self.handle_message(msg).await;
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok(next) = rx.try_recv() else {
                            break;
                        };
                        drained += 1;
                        redraw |= self.handle_message(next).await;
                    }
                    needs_redraw = redraw;
                }

                _ = ui_tick.tick() => {
                    self.state.frame_counter = self.state.frame_counter.wrapping_add(1);
                    let animating = match self.state.destination.route() {
                        Route::Home => self.home.tick(&self.state),
                        Route::Favourites => self.favourites.tick(&self.state),
                        Route::Detail => self.detail.tick(&self.state),
                    };
                    needs_redraw = animating
                        || self.state.images.is_loading()
                        || !self.intents.is_empty();
                }

                _ = toast_tick.tick() => {
                    let had_toasts = !self.toast.is_empty();
                    self.toast.tick();
                    for id in self.intents.tick() {
                        let title = self
                            .state
                            .movie(&id)
                            .map(|m| m.title.clone())
                            .unwrap_or_else(|| id.clone());
                        warn!("favourite intent for {} timed out", id);
                        self.toast.error(format!("favourite not confirmed: {}", title));
                    }
                    self.state.favourite_hints = self.intents.hints();
                    needs_redraw = had_toasts || !self.toast.is_empty();
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        self.save_ui_session_state();
        let _ = self.cmd_tx.send(CatalogEvent::Shutdown).await;
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        Ok(())
    }

    /// Returns `true` if a redraw is needed.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        return false;
                    }
                    let actions = self.handle_key(key);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                }
                Event::Mouse(mouse) => {
                    let actions = self.handle_mouse(mouse);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                }
                Event::Resize(w, h) => {
                    self.dispatch(Action::Resize(w, h)).await;
                }
                _ => return false,
            },

            AppMessage::StateUpdated(catalog) => {
                self.on_state_updated(catalog);
            }

            AppMessage::CommandFailed { movie_id, reason } => {
                self.on_command_failed(movie_id, reason);
            }

            AppMessage::CycleFired(fired) => {
                let s = &self.state;
                let changed = self.home.on_cycle_fired(&fired, s)
                    | self.favourites.on_cycle_fired(&fired, s)
                    | self.detail.on_cycle_fired(&fired, s);
                if !changed {
                    debug!("cycle: stale timer {} for {}", fired.timer_id, fired.row_key);
                }
                return changed;
            }

            AppMessage::ImageResolved(resolved) => {
                self.state.images.on_resolved(resolved);
            }
        }
        true
    }

    fn on_state_updated(&mut self, catalog: CatalogState) {
        debug!(
            "catalog rev {} ({} movies, {} favourites)",
            catalog.rev,
            catalog.movies.len(),
            catalog.favourite_count()
        );
        self.state.catalog = catalog;
        self.intents.confirm_from(&self.state.catalog);
        self.state.favourite_hints = self.intents.hints();

        self.home.on_catalog_updated(&self.state);
        self.favourites.on_catalog_updated(&self.state);
        self.detail.on_catalog_updated(&self.state);

        if let Some(id) = self.pending_selection.take() {
            if !self.home.select_movie(&id) {
                debug!("session: movie {} no longer in catalog", id);
            }
        }

        if self.reload_pending {
            self.reload_pending = false;
            self.toast.resolve_spinner(
                Severity::Success,
                format!("catalog reloaded: {} movies", self.state.catalog.movies.len()),
            );
        }
    }

    fn on_command_failed(&mut self, movie_id: Option<String>, reason: String) {
        warn!("command failed ({:?}): {}", movie_id, reason);
        match movie_id {
            Some(id) => {
                self.intents.revert(&id);
                self.state.favourite_hints = self.intents.hints();
                self.toast.error(format!("favourite failed: {}", reason));
            }
            None if self.reload_pending => {
                self.reload_pending = false;
                self.toast
                    .resolve_spinner(Severity::Error, format!("reload failed: {}", reason));
            }
            None => self.toast.error(reason),
        }
    }

    // ── Input routing ─────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let normal = self.state.input_mode == InputMode::Normal;

        // Global keys, active on every screen
        match key.code {
            KeyCode::Char('q') if key.modifiers == KeyModifiers::NONE && normal => {
                return vec![Action::Quit];
            }
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                return vec![Action::Quit];
            }
            KeyCode::Char('?') if normal => return vec![Action::ToggleHelp],
            KeyCode::Char('K') if normal => return vec![Action::ToggleKeys],
            _ => {}
        }

        // Help overlay captures all keys when visible
        if self.help_overlay.visible {
            return self.help_overlay.handle_key(key, &self.state);
        }

        if normal {
            match key.code {
                KeyCode::Char('F') => {
                    return vec![Action::Navigate(Destination::Favourites.path())];
                }
                KeyCode::Char('H') => return vec![Action::Home],
                KeyCode::Char('R') => return vec![Action::Reload],
                KeyCode::Backspace | KeyCode::Char('h') => return vec![Action::Back],
                // Esc first clears a kept list filter
                KeyCode::Esc if !self.current_filter_kept() => return vec![Action::Back],
                _ => {}
            }
        }

        match self.state.destination.route() {
            Route::Home => self.home.handle_key(key, &self.state),
            Route::Favourites => self.favourites.handle_key(key, &self.state),
            Route::Detail => self.detail.handle_key(key, &self.state),
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        if self.help_overlay.visible {
            return self.help_overlay.handle_mouse(event, self.screen_area, &self.state);
        }
        let r = self.screen_area;
        if !hit(r, event.column, event.row) {
            return vec![];
        }
        match self.state.destination.route() {
            Route::Home => self.home.handle_mouse(event, r, &self.state),
            Route::Favourites => self.favourites.handle_mouse(event, r, &self.state),
            Route::Detail => self.detail.handle_mouse(event, r, &self.state),
        }
    }

    fn current_filter_kept(&self) -> bool {
        match self.state.destination.route() {
            Route::Home => !self.home.list.filter.is_empty(),
            Route::Favourites => !self.favourites.list.filter.is_empty(),
            Route::Detail => false,
        }
    }

    // ── Action dispatch ───────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        match &action {
            Action::Resize(..) => {}
            _ => debug!("dispatch: {:?}", action),
        }
        match action {
            // ── Navigation ────────────────────────────────────────────────────
            Action::Navigate(path) => {
                let before = self.nav.current().clone();
                match self.nav.navigate(&path) {
                    Ok(_) => self.on_navigated(before),
                    Err(e) => self.toast.warning(e.to_string()),
                }
            }
            Action::Back => {
                let before = self.nav.current().clone();
                if self.nav.pop_back() {
                    self.on_navigated(before);
                }
            }
            Action::Home => {
                let before = self.nav.current().clone();
                self.nav.restore(&Destination::Home.path());
                self.on_navigated(before);
            }

            // ── Favourites ────────────────────────────────────────────────────
            Action::ToggleFavourite(movie_id) => {
                let Some(observed) = self.state.movie(&movie_id).map(|m| m.favoured) else {
                    self.toast.warning(format!("unknown movie {}", movie_id));
                    return;
                };
                let favoured = self.intents.request_toggle(&movie_id, observed);
                self.state.favourite_hints = self.intents.hints();
                self.send_cmd(Command::SetFavourite { movie_id, favoured })
                    .await;
            }

            // ── Filter ────────────────────────────────────────────────────────
            Action::OpenFilter => self.state.input_mode = InputMode::Filter,
            Action::CloseFilter => self.state.input_mode = InputMode::Normal,

            // ── UI toggles ────────────────────────────────────────────────────
            Action::ToggleHelp => self.help_overlay.toggle(),
            Action::ToggleKeys => self.show_keys_bar = !self.show_keys_bar,

            // ── System ────────────────────────────────────────────────────────
            Action::Reload => {
                if !self.reload_pending {
                    self.reload_pending = true;
                    self.toast.spinner("reloading catalog…");
                    self.send_cmd(Command::Reload).await;
                }
            }
            Action::Quit => self.should_quit = true,
            Action::Resize(..) => {}
        }
    }

    /// The top of the back stack changed from `before`.
    fn on_navigated(&mut self, before: Destination) {
        let after = self.nav.current().clone();
        if before.route() != after.route() {
            match before.route() {
                Route::Home => self.home.on_leave(),
                Route::Favourites => self.favourites.on_leave(),
                Route::Detail => self.detail.on_leave(),
            }
        }
        // A filter still open on the old screen must not swallow keys
        self.home.filter_input.deactivate();
        self.favourites.filter_input.deactivate();
        self.state.input_mode = InputMode::Normal;

        self.sync_destination();
        self.save_ui_session_state();
    }

    fn sync_destination(&mut self) {
        let dest = self.nav.current().clone();
        if let Destination::Detail { movie_id } = &dest {
            self.detail.set_movie(movie_id.clone());
        }
        self.state.destination = dest;
        self.state.breadcrumbs = self.nav.breadcrumbs();
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        use crate::theme::C_BG;
        use ratatui::widgets::Block;
        let area = frame.area();

        frame.render_widget(
            Block::default().style(ratatui::style::Style::default().bg(C_BG)),
            area,
        );

        // ── Outer layout: title | separator | body | (keys bar) ───────────────
        let status_h = if self.show_keys_bar { 1u16 } else { 0 };
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(status_h),
            ])
            .split(area);

        status_bar::draw_title_bar(
            frame,
            outer[0],
            &self.state.breadcrumbs,
            self.state.catalog.favourite_count(),
            self.state.catalog.movies.len(),
        );
        status_bar::draw_separator(frame, outer[1]);

        let body = outer[2];
        self.screen_area = body;
        match self.state.destination.route() {
            Route::Home => self.home.draw(frame, body, true, &self.state),
            Route::Favourites => self.favourites.draw(frame, body, true, &self.state),
            Route::Detail => self.detail.draw(frame, body, true, &self.state),
        }

        if self.show_keys_bar {
            status_bar::draw_keys_bar(
                frame,
                outer[3],
                self.state.input_mode,
                self.state.destination.route(),
            );
        }

        // ── Help overlay (on top of everything) ──────────────────────────────
        if self.help_overlay.visible {
            self.help_overlay.draw(frame, area, false, &self.state);
        }

        // ── Toast notifications (topmost layer) ──────────────────────────────
        self.toast.draw(frame, area);
    }

    /// Start loading every image reference drawn in the last frame.
    fn request_images(&mut self) {
        let requests = match self.state.destination.route() {
            Route::Home => self.home.take_image_requests(),
            Route::Favourites => self.favourites.take_image_requests(),
            Route::Detail => self.detail.take_image_requests(),
        };
        for reference in requests {
            self.state.images.request(&reference);
        }
    }

    async fn send_cmd(&self, cmd: Command) {
        if self.cmd_tx.send(CatalogEvent::ClientCommand(cmd)).await.is_err() {
            warn!("catalog core is gone; command dropped");
        }
    }

    fn save_ui_session_state(&self) {
        let ui_state = UiSessionState {
            path: self.nav.current_path(),
            selected_movie_id: self.home.selected_movie_id(),
        };
        if let Err(e) = save_ui_session_state(&self.ui_state_path, &ui_state) {
            warn!("failed to save ui state: {}", e);
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

// ── Persistence helpers ───────────────────────────────────────────────────────

fn load_ui_session_state(path: &PathBuf) -> UiSessionState {
    let Ok(content) = std::fs::read_to_string(path) else {
        return UiSessionState::default();
    };
    serde_json::from_str(&content).unwrap_or_default()
}

fn save_ui_session_state(path: &PathBuf, state: &UiSessionState) -> anyhow::Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(state)?)?;
    Ok(())
}
