//! Component trait — the interface every screen and overlay implements.
//!
//! - Components own their state and render themselves.
//! - They read `AppState` for data they don't own and never mutate it.
//! - They return `Vec<Action>`; the App event loop dispatches them.

use ratatui::crossterm::event::{KeyEvent, MouseEvent};
use ratatui::{layout::Rect, Frame};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::row::CycleFired;

pub trait Component {
    fn id(&self) -> ComponentId;

    /// Handle a key event. Only called for the visible screen.
    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action>;

    /// Handle a mouse event inside the component's last drawn `area`.
    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, state: &AppState) -> Vec<Action>;

    /// Called each UI tick (~100ms).  Returns `true` if a redraw is needed.
    fn tick(&mut self, _state: &AppState) -> bool {
        false
    }

    /// A row timer fired.  Returns `true` if the component changed.
    fn on_cycle_fired(&mut self, _fired: &CycleFired, _state: &AppState) -> bool {
        false
    }

    /// The catalog changed.
    fn on_catalog_updated(&mut self, _state: &AppState) {}

    /// The screen is being left: drop per-row state and cancel timers.
    fn on_leave(&mut self) {}

    /// Image references drawn since the last call, for the App to resolve.
    fn take_image_requests(&mut self) -> Vec<String> {
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState);
}
