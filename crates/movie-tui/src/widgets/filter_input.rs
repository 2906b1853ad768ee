//! FilterInput — wraps tui-input for the movie list's filter bar.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED, C_SECONDARY};

#[derive(Debug, Clone, PartialEq)]
pub enum FilterAction {
    Changed(String),
    Confirmed,
    Cancelled,
    None,
}

pub struct FilterInput {
    input: Input,
    active: bool,
    placeholder: String,
}

impl FilterInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            placeholder: placeholder.into(),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.input.value().is_empty()
    }

    /// Handle a key event. Returns what happened.
    ///
    /// Esc clears a non-empty query first and closes the bar on the second
    /// press.  Ctrl-U clears without closing.
    pub fn handle_key(&mut self, key: KeyEvent) -> FilterAction {
        match key.code {
            KeyCode::Esc => {
                if !self.is_empty() {
                    self.clear();
                    FilterAction::Changed(String::new())
                } else {
                    self.deactivate();
                    FilterAction::Cancelled
                }
            }
            KeyCode::Enter => {
                self.deactivate();
                FilterAction::Confirmed
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.is_empty() {
                    return FilterAction::None;
                }
                self.clear();
                FilterAction::Changed(String::new())
            }
            _ => {
                let before = self.input.value().to_string();
                self.input.handle_event(&Event::Key(key));
                if self.input.value() == before {
                    FilterAction::None
                } else {
                    FilterAction::Changed(self.input.value().to_string())
                }
            }
        }
    }

    /// Render the bar into `area`, with a `matches/total` counter on the right.
    pub fn draw(&self, frame: &mut Frame, area: Rect, matches: usize, total: usize) {
        let counter = format!(" {}/{} ", matches, total);
        let counter_w = counter.chars().count() as u16;
        let text_w = area.width.saturating_sub(counter_w);

        let scroll = self.input.visual_scroll(text_w.saturating_sub(2) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(
                format!("/ {}", self.placeholder),
                Style::default().fg(C_MUTED),
            )
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(format!("/ {}", visible), Style::default().fg(C_FILTER_FG))
        };

        let text_area = Rect {
            width: text_w,
            ..area
        };
        let counter_area = Rect {
            x: area.x + text_w,
            width: counter_w.min(area.width),
            ..area
        };
        frame.render_widget(
            Paragraph::new(Line::from(display)).style(Style::default().bg(C_FILTER_BG)),
            text_area,
        );
        frame.render_widget(
            Paragraph::new(Span::styled(counter, Style::default().fg(C_SECONDARY)))
                .style(Style::default().bg(C_FILTER_BG)),
            counter_area,
        );

        if self.active && text_w > 2 {
            let cursor = self.input.visual_cursor().saturating_sub(scroll) as u16;
            let cursor_x = area.x + 2 + cursor;
            frame.set_cursor_position((cursor_x.min(area.x + text_w - 1), area.y));
        }
    }
}

impl Default for FilterInput {
    fn default() -> Self {
        Self::new("filter...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_and_escape() {
        let mut f = FilterInput::new("title");
        f.activate();
        assert_eq!(
            f.handle_key(key(KeyCode::Char('a'))),
            FilterAction::Changed("a".into())
        );
        assert_eq!(
            f.handle_key(key(KeyCode::Esc)),
            FilterAction::Changed(String::new())
        );
        assert!(f.is_active());
        assert_eq!(f.handle_key(key(KeyCode::Esc)), FilterAction::Cancelled);
        assert!(!f.is_active());
    }

    #[test]
    fn test_enter_keeps_query() {
        let mut f = FilterInput::default();
        f.activate();
        f.handle_key(key(KeyCode::Char('x')));
        assert_eq!(f.handle_key(key(KeyCode::Enter)), FilterAction::Confirmed);
        assert_eq!(f.text(), "x");
        assert!(!f.is_active());
    }

    #[test]
    fn test_ctrl_u_clears() {
        let mut f = FilterInput::default();
        f.activate();
        f.handle_key(key(KeyCode::Char('x')));
        let ctrl_u = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert_eq!(f.handle_key(ctrl_u), FilterAction::Changed(String::new()));
        assert_eq!(f.handle_key(ctrl_u), FilterAction::None);
        assert!(f.is_active());
    }
}
