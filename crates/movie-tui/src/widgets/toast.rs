//! Toast notifications — transient status messages in the top-right corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::theme::{C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS, C_TOAST_WARNING};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    fn icon(self) -> &'static str {
        match self {
            Severity::Info => "·",
            Severity::Success => "✓",
            Severity::Warning => "!",
            Severity::Error => "✗",
        }
    }

    fn color(self) -> ratatui::style::Color {
        match self {
            Severity::Info => C_TOAST_INFO,
            Severity::Success => C_TOAST_SUCCESS,
            Severity::Warning => C_TOAST_WARNING,
            Severity::Error => C_TOAST_ERROR,
        }
    }
}

struct Toast {
    message: String,
    severity: Severity,
    expires: Instant,
    /// How many times the same message was pushed while visible.
    repeats: u32,
}

impl Toast {
    fn text(&self) -> String {
        if self.repeats > 1 {
            format!(" {} {} ×{} ", self.severity.icon(), self.message, self.repeats)
        } else {
            format!(" {} {} ", self.severity.icon(), self.message)
        }
    }
}

/// A persistent spinner toast that animates until resolved.
struct SpinnerToast {
    message: String,
    frame: usize,
}

pub const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

/// Spinner glyph for an arbitrary frame counter.
pub fn spinner_glyph(frame: usize) -> &'static str {
    SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]
}

pub struct ToastManager {
    toasts: VecDeque<Toast>,
    spinner: Option<SpinnerToast>,
    max_visible: usize,
}

impl ToastManager {
    pub fn new() -> Self {
        Self {
            toasts: VecDeque::new(),
            spinner: None,
            max_visible: 4,
        }
    }

    pub fn push(&mut self, message: impl Into<String>, severity: Severity, duration: Duration) {
        let message = message.into();
        let expires = Instant::now() + duration;
        // Same message again: bump its counter and move it to the front
        let repeats = match self.toasts.iter().position(|t| t.message == message) {
            Some(pos) => self
                .toasts
                .remove(pos)
                .map(|t| t.repeats + 1)
                .unwrap_or(1),
            None => 1,
        };
        self.toasts.push_back(Toast {
            message,
            severity,
            expires,
            repeats,
        });
        while self.toasts.len() > self.max_visible * 2 {
            self.toasts.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Info, Duration::from_secs(3));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Success, Duration::from_secs(3));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Warning, Duration::from_secs(4));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message, Severity::Error, Duration::from_secs(5));
    }

    /// Start or replace the spinner toast.  It animates on every `tick()`
    /// and stays until `resolve_spinner` or `dismiss_spinner`.
    pub fn spinner(&mut self, message: impl Into<String>) {
        self.spinner = Some(SpinnerToast {
            message: message.into(),
            frame: 0,
        });
    }

    /// Replace the spinner with a normal expiring toast.
    pub fn resolve_spinner(&mut self, severity: Severity, message: impl Into<String>) {
        if self.spinner.take().is_some() {
            self.push(message, severity, Duration::from_secs(3));
        }
    }

    pub fn dismiss_spinner(&mut self) {
        self.spinner = None;
    }

    pub fn has_spinner(&self) -> bool {
        self.spinner.is_some()
    }

    /// Remove expired toasts and advance the spinner frame. Call each tick.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.toasts.retain(|t| t.expires > now);
        if let Some(ref mut s) = self.spinner {
            s.frame = (s.frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty() && self.spinner.is_none()
    }

    /// Render toasts in the top-right corner of `area`, spinner first.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if self.is_empty() {
            return;
        }
        let max_width = (area.width / 2).clamp(30, 60).min(area.width);

        let mut lines: Vec<(String, Style)> = Vec::new();
        if let Some(ref s) = self.spinner {
            lines.push((
                format!(" {} {} ", spinner_glyph(s.frame), s.message),
                Style::default()
                    .fg(C_TOAST_INFO)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        for toast in self.toasts.iter().rev().take(self.max_visible) {
            lines.push((
                toast.text(),
                Style::default()
                    .fg(toast.severity.color())
                    .add_modifier(Modifier::BOLD),
            ));
        }

        let mut y = area.y + 1;
        for (text, style) in lines {
            if y >= area.y + area.height {
                break;
            }
            let w = (text.chars().count() as u16).min(max_width);
            let toast_area = Rect {
                x: area.x + area.width.saturating_sub(w + 1),
                y,
                width: w,
                height: 1,
            };
            frame.render_widget(Clear, toast_area);
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(text, style))),
                toast_area,
            );
            y += 1;
        }
    }
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_message_counts() {
        let mut t = ToastManager::new();
        t.error("could not save favourites");
        t.error("could not save favourites");
        assert_eq!(t.toasts.len(), 1);
        assert_eq!(t.toasts[0].repeats, 2);
        assert!(t.toasts[0].text().contains("×2"));
    }

    #[test]
    fn test_expired_toasts_removed() {
        let mut t = ToastManager::new();
        t.push("gone", Severity::Info, Duration::ZERO);
        t.tick();
        assert!(t.is_empty());
    }

    #[test]
    fn test_spinner_resolves_into_toast() {
        let mut t = ToastManager::new();
        t.spinner("reloading catalog");
        t.tick();
        assert!(t.has_spinner());
        t.resolve_spinner(Severity::Success, "catalog reloaded");
        assert!(!t.has_spinner());
        assert_eq!(t.toasts.len(), 1);

        // nothing to resolve: no toast
        t.resolve_spinner(Severity::Success, "again");
        assert_eq!(t.toasts.len(), 1);
    }

    #[test]
    fn test_spinner_glyph_wraps() {
        assert_eq!(spinner_glyph(0), spinner_glyph(SPINNER_FRAMES.len()));
    }
}
