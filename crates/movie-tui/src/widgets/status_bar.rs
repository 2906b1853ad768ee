//! Top bar (screen, breadcrumbs, counts) and bottom keybindings bar.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use movie_proto::route::Route;

use crate::theme::{
    C_ACCENT, C_FAVOURITE, C_MODE_FILTER, C_MODE_NORMAL, C_MUTED, C_PRIMARY, C_SECONDARY,
    C_SEPARATOR,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Filter,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Filter => "FILTER",
        }
    }

    pub fn color(self) -> ratatui::style::Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::Filter => C_MODE_FILTER,
        }
    }
}

/// Draw the top bar: `reel › movies › detail` on the left, counts on the right.
pub fn draw_title_bar(
    frame: &mut Frame,
    area: Rect,
    breadcrumbs: &[&str],
    favourites: usize,
    movies: usize,
) {
    let mut spans = vec![Span::styled(
        " reel",
        Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
    )];
    let last = breadcrumbs.len().saturating_sub(1);
    for (i, crumb) in breadcrumbs.iter().enumerate() {
        spans.push(Span::styled(" › ", Style::default().fg(C_MUTED)));
        let style = if i == last {
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(C_SECONDARY)
        };
        spans.push(Span::styled(crumb.to_string(), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    let counts = Line::from(vec![
        Span::styled(format!("{} movies  ", movies), Style::default().fg(C_SECONDARY)),
        Span::styled("♥ ", Style::default().fg(C_FAVOURITE)),
        Span::styled(format!("{} ", favourites), Style::default().fg(C_PRIMARY)),
    ])
    .right_aligned();
    frame.render_widget(Paragraph::new(counts), area);
}

/// Draw a horizontal separator line.
pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

/// Keys shown in the footer for a mode and screen.
pub fn keys_hint(mode: InputMode, route: Route) -> &'static str {
    match mode {
        InputMode::Filter => " type to filter  ↑↓ move  Enter keep  Esc clear+close  Ctrl-U clear",
        InputMode::Normal => match route {
            Route::Home => {
                " ↑↓/jk select  Space expand  Enter detail  f favourite  F favourites  / filter  R reload  K keys  ? help  q quit"
            }
            Route::Favourites => {
                " ↑↓/jk select  Space expand  Enter detail  f unfavourite  Esc back  / filter  K keys  ? help  q quit"
            }
            Route::Detail => {
                " ↑↓/jk image  Space expand  f favourite  Esc/h back  H home  K keys  ? help  q quit"
            }
        },
    }
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode, route: Route) {
    let label = match mode {
        InputMode::Normal => route.title().to_uppercase(),
        InputMode::Filter => mode.label().to_string(),
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", label),
            Style::default().fg(mode.color()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(keys_hint(mode, route), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
