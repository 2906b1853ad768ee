//! PaneChrome — bordered screen pane with a title, badge and footer hint.

use crate::theme::{
    style_focused_border, style_unfocused_border, C_MUTED, C_PRIMARY, C_SECONDARY,
};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders},
};

/// A badge shown in the top-right of the pane header (e.g. "♥ 3").
pub struct Badge<'a> {
    pub text: &'a str,
    pub color: Color,
}

/// Renders a bordered pane with consistent focus styling, an optional badge
/// and an optional right-aligned footer (position counters, hints).
pub fn pane_chrome<'a>(
    title: &'a str,
    focused: bool,
    badge: Option<Badge<'a>>,
    footer: Option<String>,
) -> Block<'a> {
    let border_style = if focused {
        style_focused_border()
    } else {
        style_unfocused_border()
    };

    let title_style = if focused {
        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(C_MUTED)
    };

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border_style)
        .title(Line::from(Span::styled(format!(" {} ", title), title_style)));

    if let Some(b) = badge {
        block = block.title_top(
            Line::from(Span::styled(
                format!(" {} ", b.text),
                Style::default().fg(b.color).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        );
    }

    if let Some(text) = footer {
        block = block.title_bottom(
            Line::from(Span::styled(
                format!(" {} ", text),
                Style::default().fg(C_SECONDARY),
            ))
            .right_aligned(),
        );
    }

    block
}
