//! MovieCard — one bordered card per movie: image line, title line with the
//! expand arrow, and (when expanded) the details and plot.
//!
//! Layout inside the border:
//! ```text
//!  ▣ 2/3 poster-2.jpg · img.reel.example      ♥
//!  Avatar                                     ▼
//!  Year: 2009
//!  Director: James Cameron
//!  ...
//! ```

use std::time::Instant;

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use movie_proto::protocol::Movie;

use crate::image::ImageStatus;
use crate::intent::{FavouriteHint, RenderHint};
use crate::row::RowState;
use crate::theme::{
    style_card_border, style_muted, style_secondary, style_title, C_BADGE_ERR, C_BADGE_PENDING,
    C_FAVOURITE, C_IMAGE, C_LABEL, C_MUTED, C_PRIMARY, C_RATING,
};
use crate::widgets::toast::spinner_glyph;

/// Everything needed to draw one card.
pub struct CardView<'a> {
    pub movie: &'a Movie,
    pub row: Option<&'a RowState>,
    pub selected: bool,
    pub image: Option<&'a ImageStatus>,
    pub favourite: Option<FavouriteHint>,
    pub frame_counter: usize,
    pub now: Instant,
}

impl CardView<'_> {
    fn expanded(&self) -> bool {
        self.row.map(RowState::is_expanded).unwrap_or(false)
    }

    fn image_index(&self) -> usize {
        self.row.map(RowState::image_index).unwrap_or(0)
    }
}

/// Screen areas of a drawn card, for mouse hit-testing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CardHit {
    pub card: Rect,
    pub header: Rect,
    pub heart: Rect,
}

/// Image reference a card shows for `row`'s current image index.
pub fn current_image<'a>(movie: &'a Movie, row: Option<&RowState>) -> Option<&'a str> {
    let idx = row.map(RowState::image_index).unwrap_or(0);
    movie.image(idx).or_else(|| movie.image(0))
}

/// Total height of a card drawn `width` columns wide.
pub fn card_height(movie: &Movie, expanded: bool, width: u16) -> u16 {
    let inner = width.saturating_sub(2) as usize;
    let mut h: usize = 2 + 2;
    if expanded {
        h = h.saturating_add(detail_lines(movie, inner).len());
    }
    u16::try_from(h).unwrap_or(u16::MAX)
}

/// Draw the card into `area`, clipping anything that does not fit.
pub fn draw_card(frame: &mut Frame, area: Rect, view: &CardView) -> CardHit {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(style_card_border(view.selected));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut hit = CardHit {
        card: area,
        ..CardHit::default()
    };
    if inner.height == 0 || inner.width < 4 {
        return hit;
    }
    let w = inner.width as usize;

    // ── Image line + heart ───────────────────────────────────────────────
    let image_row = Rect { height: 1, ..inner };
    let heart = heart_span(view);
    frame.render_widget(
        Paragraph::new(Line::from(image_spans(view, w.saturating_sub(3)))),
        image_row,
    );
    hit.heart = Rect {
        x: inner.x + inner.width - 2,
        width: 2,
        ..image_row
    };
    frame.render_widget(Paragraph::new(Line::from(heart)), hit.heart);

    if inner.height < 2 {
        return hit;
    }

    // ── Title line + arrow ───────────────────────────────────────────────
    hit.header = Rect {
        y: inner.y + 1,
        height: 1,
        ..inner
    };
    let arrow = view.row.map(|r| r.arrow(view.now)).unwrap_or("▲");
    let title = ellipsize(&view.movie.title, w.saturating_sub(3));
    let pad = w.saturating_sub(title.width() + 2);
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(title, style_title(view.selected)),
            Span::raw(" ".repeat(pad)),
            Span::styled(format!("{} ", arrow), Style::default().fg(C_PRIMARY)),
        ])),
        hit.header,
    );

    if !view.expanded() || inner.height < 3 {
        return hit;
    }

    // ── Details + plot ───────────────────────────────────────────────────
    let body = Rect {
        y: inner.y + 2,
        height: inner.height - 2,
        ..inner
    };
    let lines: Vec<Line> = detail_lines(view.movie, w)
        .into_iter()
        .map(|(label, text)| match label {
            Some(label) => {
                let value_style = if label.starts_with("Rating") {
                    Style::default().fg(C_RATING)
                } else {
                    style_secondary()
                };
                Line::from(vec![
                    Span::styled(label, Style::default().fg(C_LABEL)),
                    Span::styled(text, value_style),
                ])
            }
            None => Line::from(Span::styled(text, Style::default().fg(C_PRIMARY))),
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), body);
    hit
}

fn image_spans<'a>(view: &CardView<'a>, width: usize) -> Vec<Span<'a>> {
    let count = view.movie.image_count();
    if count == 0 {
        return vec![Span::styled("▨ no images", style_muted())];
    }
    let counter = format!(" {}/{} ", view.image_index().min(count - 1) + 1, count);
    match view.image {
        None | Some(ImageStatus::Loading) => vec![
            Span::styled(spinner_glyph(view.frame_counter), Style::default().fg(C_IMAGE)),
            Span::styled(counter, style_muted()),
            Span::styled("loading…", style_muted()),
        ],
        Some(ImageStatus::Ready(info)) => {
            let text = ellipsize(
                &format!("{} · {}", info.name, info.source),
                width.saturating_sub(counter.width() + 1),
            );
            vec![
                Span::styled("▣", Style::default().fg(C_IMAGE)),
                Span::styled(counter, style_muted()),
                Span::styled(text, style_secondary()),
            ]
        }
        Some(ImageStatus::Failed(e)) => {
            let text = ellipsize(
                &format!("image unavailable ({})", e),
                width.saturating_sub(counter.width() + 1),
            );
            vec![
                Span::styled("▨", style_muted()),
                Span::styled(counter, style_muted()),
                Span::styled(text, style_muted()),
            ]
        }
    }
}

fn heart_span(view: &CardView) -> Span<'static> {
    let observed = view.movie.favoured;
    let glyph = |on: bool| if on { "♥ " } else { "♡ " };
    match view.favourite {
        None => Span::styled(
            glyph(observed),
            Style::default().fg(if observed { C_FAVOURITE } else { C_MUTED }),
        ),
        Some(FavouriteHint { intended, hint }) => match hint {
            RenderHint::Normal => Span::styled(glyph(intended), Style::default().fg(C_FAVOURITE)),
            RenderHint::PendingVisible => Span::styled(
                glyph(intended),
                Style::default()
                    .fg(C_BADGE_PENDING)
                    .add_modifier(Modifier::BOLD),
            ),
            RenderHint::PendingHidden => Span::raw("  "),
            RenderHint::TimedOut => Span::styled("? ", Style::default().fg(C_BADGE_ERR)),
        },
    }
}

/// Detail rows of an expanded card: `(label, text)` pairs, then the plot
/// wrapped to `width` with no label.
pub fn detail_lines(movie: &Movie, width: usize) -> Vec<(Option<String>, String)> {
    let mut out = Vec::new();
    let rating = if movie.rating > 0.0 {
        format!("{:.1}", movie.rating)
    } else {
        String::new()
    };
    let fields = [
        ("Year: ", movie.year.as_str()),
        ("Genre: ", movie.genre.as_str()),
        ("Actors: ", movie.actors.as_str()),
        ("Director: ", movie.director.as_str()),
        ("Rating: ", rating.as_str()),
    ];
    for (label, value) in fields {
        if value.is_empty() {
            continue;
        }
        let avail = width.saturating_sub(label.width()).max(1);
        for (i, chunk) in wrap_text(value, avail).into_iter().enumerate() {
            let prefix = if i == 0 {
                label.to_string()
            } else {
                " ".repeat(label.width())
            };
            out.push((Some(prefix), chunk));
        }
    }
    if !movie.plot.is_empty() {
        out.push((None, String::new()));
        for line in wrap_text(&movie.plot, width.max(1)) {
            out.push((None, line));
        }
    }
    out
}

/// Word-wrap `text` to lines of at most `width` display columns.  Words
/// longer than a line are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_w = 0usize;

    for word in text.split_whitespace() {
        let word_w = word.width();
        if current_w > 0 && current_w + 1 + word_w <= width {
            current.push(' ');
            current.push_str(word);
            current_w += 1 + word_w;
            continue;
        }
        if current_w > 0 {
            lines.push(std::mem::take(&mut current));
            current_w = 0;
        }
        if word_w <= width {
            current.push_str(word);
            current_w = word_w;
            continue;
        }
        for ch in word.chars() {
            let cw = ch.width().unwrap_or(0);
            if current_w + cw > width && current_w > 0 {
                lines.push(std::mem::take(&mut current));
                current_w = 0;
            }
            current.push(ch);
            current_w += cw;
        }
    }
    if current_w > 0 {
        lines.push(current);
    }
    lines
}

/// Truncate `text` to `width` display columns, ending in `…` when cut.
pub fn ellipsize(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let cw = ch.width().unwrap_or(0);
        if used + cw + 1 > width {
            break;
        }
        out.push(ch);
        used += cw;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn movie() -> Movie {
        Movie {
            id: "tt0499549".into(),
            title: "Avatar".into(),
            year: "2009".into(),
            director: "James Cameron".into(),
            actors: "Sam Worthington, Zoe Saldana, Sigourney Weaver".into(),
            plot: "A paraplegic marine dispatched to the moon Pandora on a unique mission.".into(),
            images: vec!["https://img.reel.example/avatar/1.jpg".into()],
            rating: 7.9,
            ..Movie::default()
        }
    }

    #[test]
    fn test_ellipsize() {
        assert_eq!(ellipsize("Avatar", 10), "Avatar");
        assert_eq!(ellipsize("The Wolf of Wall Street", 8), "The Wol…");
        assert_eq!(ellipsize("アバター", 5), "アバ…");
        assert_eq!(ellipsize("abc", 0), "");
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(
            wrap_text("one two three four", 9),
            vec!["one two", "three", "four"]
        );
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap_text("   ", 5).is_empty());
        for line in wrap_text(&movie().plot, 12) {
            assert!(line.width() <= 12, "{:?}", line);
        }
    }

    #[test]
    fn test_card_height_grows_when_expanded() {
        let m = movie();
        assert_eq!(card_height(&m, false, 40), 4);
        let expanded = card_height(&m, true, 40);
        assert_eq!(expanded as usize, 4 + detail_lines(&m, 38).len());
        assert!(card_height(&m, true, 20) > expanded);
    }

    #[test]
    fn test_card_height_saturates_for_huge_plot() {
        let m = Movie {
            plot: "a".repeat(8 * 65_532),
            ..movie()
        };
        assert_eq!(card_height(&m, true, 10), u16::MAX);
        assert_eq!(card_height(&m, false, 10), 4);
    }

    #[test]
    fn test_detail_lines_skip_empty_fields() {
        let mut m = movie();
        m.rating = 0.0;
        m.plot.clear();
        let labels: Vec<String> = detail_lines(&m, 80)
            .into_iter()
            .filter_map(|(l, _)| l)
            .collect();
        assert_eq!(labels, vec!["Year: ", "Actors: ", "Director: "]);
    }

    #[test]
    fn test_draw_card_hit_areas() {
        let backend = TestBackend::new(40, 6);
        let mut terminal = Terminal::new(backend).unwrap();
        let m = movie();
        let mut hit = CardHit::default();
        terminal
            .draw(|f| {
                let view = CardView {
                    movie: &m,
                    row: None,
                    selected: true,
                    image: None,
                    favourite: None,
                    frame_counter: 0,
                    now: Instant::now(),
                };
                hit = draw_card(f, Rect::new(0, 0, 40, 4), &view);
            })
            .unwrap();
        assert_eq!(hit.header, Rect::new(1, 2, 38, 1));
        assert_eq!(hit.heart, Rect::new(37, 1, 2, 1));

        let buffer = terminal.backend().buffer().clone();
        let title_row: String = (1..39).map(|x| buffer[(x, 2)].symbol().to_string()).collect();
        assert!(title_row.starts_with("Avatar"));
        assert!(title_row.trim_end().ends_with('▲'));
        assert_eq!(buffer[(37, 1)].symbol(), "♡");
    }
}
