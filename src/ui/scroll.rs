//! Transcript wrapping and scroll position.

use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

/// Pre-wrap styled lines to `width` columns at word boundaries, breaking
/// words that are wider than a whole row. Rendering the result without
/// ratatui's own wrapping keeps the row count exact for scrolling.
pub fn prewrap_lines(lines: &[Line<'_>], width: u16) -> Vec<Line<'static>> {
    let width = usize::from(width).max(1);
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let cells: Vec<(char, Style)> = line
            .spans
            .iter()
            .flat_map(|span| {
                let style = line.style.patch(span.style);
                span.content.chars().map(move |ch| (ch, style))
            })
            .collect();
        wrap_cells(&cells, width, &mut out);
    }
    out
}

fn cell_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

fn wrap_cells(cells: &[(char, Style)], width: usize, out: &mut Vec<Line<'static>>) {
    let mut row: Vec<(char, Style)> = Vec::new();
    let mut row_width = 0;
    let mut wrapped = false;

    for token in cells.chunk_by(|a, b| a.0.is_whitespace() == b.0.is_whitespace()) {
        let token_width: usize = token.iter().map(|(ch, _)| cell_width(*ch)).sum();
        let is_space = token[0].0.is_whitespace();

        if row_width + token_width <= width {
            if !(is_space && wrapped && row.is_empty()) {
                row.extend_from_slice(token);
                row_width += token_width;
            }
            continue;
        }

        if is_space {
            out.push(to_line(&row));
            row.clear();
            row_width = 0;
            wrapped = true;
            continue;
        }

        if row_width > 0 {
            trim_trailing_space(&mut row);
            out.push(to_line(&row));
            row.clear();
            row_width = 0;
            wrapped = true;
        }
        for &(ch, style) in token {
            let w = cell_width(ch);
            if row_width + w > width && row_width > 0 {
                out.push(to_line(&row));
                row.clear();
                row_width = 0;
            }
            row.push((ch, style));
            row_width += w;
        }
    }
    out.push(to_line(&row));
}

fn trim_trailing_space(row: &mut Vec<(char, Style)>) {
    while row.last().is_some_and(|(ch, _)| ch.is_whitespace()) {
        row.pop();
    }
}

fn to_line(row: &[(char, Style)]) -> Line<'static> {
    let spans: Vec<Span<'static>> = row
        .chunk_by(|a, b| a.1 == b.1)
        .map(|run| Span::styled(run.iter().map(|(ch, _)| *ch).collect::<String>(), run[0].1))
        .collect();
    Line::from(spans)
}

/// Scroll position measured in rows up from the bottom of the transcript.
/// Zero keeps the view pinned to the newest message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrollState {
    offset_from_bottom: usize,
    max_offset: usize,
    page: usize,
}

impl ScrollState {
    /// Record the geometry of the last frame and return the top row to show.
    pub fn layout(&mut self, total_rows: usize, viewport_rows: usize) -> usize {
        self.max_offset = total_rows.saturating_sub(viewport_rows);
        self.page = viewport_rows.saturating_sub(1).max(1);
        self.offset_from_bottom = self.offset_from_bottom.min(self.max_offset);
        self.max_offset - self.offset_from_bottom
    }

    pub fn page_up(&mut self) {
        self.offset_from_bottom = (self.offset_from_bottom + self.page.max(1)).min(self.max_offset);
    }

    pub fn page_down(&mut self) {
        self.offset_from_bottom = self.offset_from_bottom.saturating_sub(self.page.max(1));
    }

    pub fn to_bottom(&mut self) {
        self.offset_from_bottom = 0;
    }
}
