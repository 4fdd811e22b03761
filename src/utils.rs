use std::ops::Range;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use unicode_width::UnicodeWidthChar;

/// Columns a tab expands to when drawn.
pub const TAB_WIDTH: usize = 4;

/// Terminal columns `ch` occupies once drawn.
pub fn char_width(ch: char) -> usize {
    match ch {
        '\t' => TAB_WIDTH,
        '\r' => 0,
        _ => UnicodeWidthChar::width(ch).unwrap_or(0),
    }
}

/// Splits `text` into display rows at most `width` terminal columns wide.
///
/// Rows are byte ranges into `text` so highlight ranges can be intersected
/// with them directly. Long lines break after the last space that fits. A
/// single character wider than `width` still gets a row of its own.
pub fn wrap_rows(text: &str, width: usize) -> Vec<Range<usize>> {
    let width = width.max(1);
    let mut rows = vec![];
    let mut line_start = 0;
    for line in text.split('\n') {
        if line.is_empty() {
            rows.push(line_start..line_start);
        }
        let mut start = 0;
        while start < line.len() {
            let rest = &line[start..];
            let mut end = rest.len();
            let mut last_space = None;
            let mut columns = 0;
            for (i, ch) in rest.char_indices() {
                let w = char_width(ch);
                if columns + w > width && i > 0 {
                    end = i;
                    break;
                }
                columns += w;
                if ch == ' ' {
                    last_space = Some(i + ch.len_utf8());
                }
            }
            if end < rest.len() {
                if let Some(space) = last_space {
                    end = space;
                }
            }
            rows.push(line_start + start..line_start + start + end);
            start += end;
        }
        line_start += line.len() + 1;
    }
    rows
}

/// Index of the row containing byte `pos`.
pub fn row_of(rows: &[Range<usize>], pos: usize) -> Option<usize> {
    rows.iter().position(|r| r.contains(&pos))
}

/// Scroll offset that puts `row` in the middle of a view `view_height` rows
/// tall, clamped to the content.
pub fn centered_scroll(row: usize, total_rows: usize, view_height: u16) -> u16 {
    let half = view_height as usize / 2;
    let max = calculate_max_scroll(total_rows, view_height);
    (row.saturating_sub(half) as u16).min(max)
}

pub fn calculate_max_scroll(content_lines: usize, view_height: u16) -> u16 {
    let content_lines = content_lines.min(u16::MAX as usize) as u16;
    content_lines.saturating_sub(view_height)
}

/// Centers a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default().direction(Direction::Vertical)
        .constraints([Constraint::Percentage((100-percent_y)/2), Constraint::Percentage(percent_y), Constraint::Percentage((100-percent_y)/2)]).split(r)[1];
    Layout::default().direction(Direction::Horizontal)
        .constraints([Constraint::Percentage((100-percent_x)/2), Constraint::Percentage(percent_x), Constraint::Percentage((100-percent_x)/2)]).split(vertical)[1]
}

/// Moves a list cursor by `delta`, staying inside `len` entries.
pub fn step(cursor: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    cursor.saturating_add_signed(delta).min(len - 1)
}
