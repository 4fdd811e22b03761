use std::ops::Range;

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};

use crate::app::App;
use crate::history::SlotStore;
use crate::models::{FocusArea, Side};
use crate::review::{NO_PROBLEMS, ReviewRow, render_detail, render_label};
use crate::theme::Theme;
use crate::utils::{TAB_WIDTH, calculate_max_scroll, centered_rect, centered_scroll, row_of, wrap_rows};

/// Draws the whole screen.
pub fn render<S: SlotStore>(f: &mut Frame, app: &mut App<S>, theme: &Theme) {
    let vertical_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(4)])
        .split(f.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(1)])
        .split(vertical_chunks[0]);

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(35), Constraint::Percentage(30)])
        .split(columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[1]);

    let texts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(right[0]);

    render_files(f, app, theme, Side::Source, sidebar[0]);
    render_files(f, app, theme, Side::Target, sidebar[1]);
    render_history(f, app, theme, sidebar[2]);
    render_text(f, app, theme, Side::Source, texts[0]);
    render_text(f, app, theme, Side::Target, texts[1]);
    app.follow_highlight = false;
    render_problems(f, app, theme, right[1]);
    render_footer(f, app, theme, vertical_chunks[1]);

    if app.popup.visible {
        render_popup(f, app, theme);
    }
    if let Some(input) = &app.api_key_input {
        render_api_key_input(f, input, theme);
    }
}

fn render_files<S: SlotStore>(f: &mut Frame, app: &App<S>, theme: &Theme, side: Side, area: Rect) {
    let (title, focus, cursor) = match side {
        Side::Source => ("Source files [1]", FocusArea::SourceFiles, app.source_cursor),
        Side::Target => ("Target files [2]", FocusArea::TargetFiles, app.target_cursor),
    };
    let selection = &app.controller.selection;
    let chosen = selection.chosen(side);
    let candidates = selection.candidates(side);

    let items: Vec<ListItem> = if candidates.is_empty() {
        vec![ListItem::new(Line::from(Span::styled("No matching files. Press r to rescan", theme.text_secondary)))]
    } else {
        candidates
            .iter()
            .map(|file| {
                let is_chosen = chosen == Some(file);
                let mark = if is_chosen { "✔ " } else { "  " };
                let style = if is_chosen { theme.chosen_file } else { theme.text };
                ListItem::new(Line::from(vec![
                    Span::styled(mark, theme.chosen_file),
                    Span::styled(file.relative_path.display().to_string(), style),
                ]))
            })
            .collect()
    };

    let focused = app.focus == focus;
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL).border_style(theme.border(focused)))
        .highlight_symbol("→")
        .highlight_style(if focused { theme.cursor } else { Style::default() });
    let mut state = ListState::default();
    if !candidates.is_empty() {
        state.select(Some(cursor));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn render_history<S: SlotStore>(f: &mut Frame, app: &App<S>, theme: &Theme, area: Rect) {
    let sessions = app.controller.history().sessions();
    let items: Vec<ListItem> = if sessions.is_empty() {
        vec![ListItem::new(Line::from(Span::styled("No past verifications", theme.text_secondary)))]
    } else {
        sessions
            .iter()
            .map(|s| {
                let count = s.markers.len();
                ListItem::new(vec![
                    Line::from(Span::styled(s.label.clone(), theme.history_label)),
                    Line::from(Span::styled(
                        format!(
                            "{} · {} problem{}",
                            s.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                            count,
                            if count == 1 { "" } else { "s" }
                        ),
                        theme.history_meta,
                    )),
                ])
            })
            .collect()
    };

    let focused = app.focus == FocusArea::History;
    let title = format!("History ({}) [4]", sessions.len());
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL).border_style(theme.border(focused)))
        .highlight_symbol("→")
        .highlight_style(if focused { theme.cursor } else { Style::default() });
    let mut state = ListState::default();
    if !sessions.is_empty() {
        state.select(Some(app.history_cursor));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn render_text<S: SlotStore>(f: &mut Frame, app: &mut App<S>, theme: &Theme, side: Side, area: Rect) {
    let focus = match side {
        Side::Source => FocusArea::SourceText,
        Side::Target => FocusArea::TargetText,
    };
    let block = Block::default().borders(Borders::ALL).border_style(theme.border(app.focus == focus));
    let inner = block.inner(area);

    let Some(review) = app.controller.review() else {
        let title = match side {
            Side::Source => "Source text",
            Side::Target => "Target text",
        };
        let hint = Paragraph::new("Choose one file on each side, then press v to verify.")
            .style(theme.text_secondary)
            .wrap(Wrap { trim: true })
            .block(block.title(title));
        f.render_widget(hint, area);
        return;
    };

    let view = review.view(side);
    let session = review.session();
    let file_name = match side {
        Side::Source => &session.source_file_name,
        Side::Target => &session.target_file_name,
    };
    let title = match (view.found, review.highlighted()) {
        (true, _) => format!("{} [{}]", file_name, view.anchor_id.as_deref().unwrap_or_default()),
        (false, Some(_)) => format!("{} (marker not found)", file_name),
        (false, None) => file_name.clone(),
    };

    let rows = wrap_rows(view.text, inner.width.saturating_sub(1) as usize);
    let mark = view.span();
    let lines: Vec<Line> = rows
        .iter()
        .map(|row| row_line(view.text, row.clone(), mark.as_ref(), theme.highlight))
        .collect();

    let max = calculate_max_scroll(rows.len(), inner.height);
    let scroll = match side {
        Side::Source => &mut app.source_scroll,
        Side::Target => &mut app.target_scroll,
    };
    if app.follow_highlight {
        if let Some(row) = mark.as_ref().and_then(|m| row_of(&rows, m.start)) {
            *scroll = centered_scroll(row, rows.len(), inner.height);
        }
    }
    *scroll = (*scroll).min(max);

    let para = Paragraph::new(lines)
        .style(theme.text)
        .scroll((*scroll, 0))
        .block(block.title(title));
    f.render_widget(para, area);

    let mut sb = ScrollbarState::default()
        .position(*scroll as usize)
        .content_length(rows.len());
    f.render_stateful_widget(
        Scrollbar::default().orientation(ScrollbarOrientation::VerticalRight),
        area,
        &mut sb,
    );
}

/// One wrapped row, with the part inside `mark` styled.
fn row_line(text: &str, row: Range<usize>, mark: Option<&Range<usize>>, style: Style) -> Line<'static> {
    let mut spans = vec![];
    match mark {
        Some(m) if m.start < row.end && m.end > row.start => {
            let a = m.start.max(row.start);
            let b = m.end.min(row.end);
            if a > row.start {
                spans.push(Span::raw(clean(&text[row.start..a])));
            }
            spans.push(Span::styled(clean(&text[a..b]), style));
            if b < row.end {
                spans.push(Span::raw(clean(&text[b..row.end])));
            }
        }
        _ => spans.push(Span::raw(clean(&text[row]))),
    }
    Line::from(spans)
}

fn clean(s: &str) -> String {
    s.replace('\r', "").replace('\t', &" ".repeat(TAB_WIDTH))
}

fn render_problems<S: SlotStore>(f: &mut Frame, app: &App<S>, theme: &Theme, area: Rect) {
    let focused = app.focus == FocusArea::Problems;
    let block = Block::default().borders(Borders::ALL).border_style(theme.border(focused));
    let width = block.inner(area).width.saturating_sub(4) as usize;

    let Some(review) = app.controller.review() else {
        f.render_widget(Paragraph::new("").block(block.title("Problems [3]")), area);
        return;
    };

    let items: Vec<ListItem> = review
        .list()
        .rows()
        .into_iter()
        .map(|row| match row {
            ReviewRow::NoProblems => ListItem::new(Line::from(Span::styled(NO_PROBLEMS, theme.no_problems))),
            ReviewRow::Entry(entry) => {
                let indicator = if entry.expanded { "▲" } else { "▼" };
                let mut lines = vec![
                    Line::from(vec![
                        Span::styled(render_label(entry), theme.problem_label),
                        Span::styled(format!(" {}", indicator), theme.text_secondary),
                    ]),
                    Line::from(Span::styled(
                        format!("  Source: \"{}\" | Target: \"{}\"", entry.marker.source_span, entry.marker.target_span),
                        theme.problem_spans,
                    )),
                ];
                if entry.marker.summary.as_deref().is_none_or(|s| s.trim().is_empty()) {
                    lines.push(Line::from(Span::styled("  Reason: No explanation provided", theme.problem_reason)));
                }
                if entry.expanded {
                    let detail = render_detail(entry);
                    for row in wrap_rows(detail, width) {
                        lines.push(Line::from(Span::styled(format!("    {}", clean(&detail[row])), theme.problem_detail)));
                    }
                }
                ListItem::new(lines)
            }
        })
        .collect();

    let open = review.list().entries().iter().filter(|e| e.expanded).count();
    let title = format!("Problems ({}, {} open) [3]", review.list().len(), open);
    let list = List::new(items)
        .block(block.title(title))
        .highlight_symbol("→ ")
        .highlight_style(if focused { theme.cursor } else { Style::default() });
    let mut state = ListState::default();
    if !review.list().is_empty() {
        state.select(Some(review.cursor));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn render_footer<S: SlotStore>(f: &mut Frame, app: &App<S>, theme: &Theme, area: Rect) {
    let verify = if app.controller.is_busy() {
        Span::styled("⏳ Verifying... ", theme.busy)
    } else if app.controller.can_verify() {
        Span::styled("v Verify ", theme.footer_ready)
    } else {
        Span::styled("v Verify (choose both files) ", theme.footer)
    };
    let key_state = if app.settings.api_key.as_deref().is_some_and(|k| !k.is_empty()) { "set" } else { "not set" };
    // Status first; the key hints may be clipped on narrow terminals.
    let lines = vec![
        Line::from(vec![verify, Span::styled(app.status.clone(), theme.text_secondary)]),
        Line::from(Span::styled(
            format!(
                "Model: {} | API key {} | Tab Focus | ↑/↓ Move | Enter Choose/Toggle/Load | r Rescan | m Model | K API key | c Copy | d/X Delete/Clear history | q Quit",
                app.settings.model, key_state
            ),
            theme.footer,
        )),
    ];
    let footer = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

fn render_popup<S: SlotStore>(f: &mut Frame, app: &App<S>, theme: &Theme) {
    let popup_area = centered_rect(60, 30, f.area());
    f.render_widget(Clear, popup_area);
    let style = if app.popup_is_error { theme.popup_error } else { theme.popup };
    let block = Block::default().title(app.popup.title.clone()).borders(Borders::ALL).style(style);
    let para = Paragraph::new(app.popup.text.clone())
        .block(block)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Left)
        .style(theme.popup);
    f.render_widget(para, popup_area);

    let footer_area = Rect {
        x: popup_area.x,
        y: (popup_area.y + popup_area.height).min(f.area().height.saturating_sub(1)),
        width: popup_area.width,
        height: 1,
    };
    f.render_widget(Paragraph::new("Press Esc to close").style(theme.footer), footer_area);
}

fn render_api_key_input(f: &mut Frame, input: &str, theme: &Theme) {
    let popup_area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, popup_area);
    let para = Paragraph::new(vec![
        Line::from(format!("{}▏", mask_key(input))),
        Line::from(""),
        Line::from(Span::styled("Saved as you type. Enter or Esc to finish.", theme.footer)),
    ])
    .block(Block::default().title("API key").borders(Borders::ALL).style(theme.popup))
    .wrap(Wrap { trim: false });
    f.render_widget(para, popup_area);
}

/// Shows only the last four characters of a key.
fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    key.chars()
        .enumerate()
        .map(|(i, c)| if i + 4 < count { '•' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::history::{HistoryStore, MemorySlotStore};
    use crate::models::RawAnalysis;
    use crate::session::SessionController;
    use ratatui::backend::TestBackend;

    fn app(dir: &std::path::Path) -> App<MemorySlotStore> {
        let controller = SessionController::new(HistoryStore::open(MemorySlotStore::default()));
        let mut app = App::new(Settings::load(None).unwrap(), controller, dir.to_path_buf(), dir.to_path_buf());
        app.rescan();
        app
    }

    fn screen(app: &mut App<MemorySlotStore>, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app, &Theme::default())).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .chunks(width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect()
    }

    #[test]
    fn status_is_drawn_in_the_footer() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.status = "Ready: press v to verify".into();
        for width in [100, 160] {
            let rows = screen(&mut app, width, 40);
            assert!(
                rows.iter().any(|r| r.contains("Ready: press v to verify")),
                "status missing at {} columns",
                width
            );
        }
    }

    #[test]
    fn wide_text_is_wrapped_not_clipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ch01.txt"), "x").unwrap();
        let mut app = app(dir.path());
        app.choose_at(Side::Source, 0);
        app.choose_at(Side::Target, 0);
        app.start_analysis().unwrap();
        app.finish_analysis(Ok(RawAnalysis {
            source_text: Some("第一章：狐狸跳过了懒狗然后跑掉了，第二天又回来了".into()),
            target_text: Some("Chapter one".into()),
            markers: Some(vec![]),
        }));

        let rows = screen(&mut app, 100, 40);
        let shown: String = rows.concat().chars().filter(|c| !c.is_ascii() && *c != '│' && *c != '─').collect();
        for ch in "第一章：狐狸跳过了懒狗然后跑掉了，第二天又回来了".chars() {
            assert!(shown.contains(ch), "{} was clipped", ch);
        }
    }

    #[test]
    fn row_line_styles_only_the_marked_part() {
        let text = "ABAB";
        let line = row_line(text, 0..4, Some(&(1..2)), Style::default().bg(Color::Yellow));
        let parts: Vec<_> = line.spans.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(parts, vec!["A", "B", "AB"]);
        assert_eq!(line.spans[1].style.bg, Some(Color::Yellow));
    }

    #[test]
    fn row_line_outside_mark_is_plain() {
        let line = row_line("abc\r", 0..4, Some(&(10..12)), Style::default());
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "abc");
    }

    #[test]
    fn masking_keeps_last_four() {
        assert_eq!(mask_key("sk-abcdef"), "•••••cdef");
        assert_eq!(mask_key("abc"), "abc");
    }
}
