//! Frame layout: model toggles on the left, prompt and responses on the right.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Gauge, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Tabs,
    },
};

use super::markup::to_plain;
use super::{App, Focus, colors};
use crate::view::{RegionState, ViewNode};

/// Draw the whole frame.
pub fn render(frame: &mut Frame<'_>, app: &App) {
    let [left, right] =
        Layout::horizontal([Constraint::Percentage(32), Constraint::Percentage(68)])
            .areas(frame.area());
    render_models(frame, app, left);

    let [prompt, responses, aggregate, status] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(6),
        Constraint::Length(8),
        Constraint::Length(1),
    ])
    .areas(right);
    render_prompt(frame, app, prompt);
    render_responses(frame, app, responses);
    render_aggregate(frame, app, aggregate);
    render_status(frame, app, status);
}

fn block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused {
        colors::BORDER_FOCUSED
    } else {
        colors::BORDER
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn first_text(state: &RegionState) -> Option<&str> {
    state.children.iter().find_map(|node| match node {
        ViewNode::Text(text) => Some(text.as_str()),
        _ => None,
    })
}

fn render_models(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let focused = app.focus() == Focus::Models;
    let catalog = app.view().catalog.snapshot();
    let selection = app.view().selection.snapshot();

    let mut items = Vec::with_capacity(selection.children.len() + 2);
    if let Some(summary) = first_text(&catalog) {
        items.push(ListItem::new(Line::from(Span::styled(
            summary.to_string(),
            Style::default().fg(colors::TEXT_DIM),
        ))));
        items.push(ListItem::new(Line::default()));
    }

    let mut toggle_index = 0;
    for node in &selection.children {
        match node {
            ViewNode::Heading(provider) => {
                items.push(ListItem::new(Line::from(Span::styled(
                    provider.clone(),
                    Style::default()
                        .fg(colors::PROVIDER)
                        .add_modifier(Modifier::BOLD),
                ))));
            }
            ViewNode::Toggle { label, checked, .. } => {
                let under_cursor = focused && toggle_index == app.cursor();
                let style = if under_cursor {
                    Style::default()
                        .fg(colors::TEXT_PRIMARY)
                        .bg(colors::SURFACE_HIGHLIGHT)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(colors::TEXT_PRIMARY)
                };
                let mark = if *checked { "[x]" } else { "[ ]" };
                let indent = if toggle_index == 0 { "" } else { "  " };
                items.push(ListItem::new(Line::from(vec![
                    Span::raw(indent),
                    Span::styled(
                        mark,
                        Style::default().fg(if *checked {
                            colors::CHECKED
                        } else {
                            colors::TEXT_MUTED
                        }),
                    ),
                    Span::styled(format!(" {label}"), style),
                ])));
                toggle_index += 1;
            }
            _ => {}
        }
    }

    frame.render_widget(List::new(items).block(block(" Models ", focused)), area);
}

fn render_prompt(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let focused = app.focus() == Focus::Prompt;
    let paragraph = Paragraph::new(app.prompt())
        .style(Style::default().fg(colors::TEXT_PRIMARY))
        .block(block(" Prompt (Enter to send) ", focused));
    frame.render_widget(paragraph, area);

    if focused {
        let typed = u16::try_from(app.prompt().chars().count()).unwrap_or(u16::MAX);
        let x = area.x.saturating_add(1).saturating_add(typed);
        let max_x = area.right().saturating_sub(2);
        frame.set_cursor_position((x.min(max_x), area.y + 1));
    }
}

fn render_responses(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let focused = app.focus() == Focus::Output;
    let outer = block(" Responses ", focused);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    if !app.view().outputs.snapshot().visible {
        let hint = Paragraph::new("Select models to see their responses.")
            .style(Style::default().fg(colors::TEXT_MUTED));
        frame.render_widget(hint, inner);
        return;
    }

    let [tab_area, content_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(inner);

    let tabs = app.view().tabs.snapshot();
    let mut titles = Vec::with_capacity(tabs.children.len());
    let mut selected = 0;
    for (index, node) in tabs.children.iter().enumerate() {
        if let ViewNode::Tab { label, active, .. } = node {
            titles.push(Line::from(label.clone()));
            if *active {
                selected = index;
            }
        }
    }
    let strip = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(colors::TEXT_DIM))
        .highlight_style(
            Style::default()
                .fg(colors::BORDER_FOCUSED)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(strip, tab_area);

    let slots = app.view().slots.snapshot();
    let content = slots
        .children
        .iter()
        .find_map(|node| match node {
            ViewNode::Slot {
                markup,
                active: true,
                ..
            } => Some(to_plain(markup.as_str())),
            _ => None,
        })
        .unwrap_or_default();
    render_scrolled(frame, &content, app.response_scroll(), content_area);
}

fn render_aggregate(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let outer = block(" Aggregate ", app.focus() == Focus::Aggregate);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let state = app.view().aggregate.snapshot();
    let content = state
        .children
        .iter()
        .find_map(|node| match node {
            ViewNode::Markup(markup) => Some(to_plain(markup.as_str())),
            _ => None,
        })
        .unwrap_or_default();
    render_scrolled(frame, &content, app.aggregate_scroll(), inner);
}

/// Draw the window of `text` starting at line `scroll`, clamped so the last
/// line stays reachable, with a scrollbar when it overflows.
fn render_scrolled(frame: &mut Frame<'_>, text: &str, scroll: usize, area: Rect) {
    let lines = wrap(text, usize::from(area.width.saturating_sub(1)));
    let visible_height = usize::from(area.height);
    let max_scroll = lines.len().saturating_sub(visible_height);
    let start = scroll.min(max_scroll);
    let end = start.saturating_add(visible_height).min(lines.len());

    let visible: Vec<Line<'_>> = lines[start..end]
        .iter()
        .map(|line| Line::from(line.as_str()))
        .collect();
    let paragraph = Paragraph::new(visible).style(Style::default().fg(colors::TEXT_PRIMARY));
    frame.render_widget(paragraph, area);

    if max_scroll > 0 && area.width != 0 && area.height != 0 {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None)
            .track_symbol(Some("\u{2591}"))
            .track_style(Style::default().fg(colors::TEXT_MUTED))
            .thumb_style(Style::default().fg(colors::TEXT_PRIMARY));
        let mut state = ScrollbarState::new(max_scroll.saturating_add(1))
            .position(start)
            .viewport_content_length(visible_height);
        frame.render_stateful_widget(scrollbar, area, &mut state);
    }
}

/// Word-wrap `text` to `width` columns, breaking words longer than a line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        let mut line = String::new();
        let mut len = 0;
        for word in raw.split(' ') {
            let word_len = word.chars().count();
            if len > 0 && len + 1 + word_len > width {
                lines.push(std::mem::take(&mut line));
                len = 0;
            } else if len > 0 {
                line.push(' ');
                len += 1;
            }
            for c in word.chars() {
                if len == width {
                    lines.push(std::mem::take(&mut line));
                    len = 0;
                }
                line.push(c);
                len += 1;
            }
        }
        lines.push(line);
    }
    lines
}

fn render_status(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let [text_area, gauge_area] =
        Layout::horizontal([Constraint::Min(10), Constraint::Length(24)]).areas(area);

    let view = app.view();
    let busy = view.busy.snapshot();
    let notice = view.notice.snapshot();
    let line = if busy.visible {
        let label = first_text(&busy).unwrap_or("Working...");
        Line::from(Span::styled(
            format!("{} {label}", app.spinner()),
            Style::default().fg(colors::BUSY),
        ))
    } else if let Some(text) = first_text(&notice) {
        Line::from(Span::styled(
            text.to_string(),
            Style::default().fg(colors::NOTICE),
        ))
    } else {
        Line::from(Span::styled(
            "Tab: focus  Space: toggle  \u{2190}/\u{2192}: tabs  PgUp/PgDn: scroll  r: refresh  Esc: quit",
            Style::default().fg(colors::TEXT_MUTED),
        ))
    };
    frame.render_widget(Paragraph::new(line), text_area);

    let progress = view.progress.snapshot();
    if progress.visible {
        let value = progress
            .children
            .iter()
            .find_map(|node| match node {
                ViewNode::Progress(value) => Some(*value),
                _ => None,
            })
            .unwrap_or(0);
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(colors::PROGRESS))
            .percent(u16::from(value.min(100)));
        frame.render_widget(gauge, gauge_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wrap_breaks_on_spaces() {
        assert_eq!(wrap("one two three", 7), vec!["one two", "three"]);
    }

    #[test]
    fn test_wrap_keeps_blank_lines() {
        assert_eq!(wrap("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn test_wrap_splits_long_words() {
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_wrap_zero_width_still_progresses() {
        assert_eq!(wrap("ab", 0), vec!["a", "b"]);
    }
}
