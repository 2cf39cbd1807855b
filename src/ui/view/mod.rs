//! 视图层模块
//!
//! 包含主渲染入口和各个视图，渲染只读取状态，不修改状态

pub mod components;
pub mod layouts;

use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};

use super::state::App;
use crate::controller::{Snapshot, UiFlags, ViewKind};
use crate::models::{BreathPhase, EntryKind, Sender, Theme};
use components::{Palette, accent_color, palette, render_input_widget, render_panel};
use layouts::{centered_rect, split_sidebar};

/// 渲染 UI
pub fn render(frame: &mut Frame, app: &App, now: Instant) {
    let snapshot = app.controller.snapshot();
    let flags = snapshot.flags;
    let palette = palette(flags.theme);

    frame.render_widget(
        Block::default().style(Style::default().bg(palette.bg).fg(palette.fg)),
        frame.area(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // 标题
            Constraint::Min(8),    // 主体
            Constraint::Length(3), // 帮助
        ])
        .split(frame.area());

    render_header(frame, &snapshot, &palette, chunks[0]);

    let (sidebar, main) = split_sidebar(chunks[1], flags.sidebar_open);
    if let Some(area) = sidebar {
        render_sidebar(frame, app, &snapshot, &palette, area);
    }

    match snapshot.view {
        ViewKind::Intro => render_intro(frame, &flags, &palette, main),
        ViewKind::Selection => render_selection(frame, app, &flags, &palette, main),
        ViewKind::Chat => render_chat(frame, app, &snapshot, &palette, main),
        ViewKind::Breathing => render_breathing(frame, app, &snapshot, &palette, chunks[1], now),
    }

    render_help(frame, app, snapshot.view, &palette, chunks[2]);
}

fn render_header(frame: &mut Frame, snapshot: &Snapshot<'_>, palette: &Palette, area: Rect) {
    let theme_label = match snapshot.flags.theme {
        Theme::Light => "☀ Light",
        Theme::Dark => "☾ Dark",
    };
    let title = match snapshot.companion {
        Some(companion) => format!("Solace · {}", companion.display_name),
        None => "Solace".to_string(),
    };

    let line = Line::from(vec![
        Span::styled(
            title,
            Style::default().fg(palette.sun).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(theme_label, Style::default().fg(palette.muted)),
    ]);
    let header = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.border)),
    );
    frame.render_widget(header, area);
}

fn render_sidebar(
    frame: &mut Frame,
    app: &App,
    snapshot: &Snapshot<'_>,
    palette: &Palette,
    area: Rect,
) {
    let inner = render_panel(frame, area, "History", palette);

    // 只有对话中才能开新对话
    let mut items = Vec::new();
    if snapshot.view == ViewKind::Chat {
        items.push(ListItem::new(Line::from(Span::styled(
            "+ New Chat (Ctrl-N)",
            Style::default().fg(palette.fg).add_modifier(Modifier::BOLD),
        ))));
    }
    items.extend(app.controller.history().iter().map(|entry| {
        let icon = match entry.kind {
            EntryKind::Chat => "💬",
            EntryKind::Focus => "▦",
        };
        ListItem::new(Line::from(vec![
            Span::raw(format!("{icon} {}", entry.label)),
            Span::styled(
                format!("  {}", entry.time_label()),
                Style::default().fg(palette.muted),
            ),
        ]))
    }));

    frame.render_widget(List::new(items), inner);
}

fn render_intro(frame: &mut Frame, flags: &UiFlags, palette: &Palette, area: Rect) {
    // 太阳升起前停在下方
    let top_padding = if flags.sun_risen {
        area.height / 6
    } else {
        area.height / 2
    };

    let sun_style = if flags.sun_risen {
        Style::default().fg(palette.sun).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.muted)
    };

    let mut lines: Vec<Line> = (0..top_padding).map(|_| Line::raw("")).collect();
    lines.push(Line::styled("\\  |  /", sun_style));
    lines.push(Line::styled("-- ( ☀ ) --", sun_style));
    lines.push(Line::styled("/  |  \\", sun_style));
    lines.push(Line::raw(""));
    if flags.sun_risen {
        lines.push(Line::styled(
            "Good to see you. Take a slow breath.",
            Style::default().fg(palette.fg),
        ));
    }

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn render_selection(frame: &mut Frame, app: &App, flags: &UiFlags, palette: &Palette, area: Rect) {
    if !flags.cards_visible {
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(6)])
        .split(area);

    frame.render_widget(
        Paragraph::new("Who would you like to talk to?")
            .alignment(Alignment::Center)
            .style(Style::default().fg(palette.fg).add_modifier(Modifier::BOLD)),
        rows[0],
    );

    let catalog = app.controller.catalog();
    if catalog.is_empty() {
        return;
    }
    let constraints: Vec<Constraint> = catalog
        .iter()
        .map(|_| Constraint::Ratio(1, catalog.len() as u32))
        .collect();
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(rows[1]);

    for (i, companion) in catalog.iter().enumerate() {
        let accent = accent_color(&companion.theme_accent);
        let focused = i == app.card_cursor;
        let border_style = if focused {
            Style::default().fg(accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.border)
        };
        let marker = if focused { "▶ " } else { "  " };

        let body = vec![
            Line::styled(
                format!("{marker}{}", companion.display_name),
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ),
            Line::styled(companion.avatar_ref.clone(), Style::default().fg(palette.muted)),
            Line::raw(""),
            Line::raw(companion.greeting_text()),
        ];
        let card = Paragraph::new(body).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style),
        );
        frame.render_widget(card, cards[i]);
    }
}

fn render_chat(
    frame: &mut Frame,
    app: &App,
    snapshot: &Snapshot<'_>,
    palette: &Palette,
    area: Rect,
) {
    let Some(companion) = snapshot.companion else {
        return;
    };
    let accent = accent_color(&companion.theme_accent);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let transcript = snapshot.transcript;
    let items: Vec<ListItem> = transcript
        .iter()
        .map(|message| {
            let (name, style) = match message.sender {
                Sender::User => ("You", Style::default().fg(palette.fg)),
                Sender::Companion => (companion.display_name.as_str(), Style::default().fg(accent)),
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(name.to_string(), style.add_modifier(Modifier::BOLD)),
                    Span::styled(
                        format!("  {}", message.sent_at.format("%H:%M")),
                        Style::default().fg(palette.muted),
                    ),
                ]),
                Line::styled(format!("  {}", message.text), style),
            ])
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.border)),
    );
    let mut state = ListState::default();
    state.select(transcript.len().checked_sub(1));
    frame.render_stateful_widget(list, chunks[0], &mut state);

    render_input_widget(frame, chunks[1], "Message", &app.input_buffer, true, accent);
}

fn render_breathing(
    frame: &mut Frame,
    app: &App,
    snapshot: &Snapshot<'_>,
    palette: &Palette,
    area: Rect,
    now: Instant,
) {
    let Some((phase, progress)) = app.controller.breath_phase(now) else {
        return;
    };
    let inner = render_panel(frame, area, "Breathing Break", palette);
    let overlay = centered_rect(60, 60, inner);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(overlay);

    frame.render_widget(
        Paragraph::new(phase.label().to_uppercase())
            .alignment(Alignment::Center)
            .style(Style::default().fg(palette.sun).add_modifier(Modifier::BOLD)),
        chunks[0],
    );

    // 吸气时圆圈变大，呼气时变小
    let fill = match phase {
        BreathPhase::In => progress,
        BreathPhase::Out => 1.0 - progress,
    };
    frame.render_widget(
        Gauge::default()
            .block(Block::default().borders(Borders::ALL))
            .gauge_style(Style::default().fg(palette.sun))
            .ratio(fill.clamp(0.0, 1.0))
            .label(""),
        chunks[1],
    );

    // 冥想图片位于呼吸圈中央
    if let Some(companion) = snapshot.companion {
        let lines = vec![
            Line::styled(
                companion.media_ref.clone(),
                Style::default().fg(accent_color(&companion.theme_accent)),
            ),
            Line::styled(
                format!("{} is breathing with you", companion.display_name),
                Style::default().fg(palette.muted),
            ),
        ];
        frame.render_widget(
            Paragraph::new(lines).alignment(Alignment::Center),
            chunks[2],
        );
    }
}

fn render_help(frame: &mut Frame, app: &App, view: ViewKind, palette: &Palette, area: Rect) {
    let help_text = match view {
        ViewKind::Intro => "[t] theme  [q] quit",
        ViewKind::Selection => "[←/→] choose  [Enter] chat  [s] sidebar  [t] theme  [q] quit",
        ViewKind::Chat => {
            "[Enter] send  [Ctrl-B] breathe  [Ctrl-N] new chat  [Tab] sidebar  [Ctrl-T] theme  [Ctrl-C] quit"
        }
        ViewKind::Breathing => "[Esc] back to chat",
    };

    let message = app.message.as_deref().unwrap_or("");
    let text = if message.is_empty() {
        help_text.to_string()
    } else {
        format!("{}  |  {}", help_text, message)
    };

    let help = Paragraph::new(text)
        .style(Style::default().fg(palette.muted))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border)),
        );

    frame.render_widget(help, area);
}
