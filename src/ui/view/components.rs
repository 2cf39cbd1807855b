//! 通用 UI 组件
//!
//! 配色、面板、输入框等通用组件

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::models::Theme;

/// 主题配色
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub muted: Color,
    pub sun: Color,
    pub border: Color,
}

pub fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            bg: Color::Rgb(255, 242, 227),
            fg: Color::Rgb(51, 65, 85),
            muted: Color::Rgb(120, 113, 108),
            sun: Color::Rgb(245, 158, 11),
            border: Color::Rgb(214, 196, 180),
        },
        Theme::Dark => Palette {
            bg: Color::Rgb(15, 23, 42),
            fg: Color::Rgb(226, 232, 240),
            muted: Color::Rgb(148, 163, 184),
            sun: Color::Rgb(253, 230, 138),
            border: Color::Rgb(71, 85, 105),
        },
    }
}

/// 解析 "#RRGGBB"，无法解析时退回青色
pub fn accent_color(hex: &str) -> Color {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Color::Cyan;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Cyan,
    }
}

/// [组件] 带边框的面板，返回内部区域
pub fn render_panel(frame: &mut Frame, area: Rect, title: &str, palette: &Palette) -> Rect {
    frame.render_widget(Clear, area);
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .style(Style::default().bg(palette.bg).fg(palette.fg));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    inner
}

/// [组件] 带有标题和样式的输入框
pub fn render_input_widget(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    value: &str,
    is_focused: bool,
    active_color: Color,
) {
    let style = if is_focused {
        Style::default()
            .fg(active_color)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };

    let input = Paragraph::new(value.to_string())
        .style(style)
        .wrap(Wrap { trim: false })
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(input, area);
}
