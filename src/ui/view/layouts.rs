//! 布局辅助函数

use ratatui::layout::{Constraint, Direction, Layout, Rect};

const SIDEBAR_WIDTH: u16 = 30;

/// 在区域中居中取一个百分比大小的矩形
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// 切出侧边栏，返回 (侧边栏, 主区域)
pub fn split_sidebar(area: Rect, open: bool) -> (Option<Rect>, Rect) {
    if !open {
        return (None, area);
    }
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(area);
    (Some(chunks[0]), chunks[1])
}
