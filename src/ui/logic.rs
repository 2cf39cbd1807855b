//! 业务逻辑处理 (Update/Dispatch)
//!
//! 把 Action 转成控制器调用，控制器拒绝的操作在这里吸收掉

use std::time::Instant;

use tracing::debug;

use super::actions::Action;
use super::state::App;
use crate::controller::ViewKind;
use crate::error::ControllerError;

impl App {
    /// 核心逻辑分发，返回 true 表示退出
    pub fn dispatch(&mut self, action: Action, now: Instant) -> bool {
        let result = match action {
            Action::Quit => return true,

            Action::CursorPrev => {
                self.move_cursor(false);
                Ok(())
            }
            Action::CursorNext => {
                self.move_cursor(true);
                Ok(())
            }
            Action::SelectCompanion => self.select_at_cursor(),

            Action::Input(c) => {
                if self.controller.view_kind() == ViewKind::Chat {
                    self.input_buffer.push(c);
                }
                Ok(())
            }
            Action::DeleteChar => {
                self.input_buffer.pop();
                Ok(())
            }
            Action::Submit => self.submit(now),

            Action::OpenBreathing => self.controller.open_breathing(now),
            Action::CloseBreathing => self.controller.close_breathing(),
            Action::NewChat => self.new_chat(),

            Action::ToggleSidebar => self.controller.toggle_sidebar().map(|_| ()),
            Action::FlipTheme => {
                let theme = self.controller.theme().flipped();
                self.controller.set_theme(theme);
                Ok(())
            }
        };

        if let Err(err) = result {
            self.absorb(err);
        }
        self.mark_dirty();
        false
    }

    // ============ 伙伴选择 ============

    /// 移动卡片光标（循环）
    pub fn move_cursor(&mut self, forward: bool) {
        let len = self.controller.catalog().len();
        if len == 0 {
            return;
        }
        self.card_cursor = if forward {
            (self.card_cursor + 1) % len
        } else {
            (self.card_cursor + len - 1) % len
        };
    }

    pub fn select_at_cursor(&mut self) -> Result<(), ControllerError> {
        let id = self
            .cursor_companion()
            .map(|c| c.id.clone())
            .unwrap_or_default();
        self.controller.select_companion(&id)?;
        self.message = None;
        Ok(())
    }

    // ============ 聊天 ============

    /// 发送输入框内容，成功后清空输入框
    pub fn submit(&mut self, now: Instant) -> Result<(), ControllerError> {
        self.controller.send_message(&self.input_buffer, now)?;
        self.input_buffer.clear();
        Ok(())
    }

    pub fn new_chat(&mut self) -> Result<(), ControllerError> {
        self.controller.new_chat()?;
        self.input_buffer.clear();
        self.card_cursor = 0;
        self.message = Some("Chat saved to history".to_string());
        Ok(())
    }

    // ============ 通用操作 ============

    /// 控制器拒绝的操作只记录日志，界面保持原状
    fn absorb(&mut self, err: ControllerError) {
        match err {
            ControllerError::EmptyInput => self.input_buffer.clear(),
            ControllerError::InvalidSelection(_) | ControllerError::InvalidTransition { .. } => {}
        }
        debug!(%err, "action ignored");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::Timing;
    use crate::controller::{EchoReplies, ViewStateController};
    use crate::models::{Sender, Theme, default_catalog};

    fn app_in_selection(t0: Instant) -> App {
        let mut controller =
            ViewStateController::new(default_catalog(), Timing::default(), Box::new(EchoReplies));
        controller.start(t0);
        controller.tick(t0 + Duration::from_millis(2000));
        App::new(controller)
    }

    fn type_text(app: &mut App, text: &str, now: Instant) {
        for c in text.chars() {
            app.dispatch(Action::Input(c), now);
        }
    }

    #[test]
    fn test_quit() {
        let t0 = Instant::now();
        let mut app = app_in_selection(t0);
        assert!(app.dispatch(Action::Quit, t0));
        assert!(!app.dispatch(Action::CursorNext, t0));
    }

    #[test]
    fn test_cursor_wraps_and_selects() {
        let t0 = Instant::now();
        let mut app = app_in_selection(t0);
        app.dispatch(Action::CursorPrev, t0);
        assert_eq!(app.card_cursor, 1);
        app.dispatch(Action::CursorNext, t0);
        assert_eq!(app.card_cursor, 0);
        app.dispatch(Action::CursorNext, t0);

        app.dispatch(Action::SelectCompanion, t0);
        assert_eq!(app.controller.view_kind(), ViewKind::Chat);
        assert_eq!(app.controller.selected_companion().unwrap().id, "biscuit");
    }

    #[test]
    fn test_type_and_submit() {
        let t0 = Instant::now();
        let mut app = app_in_selection(t0);
        app.dispatch(Action::SelectCompanion, t0);

        type_text(&mut app, "hi!", t0);
        app.dispatch(Action::DeleteChar, t0);
        assert_eq!(app.input_buffer, "hi");

        app.dispatch(Action::Submit, t0);
        assert!(app.input_buffer.is_empty());
        let last = app.controller.transcript().last().unwrap();
        assert_eq!((last.sender, last.text.as_str()), (Sender::User, "hi"));

        app.controller.tick(t0 + Duration::from_millis(1200));
        assert_eq!(app.controller.transcript().len(), 3);
    }

    #[test]
    fn test_blank_submit_absorbed() {
        let t0 = Instant::now();
        let mut app = app_in_selection(t0);
        app.dispatch(Action::SelectCompanion, t0);
        type_text(&mut app, "   ", t0);
        assert!(!app.dispatch(Action::Submit, t0));
        assert!(app.input_buffer.is_empty());
        assert_eq!(app.controller.transcript().len(), 1);
    }

    #[test]
    fn test_input_ignored_outside_chat() {
        let t0 = Instant::now();
        let mut app = app_in_selection(t0);
        app.dispatch(Action::Input('x'), t0);
        assert!(app.input_buffer.is_empty());
    }

    #[test]
    fn test_breathing_and_new_chat() {
        let t0 = Instant::now();
        let mut app = app_in_selection(t0);
        app.dispatch(Action::SelectCompanion, t0);
        type_text(&mut app, "hello", t0);
        app.dispatch(Action::Submit, t0);

        app.dispatch(Action::OpenBreathing, t0);
        assert_eq!(app.controller.view_kind(), ViewKind::Breathing);
        app.dispatch(Action::NewChat, t0);
        assert_eq!(app.controller.view_kind(), ViewKind::Breathing);
        app.dispatch(Action::CloseBreathing, t0);

        app.dispatch(Action::NewChat, t0);
        assert_eq!(app.controller.view_kind(), ViewKind::Selection);
        assert_eq!(app.message.as_deref(), Some("Chat saved to history"));
        assert_eq!(app.controller.history()[0].label, "Mochi: hello");
    }

    #[test]
    fn test_flip_theme_and_redraw() {
        let t0 = Instant::now();
        let mut app = app_in_selection(t0);
        assert!(app.take_redraw());
        assert!(!app.take_redraw());

        app.dispatch(Action::FlipTheme, t0);
        assert_eq!(app.controller.theme(), Theme::Dark);
        assert!(app.take_redraw());
        app.dispatch(Action::FlipTheme, t0);
        assert_eq!(app.controller.theme(), Theme::Light);
    }
}
