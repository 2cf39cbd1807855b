//! 键盘事件映射 (Input -> Action)
//!
//! 将按键事件转换为 Action

use std::io;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::actions::Action;
use super::state::App;
use crate::controller::ViewKind;

/// 根据当前视图和按键获取对应的 Action
pub fn get_action(view: ViewKind, key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('t') => Some(Action::FlipTheme),
            KeyCode::Char('b') if view == ViewKind::Chat => Some(Action::OpenBreathing),
            KeyCode::Char('n') if view == ViewKind::Chat => Some(Action::NewChat),
            KeyCode::Char('s') if view == ViewKind::Chat => Some(Action::ToggleSidebar),
            _ => None,
        };
    }

    match view {
        ViewKind::Intro => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('t') => Some(Action::FlipTheme),
            _ => None,
        },
        ViewKind::Selection => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('h') | KeyCode::Char('k') | KeyCode::Left | KeyCode::Up => {
                Some(Action::CursorPrev)
            }
            KeyCode::Char('l') | KeyCode::Char('j') | KeyCode::Right | KeyCode::Down => {
                Some(Action::CursorNext)
            }
            KeyCode::Enter | KeyCode::Char(' ') => Some(Action::SelectCompanion),
            KeyCode::Char('s') => Some(Action::ToggleSidebar),
            KeyCode::Char('t') => Some(Action::FlipTheme),
            _ => None,
        },
        ViewKind::Chat => match key.code {
            KeyCode::Enter => Some(Action::Submit),
            KeyCode::Backspace => Some(Action::DeleteChar),
            KeyCode::Tab => Some(Action::ToggleSidebar),
            KeyCode::Char(c) => Some(Action::Input(c)),
            _ => None,
        },
        ViewKind::Breathing => match key.code {
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Enter | KeyCode::Char('q') => {
                Some(Action::CloseBreathing)
            }
            _ => None,
        },
    }
}

/// 处理按键事件，返回 true 表示退出
pub fn handle_key_event(app: &mut App, key: KeyEvent, now: Instant) -> io::Result<bool> {
    if let Some(action) = get_action(app.controller.view_kind(), key) {
        Ok(app.dispatch(action, now))
    } else {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_chat_typing_is_input() {
        assert_eq!(
            get_action(ViewKind::Chat, key(KeyCode::Char('q'))),
            Some(Action::Input('q'))
        );
        assert_eq!(get_action(ViewKind::Chat, key(KeyCode::Enter)), Some(Action::Submit));
        assert_eq!(get_action(ViewKind::Chat, ctrl('b')), Some(Action::OpenBreathing));
        assert_eq!(get_action(ViewKind::Chat, ctrl('n')), Some(Action::NewChat));
    }

    #[test]
    fn test_chat_only_shortcuts() {
        assert_eq!(get_action(ViewKind::Selection, ctrl('b')), None);
        assert_eq!(get_action(ViewKind::Breathing, ctrl('n')), None);
        assert_eq!(get_action(ViewKind::Intro, ctrl('s')), None);
    }

    #[test]
    fn test_global_shortcuts() {
        for view in [
            ViewKind::Intro,
            ViewKind::Selection,
            ViewKind::Chat,
            ViewKind::Breathing,
        ] {
            assert_eq!(get_action(view, ctrl('c')), Some(Action::Quit));
            assert_eq!(get_action(view, ctrl('t')), Some(Action::FlipTheme));
        }
    }

    #[test]
    fn test_selection_keys() {
        assert_eq!(get_action(ViewKind::Selection, key(KeyCode::Right)), Some(Action::CursorNext));
        assert_eq!(get_action(ViewKind::Selection, key(KeyCode::Char('h'))), Some(Action::CursorPrev));
        assert_eq!(
            get_action(ViewKind::Selection, key(KeyCode::Enter)),
            Some(Action::SelectCompanion)
        );
        assert_eq!(get_action(ViewKind::Selection, key(KeyCode::Char('q'))), Some(Action::Quit));
    }

    #[test]
    fn test_breathing_back() {
        assert_eq!(get_action(ViewKind::Breathing, key(KeyCode::Esc)), Some(Action::CloseBreathing));
        assert_eq!(get_action(ViewKind::Breathing, key(KeyCode::Char('x'))), None);
    }
}
