//! App 状态定义 (Model)
//!
//! 控制器之外的纯界面状态：输入框、卡片光标、状态栏消息

use std::cell::Cell;
use std::rc::Rc;

use crate::controller::{ViewKind, ViewStateController};
use crate::models::Companion;

/// 应用状态
pub struct App {
    pub controller: ViewStateController,
    pub input_buffer: String,
    pub card_cursor: usize,
    pub message: Option<String>,
    dirty: Rc<Cell<bool>>,
}

impl App {
    /// 创建新的应用实例，并订阅控制器的状态提交
    pub fn new(mut controller: ViewStateController) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&dirty);
        controller.subscribe(move |_| flag.set(true));

        Self {
            controller,
            input_buffer: String::new(),
            card_cursor: 0,
            message: None,
            dirty,
        }
    }

    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    /// 是否需要重绘；呼吸视图的文字随时间变化，总是重绘
    pub fn take_redraw(&self) -> bool {
        let dirty = self.dirty.replace(false);
        dirty || self.controller.view_kind() == ViewKind::Breathing
    }

    /// 光标所在的伙伴卡片
    pub fn cursor_companion(&self) -> Option<&Companion> {
        self.controller
            .catalog()
            .get(self.card_cursor)
            .map(|c| c.as_ref())
    }
}
