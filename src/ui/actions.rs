//! Action 枚举定义 (Intent)
//!
//! 用户交互转化为明确的语义化 Action

/// 用户操作枚举
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,

    // 伙伴选择
    CursorPrev,
    CursorNext,
    SelectCompanion,

    // 聊天输入
    Input(char), // 输入字符
    DeleteChar,  // Backspace
    Submit,      // Enter

    // 视图切换
    OpenBreathing,
    CloseBreathing,
    NewChat,

    // 显示
    ToggleSidebar,
    FlipTheme,
}
