//! 回复生成器接口
//!
//! 伙伴的“智能”只是延迟回声，控制器在回复定时器到期时调用一次。

use crate::models::{Companion, Message};

pub trait ReplyGenerator {
    /// 返回 None 或空白文本时控制器会使用兜底回复
    fn reply(&mut self, companion: &Companion, transcript: &[Message], prompt: &str)
    -> Option<String>;
}

/// 默认实现：复述用户的话
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoReplies;

impl ReplyGenerator for EchoReplies {
    fn reply(
        &mut self,
        companion: &Companion,
        _transcript: &[Message],
        prompt: &str,
    ) -> Option<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }
        Some(format!(
            "{} hears you: \"{}\". Tell me more?",
            companion.display_name, prompt
        ))
    }
}

/// 生成器没有给出内容时的兜底回复
pub fn fallback_reply(companion: &Companion) -> String {
    format!("{} purrs softly and stays close.", companion.display_name)
}
