//! 视图状态控制器
//!
//! 四个互斥视图 (Intro / Selection / Chat / Breathing) 的有限状态机，
//! 拥有所有定时器和界面标志。所有操作都接收调用方给出的 `now`，
//! 由事件循环通过 `tick` 推进定时器。

mod reply;
mod timers;

pub use reply::{EchoReplies, ReplyGenerator, fallback_reply};
pub use timers::{TimerEvent, TimerQueue};

use std::rc::Rc;
use std::time::Instant;

use chrono::Local;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Timing;
use crate::error::ControllerError;
use crate::models::{
    BreathPhase, Companion, EntryKind, Message, MessageId, Sender, SidebarEntry, Theme,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Intro,
    Selection,
    Chat,
    Breathing,
}

/// 一次与伙伴的对话
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: Uuid,
    pub companion: Rc<Companion>,
    pub transcript: Vec<Message>,
}

/// 当前视图，侧边栏状态只存在于允许显示侧边栏的视图中
#[derive(Debug, Clone)]
pub enum ViewState {
    Intro,
    Selection {
        sidebar_open: bool,
    },
    Chat {
        session: ChatSession,
        sidebar_open: bool,
    },
    Breathing {
        session: ChatSession,
        entered_at: Instant,
        resume_sidebar: bool,
    },
}

impl ViewState {
    pub fn kind(&self) -> ViewKind {
        match self {
            ViewState::Intro => ViewKind::Intro,
            ViewState::Selection { .. } => ViewKind::Selection,
            ViewState::Chat { .. } => ViewKind::Chat,
            ViewState::Breathing { .. } => ViewKind::Breathing,
        }
    }

    pub fn session(&self) -> Option<&ChatSession> {
        match self {
            ViewState::Chat { session, .. } | ViewState::Breathing { session, .. } => Some(session),
            _ => None,
        }
    }

    fn session_mut(&mut self) -> Option<&mut ChatSession> {
        match self {
            ViewState::Chat { session, .. } | ViewState::Breathing { session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn sidebar_open(&self) -> bool {
        match self {
            ViewState::Selection { sidebar_open } | ViewState::Chat { sidebar_open, .. } => {
                *sidebar_open
            }
            _ => false,
        }
    }
}

/// 交给渲染层的显示标志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiFlags {
    pub sidebar_open: bool,
    pub theme: Theme,
    pub sun_risen: bool,
    pub cards_visible: bool,
}

/// 每次状态提交后推送给订阅者的只读视图
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub view: ViewKind,
    pub flags: UiFlags,
    pub companion: Option<&'a Companion>,
    pub transcript: &'a [Message],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&Snapshot<'_>)>;

pub struct ViewStateController {
    catalog: Vec<Rc<Companion>>,
    timing: Timing,
    replies: Box<dyn ReplyGenerator>,
    view: ViewState,
    theme: Theme,
    sun_risen: bool,
    history: Vec<SidebarEntry>,
    timers: TimerQueue,
    next_message_id: MessageId,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    started: bool,
    disposed: bool,
}

impl ViewStateController {
    pub fn new(catalog: Vec<Companion>, timing: Timing, replies: Box<dyn ReplyGenerator>) -> Self {
        Self {
            catalog: catalog.into_iter().map(Rc::new).collect(),
            timing,
            replies,
            view: ViewState::Intro,
            theme: Theme::default(),
            sun_risen: false,
            history: Vec::new(),
            timers: TimerQueue::new(),
            next_message_id: 1,
            listeners: Vec::new(),
            next_subscription: 0,
            started: false,
            disposed: false,
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_history(mut self, history: Vec<SidebarEntry>) -> Self {
        self.history = history;
        self
    }

    // ============ 查询 ============

    pub fn view_kind(&self) -> ViewKind {
        self.view.kind()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn catalog(&self) -> &[Rc<Companion>] {
        &self.catalog
    }

    pub fn history(&self) -> &[SidebarEntry] {
        &self.history
    }

    pub fn selected_companion(&self) -> Option<&Companion> {
        self.view.session().map(|s| s.companion.as_ref())
    }

    pub fn transcript(&self) -> &[Message] {
        self.view
            .session()
            .map(|s| s.transcript.as_slice())
            .unwrap_or(&[])
    }

    pub fn flags(&self) -> UiFlags {
        UiFlags {
            sidebar_open: self.view.sidebar_open(),
            theme: self.theme,
            sun_risen: self.sun_risen,
            cards_visible: self.view.kind() == ViewKind::Selection,
        }
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            view: self.view.kind(),
            flags: self.flags(),
            companion: self.selected_companion(),
            transcript: self.transcript(),
        }
    }

    /// 呼吸练习当前阶段，仅在 Breathing 视图中有值
    pub fn breath_phase(&self, now: Instant) -> Option<(BreathPhase, f64)> {
        match &self.view {
            ViewState::Breathing { entered_at, .. } => {
                let elapsed = now.saturating_duration_since(*entered_at);
                let half = self.timing.breath_half_period();
                Some((
                    BreathPhase::at(elapsed, half),
                    BreathPhase::progress(elapsed, half),
                ))
            }
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    #[cfg(test)]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    #[cfg(test)]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ============ 订阅 ============

    pub fn subscribe(&mut self, listener: impl FnMut(&Snapshot<'_>) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        debug!(subscription = id.0, "listener subscribed");
        id
    }

    #[cfg(test)]
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let mut listeners = std::mem::take(&mut self.listeners);
        {
            let snapshot = self.snapshot();
            for (_, listener) in listeners.iter_mut() {
                listener(&snapshot);
            }
        }
        self.listeners = listeners;
    }

    // ============ 定时器 ============

    /// 登记开场动画的两个定时器，只会生效一次
    pub fn start(&mut self, now: Instant) -> bool {
        if self.started || self.disposed {
            debug!("entrance sequence already armed");
            return false;
        }
        self.started = true;
        self.timers
            .schedule(now + self.timing.sun_rise(), TimerEvent::SunRise);
        self.timers
            .schedule(now + self.timing.reveal_cards(), TimerEvent::RevealCards);
        info!(
            sun_rise_ms = self.timing.sun_rise_ms,
            reveal_cards_ms = self.timing.reveal_cards_ms,
            "entrance sequence armed"
        );
        true
    }

    /// 执行所有已到期的定时器，返回执行数量
    pub fn tick(&mut self, now: Instant) -> usize {
        if self.disposed {
            return 0;
        }
        let mut fired = 0;
        while let Some((_, event)) = self.timers.pop_due(now) {
            self.fire(event);
            fired += 1;
        }
        fired
    }

    fn fire(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::SunRise => {
                if !self.sun_risen {
                    self.sun_risen = true;
                    debug!("sun risen");
                    self.notify();
                }
            }
            TimerEvent::RevealCards => {
                if let ViewState::Intro = self.view {
                    self.sun_risen = true;
                    self.view = ViewState::Selection {
                        sidebar_open: false,
                    };
                    info!("intro finished, showing companion selection");
                    self.notify();
                } else {
                    debug!(view = ?self.view.kind(), "reveal timer ignored outside intro");
                }
            }
            TimerEvent::Reply { session, prompt } => self.deliver_reply(session, prompt),
        }
    }

    fn deliver_reply(&mut self, session_id: Uuid, prompt: MessageId) {
        let Some(session) = self.view.session_mut().filter(|s| s.id == session_id) else {
            debug!(%session_id, prompt, "stale reply suppressed");
            return;
        };

        let prompt_text = session
            .transcript
            .iter()
            .find(|m| m.id == prompt)
            .map(|m| m.text.clone())
            .unwrap_or_default();

        let text = self
            .replies
            .reply(&session.companion, &session.transcript, &prompt_text)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| {
                warn!(companion = %session.companion.id, "reply generator gave nothing, using fallback");
                fallback_reply(&session.companion)
            });

        let id = self.next_message_id;
        self.next_message_id += 1;
        session
            .transcript
            .push(Message::new(id, text, Sender::Companion));
        debug!(id, prompt, "companion replied");
        self.notify();
    }

    // ============ 用户操作 ============

    pub fn select_companion(&mut self, id: &str) -> Result<(), ControllerError> {
        if !matches!(self.view, ViewState::Selection { .. }) {
            return Err(ControllerError::InvalidTransition {
                event: "select_companion",
                from: self.view.kind(),
            });
        }
        let companion = self
            .catalog
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| ControllerError::InvalidSelection(id.to_string()))?;

        let greeting = Message::new(
            self.next_message_id,
            companion.greeting_text(),
            Sender::Companion,
        );
        self.next_message_id += 1;

        let session = ChatSession {
            id: Uuid::new_v4(),
            companion,
            transcript: vec![greeting],
        };
        info!(companion = %session.companion.id, session = %session.id, "chat started");
        self.view = ViewState::Chat {
            session,
            sidebar_open: true,
        };
        self.notify();
        Ok(())
    }

    /// 追加用户消息并登记一次延迟回复，返回消息 ID
    pub fn send_message(&mut self, text: &str, now: Instant) -> Result<MessageId, ControllerError> {
        let from = self.view.kind();
        let ViewState::Chat { session, .. } = &mut self.view else {
            return Err(ControllerError::InvalidTransition {
                event: "send_message",
                from,
            });
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(ControllerError::EmptyInput);
        }

        let id = self.next_message_id;
        self.next_message_id += 1;
        session.transcript.push(Message::new(id, text, Sender::User));
        let session_id = session.id;

        self.timers.schedule(
            now + self.timing.reply_delay(),
            TimerEvent::Reply {
                session: session_id,
                prompt: id,
            },
        );
        debug!(id, "message sent, reply scheduled");
        self.notify();
        Ok(id)
    }

    pub fn open_breathing(&mut self, now: Instant) -> Result<(), ControllerError> {
        match std::mem::replace(&mut self.view, ViewState::Intro) {
            ViewState::Chat {
                session,
                sidebar_open,
            } => {
                self.view = ViewState::Breathing {
                    session,
                    entered_at: now,
                    resume_sidebar: sidebar_open,
                };
                info!("breathing break opened");
                self.notify();
                Ok(())
            }
            other => {
                let from = other.kind();
                self.view = other;
                Err(ControllerError::InvalidTransition {
                    event: "open_breathing",
                    from,
                })
            }
        }
    }

    pub fn close_breathing(&mut self) -> Result<(), ControllerError> {
        match std::mem::replace(&mut self.view, ViewState::Intro) {
            ViewState::Breathing {
                session,
                resume_sidebar,
                ..
            } => {
                self.view = ViewState::Chat {
                    session,
                    sidebar_open: resume_sidebar,
                };
                info!("breathing break closed");
                self.notify();
                Ok(())
            }
            other => {
                let from = other.kind();
                self.view = other;
                Err(ControllerError::InvalidTransition {
                    event: "close_breathing",
                    from,
                })
            }
        }
    }

    /// 结束当前对话并回到伙伴选择
    pub fn new_chat(&mut self) -> Result<(), ControllerError> {
        match std::mem::replace(&mut self.view, ViewState::Intro) {
            ViewState::Chat { session, .. } => {
                let cancelled = self.timers.cancel_matching(
                    |e| matches!(e, TimerEvent::Reply { session: s, .. } if *s == session.id),
                );
                self.archive(&session);
                self.view = ViewState::Selection {
                    sidebar_open: false,
                };
                info!(session = %session.id, cancelled, "chat ended");
                self.notify();
                Ok(())
            }
            other => {
                let from = other.kind();
                self.view = other;
                Err(ControllerError::InvalidTransition {
                    event: "new_chat",
                    from,
                })
            }
        }
    }

    fn archive(&mut self, session: &ChatSession) {
        let Some(first) = session.transcript.iter().find(|m| m.sender == Sender::User) else {
            return;
        };
        let mut snippet: String = first.text.chars().take(24).collect();
        if first.text.chars().count() > 24 {
            snippet.push('…');
        }
        let label = format!("{}: {}", session.companion.display_name, snippet);
        self.history.insert(
            0,
            SidebarEntry::new(label, Local::now().time(), EntryKind::Chat),
        );
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if self.theme != theme {
            self.theme = theme;
            debug!(?theme, "theme changed");
            self.notify();
        }
    }

    pub fn toggle_sidebar(&mut self) -> Result<bool, ControllerError> {
        let open = match &mut self.view {
            ViewState::Selection { sidebar_open } | ViewState::Chat { sidebar_open, .. } => {
                *sidebar_open = !*sidebar_open;
                *sidebar_open
            }
            other => {
                return Err(ControllerError::InvalidTransition {
                    event: "toggle_sidebar",
                    from: other.kind(),
                });
            }
        };
        self.notify();
        Ok(open)
    }

    /// 取消所有定时器并断开订阅者，之后到期的事件一律丢弃
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let cancelled = self.timers.cancel_all();
        self.listeners.clear();
        self.disposed = true;
        info!(cancelled, "controller disposed");
    }
}

impl Drop for ViewStateController {
    fn drop(&mut self) {
        self.dispose();
    }
}
