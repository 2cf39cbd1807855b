//! 可取消的一次性定时器队列
//!
//! 队列只记录截止时间，由事件循环调用 `pop_due` 驱动，不创建线程。

use std::time::Instant;

use uuid::Uuid;

use crate::models::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// 定时器到期时要执行的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    SunRise,
    RevealCards,
    Reply { session: Uuid, prompt: MessageId },
}

#[derive(Debug)]
struct PendingTimer {
    id: TimerId,
    deadline: Instant,
    event: TimerEvent,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    pending: Vec<PendingTimer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: Instant, event: TimerEvent) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(PendingTimer {
            id,
            deadline,
            event,
        });
        id
    }

    #[cfg(test)]
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.id != id);
        self.pending.len() != before
    }

    /// 取消所有满足条件的定时器，返回取消数量
    pub fn cancel_matching(&mut self, pred: impl Fn(&TimerEvent) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|t| !pred(&t.event));
        before - self.pending.len()
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|t| t.deadline).min()
    }

    /// 取出一个已到期的定时器：截止时间最早者优先，相同时按登记顺序
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, TimerEvent)> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| (t.deadline, t.id))
            .map(|(i, _)| i)?;
        let timer = self.pending.remove(index);
        Some((timer.id, timer.event))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, pred: impl Fn(&TimerEvent) -> bool) -> bool {
        self.pending.iter().any(|t| pred(&t.event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_pop_due_in_deadline_order() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(t0 + ms(2000), TimerEvent::RevealCards);
        queue.schedule(t0 + ms(100), TimerEvent::SunRise);

        assert_eq!(queue.next_deadline(), Some(t0 + ms(100)));
        assert!(queue.pop_due(t0 + ms(99)).is_none());

        let (_, first) = queue.pop_due(t0 + ms(5000)).unwrap();
        let (_, second) = queue.pop_due(t0 + ms(5000)).unwrap();
        assert_eq!(first, TimerEvent::SunRise);
        assert_eq!(second, TimerEvent::RevealCards);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_equal_deadlines_keep_schedule_order() {
        let t0 = Instant::now();
        let session = Uuid::new_v4();
        let mut queue = TimerQueue::new();
        queue.schedule(t0, TimerEvent::Reply { session, prompt: 7 });
        queue.schedule(t0, TimerEvent::Reply { session, prompt: 3 });

        let (_, a) = queue.pop_due(t0).unwrap();
        let (_, b) = queue.pop_due(t0).unwrap();
        assert_eq!(a, TimerEvent::Reply { session, prompt: 7 });
        assert_eq!(b, TimerEvent::Reply { session, prompt: 3 });
    }

    #[test]
    fn test_cancel() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        let id = queue.schedule(t0, TimerEvent::SunRise);
        queue.schedule(t0, TimerEvent::RevealCards);

        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.cancel_all(), 1);
        assert!(queue.pop_due(t0 + ms(10)).is_none());
        assert_eq!(queue.next_deadline(), None);
    }

    #[test]
    fn test_cancel_matching_session() {
        let t0 = Instant::now();
        let old = Uuid::new_v4();
        let current = Uuid::new_v4();
        let mut queue = TimerQueue::new();
        queue.schedule(t0, TimerEvent::Reply { session: old, prompt: 1 });
        queue.schedule(t0, TimerEvent::Reply { session: old, prompt: 2 });
        queue.schedule(t0, TimerEvent::Reply { session: current, prompt: 3 });

        let removed =
            queue.cancel_matching(|e| matches!(e, TimerEvent::Reply { session, .. } if *session == old));
        assert_eq!(removed, 2);
        assert!(queue.contains(|e| matches!(e, TimerEvent::Reply { prompt: 3, .. })));
    }
}
