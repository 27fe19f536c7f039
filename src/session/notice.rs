//! 会话通知队列：成功、错误、后端提示都以短暂、自动消失的通知呈现。

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// 通知默认展示时长。
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Notice,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: Instant,
    pub dismiss_after: Duration,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            created_at: Instant::now(),
            dismiss_after: DEFAULT_DISMISS_AFTER,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.dismiss_after
    }
}

#[derive(Debug, Default)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
}

impl NotificationQueue {
    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>) {
        let notification = Notification::new(kind, message);
        match notification.kind {
            NotificationKind::Error => log::warn!("🔔 {}", notification.message),
            _ => log::info!("🔔 {}", notification.message),
        }
        self.items.push_back(notification);
    }

    /// 丢弃已过期的通知。
    pub fn prune_expired(&mut self, now: Instant) {
        self.items.retain(|item| !item.is_expired(now));
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        self.items.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_notifications_are_pruned() {
        let mut queue = NotificationQueue::default();
        queue.push(NotificationKind::Success, "done");
        queue.push(NotificationKind::Error, "failed");

        queue.prune_expired(Instant::now());
        assert_eq!(queue.len(), 2);

        queue.prune_expired(Instant::now() + DEFAULT_DISMISS_AFTER + Duration::from_millis(1));
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_empties_queue_in_order() {
        let mut queue = NotificationQueue::default();
        queue.push(NotificationKind::Notice, "first");
        queue.push(NotificationKind::Success, "second");

        let drained = queue.drain();
        assert_eq!(drained.iter().map(|n| n.message.as_str()).collect::<Vec<_>>(), ["first", "second"]);
        assert!(queue.is_empty());
    }
}
