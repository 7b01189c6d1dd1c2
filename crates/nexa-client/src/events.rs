use serde::Serialize;
use tokio::sync::broadcast;

use nexa_shared::constants::NOTIFICATION_CHANNEL_CAPACITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    /// A simulated inbound contact message arrived.
    Incoming,
}

/// A user-visible toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
}

/// Fan-out of [`Notification`]s to whatever view is listening.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn emit(&self, kind: NotificationKind, text: impl Into<String>) {
        let notification = Notification {
            kind,
            text: text.into(),
        };
        if let Err(e) = self.tx.send(notification) {
            tracing::debug!(text = %e.0.text, "No notification subscriber");
        }
    }

    pub fn success(&self, text: impl Into<String>) {
        self.emit(NotificationKind::Success, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.emit(NotificationKind::Error, text);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.emit(NotificationKind::Info, text);
    }

    pub fn incoming(&self, text: impl Into<String>) {
        self.emit(NotificationKind::Incoming, text);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscriber_is_fine() {
        Notifier::new().success("ok");
    }

    #[test]
    fn subscribers_receive_in_order() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        notifier.success("a");
        notifier.error("b");

        assert_eq!(rx.try_recv().unwrap().kind, NotificationKind::Success);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.kind, NotificationKind::Error);
        assert_eq!(second.text, "b");
    }
}
