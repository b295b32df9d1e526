//! Self-clearing status banner.
//!
//! Each [`MessageBanner::show`] replaces the current message and restarts the
//! clear window. The clear runs on a spawned task; the previous task is
//! aborted on replacement and on drop.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::task::JoinHandle;

pub const MESSAGE_WINDOW: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: MessageKind,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Error,
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, MessageKind::Error)
    }
}

#[derive(Default)]
struct Slot {
    message: Option<StatusMessage>,
    // bumped on every show; a clear task only clears its own generation
    generation: u64,
    clear_task: Option<JoinHandle<()>>,
}

pub struct MessageBanner {
    slot: Arc<Mutex<Slot>>,
    window: Duration,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MessageBanner {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            window,
        }
    }

    /// Replace the current message and restart the clear window.
    ///
    /// Must be called from within a tokio runtime.
    pub fn show(&self, message: StatusMessage) {
        let mut slot = lock(&self.slot);
        if let Some(task) = slot.clear_task.take() {
            task.abort();
        }

        slot.generation = slot.generation.wrapping_add(1);
        slot.message = Some(message);

        let generation = slot.generation;
        let window = self.window;
        let shared = Arc::clone(&self.slot);
        slot.clear_task = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut slot = lock(&shared);
            if slot.generation == generation {
                slot.message = None;
                slot.clear_task = None;
            }
        }));
    }

    #[must_use]
    pub fn current(&self) -> Option<StatusMessage> {
        lock(&self.slot).message.clone()
    }
}

impl Default for MessageBanner {
    fn default() -> Self {
        Self::new(MESSAGE_WINDOW)
    }
}

impl Drop for MessageBanner {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.slot).clear_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        // let the spawned clear task observe the advanced clock
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn message_clears_after_window() {
        let banner = MessageBanner::default();
        banner.show(StatusMessage::success("saved"));
        assert_eq!(banner.current(), Some(StatusMessage::success("saved")));

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        settle().await;
        assert!(banner.current().is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(banner.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_message_restarts_window() {
        let banner = MessageBanner::default();
        banner.show(StatusMessage::success("first"));

        tokio::time::sleep(Duration::from_secs(4)).await;
        banner.show(StatusMessage::error("second"));

        // the first window would have ended here
        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(banner.current(), Some(StatusMessage::error("second")));

        tokio::time::sleep(Duration::from_secs(4)).await;
        settle().await;
        assert_eq!(banner.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts_pending_clear() {
        let banner = MessageBanner::default();
        banner.show(StatusMessage::success("bye"));
        let slot = Arc::clone(&banner.slot);
        drop(banner);

        tokio::time::sleep(Duration::from_secs(6)).await;
        settle().await;
        // nobody cleared it: the task was aborted
        assert!(lock(&slot).message.is_some());
    }

    #[test]
    fn status_message_kinds() {
        assert!(StatusMessage::error("x").is_error());
        assert!(!StatusMessage::success("x").is_error());
    }
}
