use super::pipeline::ImportOutcome;
use super::state::ImportState;
use super::ImportError;
use crossbeam::channel::Sender;
use std::sync::Arc;

/// Observer of a running import.
pub trait ImportListener: Send + Sync {
    fn on_notification_update(&self, message: &str);

    fn on_error(&self, error: &ImportError);

    fn on_state_change(&self, _state: ImportState) {}
}

/// Handle returned on registration; pass it back to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Explicitly registered listeners, notified in registration order.
#[derive(Default, Clone)]
pub struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Arc<dyn ImportListener>)>,
}

impl Listeners {
    pub fn register(&mut self, listener: Arc<dyn ImportListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn notify(&self, message: &str) {
        tracing::debug!("{}", message);
        for (_, listener) in &self.entries {
            listener.on_notification_update(message);
        }
    }

    pub fn error(&self, error: &ImportError) {
        for (_, listener) in &self.entries {
            listener.on_error(error);
        }
    }

    pub fn state_changed(&self, state: ImportState) {
        for (_, listener) in &self.entries {
            listener.on_state_change(state);
        }
    }
}

/// Everything a listener can observe, as a message.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportEvent {
    Notification(String),
    StateChanged(ImportState),
    Error(ImportError),
    Finished(ImportOutcome),
}

/// Forwards listener callbacks into a channel the caller polls.
///
/// Sends to a dropped receiver are ignored: the import keeps going even if
/// nobody is watching.
pub struct ChannelListener {
    tx: Sender<ImportEvent>,
}

impl ChannelListener {
    pub fn new(tx: Sender<ImportEvent>) -> Self {
        Self { tx }
    }
}

impl ImportListener for ChannelListener {
    fn on_notification_update(&self, message: &str) {
        self.tx.send(ImportEvent::Notification(message.to_string())).ok();
    }

    fn on_error(&self, error: &ImportError) {
        self.tx.send(ImportEvent::Error(error.clone())).ok();
    }

    fn on_state_change(&self, state: ImportState) {
        self.tx.send(ImportEvent::StateChanged(state)).ok();
    }
}
