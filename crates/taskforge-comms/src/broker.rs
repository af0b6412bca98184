use async_trait::async_trait;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use taskforge_core::{Message, TaskforgeResult, WILDCARD_RECEIVER};
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

/// An async callback invoked for every message delivered to a subscriber id.
pub type MessageHandler =
    Arc<dyn Fn(Message) -> BoxFuture<'static, TaskforgeResult<()>> + Send + Sync>;

/// Publish/subscribe transport used for orchestrator↔agent RPC.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publishes a message, delivering it to every handler subscribed under
    /// the message's receiver id and under the wildcard id.
    async fn publish(&self, message: Message);

    /// Registers a handler under `subscriber_id`. Subscribing the same id
    /// again appends an additional handler.
    async fn subscribe(&self, subscriber_id: &str, handler: MessageHandler);

    /// Removes every handler registered under `subscriber_id`.
    async fn unsubscribe(&self, subscriber_id: &str);
}

/// In-process, at-most-once, best-effort broker.
///
/// Every published message is appended to an unbounded publish-order history
/// log before delivery. A handler's failure is logged and does not prevent
/// delivery to the remaining handlers.
pub struct InMemoryBroker {
    subscribers: RwLock<HashMap<String, Vec<MessageHandler>>>,
    history: Mutex<Vec<Message>>,
}

impl InMemoryBroker {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of the full publish-order message history.
    pub fn history(&self) -> Vec<Message> {
        self.history.lock().clone()
    }

    /// Returns the history filtered to one conversation.
    pub fn history_for(&self, conversation_id: Uuid) -> Vec<Message> {
        self.history
            .lock()
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect()
    }

    /// Number of handlers currently registered under `subscriber_id`.
    pub async fn handler_count(&self, subscriber_id: &str) -> usize {
        self.subscribers
            .read()
            .await
            .get(subscriber_id)
            .map_or(0, Vec::len)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, message: Message) {
        self.history.lock().push(message.clone());

        // Snapshot the handlers so delivery runs without holding the lock;
        // direct receivers first, then wildcard listeners.
        let handlers: Vec<MessageHandler> = {
            let subs = self.subscribers.read().await;
            let mut handlers = Vec::new();
            if let Some(direct) = subs.get(&message.receiver_id) {
                handlers.extend(direct.iter().cloned());
            }
            if message.receiver_id != WILDCARD_RECEIVER {
                if let Some(wildcard) = subs.get(WILDCARD_RECEIVER) {
                    handlers.extend(wildcard.iter().cloned());
                }
            }
            handlers
        };

        for handler in handlers {
            if let Err(e) = handler(message.clone()).await {
                error!(
                    message_id = %message.message_id,
                    receiver = %message.receiver_id,
                    error = %e,
                    "subscriber handler failed"
                );
            }
        }

        debug!(
            message_id = %message.message_id,
            sender = %message.sender_id,
            receiver = %message.receiver_id,
            "published message"
        );
    }

    async fn subscribe(&self, subscriber_id: &str, handler: MessageHandler) {
        let mut subs = self.subscribers.write().await;
        subs.entry(subscriber_id.to_string())
            .or_default()
            .push(handler);
        debug!(subscriber = %subscriber_id, "subscribed");
    }

    async fn unsubscribe(&self, subscriber_id: &str) {
        let mut subs = self.subscribers.write().await;
        if subs.remove(subscriber_id).is_some() {
            debug!(subscriber = %subscriber_id, "unsubscribed");
        }
    }
}
