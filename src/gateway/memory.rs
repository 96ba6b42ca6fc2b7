//! Gateway that records every call instead of talking to a chat host.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use tracing::debug;

use crate::{
    gateway::{ChatGateway, GatewayError, GatewayResult},
    state::roster::{ChannelId, MessageId, UserId},
};

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    /// A message was posted and got `message` as identifier.
    Send {
        channel: ChannelId,
        message: MessageId,
        text: String,
        ttl: Option<Duration>,
    },
    /// A message was edited.
    Edit {
        channel: ChannelId,
        message: MessageId,
        text: String,
    },
    /// A message was deleted.
    Delete {
        channel: ChannelId,
        message: MessageId,
    },
    /// Bot reactions were added.
    AddReactions {
        channel: ChannelId,
        message: MessageId,
        emojis: Vec<String>,
    },
    /// A user's reactions were removed.
    RemoveReactions {
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emojis: Vec<String>,
    },
    /// Every user reaction was removed.
    ClearReactions {
        channel: ChannelId,
        message: MessageId,
    },
}

#[derive(Default)]
struct Inner {
    calls: Mutex<Vec<GatewayCall>>,
    missing: Mutex<HashSet<MessageId>>,
    live_signup: Mutex<HashMap<ChannelId, MessageId>>,
    next_id: AtomicU64,
}

/// Gateway keeping an in-memory log of calls. Message identifiers are allocated from a
/// counter starting at 1000.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    inner: Arc<Inner>,
}

impl RecordingGateway {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.inner.calls).clone()
    }

    /// Texts of every posted message, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Send { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Latest content written to `message` by a send or an edit.
    pub fn latest_text(&self, message: MessageId) -> Option<String> {
        self.calls().into_iter().rev().find_map(|call| match call {
            GatewayCall::Send {
                message: id, text, ..
            }
            | GatewayCall::Edit {
                message: id, text, ..
            } if id == message => Some(text),
            _ => None,
        })
    }

    /// Forget recorded calls.
    pub fn reset(&self) {
        lock(&self.inner.calls).clear();
    }

    /// Make edits and deletes of `message` fail with [`GatewayError::NotFound`].
    pub fn mark_missing(&self, message: MessageId) {
        lock(&self.inner.missing).insert(message);
    }

    /// Declare `message` as the live signup message of `channel`.
    pub fn set_live_signup(&self, channel: ChannelId, message: MessageId) {
        lock(&self.inner.live_signup).insert(channel, message);
    }

    fn record(&self, call: GatewayCall) {
        debug!(?call, "recorded gateway call");
        lock(&self.inner.calls).push(call);
    }

    fn ensure_present(&self, message: MessageId) -> GatewayResult<()> {
        if lock(&self.inner.missing).contains(&message) {
            return Err(GatewayError::NotFound(format!("message {message}")));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChatGateway for RecordingGateway {
    fn send_message(
        &self,
        channel: ChannelId,
        text: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'static, GatewayResult<MessageId>> {
        let gateway = self.clone();
        Box::pin(async move {
            let message = 1000 + gateway.inner.next_id.fetch_add(1, Ordering::SeqCst);
            gateway.record(GatewayCall::Send {
                channel,
                message,
                text,
                ttl,
            });
            Ok(message)
        })
    }

    fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: String,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        Box::pin(async move {
            gateway.ensure_present(message)?;
            gateway.record(GatewayCall::Edit {
                channel,
                message,
                text,
            });
            Ok(())
        })
    }

    fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        Box::pin(async move {
            gateway.ensure_present(message)?;
            gateway.record(GatewayCall::Delete { channel, message });
            Ok(())
        })
    }

    fn add_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
        emojis: Vec<String>,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        Box::pin(async move {
            gateway.ensure_present(message)?;
            gateway.record(GatewayCall::AddReactions {
                channel,
                message,
                emojis,
            });
            Ok(())
        })
    }

    fn remove_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emojis: Vec<String>,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        Box::pin(async move {
            gateway.ensure_present(message)?;
            gateway.record(GatewayCall::RemoveReactions {
                channel,
                message,
                user,
                emojis,
            });
            Ok(())
        })
    }

    fn clear_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        Box::pin(async move {
            gateway.ensure_present(message)?;
            gateway.record(GatewayCall::ClearReactions { channel, message });
            Ok(())
        })
    }

    fn current_signup_message(
        &self,
        channel: ChannelId,
    ) -> BoxFuture<'static, GatewayResult<Option<MessageId>>> {
        let gateway = self.clone();
        Box::pin(async move { Ok(lock(&gateway.inner.live_signup).get(&channel).copied()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_and_simulates_missing_messages() {
        let gateway = RecordingGateway::new();
        let id = gateway.send_message(1, "hello".into(), None).await.unwrap();
        gateway.edit_message(1, id, "edited".into()).await.unwrap();
        assert_eq!(gateway.latest_text(id).as_deref(), Some("edited"));

        gateway.mark_missing(id);
        let err = gateway.edit_message(1, id, "again".into()).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(gateway.calls().len(), 2);

        assert_eq!(gateway.current_signup_message(1).await.unwrap(), None);
        gateway.set_live_signup(1, 77);
        assert_eq!(gateway.current_signup_message(1).await.unwrap(), Some(77));
    }
}
