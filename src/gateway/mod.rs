//! Outbound side of the chat host: everything the service asks the host to do on the
//! chat platform.

#[cfg(feature = "http-gateway")]
pub mod http;
pub mod memory;

use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::state::roster::{ChannelId, MessageId, UserId};

#[cfg(feature = "http-gateway")]
pub use self::http::HttpGateway;
pub use self::memory::{GatewayCall, RecordingGateway};

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure reported by the chat host.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The channel or message no longer exists.
    #[error("chat surface not found: {0}")]
    NotFound(String),
    /// The request could not be delivered.
    #[error("gateway request to `{path}` failed")]
    Request {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The host answered with an unexpected status.
    #[error("gateway answered {status} for `{path}`")]
    Status { path: String, status: u16 },
    /// The host answer could not be decoded.
    #[error("failed to decode gateway answer for `{path}`")]
    Decode {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl GatewayError {
    /// Whether the target surface is gone for good.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}

/// Message and reaction primitives of the chat platform, implemented by the host.
pub trait ChatGateway: Send + Sync {
    /// Post `text` in `channel`; the host deletes it after `ttl` when set.
    fn send_message(
        &self,
        channel: ChannelId,
        text: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'static, GatewayResult<MessageId>>;
    /// Replace the content of a message.
    fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: String,
    ) -> BoxFuture<'static, GatewayResult<()>>;
    /// Delete a message.
    fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> BoxFuture<'static, GatewayResult<()>>;
    /// Add the bot's own reactions to a message.
    fn add_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
        emojis: Vec<String>,
    ) -> BoxFuture<'static, GatewayResult<()>>;
    /// Remove `user`'s reactions among `emojis`.
    fn remove_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emojis: Vec<String>,
    ) -> BoxFuture<'static, GatewayResult<()>>;
    /// Remove every user reaction, keeping the bot's own.
    fn clear_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> BoxFuture<'static, GatewayResult<()>>;
    /// Freshly resolve the signup message currently live in `channel`.
    fn current_signup_message(
        &self,
        channel: ChannelId,
    ) -> BoxFuture<'static, GatewayResult<Option<MessageId>>>;
}
