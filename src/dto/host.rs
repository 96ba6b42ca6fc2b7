//! Payloads exchanged with the chat host adapter.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::state::{
    members::MemberProfile,
    reactions::ReactionEvent,
    roster::{ChannelId, MessageId, UserId},
};

/// Member profile as known by the chat host.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct MemberInput {
    #[validate(length(min = 1))]
    pub display_name: String,
    #[validate(length(min = 1))]
    pub username: String,
    /// Role names, in the host's order.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl From<MemberInput> for MemberProfile {
    fn from(value: MemberInput) -> Self {
        MemberProfile {
            display_name: value.display_name,
            username: value.username,
            roles: value.roles,
        }
    }
}

/// A reaction added by a user on any message of the guild.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ReactionRequest {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    #[validate(length(min = 1))]
    pub emoji: String,
    /// Result of the host's administrator permission check.
    #[serde(default)]
    pub is_admin: bool,
    /// Fresh profile of the reacting member; stored before the reaction is handled.
    #[serde(default)]
    #[validate(nested)]
    pub member: Option<MemberInput>,
}

impl ReactionRequest {
    pub(crate) fn to_event(&self, reconciled: bool) -> ReactionEvent {
        ReactionEvent {
            user_id: self.user_id,
            channel_id: self.channel_id,
            message_id: self.message_id,
            emoji: self.emoji.clone(),
            reconciled,
        }
    }
}

/// What happened to a forwarded reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReactionOutcome {
    /// Queued for the next drain.
    Queued,
    /// Queued after the gateway confirmed the message is the live signup message.
    Reconciled,
    /// Executed as an admin panel action.
    Panel,
    /// Removed because the user has no registered nickname.
    NicknameRequired,
    /// Not a reaction the roster cares about.
    Ignored,
    /// Addressed to a message that is no longer the signup message.
    Stale,
}

/// Acknowledgement of a forwarded reaction.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReactionAck {
    pub outcome: ReactionOutcome,
}

/// A plain chat message written by a user in the guild.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MessageRequest {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub content: String,
}

/// Acknowledgement of a forwarded chat message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageAck {
    /// Nickname registered from the message, if it was a registration.
    pub nickname: Option<String>,
}
