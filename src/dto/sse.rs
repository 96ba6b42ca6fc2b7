use serde::Serialize;
use utoipa::ToSchema;

use crate::state::roster::GuildId;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
    /// Guild the event is about; feeds filtered on another guild skip it.
    pub guild_id: Option<GuildId>,
}

impl ServerEvent {
    /// Build an event from already serialised data.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self {
            event,
            data,
            guild_id: None,
        }
    }

    /// Scope the event to `guild`.
    pub fn for_guild(mut self, guild: GuildId) -> Self {
        self.guild_id = Some(guild);
        self
    }

    /// Whether a feed filtered on `guild` should receive this event.
    pub fn visible_to(&self, guild: GuildId) -> bool {
        self.guild_id.is_none_or(|scoped| scoped == guild)
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self::new(event.into(), serde_json::to_string(payload)?))
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial message sent to a feed client when it connects.
pub struct FeedHandshake {
    /// Guild the feed is filtered on.
    pub guild_id: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Broadcast after every status refresh of a guild.
pub struct RosterUpdatedEvent {
    /// Guild whose roster changed.
    pub guild_id: String,
    /// Rendered status text.
    pub text: String,
    /// Participants in priority order.
    pub participants: Vec<String>,
    /// Waitlist, front first.
    pub waitlist: Vec<String>,
    /// Capacity in effect.
    pub capacity: usize,
    /// Whether reaction joins are accepted.
    pub signup_open: bool,
}
