use serde::Serialize;
use tracing::{trace, warn};

use crate::{
    dto::sse::{RosterUpdatedEvent, ServerEvent},
    state::{SharedState, roster::GuildId},
};

const EVENT_ROSTER_UPDATED: &str = "roster.updated";

/// Publish the freshly rendered roster of a guild.
pub fn broadcast_roster_updated(state: &SharedState, payload: &RosterUpdatedEvent, guild: GuildId) {
    send_feed_event(state, EVENT_ROSTER_UPDATED, payload, guild);
}

fn send_feed_event<T>(state: &SharedState, event: &str, payload: &T, guild: GuildId)
where
    T: Serialize,
{
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(message) => {
            let reached = state.feed().broadcast(message.for_guild(guild));
            trace!(event, guild, reached, "feed event published");
        }
        Err(err) => warn!(event, guild, error = %err, "failed to serialise feed event"),
    }
}
