use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the snapshot store cannot be reached.
    pub status: String,
    /// Guilds with a registered roster.
    pub guilds: usize,
    /// Reaction events waiting for the next drain, across every guild.
    pub queued_events: usize,
    /// Connected roster feed clients.
    pub feed_subscribers: usize,
}

impl HealthResponse {
    /// Build a response from the store probe result and the session counters.
    pub fn new(store_ok: bool, guilds: usize, queued_events: usize, feed_subscribers: usize) -> Self {
        let status = if store_ok { "ok" } else { "degraded" };
        Self {
            status: status.to_string(),
            guilds,
            queued_events,
            feed_subscribers,
        }
    }
}
