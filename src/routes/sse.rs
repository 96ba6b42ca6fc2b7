use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::sse_service,
    state::{SharedState, roster::GuildId},
};

#[utoipa::path(
    get,
    path = "/guilds/{guild}/feed",
    tag = "feed",
    params(("guild" = u64, Path, description = "Guild whose roster is streamed")),
    responses((status = 200, description = "Roster SSE stream", content_type = "text/event-stream", body = String),
    (status = 404, description = "No roster registered for the guild"))
)]
/// Stream roster updates of a guild to dashboards and overlays.
pub async fn roster_feed(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (receiver, handshake) = sse_service::subscribe_feed(&state, guild)?;
    info!(guild, "new roster feed connection");
    Ok(sse_service::to_sse_stream(receiver, guild, handshake))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/guilds/{guild}/feed", get(roster_feed))
}
