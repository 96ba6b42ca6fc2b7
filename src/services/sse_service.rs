use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::{FeedHandshake, ServerEvent},
    error::ServiceError,
    state::{SharedState, roster::GuildId},
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Subscribe to the roster feed of `guild`. Returns the receiver together with the
/// handshake event that opens the stream.
pub fn subscribe_feed(
    state: &SharedState,
    guild: GuildId,
) -> Result<(broadcast::Receiver<ServerEvent>, ServerEvent), ServiceError> {
    state.session(guild)?;
    let receiver = state.feed().subscribe();

    let handshake = ServerEvent::json(
        Some(EVENT_HANDSHAKE.to_string()),
        &FeedHandshake {
            guild_id: guild.to_string(),
            message: "roster feed connected".into(),
        },
    )
    .map_err(|err| ServiceError::InvalidState(format!("failed to encode handshake: {err}")))?;

    Ok((receiver, handshake.for_guild(guild)))
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a broadcast receiver into an SSE response that only forwards events visible
/// to `guild`, starting with `greeting`.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    guild: GuildId,
    greeting: ServerEvent,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if tx.send(Ok(to_event(greeting))).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) if payload.visible_to(guild) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => continue,
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(guild, skipped, "roster feed lagged");
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!(guild, "roster feed disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
