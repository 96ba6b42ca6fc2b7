use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{post, put},
};
use axum_valid::Valid;

use crate::{
    dto::host::{MemberInput, MessageAck, MessageRequest, ReactionAck, ReactionRequest},
    error::AppError,
    services::{member_service, nickname_service, reaction_service},
    state::{
        SharedState,
        roster::{GuildId, UserId},
    },
};

const HOST_TOKEN_HEADER: &str = "x-host-token";

/// Endpoints the chat host adapter calls to forward guild events.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/host/guilds/{guild}/reactions", post(forward_reaction))
        .route("/host/guilds/{guild}/messages", post(forward_message))
        .route(
            "/host/guilds/{guild}/members/{user}",
            put(upsert_member).delete(member_left),
        )
        .route_layer(middleware::from_fn_with_state(state, require_host_token))
}

/// Forward a reaction added in the guild.
#[utoipa::path(
    post,
    path = "/host/guilds/{guild}/reactions",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild the reaction belongs to")),
    request_body = ReactionRequest,
    responses((status = 200, description = "Reaction handled", body = ReactionAck))
)]
pub async fn forward_reaction(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<ReactionRequest>>,
) -> Result<Json<ReactionAck>, AppError> {
    let outcome = reaction_service::intake(&state, guild, payload).await?;
    Ok(Json(ReactionAck { outcome }))
}

/// Forward a chat message; registration-shaped messages register a nickname.
#[utoipa::path(
    post,
    path = "/host/guilds/{guild}/messages",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild the message was written in")),
    request_body = MessageRequest,
    responses((status = 200, description = "Message handled", body = MessageAck))
)]
pub async fn forward_message(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<MessageRequest>>,
) -> Result<Json<MessageAck>, AppError> {
    let nickname = nickname_service::submit_message(&state, guild, payload).await?;
    Ok(Json(MessageAck { nickname }))
}

/// Store the latest profile of a member.
#[utoipa::path(
    put,
    path = "/host/guilds/{guild}/members/{user}",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the member"),
    ("user" = u64, Path, description = "Member user ID")),
    request_body = MemberInput,
    responses((status = 204, description = "Profile stored"))
)]
pub async fn upsert_member(
    State(state): State<SharedState>,
    Path((guild, user)): Path<(GuildId, UserId)>,
    Valid(Json(payload)): Valid<Json<MemberInput>>,
) -> StatusCode {
    member_service::upsert(&state, guild, user, payload);
    StatusCode::NO_CONTENT
}

/// The member left the guild.
#[utoipa::path(
    delete,
    path = "/host/guilds/{guild}/members/{user}",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild the member left"),
    ("user" = u64, Path, description = "Member user ID")),
    responses((status = 204, description = "Member removed"))
)]
pub async fn member_left(
    State(state): State<SharedState>,
    Path((guild, user)): Path<(GuildId, UserId)>,
) -> StatusCode {
    member_service::member_left(&state, guild, user).await;
    StatusCode::NO_CONTENT
}

/// Reject callers that do not present the configured host token. Every request passes
/// when no token is configured.
pub(super) async fn require_host_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config().host_token.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get(HOST_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing host token header `X-Host-Token`".into()))?;

    if provided == expected {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Unauthorized("invalid host token".into()))
    }
}
