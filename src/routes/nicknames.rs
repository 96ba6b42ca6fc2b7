use axum::{
    Json, Router,
    extract::{Path, State},
    middleware,
    routing::{delete, post},
};
use axum_valid::Valid;

use crate::{
    dto::admin::{ActionResponse, NicknameRequest, PartyCodeRequest},
    error::AppError,
    routes::host::require_host_token,
    services::{nickname_service, roster_service},
    state::{
        SharedState,
        roster::{GuildId, UserId},
    },
};

/// Commands any guild member may run, relayed by the chat host.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/guilds/{guild}/nicknames", post(register_nickname))
        .route("/guilds/{guild}/nicknames/{user}", delete(delete_nickname))
        .route("/guilds/{guild}/party-code", post(announce_party_code))
        .route_layer(middleware::from_fn_with_state(state, require_host_token))
}

/// Register the caller's in-game nickname.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/nicknames",
    tag = "nicknames",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild the command was issued in")),
    request_body = NicknameRequest,
    responses((status = 200, description = "Nickname registered", body = ActionResponse),
    (status = 409, description = "A nickname is already registered"))
)]
pub async fn register_nickname(
    State(state): State<SharedState>,
    Path(_guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<NicknameRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        nickname_service::register(&state, payload.user_id, &payload.nickname).await?,
    ))
}

/// Delete the caller's nickname.
#[utoipa::path(
    delete,
    path = "/guilds/{guild}/nicknames/{user}",
    tag = "nicknames",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild the command was issued in"),
    ("user" = u64, Path, description = "User deleting their nickname")),
    responses((status = 200, description = "Nickname deleted", body = ActionResponse),
    (status = 404, description = "No nickname registered"))
)]
pub async fn delete_nickname(
    State(state): State<SharedState>,
    Path((_guild, user)): Path<(GuildId, UserId)>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(nickname_service::delete_own(&state, user).await?))
}

/// Announce the party code in the viewer channel.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/party-code",
    tag = "nicknames",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    request_body = PartyCodeRequest,
    responses((status = 200, description = "Code announced", body = ActionResponse))
)]
pub async fn announce_party_code(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<PartyCodeRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        roster_service::party_code(&state, guild, &payload.code).await?,
    ))
}
