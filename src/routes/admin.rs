use axum::{
    Json, Router,
    extract::{Path, State},
    middleware,
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::admin::{
        ActionResponse, BackupResponse, CapacityRequest, CapacityResponse, DemoteRequest,
        MemberRequest, ModeChangeResponse, NicknameOverrideRequest, PanelRequest, PanelResponse,
        PromoteRequest, QueuePositionRequest, RandomMapResponse, RosterSummary, RotationResponse,
        RoundCreditRequest, SetupRequest, SetupResponse, SignupToggleRequest,
    },
    error::AppError,
    routes::host::require_host_token,
    services::{nickname_service, roster_service},
    state::{SharedState, roster::GuildId},
};

/// Administrator commands, relayed by the chat host after its permission check.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/guilds/{guild}/admin/setup", post(setup))
        .route("/guilds/{guild}/admin/panel", post(configure_panel))
        .route("/guilds/{guild}/admin/roster", get(show_roster))
        .route("/guilds/{guild}/admin/round-capacity", put(set_round_capacity))
        .route("/guilds/{guild}/admin/lock-capacity", put(lock_capacity))
        .route("/guilds/{guild}/admin/signup", put(set_signup))
        .route("/guilds/{guild}/admin/rotate", post(rotate))
        .route("/guilds/{guild}/admin/undo", post(undo))
        .route("/guilds/{guild}/admin/backup", post(backup))
        .route("/guilds/{guild}/admin/clear", post(clear))
        .route("/guilds/{guild}/admin/promote", post(promote))
        .route("/guilds/{guild}/admin/demote", post(demote))
        .route("/guilds/{guild}/admin/queue-position", put(queue_position))
        .route(
            "/guilds/{guild}/admin/participants",
            post(add_participant).delete(delete_participant),
        )
        .route("/guilds/{guild}/admin/round-credit", put(set_round_credit))
        .route("/guilds/{guild}/admin/nickname", put(override_nickname))
        .route("/guilds/{guild}/admin/mode", post(change_mode))
        .route("/guilds/{guild}/admin/random-map", post(random_map))
        .route_layer(middleware::from_fn_with_state(state, require_host_token))
}

/// Post a fresh signup prompt and status message, starting an empty roster.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/admin/setup",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild to set up")),
    request_body = SetupRequest,
    responses((status = 200, description = "Roster created", body = SetupResponse))
)]
pub async fn setup(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<SetupRequest>>,
) -> Result<Json<SetupResponse>, AppError> {
    Ok(Json(roster_service::setup(&state, guild, payload).await?))
}

/// Post the admin panel message in an administrator channel.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/admin/panel",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    request_body = PanelRequest,
    responses((status = 200, description = "Panel posted", body = PanelResponse))
)]
pub async fn configure_panel(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<PanelRequest>>,
) -> Result<Json<PanelResponse>, AppError> {
    Ok(Json(
        roster_service::configure_panel(&state, guild, payload.admin_channel_id).await?,
    ))
}

/// Current roster and rendered status text.
#[utoipa::path(
    get,
    path = "/guilds/{guild}/admin/roster",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    responses((status = 200, description = "Roster", body = RosterSummary))
)]
pub async fn show_roster(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<RosterSummary>, AppError> {
    Ok(Json(roster_service::show(&state, guild).await?))
}

/// Override the capacity until the next rotation.
#[utoipa::path(
    put,
    path = "/guilds/{guild}/admin/round-capacity",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    request_body = CapacityRequest,
    responses((status = 200, description = "Capacity applied", body = CapacityResponse))
)]
pub async fn set_round_capacity(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<CapacityRequest>>,
) -> Result<Json<CapacityResponse>, AppError> {
    Ok(Json(
        roster_service::set_round_capacity(&state, guild, payload.count).await?,
    ))
}

/// Pin the capacity until the roster is set up again.
#[utoipa::path(
    put,
    path = "/guilds/{guild}/admin/lock-capacity",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    request_body = CapacityRequest,
    responses((status = 200, description = "Capacity locked", body = CapacityResponse))
)]
pub async fn lock_capacity(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<CapacityRequest>>,
) -> Result<Json<CapacityResponse>, AppError> {
    Ok(Json(
        roster_service::lock_capacity(&state, guild, payload.count).await?,
    ))
}

/// Open or close the signup.
#[utoipa::path(
    put,
    path = "/guilds/{guild}/admin/signup",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    request_body = SignupToggleRequest,
    responses((status = 200, description = "Signup toggled", body = ActionResponse))
)]
pub async fn set_signup(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<SignupToggleRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        roster_service::set_signup(&state, guild, payload.open).await?,
    ))
}

/// Finish a round: consume credits and backfill from the waitlist.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/admin/rotate",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    responses((status = 200, description = "Rotation applied", body = RotationResponse))
)]
pub async fn rotate(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<RotationResponse>, AppError> {
    Ok(Json(roster_service::rotate(&state, guild).await?))
}

/// Restore the roster captured before the last rotation.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/admin/undo",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    responses((status = 200, description = "Rotation undone", body = ActionResponse),
    (status = 409, description = "Nothing to undo"))
)]
pub async fn undo(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(roster_service::undo(&state, guild).await?))
}

/// Append the rendered roster to the backup log.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/admin/backup",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    responses((status = 200, description = "Backup written", body = BackupResponse))
)]
pub async fn backup(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<BackupResponse>, AppError> {
    Ok(Json(roster_service::backup_now(&state, guild).await?))
}

/// Empty both lists and reset every credit.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/admin/clear",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    responses((status = 200, description = "Roster cleared", body = ActionResponse))
)]
pub async fn clear(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(roster_service::clear_all(&state, guild).await?))
}

/// Move a member into the participants, optionally evicting someone.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/admin/promote",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    request_body = PromoteRequest,
    responses((status = 200, description = "Member promoted", body = ActionResponse))
)]
pub async fn promote(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<PromoteRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        roster_service::promote(
            &state,
            guild,
            &payload.member,
            payload.evict.as_deref(),
            payload.position,
        )
        .await?,
    ))
}

/// Move participants to the front of the waitlist.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/admin/demote",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    request_body = DemoteRequest,
    responses((status = 200, description = "Members demoted", body = ActionResponse))
)]
pub async fn demote(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<DemoteRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        roster_service::demote(&state, guild, &payload.members).await?,
    ))
}

/// Place a member at a waitlist position.
#[utoipa::path(
    put,
    path = "/guilds/{guild}/admin/queue-position",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    request_body = QueuePositionRequest,
    responses((status = 200, description = "Member moved", body = ActionResponse))
)]
pub async fn queue_position(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<QueuePositionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        roster_service::queue_position(&state, guild, &payload.member, payload.position).await?,
    ))
}

/// Add a member with a registered nickname to the roster.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/admin/participants",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    request_body = MemberRequest,
    responses((status = 200, description = "Member added", body = RosterSummary))
)]
pub async fn add_participant(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<MemberRequest>>,
) -> Result<Json<RosterSummary>, AppError> {
    Ok(Json(
        roster_service::add_participant(&state, guild, &payload.member).await?,
    ))
}

/// Remove a member from both lists.
#[utoipa::path(
    delete,
    path = "/guilds/{guild}/admin/participants",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    request_body = MemberRequest,
    responses((status = 200, description = "Member removed", body = ActionResponse))
)]
pub async fn delete_participant(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<MemberRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        roster_service::delete_participant(&state, guild, &payload.member).await?,
    ))
}

/// Set the remaining rounds of a member.
#[utoipa::path(
    put,
    path = "/guilds/{guild}/admin/round-credit",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    request_body = RoundCreditRequest,
    responses((status = 200, description = "Credit updated", body = ActionResponse))
)]
pub async fn set_round_credit(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<RoundCreditRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let credit = payload.credit();
    Ok(Json(
        roster_service::set_round_credit(&state, guild, &payload.member, credit).await?,
    ))
}

/// Replace the nickname of a member.
#[utoipa::path(
    put,
    path = "/guilds/{guild}/admin/nickname",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the member")),
    request_body = NicknameOverrideRequest,
    responses((status = 200, description = "Nickname replaced", body = ActionResponse))
)]
pub async fn override_nickname(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
    Valid(Json(payload)): Valid<Json<NicknameOverrideRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        nickname_service::override_nickname(&state, guild, &payload.member, &payload.nickname)
            .await?,
    ))
}

/// Switch between registration and simple signup.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/admin/mode",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    responses((status = 200, description = "Mode switched", body = ModeChangeResponse))
)]
pub async fn change_mode(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<ModeChangeResponse>, AppError> {
    Ok(Json(roster_service::change_mode(&state, guild).await?))
}

/// Draw and announce a random map.
#[utoipa::path(
    post,
    path = "/guilds/{guild}/admin/random-map",
    tag = "admin",
    params(("X-Host-Token" = String, Header, description = "Shared secret of the chat host adapter"),
    ("guild" = u64, Path, description = "Guild of the roster")),
    responses((status = 200, description = "Map announced", body = RandomMapResponse))
)]
pub async fn random_map(
    State(state): State<SharedState>,
    Path(guild): Path<GuildId>,
) -> Result<Json<RandomMapResponse>, AppError> {
    Ok(Json(roster_service::random_map(&state, guild).await?))
}
