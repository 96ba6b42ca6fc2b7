use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the roster bot backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::roster_feed,
        crate::routes::host::forward_reaction,
        crate::routes::host::forward_message,
        crate::routes::host::upsert_member,
        crate::routes::host::member_left,
        crate::routes::admin::setup,
        crate::routes::admin::configure_panel,
        crate::routes::admin::show_roster,
        crate::routes::admin::set_round_capacity,
        crate::routes::admin::lock_capacity,
        crate::routes::admin::set_signup,
        crate::routes::admin::rotate,
        crate::routes::admin::undo,
        crate::routes::admin::backup,
        crate::routes::admin::clear,
        crate::routes::admin::promote,
        crate::routes::admin::demote,
        crate::routes::admin::queue_position,
        crate::routes::admin::add_participant,
        crate::routes::admin::delete_participant,
        crate::routes::admin::set_round_credit,
        crate::routes::admin::override_nickname,
        crate::routes::admin::change_mode,
        crate::routes::admin::random_map,
        crate::routes::nicknames::register_nickname,
        crate::routes::nicknames::delete_nickname,
        crate::routes::nicknames::announce_party_code,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::host::MemberInput,
            crate::dto::host::ReactionRequest,
            crate::dto::host::ReactionOutcome,
            crate::dto::host::ReactionAck,
            crate::dto::host::MessageRequest,
            crate::dto::host::MessageAck,
            crate::dto::admin::SignupModeDto,
            crate::dto::admin::SetupRequest,
            crate::dto::admin::SetupResponse,
            crate::dto::admin::PanelRequest,
            crate::dto::admin::PanelResponse,
            crate::dto::admin::CapacityRequest,
            crate::dto::admin::CapacityResponse,
            crate::dto::admin::SignupToggleRequest,
            crate::dto::admin::MemberRequest,
            crate::dto::admin::PromoteRequest,
            crate::dto::admin::DemoteRequest,
            crate::dto::admin::QueuePositionRequest,
            crate::dto::admin::RoundCreditRequest,
            crate::dto::admin::NicknameOverrideRequest,
            crate::dto::admin::PartyCodeRequest,
            crate::dto::admin::NicknameRequest,
            crate::dto::admin::ActionResponse,
            crate::dto::admin::RotationResponse,
            crate::dto::admin::RosterSummary,
            crate::dto::admin::RandomMapResponse,
            crate::dto::admin::BackupResponse,
            crate::dto::admin::ModeChangeResponse,
            crate::dto::sse::FeedHandshake,
            crate::dto::sse::RosterUpdatedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "host", description = "Guild events forwarded by the chat host adapter"),
        (name = "admin", description = "Administrator roster commands"),
        (name = "nicknames", description = "Member commands: nicknames and party code"),
        (name = "feed", description = "Server-sent roster updates"),
    )
)]
pub struct ApiDoc;
