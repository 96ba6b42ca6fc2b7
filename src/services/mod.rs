/// Recurring drain, refresh and backup jobs.
pub mod background;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Member profiles and member reference resolution.
pub mod member_service;
/// Nickname registration and overrides.
pub mod nickname_service;
/// Reaction intake, admin panel actions and the queue drain.
pub mod reaction_service;
/// Administrative roster commands.
pub mod roster_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Status rendering, message refresh and persistence.
pub mod status_service;
