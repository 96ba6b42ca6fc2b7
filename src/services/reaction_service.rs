//! Reaction intake and the periodic queue drain.

use tracing::{debug, info, warn};

use crate::{
    dto::host::{ReactionOutcome, ReactionRequest},
    error::ServiceError,
    services::{roster_service, status_service},
    state::{
        SharedState,
        reactions::{
            CLAIM_FIXED, DrainReport, JOIN_ONE, JOIN_THREE, JOIN_TWO, LEAVE, PanelReaction,
            SignupReaction, apply_batch,
        },
        roster::{ChannelId, GuildId, MessageId, UserId},
        session::CommunitySession,
    },
};

/// Emojis stripped from a user who left the waitlist.
const SIGNUP_REACTIONS: [&str; 5] = [JOIN_ONE, JOIN_TWO, JOIN_THREE, CLAIM_FIXED, LEAVE];

/// Route one reaction forwarded by the host.
///
/// Panel reactions by administrators run immediately. Signup reactions are queued for the
/// next drain, except joins from users without a nickname, which are bounced. A reaction
/// on any other message is only queued when the gateway confirms that message is the
/// live signup message of the viewer channel.
pub async fn intake(
    state: &SharedState,
    guild: GuildId,
    request: ReactionRequest,
) -> Result<ReactionOutcome, ServiceError> {
    if let Some(member) = request.member.clone() {
        state
            .members()
            .upsert(guild, request.user_id, member.into());
    }

    let Some(session) = state.find_session(guild) else {
        debug!(guild, "reaction for a guild without roster");
        return Ok(ReactionOutcome::Ignored);
    };
    let links = session.links();

    if links.admin_message == Some(request.message_id) {
        return match PanelReaction::parse(&request.emoji) {
            Some(action) if request.is_admin => {
                handle_panel(state, guild, &request, action).await?;
                Ok(ReactionOutcome::Panel)
            }
            _ => Ok(ReactionOutcome::Ignored),
        };
    }

    let Some(reaction) = SignupReaction::parse(&request.emoji) else {
        return Ok(ReactionOutcome::Ignored);
    };

    if links.signup_message == Some(request.message_id) {
        if reaction.is_join()
            && !request.is_admin
            && !state.nicknames().is_registered(request.user_id)
        {
            bounce_unregistered(state, &request).await;
            return Ok(ReactionOutcome::NicknameRequired);
        }
        session.enqueue(request.to_event(false));
        return Ok(ReactionOutcome::Queued);
    }

    let Some(viewer) = links.viewer_channel else {
        return Ok(ReactionOutcome::Stale);
    };
    match state.gateway().current_signup_message(viewer).await {
        Ok(Some(live)) if live == request.message_id => {
            info!(
                guild,
                message = request.message_id,
                recorded = ?links.signup_message,
                "reaction matched the live signup message; queueing"
            );
            session.enqueue(request.to_event(true));
            Ok(ReactionOutcome::Reconciled)
        }
        Ok(_) => {
            debug!(guild, message = request.message_id, "reaction on a stale message");
            Ok(ReactionOutcome::Stale)
        }
        Err(err) => {
            warn!(guild, error = %err, "could not resolve the live signup message");
            Ok(ReactionOutcome::Stale)
        }
    }
}

async fn handle_panel(
    state: &SharedState,
    guild: GuildId,
    request: &ReactionRequest,
    action: PanelReaction,
) -> Result<(), ServiceError> {
    remove_reactions(
        state,
        request.channel_id,
        request.message_id,
        request.user_id,
        &[action.emoji()],
    )
    .await;

    info!(guild, user = request.user_id, ?action, "panel action");
    match action {
        PanelReaction::Rotate => roster_service::rotate(state, guild).await.map(|_| ()),
        PanelReaction::OpenSignup => roster_service::set_signup(state, guild, true)
            .await
            .map(|_| ()),
        PanelReaction::CloseSignup => roster_service::set_signup(state, guild, false)
            .await
            .map(|_| ()),
        PanelReaction::RandomMap => roster_service::random_map(state, guild).await.map(|_| ()),
    }
}

/// Remove the join reaction of a user without nickname and post a short warning,
/// replacing any warning still displayed for them.
async fn bounce_unregistered(state: &SharedState, request: &ReactionRequest) {
    let user = request.user_id;
    remove_reactions(
        state,
        request.channel_id,
        request.message_id,
        user,
        &[request.emoji.as_str()],
    )
    .await;

    let warning = state
        .gateway()
        .send_message(
            request.channel_id,
            format!("<@{user}> ⚠️ 발로닉네임 등록해주세요!"),
            Some(state.config().notice_ttl),
        )
        .await;

    match warning {
        Ok(message) => {
            if let Some((channel, previous)) = state
                .pending_warnings()
                .insert(user, (request.channel_id, message))
            {
                delete_warning(state, channel, previous).await;
            }
        }
        Err(err) => warn!(user, error = %err, "failed to post nickname warning"),
    }
}

pub(crate) async fn delete_warning(state: &SharedState, channel: ChannelId, message: MessageId) {
    if let Err(err) = state.gateway().delete_message(channel, message).await {
        debug!(channel, message, error = %err, "nickname warning already gone");
    }
}

async fn remove_reactions(
    state: &SharedState,
    channel: ChannelId,
    message: MessageId,
    user: UserId,
    emojis: &[&str],
) {
    let emojis = emojis.iter().map(|emoji| emoji.to_string()).collect();
    if let Err(err) = state
        .gateway()
        .remove_reactions(channel, message, user, emojis)
        .await
    {
        debug!(channel, message, user, error = %err, "failed to remove reactions");
    }
}

/// Apply every queued event of one guild under its lock, then refresh once.
pub async fn drain_session(state: &SharedState, session: &CommunitySession) -> DrainReport {
    if session.queued() == 0 {
        return DrainReport::default();
    }

    let guild = session.guild_id();
    let members = state.members().for_guild(guild);
    let fixed_role = state.config().fixed_slot_role.as_str();
    let report = state
        .with_rotation(session, |rotation| {
            apply_batch(rotation, session.take_queue(), &members, fixed_role)
        })
        .await;

    debug!(
        guild,
        applied = report.applied,
        dropped = report.dropped,
        failed = report.failures.len(),
        "drained reaction queue"
    );

    if !report.cleared.is_empty() {
        let links = session.links();
        if let Some(channel) = links.viewer_channel {
            for user in &report.cleared {
                for message in [links.signup_message, links.status_message]
                    .into_iter()
                    .flatten()
                {
                    remove_reactions(state, channel, message, *user, &SIGNUP_REACTIONS).await;
                }
            }
        }
    }

    if report.mutated() {
        status_service::refresh_and_persist(state, session).await;
    }
    report
}

/// Drain every guild with queued events. Guilds are independent: one guild's failures
/// never affect another.
pub async fn drain_pending(state: &SharedState) {
    for session in state.sessions() {
        drain_session(state, &session).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::snapshot_store::MemorySnapshotStore,
        dto::host::MemberInput,
        gateway::{GatewayCall, RecordingGateway},
        state::{
            AppState,
            reactions::{PANEL_OPEN, PANEL_ROTATE},
            roster::{MessageLinks, Roster, SignupMode},
        },
    };

    const GUILD: GuildId = 1;
    const VIEWER: ChannelId = 10;
    const SIGNUP: MessageId = 20;
    const STATUS: MessageId = 21;
    const ADMIN_CHANNEL: ChannelId = 30;
    const PANEL: MessageId = 31;

    fn setup(mode: SignupMode, capacity: usize) -> (SharedState, RecordingGateway, Arc<CommunitySession>) {
        let gateway = RecordingGateway::new();
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(gateway.clone()),
        );
        let links = MessageLinks {
            viewer_channel: Some(VIEWER),
            signup_message: Some(SIGNUP),
            status_message: Some(STATUS),
            admin_channel: Some(ADMIN_CHANNEL),
            admin_message: Some(PANEL),
            ..MessageLinks::default()
        };
        let mut roster = Roster::new(mode, capacity, links);
        roster.set_signup_open(true);
        let session = state.install_session(GUILD, roster);
        (state, gateway, session)
    }

    fn member(name: &str, roles: &[&str]) -> Option<MemberInput> {
        Some(MemberInput {
            display_name: name.into(),
            username: name.to_lowercase(),
            roles: roles.iter().map(|role| role.to_string()).collect(),
        })
    }

    fn reaction(user: UserId, message: MessageId, emoji: &str) -> ReactionRequest {
        ReactionRequest {
            user_id: user,
            channel_id: VIEWER,
            message_id: message,
            emoji: emoji.into(),
            is_admin: false,
            member: member(&format!("user{user}"), &[]),
        }
    }

    #[tokio::test]
    async fn joins_are_queued_then_applied_in_order() {
        let (state, gateway, session) = setup(SignupMode::Registration, 1);
        state.nicknames().register(1, "one#KR1").unwrap();
        state.nicknames().register(2, "two#KR1").unwrap();

        for (user, emoji) in [(1, JOIN_TWO), (2, JOIN_ONE)] {
            let outcome = intake(&state, GUILD, reaction(user, SIGNUP, emoji))
                .await
                .unwrap();
            assert_eq!(outcome, ReactionOutcome::Queued);
        }
        assert_eq!(session.queued(), 2);

        let report = drain_session(&state, &session).await;

        assert_eq!(report.applied, 2);
        let roster = session.lock().await;
        assert_eq!(roster.participants(), &[1]);
        assert_eq!(roster.waitlist(), &[2]);
        drop(roster);
        let edits = gateway
            .calls()
            .into_iter()
            .filter(|call| matches!(call, GatewayCall::Edit { message: STATUS, .. }))
            .count();
        assert_eq!(edits, 1);
    }

    #[tokio::test]
    async fn joins_without_nickname_are_bounced() {
        let (state, gateway, session) = setup(SignupMode::Registration, 4);

        let first = intake(&state, GUILD, reaction(7, SIGNUP, JOIN_ONE)).await.unwrap();
        let second = intake(&state, GUILD, reaction(7, SIGNUP, JOIN_ONE)).await.unwrap();

        assert_eq!(first, ReactionOutcome::NicknameRequired);
        assert_eq!(second, ReactionOutcome::NicknameRequired);
        assert_eq!(session.queued(), 0);

        let calls = gateway.calls();
        assert!(calls.contains(&GatewayCall::RemoveReactions {
            channel: VIEWER,
            message: SIGNUP,
            user: 7,
            emojis: vec![JOIN_ONE.to_string()],
        }));
        let warnings: Vec<_> = calls
            .iter()
            .filter_map(|call| match call {
                GatewayCall::Send { message, text, .. } if text.contains("발로닉네임") => {
                    Some(*message)
                }
                _ => None,
            })
            .collect();
        assert_eq!(warnings.len(), 2);
        assert!(calls.contains(&GatewayCall::Delete {
            channel: VIEWER,
            message: warnings[0]
        }));
        assert_eq!(state.pending_warnings().get(&7).map(|entry| entry.1), Some(warnings[1]));

        let mut admin = reaction(8, SIGNUP, JOIN_ONE);
        admin.is_admin = true;
        assert_eq!(
            intake(&state, GUILD, admin).await.unwrap(),
            ReactionOutcome::Queued
        );
    }

    #[tokio::test]
    async fn leave_is_allowed_without_nickname_and_clears_reactions() {
        let (state, gateway, session) = setup(SignupMode::Simple, 1);
        state.nicknames().register(1, "one#KR1").unwrap();
        state.nicknames().register(2, "two#KR1").unwrap();
        intake(&state, GUILD, reaction(1, SIGNUP, JOIN_ONE)).await.unwrap();
        intake(&state, GUILD, reaction(2, SIGNUP, JOIN_ONE)).await.unwrap();
        drain_session(&state, &session).await;

        state.nicknames().remove(2).unwrap();
        let outcome = intake(&state, GUILD, reaction(2, SIGNUP, "🗑")).await.unwrap();
        assert_eq!(outcome, ReactionOutcome::Queued);
        let report = drain_session(&state, &session).await;

        assert_eq!(report.cleared, vec![2]);
        assert!(session.lock().await.waitlist().is_empty());
        for message in [SIGNUP, STATUS] {
            assert!(gateway.calls().iter().any(|call| matches!(
                call,
                GatewayCall::RemoveReactions { message: m, user: 2, emojis, .. }
                    if *m == message && emojis.len() == 5
            )));
        }
    }

    #[tokio::test]
    async fn stale_messages_need_gateway_confirmation() {
        let (state, gateway, session) = setup(SignupMode::Registration, 4);
        state.nicknames().register(1, "one#KR1").unwrap();

        let outcome = intake(&state, GUILD, reaction(1, 99, JOIN_ONE)).await.unwrap();
        assert_eq!(outcome, ReactionOutcome::Stale);
        assert_eq!(session.queued(), 0);

        gateway.set_live_signup(VIEWER, 99);
        let outcome = intake(&state, GUILD, reaction(1, 99, JOIN_ONE)).await.unwrap();
        assert_eq!(outcome, ReactionOutcome::Reconciled);

        drain_session(&state, &session).await;
        assert_eq!(session.lock().await.participants(), &[1]);
    }

    #[tokio::test]
    async fn panel_reactions_run_for_admins_only() {
        let (state, gateway, session) = setup(SignupMode::Registration, 4);
        session.lock().await.set_signup_open(false);

        let mut request = reaction(9, PANEL, PANEL_OPEN);
        request.channel_id = ADMIN_CHANNEL;
        assert_eq!(
            intake(&state, GUILD, request).await.unwrap(),
            ReactionOutcome::Ignored
        );
        assert!(!session.lock().await.signup_open());

        let mut request = reaction(9, PANEL, PANEL_OPEN);
        request.channel_id = ADMIN_CHANNEL;
        request.is_admin = true;
        assert_eq!(
            intake(&state, GUILD, request).await.unwrap(),
            ReactionOutcome::Panel
        );
        assert!(session.lock().await.signup_open());
        assert!(gateway.calls().contains(&GatewayCall::RemoveReactions {
            channel: ADMIN_CHANNEL,
            message: PANEL,
            user: 9,
            emojis: vec![PANEL_OPEN.to_string()],
        }));

        let mut request = reaction(9, PANEL, PANEL_ROTATE);
        request.is_admin = true;
        intake(&state, GUILD, request).await.unwrap();
        assert!(session.lock().await.previous().is_some());
    }

    #[tokio::test]
    async fn fixed_claim_requires_role() {
        let (state, _gateway, session) = setup(SignupMode::Registration, 4);
        state.nicknames().register(1, "one#KR1").unwrap();
        state.nicknames().register(2, "two#KR1").unwrap();

        intake(&state, GUILD, reaction(1, SIGNUP, CLAIM_FIXED)).await.unwrap();
        let mut entitled = reaction(2, SIGNUP, "❤");
        entitled.member = member("two", &["고정룰렛권"]);
        intake(&state, GUILD, entitled).await.unwrap();

        let report = drain_session(&state, &session).await;
        assert_eq!(report.applied, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(session.lock().await.participants(), &[2]);
    }

    #[tokio::test]
    async fn unknown_guilds_and_emojis_are_ignored() {
        let (state, _gateway, session) = setup(SignupMode::Registration, 4);
        assert_eq!(
            intake(&state, 2, reaction(1, SIGNUP, JOIN_ONE)).await.unwrap(),
            ReactionOutcome::Ignored
        );
        assert_eq!(
            intake(&state, GUILD, reaction(1, SIGNUP, "🔥")).await.unwrap(),
            ReactionOutcome::Ignored
        );
        assert_eq!(session.queued(), 0);
    }
}
