//! Keeps the status message, the roster feed and the snapshot in line with the rosters.

use tracing::{debug, info, warn};

use crate::{
    dao::storage::StorageResult,
    dto::{admin::ids, sse::RosterUpdatedEvent},
    services::sse_events,
    state::{
        SharedState,
        render::{RenderContext, render},
        roster::{ChannelId, GuildId, Roster},
        session::CommunitySession,
    },
};

/// Render the status text of `roster`, which belongs to `guild`.
pub fn render_text(state: &SharedState, guild: GuildId, roster: &Roster) -> String {
    let members = state.members().for_guild(guild);
    let config = state.config();
    let context = RenderContext {
        header: &config.status_header,
        tiers: &config.tiers,
        members: &members,
        nicknames: state.nicknames(),
    };
    render(roster, &context)
}

/// Rewrite the status message of one guild and publish the result on the feed.
///
/// Refreshes of one guild run one at a time, so the last edit carries the newest render.
/// The roster lock is only held while rendering. Gateway failures are logged; the next
/// periodic refresh retries.
pub async fn refresh_display(state: &SharedState, session: &CommunitySession) {
    let _refreshing = session.refresh_lock().await;
    let guild = session.guild_id();
    let (text, event, target) = {
        let roster = session.lock().await;
        let text = render_text(state, guild, &roster);
        let event = RosterUpdatedEvent {
            guild_id: guild.to_string(),
            text: text.clone(),
            participants: ids(roster.participants()),
            waitlist: ids(roster.waitlist()),
            capacity: roster.resolve_capacity(state.config().default_capacity),
            signup_open: roster.signup_open(),
        };
        let links = roster.links();
        (text, event, links.viewer_channel.zip(links.status_message))
    };

    sse_events::broadcast_roster_updated(state, &event, guild);

    let Some((channel, message)) = target else {
        debug!(guild, "no status message to refresh");
        return;
    };

    match state.gateway().edit_message(channel, message, text).await {
        Ok(()) => debug!(guild, message, "status message refreshed"),
        Err(err) if err.is_not_found() => {
            info!(guild, message, "status message is gone; skipping refresh")
        }
        Err(err) => warn!(guild, message, error = %err, "failed to refresh status message"),
    }
}

/// Save every roster, logging failures. The in-memory state is never rolled back.
pub async fn persist(state: &SharedState) {
    if let Err(err) = state.persist_rosters().await {
        warn!(error = %err, "failed to persist rosters");
    }
}

/// Save the nickname book, logging failures.
pub async fn persist_nicknames(state: &SharedState) {
    if let Err(err) = state.persist_nicknames().await {
        warn!(error = %err, "failed to persist nicknames");
    }
}

/// Status refresh followed by a snapshot save: the tail of every roster mutation.
pub async fn refresh_and_persist(state: &SharedState, session: &CommunitySession) {
    refresh_display(state, session).await;
    persist(state).await;
}

/// Refresh the status message of every guild.
pub async fn refresh_all(state: &SharedState) {
    for session in state.sessions() {
        refresh_display(state, &session).await;
    }
}

/// Append the rendered roster of `session` to its backup log. Returns the log location.
pub async fn backup(
    state: &SharedState,
    session: &CommunitySession,
) -> StorageResult<String> {
    let guild = session.guild_id();
    let text = {
        let roster = session.lock().await;
        render_text(state, guild, &roster)
    };
    state.store().append_backup(guild, text).await
}

/// Back up every guild; one failure does not stop the others.
pub async fn backup_all(state: &SharedState) {
    for session in state.sessions() {
        if let Err(err) = backup(state, &session).await {
            warn!(guild = session.guild_id(), error = %err, "periodic backup failed");
        }
    }
}

/// Post a short-lived notice in `channel`.
pub async fn notify(state: &SharedState, channel: ChannelId, text: impl Into<String>) {
    let ttl = Some(state.config().notice_ttl);
    if let Err(err) = state.gateway().send_message(channel, text.into(), ttl).await {
        warn!(channel, error = %err, "failed to post notice");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::snapshot_store::MemorySnapshotStore,
        gateway::{GatewayCall, RecordingGateway},
        state::{
            AppState,
            members::MemberProfile,
            rotation::JoinWeight,
            roster::{MessageLinks, SignupMode},
        },
    };

    fn setup() -> (SharedState, RecordingGateway, MemorySnapshotStore) {
        let gateway = RecordingGateway::new();
        let store = MemorySnapshotStore::new();
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(store.clone()),
            Arc::new(gateway.clone()),
        );
        (state, gateway, store)
    }

    fn links() -> MessageLinks {
        MessageLinks {
            viewer_channel: Some(10),
            signup_message: Some(20),
            status_message: Some(21),
            ..MessageLinks::default()
        }
    }

    #[tokio::test]
    async fn refresh_edits_status_and_publishes_feed() {
        let (state, gateway, store) = setup();
        let mut feed = state.feed().subscribe();
        let mut roster = Roster::new(SignupMode::Registration, 9, links());
        roster.set_signup_open(true);
        let session = state.install_session(1, roster);
        state.members().upsert(
            1,
            7,
            MemberProfile {
                display_name: "Alice".into(),
                username: "alice".into(),
                roles: vec![],
            },
        );
        state
            .with_rotation(&session, |rotation| rotation.join(7, JoinWeight::Rounds(2)))
            .await
            .unwrap();

        refresh_and_persist(&state, &session).await;

        let text = gateway.latest_text(21).unwrap();
        assert!(text.contains("Alice [티어 없음] (2판)"));
        let event = feed.recv().await.unwrap();
        assert!(event.visible_to(1));
        assert_eq!(store.rosters()["1"].participants, vec![7]);
    }

    #[tokio::test]
    async fn refreshes_of_one_guild_wait_for_each_other() {
        let (state, gateway, _store) = setup();
        let session = state.install_session(1, Roster::new(SignupMode::Simple, 4, links()));

        let held = session.refresh_lock().await;
        let refresh = refresh_display(&state, &session);
        tokio::pin!(refresh);
        assert!(futures::poll!(&mut refresh).is_pending());
        assert!(gateway.latest_text(21).is_none());

        session.lock().await.set_signup_open(true);
        drop(held);
        refresh.await;

        let text = gateway.latest_text(21).unwrap();
        assert_eq!(text, render_text(&state, 1, &*session.lock().await));
    }

    #[tokio::test]
    async fn missing_status_message_is_tolerated() {
        let (state, gateway, store) = setup();
        gateway.mark_missing(21);
        let session = state.install_session(1, Roster::new(SignupMode::Simple, 4, links()));

        refresh_and_persist(&state, &session).await;

        assert!(gateway.latest_text(21).is_none());
        assert!(store.rosters().contains_key("1"));
    }

    #[tokio::test]
    async fn persistence_failures_keep_memory_state() {
        let (state, _gateway, store) = setup();
        store.set_failing(true);
        let mut roster = Roster::new(SignupMode::Simple, 4, links());
        roster.set_signup_open(true);
        let session = state.install_session(1, roster);
        state
            .with_rotation(&session, |rotation| rotation.join(3, JoinWeight::Rounds(1)))
            .await
            .unwrap();

        persist(&state).await;

        assert!(store.rosters().is_empty());
        assert_eq!(session.lock().await.participants(), &[3]);
    }

    #[tokio::test]
    async fn backups_append_rendered_text() {
        let (state, gateway, store) = setup();
        state.install_session(2, Roster::new(SignupMode::Simple, 4, links()));

        backup_all(&state).await;
        notify(&state, 10, "hello").await;

        let backups = store.backups();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].1.contains("(아직 없음)"));
        assert!(matches!(
            gateway.calls().last(),
            Some(GatewayCall::Send { channel: 10, ttl: Some(_), .. })
        ));
    }
}
