//! Member profiles pushed by the host and member references used by admin commands.

use tracing::{debug, info};

use crate::{
    dto::host::MemberInput,
    error::ServiceError,
    services::status_service,
    state::{
        SharedState,
        members::MemberLookup,
        roster::{GuildId, UserId},
    },
};

/// A member reference resolved to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMember {
    /// Matched user.
    pub user_id: UserId,
    /// Guild display name at resolution time.
    pub display_name: String,
}

/// Store the latest profile of a guild member.
pub fn upsert(state: &SharedState, guild: GuildId, user: UserId, input: MemberInput) {
    debug!(guild, user, "member profile updated");
    state.members().upsert(guild, user, input.into());
}

/// The member left the guild: drop them from the roster (backfilling their slot) and
/// forget their profile. Returns whether the roster changed.
pub async fn member_left(state: &SharedState, guild: GuildId, user: UserId) -> bool {
    let changed = match state.find_session(guild) {
        Some(session) => {
            let changed = state
                .with_rotation(&session, |rotation| rotation.member_left(user))
                .await;
            if changed {
                info!(guild, user, "member left; removed from roster");
                status_service::refresh_and_persist(state, &session).await;
            }
            changed
        }
        None => false,
    };

    state.members().remove(guild, user);
    changed
}

/// Resolve a numeric user ID, a display name or an account name.
pub fn resolve(
    state: &SharedState,
    guild: GuildId,
    reference: &str,
) -> Result<ResolvedMember, ServiceError> {
    let reference = reference.trim();

    if let Ok(user_id) = reference.parse::<UserId>() {
        let display_name = state
            .members()
            .for_guild(guild)
            .profile(user_id)
            .map(|profile| profile.display_name)
            .unwrap_or_else(|| format!("<@{user_id}>"));
        return Ok(ResolvedMember {
            user_id,
            display_name,
        });
    }

    state
        .members()
        .find_by_name(guild, reference)
        .map(|(user_id, profile)| ResolvedMember {
            user_id,
            display_name: profile.display_name,
        })
        .ok_or_else(|| ServiceError::NotFound(format!("⚠️ '{reference}' 님을 찾을 수 없습니다.")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::snapshot_store::MemorySnapshotStore,
        gateway::RecordingGateway,
        state::{
            AppState,
            rotation::JoinWeight,
            roster::{MessageLinks, Roster, SignupMode},
        },
    };

    fn input(name: &str) -> MemberInput {
        MemberInput {
            display_name: name.to_string(),
            username: name.to_lowercase(),
            roles: vec![],
        }
    }

    #[tokio::test]
    async fn resolves_ids_and_names() {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(RecordingGateway::new()),
        );
        upsert(&state, 1, 5, input("Bob"));

        assert_eq!(resolve(&state, 1, "5").unwrap().display_name, "Bob");
        assert_eq!(resolve(&state, 1, "bob").unwrap().user_id, 5);
        assert_eq!(resolve(&state, 1, "9").unwrap().display_name, "<@9>");
        assert!(matches!(
            resolve(&state, 2, "Bob"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn departure_backfills_and_forgets_profile() {
        let store = MemorySnapshotStore::new();
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(store.clone()),
            Arc::new(RecordingGateway::new()),
        );
        let mut roster = Roster::new(SignupMode::Simple, 1, MessageLinks::default());
        roster.set_signup_open(true);
        let session = state.install_session(1, roster);
        state
            .with_rotation(&session, |rotation| {
                rotation.join(5, JoinWeight::Rounds(1)).unwrap();
                rotation.join(6, JoinWeight::Rounds(1)).unwrap();
            })
            .await;
        upsert(&state, 1, 5, input("Bob"));

        assert!(member_left(&state, 1, 5).await);
        assert!(!member_left(&state, 1, 42).await);

        assert_eq!(session.lock().await.participants(), &[6]);
        assert!(state.members().find_by_name(1, "Bob").is_none());
        assert_eq!(store.rosters()["1"].participants, vec![6]);
    }
}
