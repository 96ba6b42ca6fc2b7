pub mod members;
pub mod nicknames;
pub mod reactions;
pub mod render;
pub mod roster;
pub mod rotation;
pub mod session;
mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dao::{
        models::{NicknameDocument, RosterDocument, RosterEntity},
        snapshot_store::SnapshotStore,
        storage::StorageResult,
    },
    error::ServiceError,
    gateway::ChatGateway,
    state::{
        members::MemberDirectory,
        nicknames::NicknameBook,
        rotation::Rotation,
        roster::{ChannelId, GuildId, MessageId, Roster, UserId},
        session::CommunitySession,
    },
};

pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

/// Central application state: guild sessions, shared lookups and the outbound seams.
pub struct AppState {
    config: Arc<AppConfig>,
    sessions: DashMap<GuildId, Arc<CommunitySession>>,
    members: MemberDirectory,
    nicknames: NicknameBook,
    pending_warnings: DashMap<UserId, (ChannelId, MessageId)>,
    store: Arc<dyn SnapshotStore>,
    gateway: Arc<dyn ChatGateway>,
    feed: SseHub,
    persist_gate: Mutex<()>,
}

impl AppState {
    /// Construct an empty [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn SnapshotStore>,
        gateway: Arc<dyn ChatGateway>,
    ) -> SharedState {
        Self::with_nicknames(config, store, gateway, NicknameBook::default())
    }

    fn with_nicknames(
        config: AppConfig,
        store: Arc<dyn SnapshotStore>,
        gateway: Arc<dyn ChatGateway>,
        nicknames: NicknameBook,
    ) -> SharedState {
        Arc::new(Self {
            config: Arc::new(config),
            sessions: DashMap::new(),
            members: MemberDirectory::new(),
            nicknames,
            pending_warnings: DashMap::new(),
            store,
            gateway,
            feed: SseHub::new(64),
            persist_gate: Mutex::new(()),
        })
    }

    /// Rebuild the state from the snapshot store. Every restored roster is fitted to its
    /// capacity before being installed.
    pub async fn restore(
        config: AppConfig,
        store: Arc<dyn SnapshotStore>,
        gateway: Arc<dyn ChatGateway>,
    ) -> StorageResult<SharedState> {
        let rosters = store.load_rosters().await?;
        let nicknames = store.load_nicknames().await?;

        let book = NicknameBook::from_entries(nicknames.into_iter().filter_map(|(user, nick)| {
            match user.parse::<UserId>() {
                Ok(user) => Some((user, nick)),
                Err(err) => {
                    warn!(user = %user, error = %err, "skipping nickname with invalid user id");
                    None
                }
            }
        }));

        let state = Self::with_nicknames(config, store, gateway, book);
        let default_capacity = state.config.default_capacity;
        for (guild, entity) in rosters {
            let Ok(guild_id) = guild.parse::<GuildId>() else {
                warn!(guild = %guild, "skipping roster with invalid guild id");
                continue;
            };
            let mut roster = Roster::from(entity);
            let mut rotation = Rotation::new(&mut roster, default_capacity);
            let limit = rotation.capacity();
            rotation.adjust_capacity(limit);
            state.install_session(guild_id, roster);
        }

        info!(
            guilds = state.sessions.len(),
            nicknames = state.nicknames.entries().len(),
            "restored snapshot"
        );
        Ok(state)
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Member profiles fed by the host.
    pub fn members(&self) -> &MemberDirectory {
        &self.members
    }

    /// Registered nicknames.
    pub fn nicknames(&self) -> &NicknameBook {
        &self.nicknames
    }

    /// Nickname warnings still displayed, keyed by the warned user.
    pub fn pending_warnings(&self) -> &DashMap<UserId, (ChannelId, MessageId)> {
        &self.pending_warnings
    }

    /// Snapshot store handle.
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Outbound chat gateway.
    pub fn gateway(&self) -> &Arc<dyn ChatGateway> {
        &self.gateway
    }

    /// Broadcast hub of the roster feed.
    pub fn feed(&self) -> &SseHub {
        &self.feed
    }

    /// Session of `guild`, if a roster was set up.
    pub fn find_session(&self, guild: GuildId) -> Option<Arc<CommunitySession>> {
        self.sessions.get(&guild).map(|entry| entry.value().clone())
    }

    /// Session of `guild`, or a not-found error when no roster was set up.
    pub fn session(&self, guild: GuildId) -> Result<Arc<CommunitySession>, ServiceError> {
        self.find_session(guild)
            .ok_or_else(|| ServiceError::NotFound(format!("no roster registered for guild {guild}")))
    }

    /// Every session, in no particular order.
    pub fn sessions(&self) -> Vec<Arc<CommunitySession>> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Install (or replace) the session of `guild`.
    pub fn install_session(&self, guild: GuildId, roster: Roster) -> Arc<CommunitySession> {
        let session = Arc::new(CommunitySession::new(guild, roster));
        self.sessions.insert(guild, session.clone());
        session
    }

    /// Run `work` against the guild roster under its lock. Message handles are republished
    /// afterwards.
    pub async fn with_rotation<T>(
        &self,
        session: &CommunitySession,
        work: impl FnOnce(&mut Rotation<'_>) -> T,
    ) -> T {
        let mut roster = session.lock().await;
        let outcome = {
            let mut rotation = Rotation::new(&mut roster, self.config.default_capacity);
            work(&mut rotation)
        };
        session.sync_links(&roster);
        outcome
    }

    /// Save every roster. Saves are serialized so a later call always stores newer state;
    /// roster locks are only held while copying.
    pub async fn persist_rosters(&self) -> StorageResult<()> {
        let _gate = self.persist_gate.lock().await;

        let mut document = RosterDocument::new();
        for session in self.sessions() {
            let roster = session.lock().await;
            document.insert(session.guild_id().to_string(), RosterEntity::from(&*roster));
        }

        self.store.save_rosters(document).await
    }

    /// Save the nickname book.
    pub async fn persist_nicknames(&self) -> StorageResult<()> {
        let document: NicknameDocument = self
            .nicknames
            .entries()
            .into_iter()
            .map(|(user, nick)| (user.to_string(), nick))
            .collect();
        self.store.save_nicknames(document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::snapshot_store::MemorySnapshotStore,
        gateway::RecordingGateway,
        state::{
            rotation::JoinWeight,
            roster::{MessageLinks, SignupMode},
        },
    };

    #[tokio::test]
    async fn restore_repairs_and_fits_capacity() {
        let mut document = RosterDocument::new();
        document.insert(
            "5".into(),
            RosterEntity {
                participants: vec![1, 2, 3],
                waitlist: vec![2],
                max_participants: Some(2),
                ..RosterEntity::default()
            },
        );
        document.insert("not-a-guild".into(), RosterEntity::default());
        let store = MemorySnapshotStore::with_rosters(document);

        let state = AppState::restore(
            AppConfig::default(),
            Arc::new(store),
            Arc::new(RecordingGateway::new()),
        )
        .await
        .unwrap();

        assert_eq!(state.sessions().len(), 1);
        let session = state.session(5).unwrap();
        let roster = session.lock().await;
        assert_eq!(roster.participants(), &[1, 2]);
        assert_eq!(roster.waitlist(), &[3]);
        assert!(state.session(6).is_err());
    }

    #[tokio::test]
    async fn persist_captures_every_session() {
        let store = MemorySnapshotStore::new();
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(store.clone()),
            Arc::new(RecordingGateway::new()),
        );
        let mut roster = Roster::new(SignupMode::Simple, 4, MessageLinks::default());
        roster.set_signup_open(true);
        let session = state.install_session(9, roster);
        state
            .with_rotation(&session, |rotation| rotation.join(1, JoinWeight::Rounds(1)))
            .await
            .unwrap();
        state.nicknames().register(1, "one#KR1").unwrap();

        state.persist_rosters().await.unwrap();
        state.persist_nicknames().await.unwrap();

        let saved = store.rosters();
        assert_eq!(saved["9"].participants, vec![1]);
        assert_eq!(store.nicknames()["1"], "one#KR1");
    }
}
