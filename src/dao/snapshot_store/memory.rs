//! In-memory snapshot store, used by tests and for ephemeral runs.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use futures::future::BoxFuture;

use crate::{
    dao::{
        models::{NicknameDocument, RosterDocument},
        snapshot_store::SnapshotStore,
        storage::{StorageError, StorageResult},
    },
    state::roster::GuildId,
};

#[derive(Default)]
struct Inner {
    rosters: Mutex<RosterDocument>,
    nicknames: Mutex<NicknameDocument>,
    backups: Mutex<Vec<(GuildId, String)>>,
    failing: AtomicBool,
}

/// Store keeping every document in memory.
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<Inner>,
}

impl MemorySnapshotStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with a roster document.
    pub fn with_rosters(rosters: RosterDocument) -> Self {
        let store = Self::default();
        *lock(&store.inner.rosters) = rosters;
        store
    }

    /// Make every following operation fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Last saved roster document.
    pub fn rosters(&self) -> RosterDocument {
        lock(&self.inner.rosters).clone()
    }

    /// Last saved nickname document.
    pub fn nicknames(&self) -> NicknameDocument {
        lock(&self.inner.nicknames).clone()
    }

    /// Every backup appended so far.
    pub fn backups(&self) -> Vec<(GuildId, String)> {
        lock(&self.inner.backups).clone()
    }

    fn check(&self) -> StorageResult<()> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                "memory store switched to failing".into(),
                std::io::Error::other("simulated outage"),
            ));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SnapshotStore for MemorySnapshotStore {
    fn load_rosters(&self) -> BoxFuture<'static, StorageResult<RosterDocument>> {
        let store = self.clone();
        Box::pin(async move {
            store.check()?;
            Ok(store.rosters())
        })
    }

    fn save_rosters(&self, document: RosterDocument) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.check()?;
            *lock(&store.inner.rosters) = document;
            Ok(())
        })
    }

    fn load_nicknames(&self) -> BoxFuture<'static, StorageResult<NicknameDocument>> {
        let store = self.clone();
        Box::pin(async move {
            store.check()?;
            Ok(store.nicknames())
        })
    }

    fn save_nicknames(
        &self,
        document: NicknameDocument,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.check()?;
            *lock(&store.inner.nicknames) = document;
            Ok(())
        })
    }

    fn append_backup(
        &self,
        guild: GuildId,
        text: String,
    ) -> BoxFuture<'static, StorageResult<String>> {
        let store = self.clone();
        Box::pin(async move {
            store.check()?;
            let mut backups = lock(&store.inner.backups);
            backups.push((guild, text));
            Ok(format!("memory://backup_{guild}/{}", backups.len()))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.check() })
    }
}
