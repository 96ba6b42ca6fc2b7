pub mod json_file;
pub mod memory;

use futures::future::BoxFuture;

use crate::{
    dao::{
        models::{NicknameDocument, RosterDocument},
        storage::StorageResult,
    },
    state::roster::GuildId,
};

pub use self::{json_file::JsonFileStore, memory::MemorySnapshotStore};

/// Abstraction over the persistence of roster snapshots, nicknames and text backups.
///
/// Saves overwrite the whole document: either the new document is stored entirely or
/// the previous one stays in place.
pub trait SnapshotStore: Send + Sync {
    fn load_rosters(&self) -> BoxFuture<'static, StorageResult<RosterDocument>>;
    fn save_rosters(&self, document: RosterDocument) -> BoxFuture<'static, StorageResult<()>>;
    fn load_nicknames(&self) -> BoxFuture<'static, StorageResult<NicknameDocument>>;
    fn save_nicknames(&self, document: NicknameDocument)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Append a timestamped copy of `text` to the guild's backup log and return where it
    /// was written.
    fn append_backup(&self, guild: GuildId, text: String)
    -> BoxFuture<'static, StorageResult<String>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
