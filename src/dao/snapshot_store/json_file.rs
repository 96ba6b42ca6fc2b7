//! Snapshot store writing JSON documents into a data directory.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::{
    dao::{
        models::{NicknameDocument, RosterDocument},
        snapshot_store::SnapshotStore,
        storage::{StorageError, StorageResult},
    },
    state::roster::GuildId,
};

const ROSTERS_FILE: &str = "rosters.json";
const NICKNAMES_FILE: &str = "nicknames.json";
const BACKUP_DIR: &str = "backups";

/// File-backed store: `rosters.json`, `nicknames.json` and `backups/backup_<guild>.txt`
/// under a single directory.
#[derive(Clone)]
pub struct JsonFileStore {
    root: Arc<PathBuf>,
}

impl JsonFileStore {
    /// Use `root` as data directory; it is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    /// Data directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn backup_path(&self, guild: GuildId) -> PathBuf {
        self.root
            .join(BACKUP_DIR)
            .join(format!("backup_{guild}.txt"))
    }

    async fn read_document<T>(&self, name: &str) -> StorageResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.root.join(name);
        match fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(T::default()),
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| StorageError::corrupt(name, source))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(err) => Err(StorageError::unavailable(
                format!("failed to read {}", path.display()),
                err,
            )),
        }
    }

    /// Serialize `document` into a sibling temp file, then rename it over the target.
    async fn write_document<T>(&self, name: &str, document: &T) -> StorageResult<()>
    where
        T: Serialize,
    {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|source| StorageError::corrupt(name, source))?;

        fs::create_dir_all(self.root.as_path()).await.map_err(|err| {
            StorageError::unavailable(
                format!("failed to create {}", self.root.display()),
                err,
            )
        })?;

        let target = self.root.join(name);
        let temp = self
            .root
            .join(format!("{name}.{}.tmp", Uuid::new_v4().simple()));
        fs::write(&temp, &bytes).await.map_err(|err| {
            StorageError::unavailable(format!("failed to write {}", temp.display()), err)
        })?;
        fs::rename(&temp, &target).await.map_err(|err| {
            StorageError::unavailable(format!("failed to replace {}", target.display()), err)
        })
    }

    async fn append(&self, guild: GuildId, text: &str) -> StorageResult<String> {
        let path = self.backup_path(guild);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await.map_err(|err| {
                StorageError::unavailable(format!("failed to create {}", dir.display()), err)
            })?;
        }

        let entry = format!("\n====== {} ======\n{text}\n", backup_timestamp());
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|err| {
                StorageError::unavailable(format!("failed to open {}", path.display()), err)
            })?;
        file.write_all(entry.as_bytes()).await.map_err(|err| {
            StorageError::unavailable(format!("failed to append {}", path.display()), err)
        })?;
        file.flush().await.map_err(|err| {
            StorageError::unavailable(format!("failed to flush {}", path.display()), err)
        })?;

        Ok(path.display().to_string())
    }
}

fn backup_timestamp() -> String {
    OffsetDateTime::from(SystemTime::now())
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

impl SnapshotStore for JsonFileStore {
    fn load_rosters(&self) -> BoxFuture<'static, StorageResult<RosterDocument>> {
        let store = self.clone();
        Box::pin(async move { store.read_document(ROSTERS_FILE).await })
    }

    fn save_rosters(&self, document: RosterDocument) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.write_document(ROSTERS_FILE, &document).await })
    }

    fn load_nicknames(&self) -> BoxFuture<'static, StorageResult<NicknameDocument>> {
        let store = self.clone();
        Box::pin(async move { store.read_document(NICKNAMES_FILE).await })
    }

    fn save_nicknames(
        &self,
        document: NicknameDocument,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.write_document(NICKNAMES_FILE, &document).await })
    }

    fn append_backup(
        &self,
        guild: GuildId,
        text: String,
    ) -> BoxFuture<'static, StorageResult<String>> {
        let store = self.clone();
        Box::pin(async move { store.append(guild, &text).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            match fs::metadata(store.root.as_path()).await {
                Ok(meta) if meta.is_dir() => Ok(()),
                Ok(_) => Err(StorageError::unavailable(
                    format!("{} is not a directory", store.root.display()),
                    std::io::Error::from(ErrorKind::InvalidInput),
                )),
                // Not created until the first save.
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(StorageError::unavailable(
                    format!("failed to inspect {}", store.root.display()),
                    err,
                )),
            }
        })
    }
}
