use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::CheckpointError;
use super::traits::{CheckpointKey, CheckpointStore};
use crate::domain::{PartitionId, SequenceNumber};

const FORMAT_VERSION: u16 = 1;

/// On-disk layout of a checkpoint file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckpointDocument {
    version: u16,
    checkpoints: BTreeMap<String, SequenceNumber>,
}

impl Default for CheckpointDocument {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            checkpoints: BTreeMap::new(),
        }
    }
}

/// Checkpoint store persisted as a JSON document
///
/// Entries are keyed `{application}:{stream}:{partition}`, so several
/// consumers can share a file as long as they live in the same process and
/// share this store. Every write rewrites the whole document to a temporary
/// file and renames it over the original; the in-memory view is only updated
/// once the rename succeeded.
pub struct FileCheckpoint {
    application: String,
    stream: String,
    path: PathBuf,
    document: Mutex<CheckpointDocument>,
}

impl FileCheckpoint {
    /// Open (or lazily create) the checkpoint file at `path`
    pub async fn open(
        path: impl AsRef<Path>,
        application: impl Into<String>,
        stream: impl Into<String>,
    ) -> Result<Self, CheckpointError> {
        let path = path.as_ref().to_path_buf();

        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => Self::parse(&path, &bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckpointDocument::default(),
            Err(e) => return Err(e.into()),
        };

        debug!(
            path = %path.display(),
            entries = document.checkpoints.len(),
            "opened checkpoint file"
        );

        Ok(Self {
            application: application.into(),
            stream: stream.into(),
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(path: &Path, bytes: &[u8]) -> Result<CheckpointDocument, CheckpointError> {
        let document: CheckpointDocument = serde_json::from_slice(bytes)
            .map_err(|e| CheckpointError::Corrupt(format!("{}: {}", path.display(), e)))?;

        if document.version != FORMAT_VERSION {
            return Err(CheckpointError::Corrupt(format!(
                "{}: unsupported version {}",
                path.display(),
                document.version
            )));
        }

        Ok(document)
    }

    fn key(&self, partition: &PartitionId) -> String {
        CheckpointKey {
            application: &self.application,
            stream: &self.stream,
            partition,
        }
        .to_string()
    }

    async fn persist(&self, document: &CheckpointDocument) -> Result<(), CheckpointError> {
        let content = serde_json::to_vec_pretty(document)?;
        let temp_path = self.path.with_extension("tmp");

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpoint {
    async fn exists(&self, partition: &PartitionId) -> Result<bool, CheckpointError> {
        let key = self.key(partition);
        Ok(self.document.lock().await.checkpoints.contains_key(&key))
    }

    async fn sequence_number(
        &self,
        partition: &PartitionId,
    ) -> Result<SequenceNumber, CheckpointError> {
        let key = self.key(partition);
        let document = self.document.lock().await;
        document
            .checkpoints
            .get(&key)
            .cloned()
            .ok_or(CheckpointError::NotFound(key))
    }

    async fn set_checkpoint(
        &self,
        partition: &PartitionId,
        sequence: &SequenceNumber,
    ) -> Result<(), CheckpointError> {
        let key = self.key(partition);

        // Held across the write so concurrent partitions never drop each other's entries
        let mut document = self.document.lock().await;
        let mut updated = document.clone();
        updated.checkpoints.insert(key, sequence.clone());

        self.persist(&updated).await?;
        *document = updated;
        Ok(())
    }
}
