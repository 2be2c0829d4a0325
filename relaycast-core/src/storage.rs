//! Content-addressed asset store.
//!
//! Owns the physical media files and the `media_assets` records. Files are
//! written to a staged temp path first and only renamed to their
//! digest-derived location after the digest has been recomputed and
//! verified, so a failed or cancelled upload never leaves a visible file
//! or a record behind.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use sqlx::SqlitePool;

use crate::{
    digest::{ContentDigest, DigestHasher},
    models::{AssetId, MediaAsset, MediaKind, ProfileId},
    repository::{AssetRepository, NewAssetRecord},
    Error, Result,
};

static STAGED_SEQ: AtomicU64 = AtomicU64::new(0);

/// Result of committing bytes into the store
#[derive(Debug, Clone)]
pub struct StoreOutcome {
    pub asset: MediaAsset,
    /// True when the bytes matched an existing (digest, kind) record and
    /// no new file or record was created.
    pub deduplicated: bool,
}

/// An in-flight staged write.
///
/// Bytes live under `<root>/staging/` until committed; the digest is
/// accumulated as chunks arrive.
pub struct StagedUpload {
    kind: MediaKind,
    temp_path: PathBuf,
    file: fs::File,
    hasher: DigestHasher,
    bytes_written: u64,
}

impl StagedUpload {
    /// Append a chunk to the staged file
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| Error::storage("writing staged chunk", e))?;
        self.hasher.update(chunk);
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    #[must_use]
    pub const fn kind(&self) -> MediaKind {
        self.kind
    }
}

/// Content-addressed media file store
#[derive(Clone)]
pub struct AssetStore {
    root: PathBuf,
    assets: AssetRepository,
}

impl AssetStore {
    pub fn new(pool: SqlitePool, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            assets: AssetRepository::new(pool),
        }
    }

    /// Read-only lookup by content address. No side effects.
    pub async fn check_exists(
        &self,
        digest: &ContentDigest,
        kind: MediaKind,
    ) -> Result<Option<MediaAsset>> {
        self.assets.find_by_digest(digest, kind).await
    }

    /// Get an asset record by id
    pub async fn get(&self, asset_id: AssetId) -> Result<Option<MediaAsset>> {
        self.assets.get_by_id(asset_id).await
    }

    /// List a profile's assets, newest first
    pub async fn list_by_profile(&self, profile_id: ProfileId) -> Result<Vec<MediaAsset>> {
        self.assets.list_by_profile(profile_id).await
    }

    /// IDs of all assets a profile owns
    pub async fn ids_by_profile(&self, profile_id: ProfileId) -> Result<Vec<AssetId>> {
        self.assets.ids_by_profile(profile_id).await
    }

    /// Open a staged write for an incoming byte stream
    pub async fn begin_staged(&self, kind: MediaKind) -> Result<StagedUpload> {
        let staging_dir = self.root.join("staging");
        fs::create_dir_all(&staging_dir)
            .await
            .map_err(|e| Error::storage("creating staging directory", e))?;

        let seq = STAGED_SEQ.fetch_add(1, Ordering::Relaxed);
        let temp_path = staging_dir.join(format!("{}-{seq}.part", std::process::id()));

        let file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::storage("creating staged file", e))?;

        Ok(StagedUpload {
            kind,
            temp_path,
            file,
            hasher: DigestHasher::new(),
            bytes_written: 0,
        })
    }

    /// Verify, deduplicate, and publish a staged write.
    ///
    /// The digest is recomputed from the bytes actually received; a
    /// client-declared digest is checked against it and a mismatch purges
    /// the staged file with no record created. On a (digest, kind) hit the
    /// staged bytes are discarded and the existing asset is returned.
    pub async fn commit_staged(
        &self,
        mut staged: StagedUpload,
        profile_id: ProfileId,
        file_name: &str,
        mime_type: &str,
        declared: Option<&ContentDigest>,
    ) -> Result<StoreOutcome> {
        if let Err(e) = staged.file.flush().await {
            self.purge_temp(&staged.temp_path).await;
            return Err(Error::storage("flushing staged file", e));
        }
        drop(staged.file);

        let computed = staged.hasher.finalize();

        if let Some(declared) = declared {
            if *declared != computed {
                warn!(
                    declared = %declared,
                    computed = %computed,
                    "Declared digest does not match received bytes, purging staged file"
                );
                self.purge_temp(&staged.temp_path).await;
                return Err(Error::IntegrityMismatch {
                    declared: declared.to_string(),
                    computed: computed.to_string(),
                });
            }
        }

        // Dedup hit: discard our bytes, return the winner's record
        if let Some(existing) = self.assets.find_by_digest(&computed, staged.kind).await? {
            debug!(digest = %computed, kind = %staged.kind, "Dedup hit, discarding staged bytes");
            self.purge_temp(&staged.temp_path).await;
            return Ok(StoreOutcome {
                asset: existing,
                deduplicated: true,
            });
        }

        let final_path = self.asset_path(staged.kind, &computed, file_name);
        if let Some(parent) = final_path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                self.purge_temp(&staged.temp_path).await;
                return Err(Error::storage("creating asset directory", e));
            }
        }
        if let Err(e) = fs::rename(&staged.temp_path, &final_path).await {
            self.purge_temp(&staged.temp_path).await;
            return Err(Error::storage("publishing staged file", e));
        }

        let record = NewAssetRecord {
            profile_id,
            kind: staged.kind,
            file_name: file_name.to_string(),
            path: final_path.to_string_lossy().into_owned(),
            digest: computed.clone(),
            mime_type: mime_type.to_string(),
            size_bytes: staged.bytes_written as i64,
        };

        let (asset, inserted) = self.assets.insert_dedup(&record).await?;

        if inserted {
            info!(asset_id = %asset.id, digest = %computed, size = staged.bytes_written, "Asset stored");
            return Ok(StoreOutcome {
                asset,
                deduplicated: false,
            });
        }

        // Lost the record-insert race against a concurrent identical
        // upload. Our file is redundant; remove it unless the winner's
        // record points at the very same path.
        if asset.path != final_path.to_string_lossy() {
            self.purge_temp(&final_path).await;
        }
        Ok(StoreOutcome {
            asset,
            deduplicated: true,
        })
    }

    /// Discard a staged write, purging its temp file
    pub async fn abort_staged(&self, staged: StagedUpload) {
        drop(staged.file);
        self.purge_temp(&staged.temp_path).await;
    }

    /// Store a full in-memory byte slice (convenience over the staged flow)
    pub async fn store(
        &self,
        profile_id: ProfileId,
        file_name: &str,
        mime_type: &str,
        declared: Option<&ContentDigest>,
        bytes: &[u8],
    ) -> Result<StoreOutcome> {
        let kind = MediaKind::from_mime(mime_type).ok_or_else(|| {
            Error::Validation(crate::validation::ValidationError::Field {
                field: "mime_type".to_string(),
                message: "only audio/* and video/* uploads are accepted".to_string(),
            })
        })?;

        let mut staged = self.begin_staged(kind).await?;
        staged.write_chunk(bytes).await?;
        self.commit_staged(staged, profile_id, file_name, mime_type, declared)
            .await
    }

    /// Remove the physical file and the record.
    ///
    /// A missing physical file is logged and treated as success: the
    /// record must always be removable even when storage is inconsistent.
    pub async fn delete(&self, asset_id: AssetId) -> Result<()> {
        let asset = self
            .assets
            .get_by_id(asset_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Asset {asset_id} not found")))?;

        match fs::remove_file(&asset.path).await {
            Ok(()) => debug!(asset_id = %asset_id, path = %asset.path, "Asset file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(asset_id = %asset_id, path = %asset.path, "Asset file already missing, removing record anyway");
            }
            Err(e) => return Err(Error::storage("removing asset file", e)),
        }

        self.assets.delete(asset_id).await?;
        info!(asset_id = %asset_id, "Asset deleted");
        Ok(())
    }

    fn asset_path(&self, kind: MediaKind, digest: &ContentDigest, file_name: &str) -> PathBuf {
        let mut name = digest.to_string();
        if let Some(ext) = Path::new(file_name).extension().and_then(|e| e.to_str()) {
            name.push('.');
            name.push_str(ext);
        }
        self.root.join(kind.as_str()).join(name)
    }

    async fn purge_temp(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to purge staged file");
            }
        }
    }
}
