//! Staged upload sessions.
//!
//! An upload runs as a spawned task driving a chunk stream into the asset
//! store's staged-write flow. Observers get a progress channel; the caller
//! gets a handle it can cancel at any point before the staged write
//! commits. The resulting ticket must be committed into an endpoint
//! binding or discarded, so an abandoned upload never leaves residue.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    digest::ContentDigest,
    models::{AssetId, MediaAsset, MediaKind, ProfileId},
    service::CleanupCoordinator,
    storage::AssetStore,
    Error, Result,
};

const PROGRESS_CHANNEL_CAPACITY: usize = 32;

/// Client-observable upload states
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    Idle,
    Hashing,
    Checking,
    Uploading,
    Ready,
    Aborted,
}

/// A progress event. Percent is monotonic within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct UploadProgress {
    pub state: UploadState,
    pub percent: u8,
}

/// Parameters for one upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub profile_id: ProfileId,
    pub file_name: String,
    pub mime_type: String,
    /// Digest the client computed before sending; verified server-side
    pub declared_digest: Option<ContentDigest>,
    /// Expected payload size, used only for progress percentages
    pub total_bytes: Option<u64>,
}

/// Outcome of a finished upload, pending commit or discard
#[derive(Debug, Clone)]
pub struct UploadTicket {
    pub asset: MediaAsset,
    /// True when the bytes matched an already-stored asset
    pub deduplicated: bool,
}

impl UploadTicket {
    /// Commit the ticket, handing the asset id over for binding
    #[must_use]
    pub fn commit(self) -> AssetId {
        self.asset.id
    }

    /// Abandon the ticket.
    ///
    /// Only an asset this upload created is a cleanup candidate; a dedup
    /// hit belongs to whoever stored it first and is left alone.
    pub async fn discard(self, cleanup: &CleanupCoordinator) -> Result<bool> {
        if self.deduplicated {
            debug!(asset_id = %self.asset.id, "Discarding dedup ticket, asset untouched");
            return Ok(false);
        }
        cleanup.reclaim_one(self.asset.id).await
    }
}

/// Handle on an in-flight upload task
pub struct UploadHandle {
    progress: mpsc::Receiver<UploadProgress>,
    cancel: CancellationToken,
    task: JoinHandle<Result<UploadTicket>>,
}

impl std::fmt::Debug for UploadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadHandle").finish()
    }
}

impl UploadHandle {
    /// Receiver side of the session's progress events
    pub fn progress(&mut self) -> &mut mpsc::Receiver<UploadProgress> {
        &mut self.progress
    }

    /// Request cancellation. The task purges its staged file and
    /// resolves to `Error::Aborted`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Clone of the session's cancellation token.
    ///
    /// Callers feeding the chunk stream from an outer request can tie
    /// this to a drop guard, so abandoning that request aborts the
    /// session instead of presenting a truncated stream as complete.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the session to finish
    pub async fn finish(self) -> Result<UploadTicket> {
        self.task
            .await
            .map_err(|e| Error::Internal(format!("Upload task panicked: {e}")))?
    }
}

/// Spawns and tracks upload tasks against one asset store
#[derive(Clone)]
pub struct UploadSession {
    store: AssetStore,
}

impl std::fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSession").finish()
    }
}

impl UploadSession {
    pub const fn new(store: AssetStore) -> Self {
        Self { store }
    }

    /// Read-only dedup probe for a client-computed digest
    pub async fn check_exists(
        &self,
        digest: &ContentDigest,
        kind: MediaKind,
    ) -> Result<Option<MediaAsset>> {
        self.store.check_exists(digest, kind).await
    }

    /// Spawn an upload task over a chunk stream.
    ///
    /// The task checks the declared digest for a dedup hit first, skipping
    /// the byte transfer entirely on a hit. Otherwise it stages chunks,
    /// reporting progress, until the stream ends and the staged write
    /// commits.
    pub fn begin<S>(&self, request: UploadRequest, chunks: S) -> Result<UploadHandle>
    where
        S: Stream<Item = Result<Bytes>> + Send + Unpin + 'static,
    {
        let kind = mime_kind(&request.mime_type)?;
        Ok(self.spawn(move |store, mut progress, cancel| async move {
            progress.report(UploadState::Idle, 0);
            run_upload(store, request, kind, chunks, progress, cancel).await
        }))
    }

    /// Upload a whole in-memory payload, hashing it first.
    ///
    /// Covers callers that hold the full bytes: the task reports the
    /// hashing phase, computes the digest, and feeds it through the same
    /// dedup check as a streamed upload.
    pub fn begin_bytes(
        &self,
        profile_id: ProfileId,
        file_name: &str,
        mime_type: &str,
        bytes: Bytes,
    ) -> Result<UploadHandle> {
        let kind = mime_kind(mime_type)?;
        let file_name = file_name.to_string();
        let mime_type = mime_type.to_string();
        Ok(self.spawn(move |store, mut progress, cancel| async move {
            progress.report(UploadState::Idle, 0);
            progress.report(UploadState::Hashing, 0);
            let digest = ContentDigest::compute(&bytes);
            let request = UploadRequest {
                profile_id,
                file_name,
                mime_type,
                declared_digest: Some(digest),
                total_bytes: Some(bytes.len() as u64),
            };
            let chunks = futures::stream::iter([Ok(bytes)]);
            run_upload(store, request, kind, chunks, progress, cancel).await
        }))
    }

    fn spawn<F, Fut>(&self, run: F) -> UploadHandle
    where
        F: FnOnce(AssetStore, ProgressReporter, CancellationToken) -> Fut,
        Fut: std::future::Future<Output = Result<UploadTicket>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            self.store.clone(),
            ProgressReporter::new(tx),
            cancel.clone(),
        ));
        UploadHandle {
            progress: rx,
            cancel,
            task,
        }
    }
}

fn mime_kind(mime_type: &str) -> Result<MediaKind> {
    MediaKind::from_mime(mime_type).ok_or_else(|| {
        Error::Validation(crate::validation::ValidationError::Field {
            field: "mime_type".to_string(),
            message: "only audio/* and video/* uploads are accepted".to_string(),
        })
    })
}

struct ProgressReporter {
    tx: mpsc::Sender<UploadProgress>,
    last_percent: u8,
}

impl ProgressReporter {
    fn new(tx: mpsc::Sender<UploadProgress>) -> Self {
        Self { tx, last_percent: 0 }
    }

    /// Emit an event. Percent never goes backwards within a session.
    /// Events are dropped when no observer keeps up; the task never
    /// blocks on reporting.
    fn report(&mut self, state: UploadState, percent: u8) {
        let percent = percent.clamp(self.last_percent, 100);
        self.last_percent = percent;
        let _ = self.tx.try_send(UploadProgress { state, percent });
    }

    fn aborted(&mut self) {
        let percent = self.last_percent;
        self.report(UploadState::Aborted, percent);
    }
}

async fn run_upload<S>(
    store: AssetStore,
    request: UploadRequest,
    kind: MediaKind,
    mut chunks: S,
    mut progress: ProgressReporter,
    cancel: CancellationToken,
) -> Result<UploadTicket>
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin + 'static,
{
    // Dedup probe: a declared digest lets us skip the transfer entirely
    if let Some(declared) = &request.declared_digest {
        progress.report(UploadState::Checking, 0);
        if let Some(existing) = store.check_exists(declared, kind).await? {
            info!(asset_id = %existing.id, digest = %declared, "Dedup hit, skipping upload");
            progress.report(UploadState::Ready, 100);
            return Ok(UploadTicket {
                asset: existing,
                deduplicated: true,
            });
        }
    }

    progress.report(UploadState::Uploading, 0);
    let mut staged = store.begin_staged(kind).await?;

    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => {
                store.abort_staged(staged).await;
                progress.aborted();
                info!(profile_id = %request.profile_id, "Upload cancelled, staged bytes purged");
                return Err(Error::Aborted);
            }
            next = chunks.next() => next,
        };

        let Some(chunk) = next else {
            // A cancelled stream end is a dropped feeder, not a complete
            // payload
            if cancel.is_cancelled() {
                store.abort_staged(staged).await;
                progress.aborted();
                info!(profile_id = %request.profile_id, "Upload cancelled, staged bytes purged");
                return Err(Error::Aborted);
            }
            break;
        };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                store.abort_staged(staged).await;
                progress.aborted();
                return Err(e);
            }
        };

        if let Err(e) = staged.write_chunk(&chunk).await {
            store.abort_staged(staged).await;
            progress.aborted();
            return Err(e);
        }

        if let Some(total) = request.total_bytes {
            if total > 0 {
                let percent = ((staged.bytes_written() * 100) / total).min(99) as u8;
                progress.report(UploadState::Uploading, percent);
            }
        }
    }

    let outcome = store
        .commit_staged(
            staged,
            request.profile_id,
            &request.file_name,
            &request.mime_type,
            request.declared_digest.as_ref(),
        )
        .await?;

    progress.report(UploadState::Ready, 100);
    Ok(UploadTicket {
        asset: outcome.asset,
        deduplicated: outcome.deduplicated,
    })
}
