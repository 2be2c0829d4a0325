// Media asset HTTP handlers
//
// Upload is multipart: a `digest` text part (the client-computed content
// digest, optional but recommended) must precede the `file` part so the
// server can short-circuit on a dedup hit.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use relaycast_core::{
    digest::ContentDigest,
    models::{AssetId, MediaAsset, MediaKind, ProfileId},
    service::UploadRequest,
};

use super::{AppError, AppResult, AppState};

const UPLOAD_CHANNEL_CAPACITY: usize = 16;

/// Digest probe request
#[derive(Debug, Deserialize)]
pub struct CheckDigestRequest {
    pub digest: String,
    pub kind: String,
}

/// Digest probe response
#[derive(Debug, Serialize)]
pub struct CheckDigestResponse {
    pub exists: bool,
    pub asset: Option<MediaAsset>,
}

/// Upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub asset: MediaAsset,
    pub deduplicated: bool,
}

/// Media deletion response
#[derive(Debug, Serialize)]
pub struct MediaDeletionResponse {
    pub asset_id: AssetId,
    pub deleted: bool,
}

fn parse_digest(raw: &str) -> Result<ContentDigest, AppError> {
    raw.parse().map_err(AppError::bad_request)
}

fn parse_kind(raw: &str) -> Result<MediaKind, AppError> {
    raw.parse().map_err(AppError::bad_request)
}

pub async fn check_digest(
    State(state): State<AppState>,
    Json(req): Json<CheckDigestRequest>,
) -> AppResult<Json<CheckDigestResponse>> {
    let digest = parse_digest(&req.digest)?;
    let kind = parse_kind(&req.kind)?;

    let asset = state.uploads.check_exists(&digest, kind).await?;
    Ok(Json(CheckDigestResponse {
        exists: asset.is_some(),
        asset,
    }))
}

pub async fn upload_media(
    State(state): State<AppState>,
    Path(profile_id): Path<i64>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let profile_id = ProfileId::new(profile_id);
    // Ownership is checked up front so a bad profile id fails before any
    // bytes are transferred.
    state.profiles.get(profile_id).await?;

    let mut declared: Option<ContentDigest> = None;

    while let Some(mut field) = multipart.next_field().await? {
        match field.name() {
            Some("digest") => {
                let text = field.text().await?;
                declared = Some(parse_digest(&text)?);
            }
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::bad_request("File part requires a filename"))?;
                let mime_type = field
                    .content_type()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::bad_request("File part requires a content type"))?;

                let request = UploadRequest {
                    profile_id,
                    file_name,
                    mime_type,
                    declared_digest: declared.take(),
                    total_bytes: None,
                };

                let (tx, rx) = mpsc::channel(UPLOAD_CHANNEL_CAPACITY);
                let handle = state.uploads.begin(request, ReceiverStream::new(rx))?;
                // Armed until the body is fully pumped: if this handler
                // is dropped mid-transfer (client disconnect), the guard
                // cancels the session instead of letting the closed
                // channel read as a complete stream.
                let abort_guard = handle.cancellation_token().drop_guard();

                // Pump the multipart body into the session. A closed
                // receiver means the session already resolved (dedup hit
                // or failure); finish() reports which.
                loop {
                    match field.chunk().await {
                        Ok(Some(chunk)) => {
                            if tx.send(Ok(chunk)).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            // tx stays open so the session cannot read the
                            // truncated stream as complete; the purge must
                            // land before the error response.
                            handle.cancel();
                            let _ = handle.finish().await;
                            return Err(e.into());
                        }
                    }
                }
                drop(tx);
                let _ = abort_guard.disarm();

                let ticket = handle.finish().await?;
                return Ok(Json(UploadResponse {
                    asset: ticket.asset,
                    deduplicated: ticket.deduplicated,
                }));
            }
            _ => {}
        }
    }

    Err(AppError::bad_request("Missing file field"))
}

pub async fn list_media(
    State(state): State<AppState>,
    Path(profile_id): Path<i64>,
) -> AppResult<Json<Vec<MediaAsset>>> {
    let profile_id = ProfileId::new(profile_id);
    state.profiles.get(profile_id).await?;
    let assets = state.store.list_by_profile(profile_id).await?;
    Ok(Json(assets))
}

/// Delete an asset, refusing while endpoints still reference it
pub async fn delete_media(
    State(state): State<AppState>,
    Path(asset_id): Path<i64>,
) -> AppResult<Json<MediaDeletionResponse>> {
    let asset_id = AssetId::new(asset_id);
    state
        .store
        .get(asset_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Asset {asset_id} not found")))?;

    let references = state.cleanup.reference_count(asset_id).await?;
    if references > 0 {
        return Err(AppError::conflict(format!(
            "Asset {asset_id} is referenced by {references} endpoint(s)"
        )));
    }

    let deleted = state.cleanup.reclaim_one(asset_id).await?;
    Ok(Json(MediaDeletionResponse { asset_id, deleted }))
}
