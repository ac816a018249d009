use crate::Context;
use crate::resize::error::{Error, ErrorKind, Result, Stage};
use exn::ResultExt;
use lowres_storage::error::Error as StorageError;
use lowres_storage::{ClientHandle, MoveOptions, UploadOptions};

/// The outcome of (successfully) resizing a single file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// Where the original was found.
    pub original: String,
    /// Where the downsized rendition ended up (after any autorename).
    pub lowres: String,
    /// Where the original was moved to (after any autorename).
    pub archived: String,
}

/// Replaces one oversized image with a downsized rendition and archives the
/// original.
///
/// Three remote calls, strictly in order: render a thumbnail of `path`,
/// upload it next to the original under the
/// [lowres destination](crate::PathPolicy::lowres_destination), then move
/// the original to its [archive destination](crate::PathPolicy::archive_destination).
/// Both writes autorename on conflict and the upload suppresses
/// notifications.
///
/// Nothing is rolled back: if the move fails, the uploaded rendition stays.
pub(crate) async fn resize_file(client: &ClientHandle, ctx: &Context, path: &str) -> Result<Outcome> {
    let lowres = ctx.policy.lowres_destination(path).or_raise(|| ErrorKind::Path(path.to_string()))?;
    let archive = ctx.policy.archive_destination(path).or_raise(|| ErrorKind::Path(path.to_string()))?;

    let thumbnail =
        client.download_thumbnail(path, &ctx.thumbnail).await.map_err(|e| raise(e, Stage::Thumbnail, path))?;
    tracing::debug!(path = %path, bytes = thumbnail.data.len(), "Downloaded thumbnail");

    let upload = UploadOptions { autorename: true, mute: true };
    let uploaded = client.upload(&lowres, &thumbnail.data, upload).await.map_err(|e| raise(e, Stage::Upload, path))?;
    if uploaded.path.to_lowercase() != lowres.to_lowercase() {
        tracing::info!(path = %lowres, renamed = %uploaded.path, "Downsized file renamed on upload");
    }

    let moved = client
        .move_entry(path, &archive, MoveOptions { autorename: true })
        .await
        .map_err(|e| raise(e, Stage::Move, path))?;

    Ok(Outcome {
        original: path.to_string(),
        lowres: uploaded.path,
        archived: moved.path,
    })
}

fn raise(err: StorageError, stage: Stage, path: &str) -> Error {
    let recoverable = !err.is_fatal();
    tracing::debug!(path = %path, stage = %stage, retryable = err.is_retryable(), "Remote call failed");
    err.raise(ErrorKind::File {
        stage,
        path: path.to_string(),
        recoverable,
    })
}
