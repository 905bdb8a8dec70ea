use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use libs::{
    ApiClient,
    camera::{self, CameraBackend, CameraError, FacingMode, Platform},
    client::{self as api, BatchUpload, NewUpload, PhotoFile},
    models::User,
};

/// Photographers may send at most this much per image.
pub const MAX_BATCH_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    NotAnImage,
    TooLarge(u64),
    Unreadable(String),
}

impl std::fmt::Display for Skip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Skip::NotAnImage => f.write_str("not a jpg, png, gif or webp image"),
            Skip::TooLarge(len) => write!(f, "{:.1} MB is over the 10 MB limit", *len as f64 / 1_048_576.0),
            Skip::Unreadable(e) => write!(f, "unreadable: {e}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Selection {
    pub accepted: Vec<PathBuf>,
    pub skipped: Vec<(PathBuf, Skip)>,
}

async fn check(path: &Path) -> Result<(), Skip> {
    if api::image_mime(path).is_none() {
        return Err(Skip::NotAnImage);
    }
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| Skip::Unreadable(e.to_string()))?;
    if meta.len() > MAX_BATCH_FILE_BYTES {
        return Err(Skip::TooLarge(meta.len()));
    }
    Ok(())
}

/// Split `paths` into files worth sending and files skipped with a reason.
/// Directories contribute their direct children, in name order.
pub async fn select_batch(paths: &[PathBuf]) -> Selection {
    let mut candidates = Vec::new();
    for path in paths {
        if !path.is_dir() {
            candidates.push(path.clone());
            continue;
        }
        let mut dir = match tokio::fs::read_dir(path).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(path = %path.display(), "cannot read directory: {e}");
                continue;
            }
        };
        let mut children = Vec::new();
        while let Ok(Some(entry)) = dir.next_entry().await {
            let p = entry.path();
            if p.is_file() {
                children.push(p);
            }
        }
        children.sort();
        candidates.extend(children);
    }

    let mut selection = Selection::default();
    for path in candidates {
        match check(&path).await {
            Ok(()) => selection.accepted.push(path),
            Err(skip) => {
                tracing::warn!(path = %path.display(), "skipping: {skip}");
                selection.skipped.push((path, skip));
            }
        }
    }
    selection
}

/// Send every accepted file in one request on behalf of `photographer`.
/// Returns how many photos went out.
pub async fn batch(
    client: &ApiClient,
    photographer: &User,
    selection: &Selection,
    message: Option<String>,
) -> Result<usize> {
    if selection.accepted.is_empty() {
        bail!("Select at least one image");
    }
    let mut photos = Vec::with_capacity(selection.accepted.len());
    for path in &selection.accepted {
        photos.push(PhotoFile::read(path).await?);
    }
    let count = photos.len();
    client
        .batch_upload(BatchUpload {
            photos,
            message,
            uploaded_by: photographer.id.clone(),
        })
        .await?;
    Ok(count)
}

/// Open the camera, take one frame and release the device again.
pub async fn capture<B>(backend: B, facing: FacingMode, platform: Platform) -> Result<PhotoFile, CameraError>
where
    B: CameraBackend + Send + 'static,
{
    tokio::task::spawn_blocking(move || camera::open_camera(&backend, facing, platform)?.capture())
        .await
        .map_err(|e| CameraError::Capture(e.to_string()))?
}

pub async fn visitor_upload(
    client: &ApiClient,
    photo: Option<PhotoFile>,
    message: Option<String>,
) -> libs::Result<()> {
    client.create_upload(NewUpload { photo, message }).await
}
