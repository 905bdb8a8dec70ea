use std::path::Path;

use chrono::{DateTime, Utc};
use reqwest::{
    multipart::{Form, Part},
    RequestBuilder, Response,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    config::ApiConfig,
    error::{Error, Result},
    models::{
        BulkRequest, Credentials, ListQuery, ModerationAction, NewUser, Upload, UploadListing,
        UploadPatch, User, UserUpdate,
    },
};

pub const MIN_PASSWORD_LEN: usize = 8;
/// Longest message, after trimming, that the upload forms accept.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// An image ready to be sent as a multipart file part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub file_name: String,
    pub mime: mime::Mime,
    pub bytes: Vec<u8>,
}

impl PhotoFile {
    pub fn jpeg(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime::IMAGE_JPEG,
            bytes,
        }
    }

    /// Read an image from disk, guessing the content type from its extension.
    pub async fn read(path: &Path) -> Result<Self> {
        let mime = image_mime(path).ok_or_else(|| {
            Error::validation(format!("{} is not a supported image", path.display()))
        })?;
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo".to_string());
        Ok(Self {
            file_name,
            mime,
            bytes,
        })
    }

    fn into_part(self) -> Result<Part> {
        Ok(Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(self.mime.as_ref())?)
    }
}

/// Content type for the image formats the wall accepts, by extension.
pub fn image_mime(path: &Path) -> Option<mime::Mime> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some(mime::IMAGE_JPEG),
        "png" => Some(mime::IMAGE_PNG),
        "gif" => Some(mime::IMAGE_GIF),
        "webp" => "image/webp".parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUpload {
    pub photo: Option<PhotoFile>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BatchUpload {
    pub photos: Vec<PhotoFile>,
    pub message: Option<String>,
    pub uploaded_by: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn trimmed(message: Option<String>) -> Result<Option<String>> {
    let message = message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    if let Some(m) = &message {
        if m.chars().count() > MAX_MESSAGE_CHARS {
            return Err(Error::validation(format!(
                "Message must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }
    }
    Ok(message)
}

/// Thin typed wrapper over the LiveWall REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api: ApiConfig,
}

impl ApiClient {
    pub fn new(api: ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("livewall/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, api })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.api
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.message);
        tracing::debug!(%status, ?message, "api request rejected");
        Err(Error::Http { status, message })
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let bytes = self.send(req).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn list_uploads(&self, query: &ListQuery) -> Result<UploadListing> {
        let req = self.http.get(self.api.uploads()).query(&query.params());
        self.json(req).await
    }

    /// Feed for the wall: approved uploads the API has not seen displayed yet.
    pub async fn approved_not_displayed(&self) -> Result<Vec<Upload>> {
        Ok(self
            .list_uploads(&ListQuery::approved_not_displayed())
            .await?
            .into_uploads())
    }

    /// Raw body of an image URL, typically one built by `ApiConfig::image_url`.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        Ok(self.send(self.http.get(url)).await?.bytes().await?.to_vec())
    }

    pub async fn create_upload(&self, upload: NewUpload) -> Result<()> {
        let message = trimmed(upload.message)?;
        if upload.photo.is_none() && message.is_none() {
            return Err(Error::validation("Please upload a photo or enter a message"));
        }

        let mut form = Form::new();
        if let Some(photo) = upload.photo {
            form = form.part("photo", photo.into_part()?);
        }
        if let Some(message) = message {
            form = form.text("message", message);
        }
        self.send(self.http.post(self.api.uploads()).multipart(form))
            .await?;
        Ok(())
    }

    pub async fn batch_upload(&self, batch: BatchUpload) -> Result<()> {
        if batch.photos.is_empty() {
            return Err(Error::validation("Select at least one image"));
        }
        let count = batch.photos.len();
        let message = trimmed(batch.message)?;

        let mut form = Form::new();
        for photo in batch.photos {
            form = form.part("photos", photo.into_part()?);
        }
        if let Some(message) = message {
            form = form.text("message", message);
        }
        form = form.text("uploadedBy", batch.uploaded_by);

        self.send(self.http.post(self.api.batch_uploads()).multipart(form))
            .await?;
        tracing::info!(count, "batch upload accepted");
        Ok(())
    }

    async fn patch_upload(&self, id: &str, body: &UploadPatch) -> Result<()> {
        self.send(self.http.patch(self.api.upload_by_id(id)).json(body))
            .await?;
        Ok(())
    }

    pub async fn moderate(&self, id: &str, action: ModerationAction) -> Result<()> {
        self.patch_upload(id, &UploadPatch::Action { action }).await
    }

    pub async fn schedule(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let body = UploadPatch::Schedule {
            action: ModerationAction::Schedule,
            scheduled_for: at,
        };
        self.patch_upload(id, &body).await
    }

    pub async fn mark_displayed(&self, id: &str) -> Result<()> {
        self.patch_upload(id, &UploadPatch::Displayed { displayed: true })
            .await
    }

    pub async fn bulk(&self, ids: &[String], action: ModerationAction) -> Result<()> {
        if ids.is_empty() {
            return Err(Error::validation("No uploads selected"));
        }
        let body = BulkRequest { ids, action };
        self.send(self.http.patch(self.api.bulk_uploads()).json(&body))
            .await?;
        Ok(())
    }

    /// Removes the upload and its stored image.
    pub async fn delete_upload(&self, id: &str) -> Result<()> {
        self.send(self.http.delete(self.api.upload_by_id(id)))
            .await?;
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.json(self.http.get(self.api.users())).await
    }

    pub async fn get_user(&self, id: &str) -> Result<User> {
        self.json(self.http.get(self.api.user_by_id(id))).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        check_password(&user.password)?;
        self.json(self.http.post(self.api.users()).json(user)).await
    }

    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User> {
        if let Some(password) = &update.password {
            check_password(password)?;
        }
        self.json(self.http.patch(self.api.user_by_id(id)).json(update))
            .await
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        self.send(self.http.delete(self.api.user_by_id(id))).await?;
        Ok(())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let body = Credentials { username, password };
        self.json(self.http.post(self.api.user_login()).json(&body))
            .await
    }

    /// Bootstrap an admin account. The server checks `secret` against its own
    /// admin creation secret.
    pub async fn create_admin(&self, username: &str, password: &str, secret: &str) -> Result<()> {
        check_password(password)?;
        let body = Credentials { username, password };
        let req = self
            .http
            .post(self.api.admin_create())
            .header("x-admin-secret", secret)
            .json(&body);
        self.send(req).await?;
        Ok(())
    }
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
