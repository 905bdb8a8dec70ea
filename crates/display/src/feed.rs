use std::{future::Future, sync::Arc};

use image::RgbaImage;

use libs::{ApiClient, config::ImageHostPolicy, models::Upload};

use crate::image_loader;

/// Where the wall gets its content from and reports back to.
pub trait Feed: Clone + Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = libs::Result<Vec<Upload>>> + Send;

    fn mark_displayed(&self, id: &str) -> impl Future<Output = libs::Result<()>> + Send;

    /// Decoded photo for an upload; `None` means show the message alone.
    fn image(&self, photo_url: &str) -> impl Future<Output = Option<RgbaImage>> + Send;
}

#[derive(Clone)]
pub struct ApiFeed {
    client: ApiClient,
    policy: Arc<ImageHostPolicy>,
}

impl ApiFeed {
    pub fn new(client: ApiClient, policy: ImageHostPolicy) -> Self {
        Self {
            client,
            policy: Arc::new(policy),
        }
    }
}

impl Feed for ApiFeed {
    async fn fetch(&self) -> libs::Result<Vec<Upload>> {
        self.client.approved_not_displayed().await
    }

    async fn mark_displayed(&self, id: &str) -> libs::Result<()> {
        self.client.mark_displayed(id).await
    }

    async fn image(&self, photo_url: &str) -> Option<RgbaImage> {
        let url = self.client.config().image_url(Some(photo_url))?;
        if !self.policy.allows(&url) {
            tracing::warn!(%url, "image host not allowed, showing message only");
            return None;
        }
        let bytes = match self.client.fetch_bytes(&url).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(%url, "cannot fetch photo: {e}");
                return None;
            }
        };
        match tokio::task::spawn_blocking(move || image_loader::decode(&bytes)).await {
            Ok(Ok(img)) => Some(img),
            Ok(Err(e)) => {
                tracing::warn!(%url, "cannot decode photo: {e:#}");
                None
            }
            Err(e) => {
                tracing::error!("decode task failed: {e}");
                None
            }
        }
    }
}
