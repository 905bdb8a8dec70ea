use std::time::Duration;

use anyhow::Result;
use image::RgbaImage;

use libs::{models::Upload, qr::UploadQr};

pub struct Slide<'a> {
    pub upload: &'a Upload,
    pub index: usize,
    pub len: usize,
    pub image: Option<&'a RgbaImage>,
}

/// Output surface of the wall.
pub trait Screen {
    /// Whether slides should come with a decoded photo.
    fn wants_images(&self) -> bool {
        false
    }

    /// Idle placeholder with the corner QR badge.
    fn waiting(&mut self) -> Result<()>;

    fn slide(&mut self, slide: &Slide<'_>) -> Result<()>;

    /// Full-screen call-to-action.
    fn qr(&mut self) -> Result<()>;

    /// Handle window events. `false` asks the wall to shut down.
    fn pump(&mut self) -> bool {
        true
    }

    /// How often `pump` must run, `None` if never.
    fn pump_interval(&self) -> Option<Duration> {
        None
    }
}

/// Headless screen: every transition becomes a log line.
pub struct LogScreen {
    qr: UploadQr,
}

impl LogScreen {
    pub fn new(qr: UploadQr) -> Self {
        Self { qr }
    }
}

impl Screen for LogScreen {
    fn waiting(&mut self) -> Result<()> {
        tracing::info!("waiting for approved uploads");
        Ok(())
    }

    fn slide(&mut self, slide: &Slide<'_>) -> Result<()> {
        tracing::info!(
            id = %slide.upload.id,
            photo = slide.upload.photo_url.as_deref().unwrap_or("-"),
            message = slide.upload.text().unwrap_or("-"),
            decoded = slide.image.is_some(),
            "showing {}/{}",
            slide.index + 1,
            slide.len,
        );
        Ok(())
    }

    fn qr(&mut self) -> Result<()> {
        tracing::info!(url = %self.qr.url(), "{}", libs::qr::CALL_TO_ACTION);
        Ok(())
    }
}
