use image::{GrayImage, Luma};
use qrcode::{
    render::{svg, unicode},
    Color, EcLevel, QrCode,
};

use crate::error::{Error, Result};

pub const HEADLINE: [&str; 3] = ["SCAN", "SHARE", "SHINE"];
pub const POWERED_BY: &str = "POWERED BY LIVEWALL EXPERIENCE";
pub const CALL_TO_ACTION: &str = "Scan to share your moment";

/// Where the code should send people: the explicit override, otherwise the
/// upload page of the public site.
pub fn upload_url(qr_url: Option<&str>, site_url: &str) -> String {
    match qr_url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => url.to_string(),
        None => format!("{}/upload", site_url.trim_end_matches('/')),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QrVariant {
    /// Big call-to-action with headline and branding.
    #[default]
    Full,
    Compact,
    /// Corner badge, code only.
    Mini,
}

impl QrVariant {
    pub fn size(&self) -> u32 {
        match self {
            QrVariant::Full => 200,
            QrVariant::Compact => 180,
            QrVariant::Mini => 100,
        }
    }

    pub fn has_caption(&self) -> bool {
        !matches!(self, QrVariant::Mini)
    }
}

impl std::str::FromStr for QrVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(QrVariant::Full),
            "compact" => Ok(QrVariant::Compact),
            "mini" => Ok(QrVariant::Mini),
            other => Err(format!("unknown QR variant {other:?}")),
        }
    }
}

/// QR code pointing at the upload page.
pub struct UploadQr {
    url: String,
    code: QrCode,
    variant: QrVariant,
}

impl UploadQr {
    pub fn new(url: impl Into<String>, variant: QrVariant) -> Result<Self> {
        let url = url.into();
        let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::H)
            .map_err(|e| Error::validation(format!("cannot encode {url:?} as QR: {e}")))?;
        Ok(Self { url, code, variant })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn variant(&self) -> QrVariant {
        self.variant
    }

    /// Modules per side.
    pub fn modules(&self) -> usize {
        self.code.width()
    }

    pub fn to_svg(&self) -> String {
        let size = self.variant.size();
        self.code
            .render::<svg::Color<'_>>()
            .min_dimensions(size, size)
            .quiet_zone(false)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build()
    }

    /// Half-block rendering for terminals. Keeps the quiet zone, phones
    /// struggle without it on dark backgrounds.
    pub fn to_terminal(&self) -> String {
        self.code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build()
    }

    /// Grayscale bitmap exactly `variant.size()` pixels wide, code centered.
    pub fn to_luma(&self) -> GrayImage {
        let size = self.variant.size();
        let width = self.code.width() as u32;
        let scale = (size / width).max(1);
        let side = (width * scale).max(size);
        let offset = (side - width * scale) / 2;
        let colors = self.code.to_colors();

        GrayImage::from_fn(side, side, |x, y| {
            let (Some(mx), Some(my)) = (x.checked_sub(offset), y.checked_sub(offset)) else {
                return Luma([255]);
            };
            let (mx, my) = (mx / scale, my / scale);
            if mx >= width || my >= width {
                return Luma([255]);
            }
            match colors[(my * width + mx) as usize] {
                Color::Dark => Luma([0]),
                Color::Light => Luma([255]),
            }
        })
    }

    /// Caption lines drawn under/next to the code.
    pub fn caption(&self) -> Vec<&'static str> {
        if !self.variant.has_caption() {
            return Vec::new();
        }
        let mut lines = HEADLINE.to_vec();
        lines.push(POWERED_BY);
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_prefers_override() {
        assert_eq!(
            upload_url(Some("https://wall.example.com/u"), "http://localhost:3000"),
            "https://wall.example.com/u"
        );
        assert_eq!(
            upload_url(Some("  "), "http://localhost:3000/"),
            "http://localhost:3000/upload"
        );
        assert_eq!(upload_url(None, "https://x.io"), "https://x.io/upload");
    }

    #[test]
    fn luma_matches_variant_size() {
        for variant in [QrVariant::Full, QrVariant::Compact, QrVariant::Mini] {
            let qr = UploadQr::new("http://localhost:3000/upload", variant).unwrap();
            let img = qr.to_luma();
            assert_eq!(img.width(), variant.size());
            assert_eq!(img.height(), variant.size());
            // finder pattern corner is dark once past the centering offset
            let offset = (variant.size() - qr.modules() as u32 * (variant.size() / qr.modules() as u32)) / 2;
            assert_eq!(img.get_pixel(offset, offset).0, [0]);
        }
    }

    #[test]
    fn svg_and_terminal_render() {
        let qr = UploadQr::new("https://wall.example.com/upload", QrVariant::Compact).unwrap();
        let svg = qr.to_svg();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("#000000"));
        assert!(!qr.to_terminal().is_empty());
    }

    #[test]
    fn captions() {
        let full = UploadQr::new("x", QrVariant::Full).unwrap();
        assert_eq!(full.caption(), vec!["SCAN", "SHARE", "SHINE", POWERED_BY]);
        let mini = UploadQr::new("x", QrVariant::Mini).unwrap();
        assert!(mini.caption().is_empty());
    }
}
