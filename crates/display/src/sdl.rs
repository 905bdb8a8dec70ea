use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, RgbaImage};
use sdl2::{
    EventPump, Sdl,
    event::Event,
    keyboard::Keycode,
    pixels::{Color, PixelFormatEnum},
    rect::Rect,
    render::{Canvas, Texture, TextureCreator},
    ttf::Sdl2TtfContext,
    video::{Window, WindowContext},
};

use libs::qr::{self, QrVariant, UploadQr};

use crate::screen::{Screen, Slide};

const BACKGROUND: Color = Color::RGB(12, 12, 16);
const TEXT: Color = Color::RGB(245, 245, 245);
const DOT_ON: Color = Color::RGB(245, 245, 245);
const DOT_OFF: Color = Color::RGB(90, 90, 100);
const MARGIN: i32 = 24;

fn texture<'a>(creator: &'a TextureCreator<WindowContext>, img: &RgbaImage) -> Result<Texture<'a>> {
    let (w, h) = img.dimensions();
    let mut tex = creator
        .create_texture_static(PixelFormatEnum::ABGR8888, w, h)
        .context("create texture")?;
    tex.update(None, img.as_raw(), w as usize * 4)
        .context("upload texture")?;
    Ok(tex)
}

/// Largest rect with the source aspect that fits into `area`, centered.
fn fit(w: u32, h: u32, area: Rect) -> Rect {
    let scale = (area.width() as f32 / w as f32).min(area.height() as f32 / h as f32);
    Rect::from_center(
        area.center(),
        ((w as f32 * scale) as u32).max(1),
        ((h as f32 * scale) as u32).max(1),
    )
}

fn qr_bitmap(code: &UploadQr) -> RgbaImage {
    DynamicImage::ImageLuma8(code.to_luma()).into_rgba8()
}

/// Full-screen SDL2 output.
pub struct SdlScreen {
    _sdl: Sdl,
    canvas: Canvas<Window>,
    creator: TextureCreator<WindowContext>,
    events: EventPump,
    ttf: Option<Sdl2TtfContext>,
    font_file: Option<PathBuf>,
    qr_full: RgbaImage,
    qr_badge: RgbaImage,
}

impl SdlScreen {
    pub fn new(upload_url: &str, font_file: Option<PathBuf>) -> Result<Self> {
        let sdl = sdl2::init().map_err(|e| anyhow!("sdl init: {e}"))?;
        let video = sdl.video().map_err(|e| anyhow!("sdl video: {e}"))?;
        let mut window = video
            .window("LiveWall", 800, 480)
            .position_centered()
            .fullscreen_desktop()
            .build()
            .context("create window")?;
        window.set_bordered(false);
        sdl.mouse().show_cursor(false);

        let canvas = window
            .into_canvas()
            .present_vsync()
            .build()
            .context("create canvas")?;
        let creator = canvas.texture_creator();
        let events = sdl.event_pump().map_err(|e| anyhow!("sdl events: {e}"))?;

        let ttf = match &font_file {
            Some(_) => match sdl2::ttf::init() {
                Ok(ctx) => Some(ctx),
                Err(e) => {
                    tracing::warn!("text rendering disabled: {e}");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            _sdl: sdl,
            canvas,
            creator,
            events,
            ttf,
            font_file,
            qr_full: qr_bitmap(&UploadQr::new(upload_url, QrVariant::Full)?),
            qr_badge: qr_bitmap(&UploadQr::new(upload_url, QrVariant::Mini)?),
        })
    }

    fn area(&self) -> Result<Rect> {
        let (w, h) = self.canvas.output_size().map_err(|e| anyhow!(e))?;
        Ok(Rect::new(0, 0, w, h))
    }

    fn clear(&mut self) {
        self.canvas.set_draw_color(BACKGROUND);
        self.canvas.clear();
    }

    fn blit(&mut self, img: &RgbaImage, dst: Rect) -> Result<()> {
        let tex = texture(&self.creator, img)?;
        self.canvas.copy(&tex, None, dst).map_err(|e| anyhow!(e))
    }

    /// Draw `text` wrapped to `width`, horizontally centered on `cx`.
    /// No-op without a font.
    fn text(&mut self, text: &str, size: u16, cx: i32, top: i32, width: u32) -> Result<()> {
        let (Some(ttf), Some(path)) = (&self.ttf, &self.font_file) else {
            return Ok(());
        };
        if text.is_empty() {
            return Ok(());
        }
        let font = ttf
            .load_font(path, size)
            .map_err(|e| anyhow!("loading font {path:?}: {e}"))?;
        let surface = font
            .render(text)
            .blended_wrapped(TEXT, width)
            .context("render text")?;
        let tex = self
            .creator
            .create_texture_from_surface(&surface)
            .context("text texture")?;
        let (w, h) = (surface.width(), surface.height());
        let dst = Rect::new(cx - w as i32 / 2, top, w, h);
        self.canvas.copy(&tex, None, dst).map_err(|e| anyhow!(e))
    }

    fn badge(&mut self, area: Rect) -> Result<()> {
        let side = self.qr_badge.width();
        let dst = Rect::new(
            area.right() - side as i32 - MARGIN,
            area.bottom() - side as i32 - MARGIN,
            side,
            side,
        );
        let badge = std::mem::take(&mut self.qr_badge);
        let res = self.blit(&badge, dst);
        self.qr_badge = badge;
        res
    }

    fn dots(&mut self, index: usize, len: usize, area: Rect) -> Result<()> {
        if len < 2 {
            return Ok(());
        }
        let (dot, gap) = (10u32, 8i32);
        let total = len as i32 * (dot as i32 + gap) - gap;
        let mut x = area.center().x() - total / 2;
        let y = area.bottom() - MARGIN - dot as i32;
        for i in 0..len {
            self.canvas
                .set_draw_color(if i == index { DOT_ON } else { DOT_OFF });
            self.canvas
                .fill_rect(Rect::new(x, y, dot, dot))
                .map_err(|e| anyhow!(e))?;
            x += dot as i32 + gap;
        }
        Ok(())
    }
}

impl Screen for SdlScreen {
    fn wants_images(&self) -> bool {
        true
    }

    fn waiting(&mut self) -> Result<()> {
        let area = self.area()?;
        self.clear();
        let width = area.width() * 3 / 4;
        self.text("Waiting for new uploads", 36, area.center().x(), area.center().y() - 24, width)?;
        self.badge(area)?;
        self.canvas.present();
        Ok(())
    }

    fn slide(&mut self, slide: &Slide<'_>) -> Result<()> {
        let area = self.area()?;
        self.clear();

        let message = slide.upload.text();
        let reserved = match (slide.image, message) {
            (Some(_), Some(_)) => area.height() / 5,
            _ => 0,
        };

        match slide.image {
            Some(img) => {
                let photo_area = Rect::new(0, 0, area.width(), area.height() - reserved);
                self.blit(img, fit(img.width(), img.height(), photo_area))?;
                if let Some(text) = message {
                    let top = (area.height() - reserved) as i32 + MARGIN / 2;
                    self.text(text, 28, area.center().x(), top, area.width() - 2 * MARGIN as u32)?;
                }
            }
            None => {
                // message-only card
                let text = message.unwrap_or_default();
                let width = area.width() * 3 / 4;
                self.text(text, 48, area.center().x(), area.height() as i32 / 3, width)?;
            }
        }

        self.dots(slide.index, slide.len, area)?;
        self.badge(area)?;
        self.canvas.present();
        Ok(())
    }

    fn qr(&mut self) -> Result<()> {
        let area = self.area()?;
        self.clear();

        let headline = qr::HEADLINE.join(" ");
        self.text(&headline, 56, area.center().x(), MARGIN * 2, area.width())?;

        let side = (area.width().min(area.height()) * 3 / 5).max(self.qr_full.width());
        let code_area = Rect::from_center(area.center(), side, side);
        let full = std::mem::take(&mut self.qr_full);
        let res = self.blit(&full, code_area);
        self.qr_full = full;
        res?;

        let below = code_area.bottom() + MARGIN;
        self.text(qr::CALL_TO_ACTION, 32, area.center().x(), below, area.width())?;
        self.text(qr::POWERED_BY, 18, area.center().x(), area.bottom() - MARGIN - 24, area.width())?;
        self.canvas.present();
        Ok(())
    }

    fn pump(&mut self) -> bool {
        for event in self.events.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => return false,
                _ => {}
            }
        }
        true
    }

    fn pump_interval(&self) -> Option<Duration> {
        Some(Duration::from_millis(50))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_letterboxes_wide_and_tall_images() {
        let area = Rect::new(0, 0, 800, 480);

        let wide = fit(1600, 400, area);
        assert_eq!((wide.width(), wide.height()), (800, 200));
        assert_eq!(wide.center(), area.center());

        let tall = fit(300, 600, area);
        assert_eq!((tall.width(), tall.height()), (240, 480));
    }
}
