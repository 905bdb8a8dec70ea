use std::io::Cursor;

use anyhow::{Context, Result};
use image::{DynamicImage, RgbaImage};

/// EXIF orientation tag (1-8), if the file carries one.
fn exif_orientation(bytes: &[u8]) -> Option<u32> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?
        .value
        .get_uint(0)
}

fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Decode a downloaded photo upright, the way the phone that took it saw it.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(bytes).context("decoding photo")?;
    let img = match exif_orientation(bytes) {
        Some(o) => apply_orientation(img, o),
        None => img,
    };
    Ok(img.into_rgba8())
}
