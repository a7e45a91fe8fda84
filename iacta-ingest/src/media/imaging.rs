//! Cover and background image normalization

use crate::error::MediaError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageReader, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

/// Pixel dimensions read from the file header without decoding
pub fn dimensions(path: &Path) -> Result<(u32, u32), MediaError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    Ok(reader.into_dimensions()?)
}

/// Decode and flatten to opaque RGB
///
/// The format is sniffed from content, so a PNG saved as `.jpg` still loads.
pub fn open_rgb(path: &Path) -> Result<RgbImage, MediaError> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "Decoded image"
    );
    Ok(image.to_rgb8())
}

/// Lanczos resize to exactly `size`
pub fn resize(image: &RgbImage, size: (u32, u32)) -> RgbImage {
    image::imageops::resize(image, size.0, size.1, FilterType::Lanczos3)
}

/// Encode as baseline JPEG
pub fn write_jpeg(path: &Path, image: &RgbImage, quality: u8) -> Result<(), MediaError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
    image.write_with_encoder(encoder)?;
    Ok(())
}

/// Pick the path with the largest pixel area; unreadable candidates are skipped
pub fn pick_largest<'a, I>(paths: I) -> Option<&'a Path>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut best: Option<(&Path, u64)> = None;
    for path in paths {
        match dimensions(path) {
            Ok((w, h)) => {
                let area = w as u64 * h as u64;
                if best.map_or(true, |(_, a)| area > a) {
                    best = Some((path, area));
                }
            }
            Err(e) => debug!(path = %path.display(), "Skipping unreadable image: {}", e),
        }
    }
    best.map(|(path, _)| path)
}
