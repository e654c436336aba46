use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

/// Render a JPEG thumbnail whose longest side is at most `max_side` pixels.
///
/// Images already within bounds are re-encoded without scaling. CPU-bound;
/// call from a blocking context.
pub fn make_thumbnail(bytes: &[u8], max_side: u32) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(bytes)?;

    let scaled = if img.width() > max_side || img.height() > max_side {
        img.thumbnail(max_side, max_side)
    } else {
        img
    };

    // The JPEG encoder rejects alpha channels.
    let rgb = DynamicImage::ImageRgb8(scaled.to_rgb8());
    let mut out = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)?;
    Ok(out)
}
