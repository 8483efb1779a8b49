//! Image encoding for OCR: rendered page → base64 PNG `ImageData`.
//!
//! Scanned course notes are almost always black-on-white, so the page is
//! converted to 8-bit grayscale before PNG compression. That keeps text
//! edges lossless while cutting the request body to roughly a third of an
//! RGBA encoding.

use crate::error::ExtractError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode page `page_number` as a grayscale base64 PNG for a vision model.
pub fn encode_page(img: &DynamicImage, page_number: usize) -> Result<ImageData, ExtractError> {
    let gray = DynamicImage::ImageLuma8(img.to_luma8());
    let mut buf = Vec::new();
    gray.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ExtractError::Render {
            page: page_number,
            detail: format!("PNG encoding failed: {e}"),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!("Page {}: encoded {} bytes base64", page_number, b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
