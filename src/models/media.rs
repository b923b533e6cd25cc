use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat};

#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("uploaded file is empty")]
    Empty,
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

/// An upload decoded, converted to RGB and re-encoded as PNG, ready to be
/// sent to any model backend.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl PreparedImage {
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

pub fn prepare_image(data: &[u8]) -> Result<PreparedImage, ImageLoadError> {
    if data.is_empty() {
        return Err(ImageLoadError::Empty);
    }
    if let Some(mime_type) = detect_mime_type(data) {
        if !mime_type.starts_with("image/") {
            return Err(ImageLoadError::UnsupportedType(mime_type));
        }
    }

    let decoded = image::load_from_memory(data)?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let mut bytes = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

    Ok(PreparedImage {
        bytes,
        mime_type: "image/png".to_string(),
        width: rgb.width(),
        height: rgb.height(),
    })
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 128]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
