//! Raster decode/encode for canvas load and export

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::error::{InkError, InkResult};

/// Formats the canvas can be exported to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Jpeg,
    Bmp,
}

impl ExportFormat {
    /// Detect format from file extension
    pub fn from_path(path: &str) -> Option<Self> {
        let path_lower = path.to_lowercase();
        if path_lower.ends_with(".png") {
            Some(ExportFormat::Png)
        } else if path_lower.ends_with(".jpg") || path_lower.ends_with(".jpeg") {
            Some(ExportFormat::Jpeg)
        } else if path_lower.ends_with(".bmp") {
            Some(ExportFormat::Bmp)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Bmp => "bmp",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            ExportFormat::Png => ImageFormat::Png,
            ExportFormat::Jpeg => ImageFormat::Jpeg,
            ExportFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

const LOADABLE: [ImageFormat; 4] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Bmp,
    ImageFormat::Gif,
];

/// Decode PNG/JPEG/BMP/GIF bytes into an RGB buffer. GIFs yield their first frame.
pub fn decode_rgb(bytes: &[u8]) -> InkResult<RgbImage> {
    let format = image::guess_format(bytes).map_err(|e| InkError::Decode(e.to_string()))?;
    if !LOADABLE.contains(&format) {
        return Err(InkError::Decode(format!("unsupported format {:?}", format)));
    }
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| InkError::Decode(e.to_string()))?;
    let rgb = decoded.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(InkError::Decode("image has no pixels".into()));
    }
    Ok(rgb)
}

pub fn encode_rgb(image: &RgbImage, format: ExportFormat) -> InkResult<Vec<u8>> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), format.image_format())
        .map_err(|e| InkError::Encode(e.to_string()))?;
    Ok(buf)
}
