//! Avatar upload rules and normalization.
//!
//! Uploads must be a `.jpg`, `.jpeg` or `.png` file of at most
//! [`MAX_AVATAR_BYTES`]. Accepted images are resized to a fixed square and
//! re-encoded as PNG before they are stored.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{ImageFormat, ImageReader, Limits};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

/// Upper bound on the raw upload size.
pub const MAX_AVATAR_BYTES: usize = 1_000_000;

/// Width and height of a stored avatar.
pub const AVATAR_DIMENSION: u32 = 250;

/// Largest width or height accepted for an uploaded image, checked before decoding.
pub const MAX_SOURCE_DIMENSION: u32 = 4096;

/// Memory the decoder may allocate for one upload.
const MAX_DECODE_ALLOC: u64 = 64 * 1024 * 1024;

/// Content type of every stored avatar.
pub const AVATAR_CONTENT_TYPE: &str = "image/png";

lazy_static! {
    static ref AVATAR_FILE_NAME: Regex = Regex::new(r"(?i)\.(jpg|jpeg|png)$").unwrap();
}

pub fn check_file_name(file_name: &str) -> Result<(), AppError> {
    if AVATAR_FILE_NAME.is_match(file_name) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Please upload an image".into()))
    }
}

pub fn check_size(len: usize) -> Result<(), AppError> {
    if len > MAX_AVATAR_BYTES {
        Err(AppError::BadRequest("File too large".into()))
    } else {
        Ok(())
    }
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

/// Decodes an uploaded image, resizes it to the avatar square and encodes it as PNG.
///
/// Header dimensions and decoder allocations are capped on top of the upload
/// size, since a small compressed file can describe a huge image.
pub fn normalize(data: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AppError::BadRequest(format!("Please upload an image: {}", e)))?;
    reader.limits(decode_limits());

    let decoded = reader.decode().map_err(|e| {
        log::warn!("rejected avatar upload: {}", e);
        AppError::BadRequest("Please upload an image".into())
    })?;

    let resized = decoded.resize_exact(AVATAR_DIMENSION, AVATAR_DIMENSION, FilterType::Triangle);

    let mut buf = Cursor::new(Vec::new());
    resized
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| AppError::InternalServerError(format!("Failed to encode avatar: {}", e)))?;
    Ok(buf.into_inner())
}

/// Runs [`normalize`] on the blocking pool.
pub async fn normalize_blocking(data: Vec<u8>) -> Result<Vec<u8>, AppError> {
    actix_web::web::block(move || normalize(&data)).await?
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    /// Encodes a solid test image in the given format.
    pub(crate) fn sample_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 40, 90])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_file_name_allow_list() {
        assert!(check_file_name("profile-pic.jpg").is_ok());
        assert!(check_file_name("PROFILE.JPEG").is_ok());
        assert!(check_file_name("me.png").is_ok());
        assert!(check_file_name("resume.pdf").is_err());
        assert!(check_file_name("image.png.exe").is_err());
        assert!(check_file_name("png").is_err());
    }

    #[test]
    fn test_size_ceiling() {
        assert!(check_size(MAX_AVATAR_BYTES).is_ok());
        assert!(matches!(
            check_size(MAX_AVATAR_BYTES + 1),
            Err(AppError::BadRequest(msg)) if msg == "File too large"
        ));
    }

    #[test]
    fn test_normalize_resizes_to_png_square() {
        let jpeg = sample_image(640, 480, ImageFormat::Jpeg);
        let png = normalize(&jpeg).unwrap();

        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), AVATAR_DIMENSION);
        assert_eq!(decoded.height(), AVATAR_DIMENSION);
    }

    fn grayscale_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageLuma8(image::GrayImage::new(width, height));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_normalize_rejects_oversized_dimensions() {
        // A flat image compresses to a few kilobytes whatever its dimensions.
        let wide = grayscale_png(MAX_SOURCE_DIMENSION + 1, 8);
        assert!(wide.len() < MAX_AVATAR_BYTES);
        assert!(matches!(
            normalize(&wide),
            Err(AppError::BadRequest(msg)) if msg == "Please upload an image"
        ));

        let tall = grayscale_png(8, MAX_SOURCE_DIMENSION + 1);
        assert!(matches!(normalize(&tall), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_normalize_accepts_largest_allowed_dimension() {
        let edge = grayscale_png(MAX_SOURCE_DIMENSION, 4);
        let png = normalize(&edge).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (AVATAR_DIMENSION, AVATAR_DIMENSION));
    }

    #[test]
    fn test_normalize_rejects_non_images() {
        assert!(matches!(
            normalize(b"definitely not an image"),
            Err(AppError::BadRequest(_))
        ));
    }
}
