use base64::{engine::general_purpose, Engine as _};
use image::GenericImageView;
use std::io::Cursor;

/// Uploads wider than this are downscaled before being embedded in the
/// outbound payload. Smaller images pass through untouched.
pub const MAX_WIDTH: u32 = 1024;

pub const JPEG_QUALITY: u8 = 85;

/// Image bytes ready to be embedded in a provider request.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl EncodedImage {
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            sanitize_mime(&self.mime),
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Some clients declare MIME strings with a doubled prefix such as
/// "image/image/png". The provider rejects those, so collapse them first.
pub fn sanitize_mime(mime: &str) -> &str {
    let mut mime = mime.trim();
    while mime.starts_with("image/image/") {
        mime = &mime["image/".len()..];
    }
    mime
}

/// Decode the upload and bound its size for the outbound payload: downscale to
/// at most `MAX_WIDTH` pixels wide (aspect preserved, never upscaled) and
/// re-encode as JPEG. Images already within the bound keep their original
/// bytes and declared type.
pub fn prepare_image(data: &[u8], declared_mime: &str) -> Result<EncodedImage, image::ImageError> {
    let img = image::load_from_memory(data)?;
    let (width, _) = img.dimensions();

    if width <= MAX_WIDTH {
        return Ok(EncodedImage {
            bytes: data.to_vec(),
            mime: sanitize_mime(declared_mime).to_string(),
        });
    }

    let resized = img.resize(MAX_WIDTH, u32::MAX, image::imageops::FilterType::Lanczos3);
    // JPEG output cannot carry an alpha channel
    let rgb = resized.to_rgb8();
    let mut jpeg_bytes = Vec::new();
    rgb.write_to(
        &mut Cursor::new(&mut jpeg_bytes),
        image::ImageOutputFormat::Jpeg(JPEG_QUALITY),
    )?;

    Ok(EncodedImage {
        bytes: jpeg_bytes,
        mime: "image/jpeg".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 90, 140]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_wide_image_is_downscaled_preserving_aspect() {
        let original = png_bytes(2048, 512);
        let encoded = prepare_image(&original, "image/png").unwrap();
        assert_eq!(encoded.mime, "image/jpeg");

        let reloaded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(reloaded.dimensions(), (1024, 256));
    }

    #[test]
    fn test_small_image_passes_through_unchanged() {
        let original = png_bytes(640, 480);
        let encoded = prepare_image(&original, "image/png").unwrap();
        assert_eq!(encoded.bytes, original);
        assert_eq!(encoded.mime, "image/png");
    }

    #[test]
    fn test_image_at_exact_bound_is_not_resized() {
        let original = png_bytes(1024, 768);
        let encoded = prepare_image(&original, "image/png").unwrap();
        assert_eq!(encoded.bytes, original);
    }

    #[test]
    fn test_undecodable_bytes_are_rejected() {
        assert!(prepare_image(b"not an image", "image/png").is_err());
    }

    #[test]
    fn test_sanitize_collapses_doubled_mime_prefix() {
        assert_eq!(sanitize_mime("image/image/png"), "image/png");
        assert_eq!(sanitize_mime("image/image/image/jpeg"), "image/jpeg");
        assert_eq!(sanitize_mime("image/webp"), "image/webp");
        assert_eq!(sanitize_mime(" image/png "), "image/png");
    }

    #[test]
    fn test_data_uri_carries_sanitized_mime() {
        let encoded = EncodedImage {
            bytes: vec![1, 2, 3],
            mime: "image/image/png".to_string(),
        };
        let uri = encoded.to_data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(
            uri,
            format!(
                "data:image/png;base64,{}",
                general_purpose::STANDARD.encode([1u8, 2, 3])
            )
        );
    }
}
