use base64::engine::general_purpose;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;

use crate::shared::constants::JPEG_QUALITY;
use crate::shared::pixel_buffer::PixelBuffer;

/// Encodes a captured RGB buffer as JPEG at upload quality.
pub fn encode_jpeg(buffer: &PixelBuffer) -> Result<Vec<u8>, image::ImageError> {
    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    encoder.encode(
        buffer.data(),
        buffer.width(),
        buffer.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(jpeg)
}

/// Base64 wire payload for a `video_frame` message.
pub fn to_wire_payload(jpeg: &[u8]) -> String {
    general_purpose::STANDARD.encode(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::resolution::Resolution;

    fn buffer(width: u32, height: u32) -> PixelBuffer {
        let data = vec![128u8; (width * height * 3) as usize];
        PixelBuffer::new(data, Resolution::new(width, height))
    }

    #[test]
    fn test_encode_produces_jpeg_magic_bytes() {
        let jpeg = encode_jpeg(&buffer(16, 16)).unwrap();
        assert!(jpeg.len() > 2);
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]); // SOI marker
    }

    #[test]
    fn test_encode_single_pixel() {
        let jpeg = encode_jpeg(&buffer(1, 1)).unwrap();
        assert!(!jpeg.is_empty());
    }

    #[test]
    fn test_wire_payload_is_standard_base64() {
        let payload = to_wire_payload(b"hello");
        assert_eq!(payload, "aGVsbG8=");
    }

    #[test]
    fn test_wire_payload_round_trip() {
        let jpeg = encode_jpeg(&buffer(8, 8)).unwrap();
        let payload = to_wire_payload(&jpeg);
        let decoded = general_purpose::STANDARD.decode(payload).unwrap();
        assert_eq!(decoded, jpeg);
    }
}
