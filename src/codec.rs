use crate::display::{pack, unpack, PixelBuffer};
use image::{ImageEncoder, RgbaImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),
}

/// Converts between encoded image bytes and pixel buffers
pub trait RasterCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, CodecError>;
    fn encode(&self, buffer: &PixelBuffer) -> Result<Vec<u8>, CodecError>;
}

/// PNG codec backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl RasterCodec for PngCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, CodecError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| CodecError::Decode(e.to_string()))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| pack(p[0], p[1], p[2], p[3]))
            .collect();

        PixelBuffer::from_pixels(width, height, pixels)
            .ok_or_else(|| CodecError::Decode("pixel count mismatch".into()))
    }

    fn encode(&self, buffer: &PixelBuffer) -> Result<Vec<u8>, CodecError> {
        let raw: Vec<u8> = buffer
            .pixels()
            .iter()
            .flat_map(|&p| {
                let (r, g, b, a) = unpack(p);
                [r, g, b, a]
            })
            .collect();
        let img = RgbaImage::from_raw(buffer.width(), buffer.height(), raw)
            .ok_or_else(|| CodecError::Encode("pixel count mismatch".into()))?;

        let mut out = Vec::new();
        image::codecs::png::PngEncoder::new(&mut out)
            .write_image(
                img.as_raw(),
                img.width(),
                img.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_roundtrip_preserves_pixels() {
        let buf = PixelBuffer::from_pixels(
            2,
            2,
            vec![0xff00_00ff, 0x00ff_0080, 0x0000_ff00, 0x1234_5678],
        )
        .unwrap();

        let bytes = PngCodec.encode(&buf).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        assert_eq!(PngCodec.decode(&bytes).unwrap(), buf);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            PngCodec.decode(b"not an image"),
            Err(CodecError::Decode(_))
        ));
    }
}
