//! Image decoding into RGBA frames.
//!
//! Animated GIF, APNG, and animated WebP decode into one frame per animation
//! step, each composited to the full canvas with its own delay. Every other
//! supported format decodes into a single frame with zero delay.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::Path;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, DynamicImage, Frames, ImageFormat, ImageReader, RgbaImage};
use tracing::warn;

use crate::error::DecodeError;

/// One decoded frame.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Full-canvas RGBA pixels.
    pub image: RgbaImage,
    /// How long the frame stays on screen.
    pub delay: Duration,
}

/// All frames of a decoded image. Every frame shares `width` x `height`.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Frames in display order; never empty.
    pub frames: Vec<DecodedFrame>,
}

impl DecodedImage {
    /// Wrap a single still image.
    #[must_use]
    pub fn still(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            frames: vec![DecodedFrame {
                image,
                delay: Duration::ZERO,
            }],
        }
    }

    /// Whether the image has more than one frame.
    #[must_use]
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }
}

/// Decode the file at `path`, sniffing its format from the contents.
///
/// # Errors
///
/// Returns [`DecodeError`] if the file cannot be read or decoded, or if an
/// animation yields no frames.
pub fn decode_file(path: &Path) -> Result<DecodedImage, DecodeError> {
    let reader = ImageReader::new(BufReader::new(File::open(path)?)).with_guessed_format()?;
    decode_reader(reader)
}

/// Decode an in-memory encoded image.
///
/// # Errors
///
/// Same as [`decode_file`], minus file access.
pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    decode_reader(reader)
}

fn decode_reader<R: BufRead + Seek>(reader: ImageReader<R>) -> Result<DecodedImage, DecodeError> {
    match reader.format() {
        Some(ImageFormat::Gif) => collect_frames(GifDecoder::new(reader.into_inner())?.into_frames()),
        Some(ImageFormat::Png) => {
            let decoder = PngDecoder::new(reader.into_inner())?;
            if decoder.is_apng()? {
                collect_frames(decoder.apng()?.into_frames())
            } else {
                Ok(DecodedImage::still(DynamicImage::from_decoder(decoder)?.to_rgba8()))
            }
        }
        Some(ImageFormat::WebP) => {
            let decoder = WebPDecoder::new(reader.into_inner())?;
            if decoder.has_animation() {
                collect_frames(decoder.into_frames())
            } else {
                Ok(DecodedImage::still(DynamicImage::from_decoder(decoder)?.to_rgba8()))
            }
        }
        _ => Ok(DecodedImage::still(reader.decode()?.to_rgba8())),
    }
}

/// Drain an animation into frames sized like the first one.
fn collect_frames(frames: Frames<'_>) -> Result<DecodedImage, DecodeError> {
    let mut decoded: Vec<DecodedFrame> = Vec::new();
    let mut canvas = None;

    for (index, frame) in frames.enumerate() {
        let frame = frame?;
        let delay = frame_delay(frame.delay());
        let image = frame.into_buffer();
        let dimensions = image.dimensions();

        match canvas {
            None => canvas = Some(dimensions),
            Some(expected) if expected != dimensions => {
                warn!(
                    index,
                    ?expected,
                    actual = ?dimensions,
                    "skipping animation frame with mismatched size"
                );
                continue;
            }
            Some(_) => {}
        }

        decoded.push(DecodedFrame { image, delay });
    }

    let (width, height) = canvas.ok_or(DecodeError::Empty)?;
    Ok(DecodedImage {
        width,
        height,
        frames: decoded,
    })
}

/// Convert a decoder delay (a millisecond ratio) to a [`Duration`].
fn frame_delay(delay: image::Delay) -> Duration {
    let (numer, denom) = delay.numer_denom_ms();
    let micros = u64::from(numer) * 1000 / u64::from(denom.max(1));
    Duration::from_micros(micros)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use image::codecs::gif::{GifEncoder, Repeat};
    use image::{Delay, Frame, ImageEncoder, Rgba};

    /// Encode a GIF whose frames are solid colors, each shown for `delay_ms`.
    pub(crate) fn solid_gif(width: u32, height: u32, colors: &[[u8; 4]], delay_ms: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            encoder.set_repeat(Repeat::Infinite).unwrap();
            let frames = colors.iter().map(|color| {
                Frame::from_parts(
                    RgbaImage::from_pixel(width, height, Rgba(*color)),
                    0,
                    0,
                    Delay::from_numer_denom_ms(delay_ms, 1),
                )
            });
            encoder.encode_frames(frames).unwrap();
        }
        bytes
    }

    pub(crate) fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut bytes = Vec::new();
        image::codecs::png::PngEncoder::new(&mut bytes)
            .write_image(image.as_raw(), width, height, image::ExtendedColorType::Rgba8)
            .unwrap();
        bytes
    }

    #[test]
    fn still_png_is_one_frame() {
        let decoded = decode_bytes(&solid_png(3, 2, [1, 2, 3, 255])).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.frames.len(), 1);
        assert!(!decoded.is_animated());
        assert_eq!(decoded.frames[0].delay, Duration::ZERO);
        assert_eq!(decoded.frames[0].image.get_pixel(2, 1).0, [1, 2, 3, 255]);
    }

    #[test]
    fn gif_frames_keep_order_and_delay() {
        let colors = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];
        let decoded = decode_bytes(&solid_gif(4, 4, &colors, 70)).unwrap();

        assert_eq!((decoded.width, decoded.height), (4, 4));
        assert_eq!(decoded.frames.len(), 3);
        assert!(decoded.is_animated());
        for (frame, color) in decoded.frames.iter().zip(colors) {
            assert_eq!(frame.delay, Duration::from_millis(70));
            assert_eq!(frame.image.get_pixel(0, 0).0, color);
        }
    }

    #[test]
    fn single_frame_gif_decodes() {
        let decoded = decode_bytes(&solid_gif(2, 2, &[[9, 9, 9, 255]], 100)).unwrap();
        assert_eq!(decoded.frames.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = decode_file(&dir.path().join("nope.gif")).unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_bytes(b"definitely not an image").is_err());
    }

    #[test]
    fn fractional_delays_convert() {
        assert_eq!(
            frame_delay(Delay::from_numer_denom_ms(100, 3)),
            Duration::from_micros(33_333)
        );
        assert_eq!(frame_delay(Delay::from_numer_denom_ms(0, 1)), Duration::ZERO);
    }
}
