// ============================================================================
// FrameBuffer — the one-shot screen capture and its derived pixel layers
// ============================================================================
//
// The screen is grabbed exactly once at startup. From the grab we keep three
// same-sized buffers: the untouched original, a pre-darkened copy used as the
// unfocused backdrop, and the transparent annotation raster the brush paints
// into. Only the annotation raster is ever mutated after construction.

use image::RgbaImage;
use rayon::prelude::*;
use xcap::Monitor;

/// Per-channel multiplier for the darkened backdrop copy.
pub const DARKEN_FACTOR: f32 = 0.45;

pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    /// Captured pixels, immutable for the whole session.
    pub original: RgbaImage,
    /// Pre-darkened copy (original × DARKEN_FACTOR per channel).
    pub darkened: RgbaImage,
    /// Persistent freehand annotation layer, transparent until painted.
    pub annotations: RgbaImage,
}

impl FrameBuffer {
    /// Build all three layers from a captured image.
    pub fn from_image(original: RgbaImage) -> Self {
        let (width, height) = original.dimensions();

        let mut darkened = original.clone();
        darkened.par_chunks_mut(4).for_each(|px| {
            px[0] = (px[0] as f32 * DARKEN_FACTOR) as u8;
            px[1] = (px[1] as f32 * DARKEN_FACTOR) as u8;
            px[2] = (px[2] as f32 * DARKEN_FACTOR) as u8;
            // Alpha stays as captured.
        });

        Self {
            width,
            height,
            original,
            darkened,
            annotations: RgbaImage::new(width, height),
        }
    }
}

/// Grab the primary monitor (first monitor when none is marked primary).
pub fn capture_primary() -> Result<FrameBuffer, String> {
    let monitors =
        Monitor::all().map_err(|e| format!("could not enumerate displays: {e}"))?;
    let monitor = monitors
        .iter()
        .find(|m| m.is_primary())
        .or_else(|| monitors.first())
        .ok_or_else(|| "no display found".to_string())?;
    let shot = monitor
        .capture_image()
        .map_err(|e| format!("could not capture the screen: {e}"))?;

    // Rebuild from raw bytes so xcap's image types never leak further.
    let (w, h) = shot.dimensions();
    let original = RgbaImage::from_raw(w, h, shot.into_raw())
        .ok_or_else(|| "captured frame has inconsistent dimensions".to_string())?;
    Ok(FrameBuffer::from_image(original))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    #[test]
    fn layers_share_dimensions() {
        let frame = FrameBuffer::from_image(gradient(320, 200));
        assert_eq!((frame.width, frame.height), (320, 200));
        assert_eq!(frame.darkened.dimensions(), (320, 200));
        assert_eq!(frame.annotations.dimensions(), (320, 200));
    }

    #[test]
    fn darkened_copy_scales_every_channel() {
        let frame = FrameBuffer::from_image(gradient(64, 64));
        for (orig, dark) in frame.original.pixels().zip(frame.darkened.pixels()) {
            for c in 0..3 {
                assert_eq!(dark.0[c], (orig.0[c] as f32 * DARKEN_FACTOR) as u8);
            }
            assert_eq!(dark.0[3], orig.0[3]);
        }
    }

    #[test]
    fn annotation_raster_starts_transparent() {
        let frame = FrameBuffer::from_image(gradient(32, 32));
        assert!(frame.annotations.pixels().all(|px| px.0 == [0, 0, 0, 0]));
    }
}
