// ============================================================================
// Export pipeline — flatten, crop, name, write
// ============================================================================
//
// Full-frame export flattens the annotation layer onto the original capture
// and writes it as PNG. Selection export additionally maps the screen-space
// selection rectangle back to image space through the viewport transform and
// crops. Crop coordinates outside the image wrap modulo the image dimensions
// (toroidal addressing), so a selection dragged past an edge samples from the
// opposite side instead of clamping.
//
// Output naming never overwrites: `screenshot.png`, then `screenshot_0.png`,
// `screenshot_1.png`, … until a free path is found.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use egui::Rect;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use rayon::prelude::*;

use crate::capture::FrameBuffer;
use crate::viewport::Viewport;

pub const OUTPUT_BASENAME: &str = "screenshot";
/// Upper bound on suffix probing; hitting it means the directory holds tens
/// of thousands of screenshots.
const MAX_NAME_PROBES: u32 = 100_000;

/// First non-existing output path in `dir`.
pub fn resolve_output_path(dir: &Path) -> Result<PathBuf, String> {
    let base = dir.join(format!("{OUTPUT_BASENAME}.png"));
    if !base.exists() {
        return Ok(base);
    }
    for n in 0..MAX_NAME_PROBES {
        let candidate = dir.join(format!("{OUTPUT_BASENAME}_{n}.png"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(format!(
        "could not find a free output name after {MAX_NAME_PROBES} probes in {}",
        dir.display()
    ))
}

/// Alpha-composite the annotation layer over the original capture.
pub fn flatten(frame: &FrameBuffer) -> RgbaImage {
    let mut out = frame.original.clone();
    let overlay: &[u8] = &frame.annotations;
    out.par_chunks_mut(4)
        .zip(overlay.par_chunks(4))
        .for_each(|(dst, src)| {
            let a = src[3] as u32;
            if a == 255 {
                dst.copy_from_slice(src);
            } else if a > 0 {
                let inv = 255 - a;
                for c in 0..3 {
                    dst[c] = ((src[c] as u32 * a + dst[c] as u32 * inv) / 255) as u8;
                }
            }
        });
    out
}

/// Crop `w`×`h` pixels starting at (`x`, `y`), wrapping out-of-range
/// addresses modulo the source dimensions.
pub fn crop_wrapped(src: &RgbaImage, x: i64, y: i64, w: u32, h: u32) -> RgbaImage {
    let (sw, sh) = src.dimensions();
    RgbaImage::from_fn(w, h, |dx, dy| {
        let sx = (x + dx as i64).rem_euclid(sw as i64) as u32;
        let sy = (y + dy as i64).rem_euclid(sh as i64) as u32;
        *src.get_pixel(sx, sy)
    })
}

fn write_png(img: &RgbaImage, path: &Path) -> Result<(), String> {
    let file =
        File::create(path).map_err(|e| format!("could not create {}: {e}", path.display()))?;
    let encoder = PngEncoder::new(BufWriter::new(file));
    encoder
        .write_image(img, img.width(), img.height(), ColorType::Rgba8)
        .map_err(|e| format!("could not encode {}: {e}", path.display()))
}

/// Flatten and write the whole frame. Returns the written path.
pub fn export_full(frame: &FrameBuffer, dir: &Path) -> Result<PathBuf, String> {
    let path = resolve_output_path(dir)?;
    write_png(&flatten(frame), &path)?;
    Ok(path)
}

/// Flatten, map the screen-space selection to image space, crop (with wrap)
/// and write. Returns the written path, or `Ok(None)` without writing when
/// the selection maps to a zero-area image region.
pub fn export_selection(
    frame: &FrameBuffer,
    viewport: &Viewport,
    selection: Rect,
    dir: &Path,
) -> Result<Option<PathBuf>, String> {
    let min = viewport.screen_to_image(selection.min);
    let max = viewport.screen_to_image(selection.max);
    let w = (max.x - min.x).round() as i64;
    let h = (max.y - min.y).round() as i64;
    if w <= 0 || h <= 0 {
        return Ok(None);
    }

    let flat = flatten(frame);
    let crop = crop_wrapped(
        &flat,
        min.x.round() as i64,
        min.y.round() as i64,
        w as u32,
        h as u32,
    );

    let path = resolve_output_path(dir)?;
    write_png(&crop, &path)?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Pos2;
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x * 7 + y * 3) % 256) as u8, 255])
        })
    }

    #[test]
    fn wrap_matches_double_modulo_identity() {
        let width: i64 = 37;
        for x in [-100i64, -38, -37, -1, 0, 1, 36, 37, 38, 500] {
            let wrapped = x.rem_euclid(width);
            assert_eq!(wrapped, ((x % width) + width) % width);
            assert!((0..width).contains(&wrapped));
        }
    }

    #[test]
    fn crop_wraps_toroidally() {
        let src = gradient(20, 10);
        // Start past the right/bottom edge: every pixel comes from the
        // wrapped address.
        let crop = crop_wrapped(&src, 18, 8, 5, 5);
        for dy in 0..5u32 {
            for dx in 0..5u32 {
                let expect = src.get_pixel((18 + dx) % 20, (8 + dy) % 10);
                assert_eq!(crop.get_pixel(dx, dy), expect);
            }
        }
        // Negative start wraps from the far edge.
        let crop = crop_wrapped(&src, -3, -2, 4, 4);
        assert_eq!(crop.get_pixel(0, 0), src.get_pixel(17, 8));
    }

    #[test]
    fn filename_probe_never_returns_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve_output_path(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("screenshot.png"));

        std::fs::write(dir.path().join("screenshot.png"), b"x").unwrap();
        std::fs::write(dir.path().join("screenshot_0.png"), b"x").unwrap();
        let path = resolve_output_path(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("screenshot_1.png"));
        assert!(!path.exists());
    }

    #[test]
    fn flatten_blends_annotations_on_top() {
        let mut frame = FrameBuffer::from_image(gradient(16, 16));
        frame.annotations.put_pixel(3, 3, Rgba([255, 0, 0, 255]));
        frame.annotations.put_pixel(5, 5, Rgba([0, 0, 255, 128]));

        let flat = flatten(&frame);
        assert_eq!(flat.get_pixel(3, 3).0, [255, 0, 0, 255]);
        // Un-annotated pixels equal the original.
        assert_eq!(flat.get_pixel(0, 0), frame.original.get_pixel(0, 0));
        // Half-transparent overlay mixes both.
        let orig = frame.original.get_pixel(5, 5).0;
        let mixed = flat.get_pixel(5, 5).0;
        assert_ne!(mixed, orig);
        assert_eq!(mixed[2], ((255u32 * 128 + orig[2] as u32 * 127) / 255) as u8);
    }

    #[test]
    fn selection_export_crops_the_source_subrect() {
        // End-to-end §8 case: drag (10,10) → (110,60) at identity viewport
        // exports a 100×50 region equal to the source sub-rectangle.
        let frame = FrameBuffer::from_image(gradient(200, 100));
        let viewport = Viewport::default();
        let selection = Rect::from_min_max(Pos2::new(10.0, 10.0), Pos2::new(110.0, 60.0));
        let dir = tempfile::tempdir().unwrap();

        let path = export_selection(&frame, &viewport, selection, dir.path())
            .unwrap()
            .unwrap();
        let written = image::open(&path).unwrap().into_rgba8();
        assert_eq!(written.dimensions(), (100, 50));
        for dy in 0..50u32 {
            for dx in 0..100u32 {
                assert_eq!(
                    written.get_pixel(dx, dy),
                    frame.original.get_pixel(10 + dx, 10 + dy)
                );
            }
        }
    }

    #[test]
    fn selection_export_respects_zoom_and_pan() {
        let frame = FrameBuffer::from_image(gradient(200, 100));
        let mut viewport = Viewport::default();
        viewport.zoom = 2.0;
        viewport.pan_offset = egui::Vec2::new(-20.0, -10.0);
        // Screen rect (20,10)-(120,60) maps to image (20,10)-(70,35).
        let selection = Rect::from_min_max(Pos2::new(20.0, 10.0), Pos2::new(120.0, 60.0));
        let dir = tempfile::tempdir().unwrap();

        let path = export_selection(&frame, &viewport, selection, dir.path())
            .unwrap()
            .unwrap();
        let written = image::open(&path).unwrap().into_rgba8();
        assert_eq!(written.dimensions(), (50, 25));
        assert_eq!(written.get_pixel(0, 0), frame.original.get_pixel(20, 10));
    }

    #[test]
    fn empty_selection_is_skipped_without_writing() {
        let frame = FrameBuffer::from_image(gradient(20, 20));
        let viewport = Viewport::default();
        let selection = Rect::from_min_max(Pos2::new(5.0, 5.0), Pos2::new(5.0, 15.0));
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            export_selection(&frame, &viewport, selection, dir.path()),
            Ok(None)
        );
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn full_export_writes_the_whole_frame() {
        let frame = FrameBuffer::from_image(gradient(32, 24));
        let dir = tempfile::tempdir().unwrap();
        let path = export_full(&frame, dir.path()).unwrap();
        let written = image::open(&path).unwrap().into_rgba8();
        assert_eq!(written.dimensions(), (32, 24));
        assert_eq!(written, frame.original);
    }
}
