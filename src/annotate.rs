// ============================================================================
// AnnotationCanvas — freehand brush over the captured frame
// ============================================================================
//
// Strokes are rasterized immediately into the persistent annotation layer as
// a run of filled circles interpolated between the previous and current
// pointer position: one stamp per pixel of travel, so fast motion never
// leaves gaps. Stamps write their color verbatim (including alpha), which is
// idempotent — overdraw at low speed is harmless, and the transparent
// `blank` palette entry doubles as an eraser.

use egui::Pos2;
use image::{Rgba, RgbaImage};

pub const MIN_BRUSH_RADIUS: f32 = 1.0;
pub const MAX_BRUSH_RADIUS: f32 = 100.0;
pub const DEFAULT_BRUSH_RADIUS: f32 = 6.0;

const RADIUS_WHEEL_STEP: f32 = 1.0;
const BOOSTED_RADIUS_WHEEL_STEP: f32 = 4.0;

/// Seconds after the color picker closes during which strokes are ignored,
/// so the closing click cannot leave a paint blob.
pub const PICKER_COOLDOWN_SECS: f64 = 0.25;

/// Dirty region of the annotation raster after a stroke, in image pixels.
/// Used for partial GPU texture uploads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl DirtyRect {
    fn union(self, other: DirtyRect) -> DirtyRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        DirtyRect {
            x,
            y,
            w: (self.x + self.w).max(other.x + other.w) - x,
            h: (self.y + self.h).max(other.y + other.h) - y,
        }
    }
}

pub struct AnnotationCanvas {
    pub color: [u8; 4],
    pub radius: f32,
    /// Frame-loop time before which strokes are suppressed.
    cooldown_until: f64,
}

impl AnnotationCanvas {
    pub fn new(color: [u8; 4], radius: f32) -> Self {
        Self {
            color,
            radius: radius.clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS),
            cooldown_until: 0.0,
        }
    }

    /// Wheel adjustment of the brush radius (picker-open wheel mode).
    pub fn adjust_radius(&mut self, wheel_steps: f32, boosted: bool) {
        let step = if boosted {
            BOOSTED_RADIUS_WHEEL_STEP
        } else {
            RADIUS_WHEEL_STEP
        };
        self.radius = (self.radius + wheel_steps * step).clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS);
    }

    pub fn start_cooldown(&mut self, now: f64) {
        self.cooldown_until = now + PICKER_COOLDOWN_SECS;
    }

    /// Whether a stroke may be painted at frame time `now`.
    pub fn ready(&self, now: f64) -> bool {
        now >= self.cooldown_until
    }

    /// Paint the travel from `prev` to `cur` (image-space coordinates) into
    /// the raster. Returns the dirty region, or `None` when every stamp fell
    /// outside the raster.
    pub fn stroke(&self, raster: &mut RgbaImage, prev: Pos2, cur: Pos2) -> Option<DirtyRect> {
        let distance = prev.distance(cur);
        let steps = distance.round() as u32;

        let mut dirty: Option<DirtyRect> = None;
        let mut stamp_at = |raster: &mut RgbaImage, p: Pos2| {
            if let Some(rect) = self.stamp(raster, p) {
                dirty = Some(match dirty {
                    Some(d) => d.union(rect),
                    None => rect,
                });
            }
        };

        if steps == 0 {
            stamp_at(raster, cur);
        } else {
            for step in 0..steps {
                let t = step as f32 / steps as f32;
                stamp_at(raster, prev.lerp(cur, t));
            }
            // Include the endpoint so the stroke reaches the pointer.
            stamp_at(raster, cur);
        }
        dirty
    }

    /// One filled circle at `center`. Pixels outside the raster are skipped.
    fn stamp(&self, raster: &mut RgbaImage, center: Pos2) -> Option<DirtyRect> {
        let (w, h) = raster.dimensions();
        let r = self.radius;
        let r_sq = r * r;

        let min_x = (center.x - r).floor().max(0.0) as u32;
        let min_y = (center.y - r).floor().max(0.0) as u32;
        let max_x = ((center.x + r).ceil() as i64).min(w as i64 - 1);
        let max_y = ((center.y + r).ceil() as i64).min(h as i64 - 1);
        if max_x < min_x as i64 || max_y < min_y as i64 || center.x + r < 0.0 || center.y + r < 0.0
        {
            return None;
        }
        let (max_x, max_y) = (max_x as u32, max_y as u32);

        let color = Rgba(self.color);
        let mut touched = false;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 + 0.5 - center.x;
                let dy = y as f32 + 0.5 - center.y;
                if dx * dx + dy * dy <= r_sq {
                    raster.put_pixel(x, y, color);
                    touched = true;
                }
            }
        }
        touched.then_some(DirtyRect {
            x: min_x,
            y: min_y,
            w: max_x - min_x + 1,
            h: max_y - min_y + 1,
        })
    }

    /// Clear the whole annotation layer back to transparent.
    pub fn clear(&self, raster: &mut RgbaImage) {
        for px in raster.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> AnnotationCanvas {
        AnnotationCanvas::new([230, 41, 55, 255], 3.0)
    }

    fn painted(raster: &RgbaImage, x: u32, y: u32) -> bool {
        raster.get_pixel(x, y).0[3] != 0
    }

    #[test]
    fn fast_stroke_leaves_no_gaps() {
        let brush = canvas();
        let mut raster = RgbaImage::new(300, 100);
        // A single-frame jump of ~200px must still produce a solid line.
        let prev = Pos2::new(20.0, 50.0);
        let cur = Pos2::new(280.0, 50.0);
        brush.stroke(&mut raster, prev, cur);
        for x in 20..=280 {
            assert!(painted(&raster, x, 50), "gap at x={x}");
        }
    }

    #[test]
    fn stationary_pointer_stamps_once() {
        let brush = canvas();
        let mut raster = RgbaImage::new(50, 50);
        let dirty = brush
            .stroke(&mut raster, Pos2::new(25.0, 25.0), Pos2::new(25.0, 25.0))
            .unwrap();
        assert!(painted(&raster, 25, 25));
        assert!(dirty.w <= 2 * brush.radius.ceil() as u32 + 2);
    }

    #[test]
    fn dirty_rect_covers_whole_stroke() {
        let brush = canvas();
        let mut raster = RgbaImage::new(200, 200);
        let dirty = brush
            .stroke(&mut raster, Pos2::new(40.0, 40.0), Pos2::new(160.0, 120.0))
            .unwrap();
        for (x, y, px) in raster.enumerate_pixels() {
            if px.0[3] != 0 {
                assert!(x >= dirty.x && x < dirty.x + dirty.w);
                assert!(y >= dirty.y && y < dirty.y + dirty.h);
            }
        }
    }

    #[test]
    fn strokes_outside_the_raster_are_skipped() {
        let brush = canvas();
        let mut raster = RgbaImage::new(100, 100);
        let dirty = brush.stroke(
            &mut raster,
            Pos2::new(-500.0, -500.0),
            Pos2::new(-400.0, -500.0),
        );
        assert_eq!(dirty, None);
        assert!(raster.pixels().all(|px| px.0[3] == 0));
    }

    #[test]
    fn blank_color_erases() {
        let red = canvas();
        let mut raster = RgbaImage::new(50, 50);
        red.stroke(&mut raster, Pos2::new(25.0, 25.0), Pos2::new(25.0, 25.0));
        assert!(painted(&raster, 25, 25));

        let eraser = AnnotationCanvas::new([0, 0, 0, 0], 5.0);
        eraser.stroke(&mut raster, Pos2::new(25.0, 25.0), Pos2::new(25.0, 25.0));
        assert!(!painted(&raster, 25, 25));
    }

    #[test]
    fn radius_adjustment_is_clamped() {
        let mut brush = canvas();
        for _ in 0..200 {
            brush.adjust_radius(1.0, true);
        }
        assert_eq!(brush.radius, MAX_BRUSH_RADIUS);
        for _ in 0..200 {
            brush.adjust_radius(-1.0, true);
        }
        assert_eq!(brush.radius, MIN_BRUSH_RADIUS);
    }

    #[test]
    fn cooldown_window_suppresses_then_expires() {
        let mut brush = canvas();
        assert!(brush.ready(0.0));
        brush.start_cooldown(10.0);
        assert!(!brush.ready(10.1));
        assert!(brush.ready(10.0 + PICKER_COOLDOWN_SECS));
    }

    #[test]
    fn clear_resets_to_transparent() {
        let brush = canvas();
        let mut raster = RgbaImage::new(64, 64);
        brush.stroke(&mut raster, Pos2::new(10.0, 10.0), Pos2::new(50.0, 50.0));
        assert!(raster.pixels().any(|px| px.0[3] != 0));
        brush.clear(&mut raster);
        assert!(raster.pixels().all(|px| px.0[3] == 0));
    }
}
