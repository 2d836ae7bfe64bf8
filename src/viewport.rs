// ============================================================================
// Viewport — screen ⇄ image coordinate mapping under zoom and pan
// ============================================================================
//
// Contract:
//   screen_to_image(p) = (p - pan_offset) / zoom
//   image_to_screen(p) = p * zoom + pan_offset
//
// Zoom is always clamped to [MIN_ZOOM, MAX_ZOOM]; pan_offset is unbounded
// (the image may be moved fully off-screen). The focus radius is a pure UI
// value (spotlight size) with no image-space meaning.

use egui::{Pos2, Vec2};

pub const MIN_ZOOM: f32 = 0.7;
pub const MAX_ZOOM: f32 = 10.0;
pub const STARTING_ZOOM: f32 = 1.0;

const ZOOM_SPEED: f32 = 1.2;
const BOOSTED_ZOOM_SPEED: f32 = 2.2;

const PANNING_FACTOR: f32 = 5.0;
const PANNING_ZOOM_FACTOR: f32 = 0.2;

// Spotlight radius tuning (modifier + wheel). The wheel offset is pushed
// through a sine so successive notches give an oscillation-damped step, then
// the radius eases toward the target by a fixed smoothing factor per event.
const SCROLL_SPEED: f32 = 150.0;
const SCROLL_SENSITIVITY: f32 = 350.0;
const BOOSTED_SCROLL_SENSITIVITY: f32 = SCROLL_SENSITIVITY * 3.0;
const RADIUS_ZOOM_OUT_FACTOR: f32 = 7.6;
const SMOOTHING_FACTOR: f32 = 0.1;

pub const STARTING_RADIUS: f32 = 150.0;
const MIN_RADIUS: f32 = 15.0;

pub struct Viewport {
    pub zoom: f32,
    pub pan_offset: Vec2,
    /// Spotlight radius in screen pixels (the bright circle around the
    /// cursor while the view is unfocused).
    pub focus_radius: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: STARTING_ZOOM,
            pan_offset: Vec2::ZERO,
            focus_radius: STARTING_RADIUS,
        }
    }
}

impl Viewport {
    pub fn screen_to_image(&self, p: Pos2) -> Pos2 {
        Pos2::new(
            (p.x - self.pan_offset.x) / self.zoom,
            (p.y - self.pan_offset.y) / self.zoom,
        )
    }

    pub fn image_to_screen(&self, p: Pos2) -> Pos2 {
        Pos2::new(
            p.x * self.zoom + self.pan_offset.x,
            p.y * self.zoom + self.pan_offset.y,
        )
    }

    /// Wheel zoom that keeps the image point under `pointer` fixed in screen
    /// space: resolve the anchor before changing zoom, then re-derive the pan
    /// offset from it.
    pub fn zoom_around(&mut self, pointer: Pos2, wheel_steps: f32, boosted: bool) {
        let anchor = self.screen_to_image(pointer);

        let speed = if boosted { BOOSTED_ZOOM_SPEED } else { ZOOM_SPEED };
        self.zoom = (self.zoom + wheel_steps * 0.1 * speed).clamp(MIN_ZOOM, MAX_ZOOM);

        self.pan_offset = Vec2::new(
            pointer.x - anchor.x * self.zoom,
            pointer.y - anchor.y * self.zoom,
        );
    }

    /// Pan by a pointer delta. Speed is intentionally zoom-proportional so
    /// panning feels constant in image space.
    pub fn pan_by(&mut self, pointer_delta: Vec2) {
        self.pan_offset += pointer_delta * PANNING_FACTOR * (self.zoom * PANNING_ZOOM_FACTOR);
    }

    /// Secondary wheel mode: adjust the spotlight radius. Zoom-out notches
    /// are stretched by `RADIUS_ZOOM_OUT_FACTOR` before the sine so growing
    /// the circle is faster than shrinking it. `max_radius` is the smaller
    /// screen dimension.
    pub fn adjust_focus_radius(&mut self, wheel_steps: f32, boosted: bool, max_radius: f32) {
        let raw = -SCROLL_SPEED * wheel_steps;
        let offset = if raw <= 0.0 {
            raw * -RADIUS_ZOOM_OUT_FACTOR
        } else {
            raw
        };
        let sens = if boosted {
            BOOSTED_SCROLL_SENSITIVITY
        } else {
            SCROLL_SENSITIVITY
        };
        let target = (self.focus_radius + offset.sin() * sens)
            .max(MIN_RADIUS)
            .min(max_radius);
        self.focus_radius += (target - self.focus_radius) * SMOOTHING_FACTOR;
    }

    /// Restore the default mapping. The focus radius is a UI preference and
    /// is left alone.
    pub fn reset(&mut self) {
        self.zoom = STARTING_ZOOM;
        self.pan_offset = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Pos2, b: Pos2) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn transform_round_trips() {
        let zooms = [MIN_ZOOM, 1.0, 2.5, MAX_ZOOM];
        let pans = [
            Vec2::ZERO,
            Vec2::new(123.0, -451.5),
            Vec2::new(-9999.0, 0.25),
        ];
        let points = [
            Pos2::ZERO,
            Pos2::new(17.5, 940.0),
            Pos2::new(-300.0, 12.0),
        ];
        for &zoom in &zooms {
            for &pan_offset in &pans {
                let vp = Viewport {
                    zoom,
                    pan_offset,
                    focus_radius: STARTING_RADIUS,
                };
                for &p in &points {
                    assert!(approx(vp.screen_to_image(vp.image_to_screen(p)), p));
                    assert!(approx(vp.image_to_screen(vp.screen_to_image(p)), p));
                }
            }
        }
    }

    #[test]
    fn zoom_stays_clamped() {
        let mut vp = Viewport::default();
        let pointer = Pos2::new(640.0, 360.0);
        for _ in 0..100 {
            vp.zoom_around(pointer, 3.0, true);
        }
        assert_eq!(vp.zoom, MAX_ZOOM);
        for _ in 0..200 {
            vp.zoom_around(pointer, -3.0, true);
        }
        assert_eq!(vp.zoom, MIN_ZOOM);
        assert!(vp.zoom >= MIN_ZOOM && vp.zoom <= MAX_ZOOM);
    }

    #[test]
    fn zoom_keeps_pointer_anchored() {
        let mut vp = Viewport {
            zoom: 1.5,
            pan_offset: Vec2::new(-80.0, 42.0),
            focus_radius: STARTING_RADIUS,
        };
        let pointer = Pos2::new(500.0, 300.0);
        let anchor = vp.screen_to_image(pointer);
        vp.zoom_around(pointer, 1.0, false);
        // The image point that was under the pointer must still be there.
        assert!(approx(vp.image_to_screen(anchor), pointer));
    }

    #[test]
    fn pan_scales_with_zoom() {
        let mut a = Viewport::default();
        let mut b = Viewport::default();
        b.zoom = 2.0;
        a.pan_by(Vec2::new(10.0, 0.0));
        b.pan_by(Vec2::new(10.0, 0.0));
        assert!(b.pan_offset.x > a.pan_offset.x);
        assert_eq!(a.pan_offset.x, 10.0 * PANNING_FACTOR * PANNING_ZOOM_FACTOR);
    }

    #[test]
    fn focus_radius_respects_bounds() {
        let mut vp = Viewport::default();
        for _ in 0..500 {
            vp.adjust_focus_radius(-1.0, true, 1080.0);
            assert!(vp.focus_radius >= MIN_RADIUS && vp.focus_radius <= 1080.0);
        }
        for _ in 0..500 {
            vp.adjust_focus_radius(1.0, true, 1080.0);
            assert!(vp.focus_radius >= MIN_RADIUS && vp.focus_radius <= 1080.0);
        }
    }

    #[test]
    fn reset_restores_mapping_but_not_radius() {
        let mut vp = Viewport::default();
        vp.zoom_around(Pos2::new(100.0, 100.0), 2.0, false);
        vp.pan_by(Vec2::new(30.0, -12.0));
        vp.focus_radius = 77.0;
        vp.reset();
        assert_eq!(vp.zoom, STARTING_ZOOM);
        assert_eq!(vp.pan_offset, Vec2::ZERO);
        assert_eq!(vp.focus_radius, 77.0);
    }
}
