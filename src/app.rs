// ============================================================================
// SnapbrushApp — session context, per-frame input router, render pass
// ============================================================================
//
// All mutable interaction state (viewport, selection, brush, picker) lives in
// this one structure; eframe calls `update` once per frame, which polls the
// input snapshot, routes it in priority order (modal picker > resize > draw >
// pan/zoom > view) and then paints the composited layers.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use egui::{
    Color32, ColorImage, Context, CursorIcon, ImageData, Mesh, Pos2, Rect, Rounding, Stroke,
    TextureHandle, TextureOptions, Vec2, epaint::Vertex,
};

use crate::annotate::{AnnotationCanvas, DirtyRect};
use crate::capture::FrameBuffer;
use crate::export;
use crate::picker::{ColorPicker, PALETTE};
use crate::selection::SelectionEngine;
use crate::viewport::Viewport;
use crate::{log_err, log_info, log_warn};

/// egui reports scroll in points; one mouse-wheel notch is ~50 of them. The
/// tuning constants in `viewport.rs` are calibrated for ±1 per notch.
const SCROLL_STEP_POINTS: f32 = 50.0;

const SPOTLIGHT_SEGMENTS: usize = 64;
/// Visual radius of the drawn corner handles (their hit radius is larger).
const HANDLE_DRAW_RADIUS: f32 = 5.0;

const BACKGROUND: Color32 = Color32::from_rgb(10, 10, 10);
const SELECTION_STROKE: Color32 = Color32::from_rgb(66, 133, 244);
const PICKER_BACKDROP: Color32 = Color32::from_rgba_premultiplied(18, 18, 18, 235);

struct Textures {
    original: TextureHandle,
    darkened: TextureHandle,
    annotations: TextureHandle,
}

/// One frame's worth of polled input, gathered in a single `ctx.input` pass.
struct FrameInput {
    pointer: Pos2,
    pointer_delta: Vec2,
    primary_pressed: bool,
    primary_down: bool,
    primary_released: bool,
    secondary_pressed: bool,
    /// Wheel travel in notches (see `SCROLL_STEP_POINTS`).
    wheel: f32,
    alt: bool,
    ctrl: bool,
    shift: bool,
    space: bool,
    escape: bool,
    enter: bool,
    toggle_picker: bool,
    clear_canvas: bool,
    reset_view: bool,
    quit: bool,
    now: f64,
}

pub struct SnapbrushApp {
    frame: FrameBuffer,
    viewport: Viewport,
    selection: SelectionEngine,
    brush: AnnotationCanvas,
    picker: ColorPicker,
    textures: Option<Textures>,
    output_dir: PathBuf,
    /// Pointer position at the end of the previous frame.
    prev_pointer: Pos2,
    /// True while the current primary-button hold is laying a stroke.
    painting: bool,
    pan_active: bool,
    /// Set on unrecoverable mid-session failures; main maps it to exit 1.
    fatal: Arc<AtomicBool>,
}

impl SnapbrushApp {
    pub fn new(
        frame: FrameBuffer,
        brush: AnnotationCanvas,
        output_dir: PathBuf,
        fatal: Arc<AtomicBool>,
    ) -> Self {
        let center = Pos2::new(frame.width as f32 / 2.0, frame.height as f32 / 2.0);
        Self {
            frame,
            viewport: Viewport::default(),
            selection: SelectionEngine::default(),
            brush,
            picker: ColorPicker::default(),
            textures: None,
            output_dir,
            prev_pointer: center,
            painting: false,
            pan_active: false,
            fatal,
        }
    }

    // -- Input ------------------------------------------------------------

    fn poll(&self, ctx: &Context) -> FrameInput {
        ctx.input(|i| {
            let pointer = i.pointer.hover_pos().unwrap_or(self.prev_pointer);
            FrameInput {
                pointer,
                pointer_delta: pointer - self.prev_pointer,
                primary_pressed: i.pointer.primary_pressed(),
                primary_down: i.pointer.primary_down(),
                primary_released: i.pointer.primary_released(),
                secondary_pressed: i.pointer.secondary_pressed(),
                wheel: i.scroll_delta.y / SCROLL_STEP_POINTS,
                alt: i.modifiers.alt,
                ctrl: i.modifiers.ctrl,
                shift: i.modifiers.shift,
                space: i.key_down(egui::Key::Space),
                escape: i.key_pressed(egui::Key::Escape),
                enter: i.key_pressed(egui::Key::Enter),
                toggle_picker: i.key_pressed(egui::Key::C),
                clear_canvas: i.key_pressed(egui::Key::X),
                reset_view: i.key_pressed(egui::Key::R),
                quit: i.key_pressed(egui::Key::Q),
                now: i.time,
            }
        })
    }

    /// Route one frame of input. Priority: modal picker, then selection
    /// resize, then drawing, then pan/zoom, then view-level keys.
    fn route(&mut self, input: &FrameInput, ctx: &Context) {
        // -- Modal color picker: exclusive input capture -------------------
        if self.picker.is_open() {
            if input.wheel != 0.0 {
                self.brush.adjust_radius(input.wheel, input.shift);
            }
            if input.escape || input.toggle_picker {
                self.picker.close();
                self.brush.start_cooldown(input.now);
            } else if input.primary_pressed {
                if let Some(color) = self.picker.click(input.pointer) {
                    self.brush.color = color;
                }
                self.brush.start_cooldown(input.now);
            }
            self.painting = false;
            return;
        }

        // -- View-level keys ----------------------------------------------
        if input.quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        if input.reset_view {
            self.viewport.reset();
        }
        if input.toggle_picker {
            self.picker.open_at(input.pointer);
            return;
        }
        if input.clear_canvas {
            self.brush.clear(&mut self.frame.annotations);
            self.upload_annotations_full(ctx);
        }
        if input.escape && self.selection.is_active() {
            self.selection.teardown();
        }
        if input.enter {
            self.export(ctx);
        }

        // -- Selection state machine --------------------------------------
        if self.selection.is_selecting() {
            self.selection.track(input.pointer);
            if input.primary_released {
                self.selection.release();
            }
        } else if self.selection.active_handle().is_some() {
            self.selection.resize(input.pointer, input.pointer_delta);
            if input.primary_released {
                self.selection.release();
            }
        } else if self.selection.is_active() {
            if input.primary_pressed {
                self.selection.press(input.pointer, input.alt);
            }
        } else if input.alt && input.primary_pressed {
            self.selection.begin(input.pointer);
        }
        if input.secondary_pressed {
            self.selection.preserve();
        }
        if !input.alt {
            self.selection.entry_released();
        }

        // -- Freehand drawing ---------------------------------------------
        let resizing = self.selection.active_handle().is_some();
        let can_draw = input.primary_down
            && !input.alt
            && !resizing
            && !self.selection.is_selecting()
            && self.brush.ready(input.now);
        if can_draw {
            let cur = self.viewport.screen_to_image(input.pointer);
            let prev = if self.painting {
                self.viewport.screen_to_image(self.prev_pointer)
            } else {
                cur
            };
            if let Some(dirty) = self.brush.stroke(&mut self.frame.annotations, prev, cur) {
                self.upload_annotations_region(dirty);
            }
            self.painting = true;
        } else {
            self.painting = false;
        }

        // -- Wheel: anchored zoom, or spotlight radius with Ctrl -----------
        if input.wheel != 0.0 {
            if input.ctrl {
                let max_radius = ctx.screen_rect().width().min(ctx.screen_rect().height());
                self.viewport
                    .adjust_focus_radius(input.wheel, input.shift, max_radius);
            } else {
                self.viewport
                    .zoom_around(input.pointer, input.wheel, input.shift);
            }
        }

        // -- Held-key panning ---------------------------------------------
        if input.space {
            if self.pan_active {
                self.viewport.pan_by(input.pointer_delta);
            }
            self.pan_active = true;
        } else {
            self.pan_active = false;
        }
    }

    // -- Export ------------------------------------------------------------

    fn export(&mut self, ctx: &Context) {
        let result = match self.selection.rect() {
            Some(rect) => {
                export::export_selection(&self.frame, &self.viewport, rect, &self.output_dir)
            }
            None => export::export_full(&self.frame, &self.output_dir).map(Some),
        };
        match result {
            Ok(Some(path)) => {
                log_info!("exported {}", path.display());
                println!("saved {}", path.display());
                // The export consumes both the annotations and the selection.
                self.brush.clear(&mut self.frame.annotations);
                self.upload_annotations_full(ctx);
                self.selection.teardown();
            }
            Ok(None) => {
                log_warn!("export skipped: selection is empty");
            }
            Err(e) => {
                log_err!("export failed: {e}");
                eprintln!("error: export failed: {e}");
                self.fatal.store(true, Ordering::Relaxed);
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    // -- Texture uploads ---------------------------------------------------

    fn ensure_textures(&mut self, ctx: &Context) {
        if self.textures.is_some() {
            return;
        }
        let opts = TextureOptions::LINEAR;
        self.textures = Some(Textures {
            original: ctx.load_texture("capture", color_image(&self.frame.original), opts),
            darkened: ctx.load_texture("capture_dark", color_image(&self.frame.darkened), opts),
            annotations: ctx.load_texture(
                "annotations",
                color_image(&self.frame.annotations),
                opts,
            ),
        });
    }

    fn upload_annotations_full(&mut self, _ctx: &Context) {
        if let Some(tex) = &mut self.textures {
            tex.annotations
                .set(color_image(&self.frame.annotations), TextureOptions::LINEAR);
        }
    }

    /// Partial upload — only the stroke's dirty region is sent to the GPU,
    /// not the whole screen-sized raster.
    fn upload_annotations_region(&mut self, dirty: DirtyRect) {
        let Some(tex) = &mut self.textures else {
            return;
        };
        let mut pixels = Vec::with_capacity((dirty.w * dirty.h) as usize);
        for y in dirty.y..dirty.y + dirty.h {
            for x in dirty.x..dirty.x + dirty.w {
                let px = self.frame.annotations.get_pixel(x, y).0;
                pixels.push(Color32::from_rgba_unmultiplied(px[0], px[1], px[2], px[3]));
            }
        }
        let region = ColorImage {
            size: [dirty.w as usize, dirty.h as usize],
            pixels,
        };
        tex.annotations.set_partial(
            [dirty.x as usize, dirty.y as usize],
            ImageData::Color(Arc::new(region)),
            TextureOptions::LINEAR,
        );
    }

    // -- Rendering ---------------------------------------------------------

    fn render(&self, ctx: &Context, input: &FrameInput) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(BACKGROUND))
            .show(ctx, |ui| {
                let Some(tex) = &self.textures else { return };
                let painter = ui.painter();

                let image_size = Vec2::new(self.frame.width as f32, self.frame.height as f32);
                let dest = Rect::from_min_size(
                    self.viewport.image_to_screen(Pos2::ZERO),
                    image_size * self.viewport.zoom,
                );
                let uv_full = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));

                if let Some(sel) = self.selection.rect() {
                    // Darkened backdrop with a bright window over the
                    // selected region.
                    painter.image(tex.darkened.id(), dest, uv_full, Color32::WHITE);
                    painter.image(tex.original.id(), sel, self.uv_of_rect(sel), Color32::WHITE);
                } else if input.alt {
                    painter.image(tex.original.id(), dest, uv_full, Color32::WHITE);
                } else {
                    painter.image(tex.darkened.id(), dest, uv_full, Color32::WHITE);
                    painter.add(self.spotlight_mesh(
                        &tex.original,
                        input.pointer,
                        self.viewport.focus_radius,
                    ));
                }

                // Annotation layer rides on top of whichever base is shown.
                painter.image(tex.annotations.id(), dest, uv_full, Color32::WHITE);

                if let Some(sel) = self.selection.rect() {
                    painter.rect_stroke(sel, Rounding::ZERO, Stroke::new(1.5, SELECTION_STROKE));
                    for corner in [
                        sel.left_top(),
                        sel.right_top(),
                        sel.left_bottom(),
                        sel.right_bottom(),
                    ] {
                        painter.circle_filled(corner, HANDLE_DRAW_RADIUS, Color32::WHITE);
                        painter.circle_stroke(
                            corner,
                            HANDLE_DRAW_RADIUS,
                            Stroke::new(1.5, SELECTION_STROKE),
                        );
                    }
                }

                if self.picker.is_open() {
                    self.draw_picker(painter, input.pointer);
                }
            });
    }

    /// UV rectangle of a screen-space rect, i.e. where the bright texture
    /// must be sampled so the selection window lines up with the backdrop.
    fn uv_of_rect(&self, rect: Rect) -> Rect {
        let min = self.viewport.screen_to_image(rect.min);
        let max = self.viewport.screen_to_image(rect.max);
        let w = self.frame.width as f32;
        let h = self.frame.height as f32;
        Rect::from_min_max(
            Pos2::new(min.x / w, min.y / h),
            Pos2::new(max.x / w, max.y / h),
        )
    }

    /// Triangle-fan circle textured with the bright capture: the spotlight
    /// that follows the cursor over the darkened backdrop.
    fn spotlight_mesh(&self, tex: &TextureHandle, center: Pos2, radius: f32) -> Mesh {
        let w = self.frame.width as f32;
        let h = self.frame.height as f32;
        let uv_of = |p: Pos2| {
            let ip = self.viewport.screen_to_image(p);
            Pos2::new(ip.x / w, ip.y / h)
        };

        let mut mesh = Mesh::with_texture(tex.id());
        mesh.vertices.push(Vertex {
            pos: center,
            uv: uv_of(center),
            color: Color32::WHITE,
        });
        for i in 0..=SPOTLIGHT_SEGMENTS {
            let angle = i as f32 / SPOTLIGHT_SEGMENTS as f32 * std::f32::consts::TAU;
            let pos = center + Vec2::new(angle.cos(), angle.sin()) * radius;
            mesh.vertices.push(Vertex {
                pos,
                uv: uv_of(pos),
                color: Color32::WHITE,
            });
        }
        for i in 0..SPOTLIGHT_SEGMENTS {
            mesh.indices
                .extend_from_slice(&[0, (i + 1) as u32, (i + 2) as u32]);
        }
        mesh
    }

    fn draw_picker(&self, painter: &egui::Painter, pointer: Pos2) {
        painter.rect_filled(self.picker.popup_rect(), Rounding::same(6.0), PICKER_BACKDROP);
        for (i, entry) in PALETTE.iter().enumerate() {
            let tile = self.picker.tile_rect(i);
            let [r, g, b, a] = entry.rgba;
            painter.rect_filled(
                tile,
                Rounding::same(3.0),
                Color32::from_rgba_unmultiplied(r, g, b, a),
            );
            let hovered = tile.contains(pointer);
            let outline = if hovered {
                Stroke::new(2.0, Color32::WHITE)
            } else {
                Stroke::new(1.0, Color32::from_gray(90))
            };
            painter.rect_stroke(tile, Rounding::same(3.0), outline);
        }
    }
}

impl eframe::App for SnapbrushApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.ensure_textures(ctx);

        let input = self.poll(ctx);
        self.route(&input, ctx);

        let crosshair =
            input.alt || self.selection.is_preserved() || self.picker.is_open();
        ctx.set_cursor_icon(if crosshair {
            CursorIcon::Crosshair
        } else {
            CursorIcon::None
        });

        self.render(ctx, &input);
        self.prev_pointer = input.pointer;

        // Cooperative frame loop: keep polling even without input events.
        ctx.request_repaint();
    }
}

fn color_image(img: &image::RgbaImage) -> ColorImage {
    ColorImage::from_rgba_unmultiplied(
        [img.width() as usize, img.height() as usize],
        img.as_raw(),
    )
}
