// ============================================================================
// SelectionEngine — rectangle selection + corner-handle resize state machine
// ============================================================================
//
// States: Idle → Selecting → Selected ⇄ Resizing → Idle.
//
// A selection can only be *started* while the entry modifier is held. Corner
// handles are circular hit regions tested before the interior, so a press on
// an edge-adjacent corner always grabs the corner. Releasing the entry
// modifier while the selection is neither resizing nor preserved tears the
// whole selection down.

use egui::{Pos2, Rect, Vec2};

/// Radius of the circular hit region around each corner handle, in screen
/// pixels.
pub const HANDLE_HIT_RADIUS: f32 = 12.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeHandle {
    /// Whole-rectangle drag: both corners translate by the pointer delta.
    Inside,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Idle,
    /// Primary button held after an entry-mode press; `end` tracks the pointer.
    Selecting,
    Selected,
    Resizing(ResizeHandle),
}

pub struct SelectionEngine {
    state: State,
    /// Top-left corner once normalized (arbitrary while `Selecting`).
    start: Pos2,
    end: Pos2,
    /// Keeps the selection alive after the entry modifier is released.
    preserved: bool,
}

impl Default for SelectionEngine {
    fn default() -> Self {
        Self {
            state: State::Idle,
            start: Pos2::ZERO,
            end: Pos2::ZERO,
            preserved: false,
        }
    }
}

impl SelectionEngine {
    pub fn is_active(&self) -> bool {
        self.state != State::Idle
    }

    pub fn is_selecting(&self) -> bool {
        self.state == State::Selecting
    }

    pub fn is_preserved(&self) -> bool {
        self.preserved
    }

    pub fn active_handle(&self) -> Option<ResizeHandle> {
        match self.state {
            State::Resizing(handle) => Some(handle),
            _ => None,
        }
    }

    /// Normalized selection rectangle: non-negative width/height for any drag
    /// direction. `None` while no selection exists.
    pub fn rect(&self) -> Option<Rect> {
        if self.state == State::Idle {
            return None;
        }
        Some(Rect::from_min_max(
            Pos2::new(self.start.x.min(self.end.x), self.start.y.min(self.end.y)),
            Pos2::new(self.start.x.max(self.end.x), self.start.y.max(self.end.y)),
        ))
    }

    /// Entry-mode press while idle: fix `start` and begin tracking.
    pub fn begin(&mut self, pos: Pos2) {
        if self.state == State::Idle {
            self.state = State::Selecting;
            self.start = pos;
            self.end = pos;
        }
    }

    /// Pointer moved while the primary button is held during `Selecting`.
    pub fn track(&mut self, pos: Pos2) {
        if self.state == State::Selecting {
            self.end = pos;
        }
    }

    /// Which handle a press at `p` would grab. Corners are tested first, in a
    /// fixed order, so they win over the interior.
    pub fn hit_test(&self, p: Pos2) -> Option<ResizeHandle> {
        let rect = self.rect()?;
        let corners = [
            (ResizeHandle::TopLeft, rect.left_top()),
            (ResizeHandle::TopRight, rect.right_top()),
            (ResizeHandle::BottomLeft, rect.left_bottom()),
            (ResizeHandle::BottomRight, rect.right_bottom()),
        ];
        for (handle, corner) in corners {
            if corner.distance(p) <= HANDLE_HIT_RADIUS {
                return Some(handle);
            }
        }
        if rect.contains(p) {
            return Some(ResizeHandle::Inside);
        }
        None
    }

    /// Primary press while `Selected`: grab a corner handle, or the interior
    /// when the entry modifier is held. Presses outside the rectangle are
    /// ignored.
    pub fn press(&mut self, p: Pos2, entry_down: bool) {
        if self.state != State::Selected {
            return;
        }
        match self.hit_test(p) {
            Some(ResizeHandle::Inside) if entry_down => {
                self.state = State::Resizing(ResizeHandle::Inside);
            }
            Some(handle) if handle != ResizeHandle::Inside => {
                self.state = State::Resizing(handle);
            }
            _ => {}
        }
    }

    /// Per-frame resize update. Corner drags move that corner's coordinates;
    /// the x move is rejected when it would cross the opposite vertical edge,
    /// while y is always accepted (the normalized rect absorbs a y flip).
    pub fn resize(&mut self, pointer: Pos2, delta: Vec2) {
        let State::Resizing(handle) = self.state else {
            return;
        };
        match handle {
            ResizeHandle::Inside => {
                self.start += delta;
                self.end += delta;
            }
            ResizeHandle::TopLeft => {
                if pointer.x < self.end.x {
                    self.start.x = pointer.x;
                }
                self.start.y = pointer.y;
            }
            ResizeHandle::TopRight => {
                if pointer.x > self.start.x {
                    self.end.x = pointer.x;
                }
                self.start.y = pointer.y;
            }
            ResizeHandle::BottomLeft => {
                if pointer.x < self.end.x {
                    self.start.x = pointer.x;
                }
                self.end.y = pointer.y;
            }
            ResizeHandle::BottomRight => {
                if pointer.x > self.start.x {
                    self.end.x = pointer.x;
                }
                self.end.y = pointer.y;
            }
        }
    }

    /// Primary button released: finish the initial drag or the active resize.
    /// Corners are renormalized so `start` is the top-left again.
    pub fn release(&mut self) {
        match self.state {
            State::Selecting | State::Resizing(_) => {
                self.normalize();
                self.state = State::Selected;
            }
            _ => {}
        }
    }

    /// Secondary click during a selection: keep it alive after the entry
    /// modifier is released.
    pub fn preserve(&mut self) {
        if self.is_active() {
            self.preserved = true;
        }
    }

    /// The entry modifier went up. Tears the selection down unless it is
    /// preserved or mid-resize.
    pub fn entry_released(&mut self) {
        if self.is_active() && !self.preserved && self.active_handle().is_none() {
            self.teardown();
        }
    }

    /// Destroy the selection entirely (escape, mode exit, post-export).
    pub fn teardown(&mut self) {
        self.state = State::Idle;
        self.start = Pos2::ZERO;
        self.end = Pos2::ZERO;
        self.preserved = false;
    }

    fn normalize(&mut self) {
        let min = Pos2::new(self.start.x.min(self.end.x), self.start.y.min(self.end.y));
        let max = Pos2::new(self.start.x.max(self.end.x), self.start.y.max(self.end.y));
        self.start = min;
        self.end = max;
    }
}
