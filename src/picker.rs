// ============================================================================
// ColorPicker — modal palette overlay + named brush colors
// ============================================================================
//
// The palette is the fixed set of 26 named colors the brush understands, both
// from the picker tiles and from the `brush_color` CLI flag. Tiles are laid
// out on a precomputed 6-column grid anchored at the pointer position the
// picker was opened at. While the overlay is open it captures all input.

use egui::{Pos2, Rect, Vec2};

pub const GRID_COLUMNS: usize = 6;
pub const TILE_SIZE: f32 = 26.0;
pub const TILE_GAP: f32 = 4.0;
/// Offset of the first tile from the anchor, so the grid does not open
/// directly under the pointer.
pub const CURSOR_PADDING: Vec2 = Vec2::new(14.0, 14.0);
/// Margin of the popup backdrop around the tile grid.
pub const POPUP_MARGIN: f32 = 8.0;

pub struct PaletteEntry {
    pub name: &'static str,
    pub rgba: [u8; 4],
}

/// Fixed brush palette, read-only at runtime. `blank` is fully transparent,
/// which makes a brush carrying it act as an eraser on the annotation layer.
pub const PALETTE: [PaletteEntry; 26] = [
    PaletteEntry { name: "lightgray", rgba: [200, 200, 200, 255] },
    PaletteEntry { name: "gray", rgba: [130, 130, 130, 255] },
    PaletteEntry { name: "darkgray", rgba: [80, 80, 80, 255] },
    PaletteEntry { name: "yellow", rgba: [253, 249, 0, 255] },
    PaletteEntry { name: "gold", rgba: [255, 203, 0, 255] },
    PaletteEntry { name: "orange", rgba: [255, 161, 0, 255] },
    PaletteEntry { name: "pink", rgba: [255, 109, 194, 255] },
    PaletteEntry { name: "red", rgba: [230, 41, 55, 255] },
    PaletteEntry { name: "maroon", rgba: [190, 33, 55, 255] },
    PaletteEntry { name: "green", rgba: [0, 228, 48, 255] },
    PaletteEntry { name: "lime", rgba: [0, 158, 47, 255] },
    PaletteEntry { name: "darkgreen", rgba: [0, 117, 44, 255] },
    PaletteEntry { name: "skyblue", rgba: [102, 191, 255, 255] },
    PaletteEntry { name: "blue", rgba: [0, 121, 241, 255] },
    PaletteEntry { name: "darkblue", rgba: [0, 82, 172, 255] },
    PaletteEntry { name: "purple", rgba: [200, 122, 255, 255] },
    PaletteEntry { name: "violet", rgba: [135, 60, 190, 255] },
    PaletteEntry { name: "darkpurple", rgba: [112, 31, 126, 255] },
    PaletteEntry { name: "beige", rgba: [211, 176, 131, 255] },
    PaletteEntry { name: "brown", rgba: [127, 106, 79, 255] },
    PaletteEntry { name: "darkbrown", rgba: [76, 63, 47, 255] },
    PaletteEntry { name: "white", rgba: [255, 255, 255, 255] },
    PaletteEntry { name: "black", rgba: [0, 0, 0, 255] },
    PaletteEntry { name: "blank", rgba: [0, 0, 0, 0] },
    PaletteEntry { name: "magenta", rgba: [255, 0, 255, 255] },
    PaletteEntry { name: "raywhite", rgba: [245, 245, 245, 255] },
];

/// Case-insensitive palette lookup, used by the CLI `brush_color` flag.
pub fn color_by_name(name: &str) -> Option<[u8; 4]> {
    PALETTE
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(name))
        .map(|entry| entry.rgba)
}

/// Comma-separated palette names for usage/diagnostic text.
pub fn palette_names() -> String {
    PALETTE
        .iter()
        .map(|entry| entry.name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Default)]
pub struct ColorPicker {
    open: bool,
    anchor: Pos2,
}

impl ColorPicker {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open_at(&mut self, anchor: Pos2) {
        self.open = true;
        self.anchor = anchor;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Screen rectangle of tile `index` on the 6-column grid.
    pub fn tile_rect(&self, index: usize) -> Rect {
        let col = (index % GRID_COLUMNS) as f32;
        let row = (index / GRID_COLUMNS) as f32;
        let min = self.anchor
            + CURSOR_PADDING
            + Vec2::new(col * (TILE_SIZE + TILE_GAP), row * (TILE_SIZE + TILE_GAP));
        Rect::from_min_size(min, Vec2::splat(TILE_SIZE))
    }

    /// Backdrop rectangle behind the whole grid.
    pub fn popup_rect(&self) -> Rect {
        let first = self.tile_rect(0);
        let last = self.tile_rect(PALETTE.len() - 1);
        // The last row may be partial; the widest row still ends at column 5.
        let right_col = self.tile_rect(GRID_COLUMNS - 1);
        Rect::from_min_max(first.min, Pos2::new(right_col.max.x, last.max.y))
            .expand(POPUP_MARGIN)
    }

    /// First tile containing `p`, scanned in palette order.
    pub fn hit_test(&self, p: Pos2) -> Option<usize> {
        (0..PALETTE.len()).find(|&i| self.tile_rect(i).contains(p))
    }

    /// A primary click while open: returns the picked color if a tile was
    /// hit. The overlay closes either way.
    pub fn click(&mut self, p: Pos2) -> Option<[u8; 4]> {
        let picked = self.hit_test(p).map(|i| PALETTE[i].rgba);
        self.close();
        picked
    }
}
