//! Hi-res colors and nearest-color matching.
//!
//! A lit pixel on its own shows an NTSC artifact color that depends on the
//! byte's palette group (bit 7) and on whether the pixel sits in an even or
//! odd screen column. Two adjacent lit pixels show white, unlit pixels are
//! black. Nothing else can be displayed.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Weighted squared distance, dominated by the luma channels.
    #[inline]
    pub fn distance(self, other: Rgb) -> u32 {
        let dr = self.r.abs_diff(other.r) as u32;
        let dg = self.g.abs_diff(other.g) as u32;
        let db = self.b.abs_diff(other.b) as u32;
        30 * dr * dr + 59 * dg * dg + 11 * db * db
    }
}

pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);
pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);
pub const VIOLET: Rgb = Rgb::new(0xFF, 0x44, 0xFD);
pub const GREEN: Rgb = Rgb::new(0x14, 0xF5, 0x3C);
pub const BLUE: Rgb = Rgb::new(0x14, 0xCF, 0xFD);
pub const ORANGE: Rgb = Rgb::new(0xFF, 0x6A, 0x3C);

/// Color set selected by bit 7 of a packed byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PaletteGroup {
    VioletGreen,
    BlueOrange,
}

impl PaletteGroup {
    /// Encoder trial order; earlier groups win ties.
    pub const ALL: [PaletteGroup; 2] = [PaletteGroup::VioletGreen, PaletteGroup::BlueOrange];

    #[inline(always)]
    pub fn from_high_bit(bit: bool) -> Self {
        if bit {
            PaletteGroup::BlueOrange
        } else {
            PaletteGroup::VioletGreen
        }
    }

    #[inline(always)]
    pub fn high_bit(self) -> bool {
        self == PaletteGroup::BlueOrange
    }

    /// Color shown by an isolated lit pixel in this group.
    #[inline]
    pub fn color(self, phase: Phase) -> Rgb {
        match (self, phase) {
            (PaletteGroup::VioletGreen, Phase::Even) => VIOLET,
            (PaletteGroup::VioletGreen, Phase::Odd) => GREEN,
            (PaletteGroup::BlueOrange, Phase::Even) => BLUE,
            (PaletteGroup::BlueOrange, Phase::Odd) => ORANGE,
        }
    }
}

/// Parity of a pixel's absolute screen column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    Even,
    Odd,
}

impl Phase {
    #[inline(always)]
    pub fn of_column(x: usize) -> Self {
        if x % 2 == 0 { Phase::Even } else { Phase::Odd }
    }
}

/// Representable colors for one pixel, in tie-break order.
#[inline]
pub fn candidates(group: PaletteGroup, phase: Phase) -> [Rgb; 3] {
    [BLACK, WHITE, group.color(phase)]
}

/// Closest representable color to `target` and its distance.
///
/// Only the three candidates for `(group, phase)` are considered. Equal
/// distances resolve to the candidate listed first, so the result is stable
/// for a given input.
pub fn nearest_color(target: Rgb, group: PaletteGroup, phase: Phase) -> (Rgb, u32) {
    let mut best = (BLACK, target.distance(BLACK));

    for candidate in &candidates(group, phase)[1..] {
        let error = target.distance(*candidate);
        if error < best.1 {
            best = (*candidate, error);
        }
    }

    best
}

/// What a pixel actually shows: black when unlit, white when lit next to
/// another lit pixel, otherwise the group color for its phase.
#[inline]
pub fn displayed(group: PaletteGroup, phase: Phase, lit: bool, neighbour_lit: bool) -> Rgb {
    let [black, white, color] = candidates(group, phase);
    match (lit, neighbour_lit) {
        (false, _) => black,
        (true, true) => white,
        (true, false) => color,
    }
}
