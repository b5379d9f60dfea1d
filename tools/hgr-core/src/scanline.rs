//! Hi-res scanline addressing.
//!
//! A page is 8KB, but rows are not stored in order. Eight 1KB bands hold
//! `row % 8`, each band is cut into eight 128-byte blocks for `(row / 8) % 8`,
//! and each block stores three 40-byte rows, one from each 64-row third of the
//! screen. The last 8 bytes of every block are never displayed.

/// Size of one hi-res page
pub const PAGE_SIZE: usize = 0x2000;
/// Visible scanlines per page
pub const ROWS: usize = 192;
pub const BYTES_PER_ROW: usize = 40;
pub const PIXELS_PER_BYTE: usize = 7;
/// Visible pixels per scanline
pub const WIDTH: usize = BYTES_PER_ROW * PIXELS_PER_BYTE;

const BAND_SIZE: usize = 0x400;
const BLOCK_SIZE: usize = 0x80;

const fn generate_row_offsets() -> [u16; ROWS] {
    let mut offsets = [0u16; ROWS];

    let mut row = 0;
    while row < ROWS {
        let offset = BAND_SIZE * (row % 8) + BLOCK_SIZE * ((row / 8) % 8) + BYTES_PER_ROW * (row / 64);
        offsets[row] = offset as u16;
        row += 1;
    }

    offsets
}

/// Page-relative offset of every scanline, computed once at compile time.
pub const ROW_OFFSETS: [u16; ROWS] = generate_row_offsets();

/// Byte offset of `row` for a page starting at `page_base`.
///
/// Panics if `row >= ROWS`; callers validate rows before lookup.
#[inline(always)]
pub fn offset_for_row(page_base: usize, row: usize) -> usize {
    assert!(row < ROWS, "scanline {row} is outside the {ROWS}-row page");
    page_base + ROW_OFFSETS[row] as usize
}

/// Inverse of [`offset_for_row`] for a page-relative offset: `(row, byte column)`.
///
/// Returns `None` for screen holes and offsets past the page.
pub fn row_for_offset(offset: usize) -> Option<(usize, usize)> {
    if offset >= PAGE_SIZE {
        return None;
    }

    let band = offset / BAND_SIZE;
    let block = (offset % BAND_SIZE) / BLOCK_SIZE;
    let within = offset % BLOCK_SIZE;

    let third = within / BYTES_PER_ROW;
    if third >= 3 {
        return None;
    }

    Some((third * 64 + block * 8 + band, within % BYTES_PER_ROW))
}

#[inline]
pub fn is_screen_hole(offset: usize) -> bool {
    offset < PAGE_SIZE && row_for_offset(offset).is_none()
}
