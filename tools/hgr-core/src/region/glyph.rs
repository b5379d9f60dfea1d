//! Glyph pointer table.
//!
//! The table at `table_offset` holds one little-endian pointer per glyph.
//! Each of those points at `variants` further pointers, one per orientation,
//! and each of those points at a block of `cols * rows` packed bytes. Slots
//! are allowed to be junk; a pointer that leaves the glyph data region is
//! marked out of range and never followed.

use log::debug;

use crate::canvas::Canvas;
use crate::error::{checked_range, Error, Result};
use crate::layout::{GlyphGeometry, Layout};
use crate::page::PackedPage;
use crate::row::{bytes_for_width, decode_row, patch_row, EncodeReport};
use crate::scanline::{offset_for_row, BYTES_PER_ROW, PAGE_SIZE, PIXELS_PER_BYTE, ROWS};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    /// File offset the pointer refers to
    Resolved(usize),
    OutOfRange,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Slot {
    pub pointer: u16,
    pub status: SlotStatus,
}

impl Slot {
    #[inline]
    pub fn offset(&self) -> Option<usize> {
        match self.status {
            SlotStatus::Resolved(offset) => Some(offset),
            SlotStatus::OutOfRange => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphEntry {
    pub glyph: usize,
    /// Top-level pointer to the variant table
    pub slot: Slot,
    /// Empty when `slot` is out of range
    pub variants: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphTable {
    geometry: GlyphGeometry,
    entries: Vec<GlyphEntry>,
}

/// Checks that `len` bytes at `pointer` sit inside the glyph data region.
fn resolve(layout: &Layout, pointer: u16, len: usize, size: usize) -> SlotStatus {
    let region = layout.glyphs.data_region();
    match layout.to_offset(pointer) {
        Some(offset)
            if offset >= region.start
                && offset.checked_add(len).is_some_and(|end| end <= region.end.min(size)) =>
        {
            SlotStatus::Resolved(offset)
        }
        _ => SlotStatus::OutOfRange,
    }
}

fn pointers(bytes: &[u8]) -> impl Iterator<Item = u16> + '_ {
    bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
}

impl GlyphTable {
    /// Reads and resolves the whole table. Only the top-level table itself
    /// being outside `bytes` is an error; bad pointers are reported per slot.
    pub fn scan(bytes: &[u8], layout: &Layout) -> Result<Self> {
        let geometry = layout.glyphs;
        let table = checked_range(
            "glyph pointer table",
            geometry.table_offset,
            geometry.count.saturating_mul(2),
            bytes.len(),
        )?;
        let variant_table_len = geometry.variant_table_len();

        let entries = pointers(&bytes[table])
            .enumerate()
            .map(|(glyph, pointer)| {
                let status = resolve(layout, pointer, variant_table_len, bytes.len());
                let slot = Slot { pointer, status };

                let variants = match status {
                    SlotStatus::Resolved(offset) => pointers(&bytes[offset..offset + variant_table_len])
                        .enumerate()
                        .map(|(variant, pointer)| {
                            let status = resolve(layout, pointer, geometry.data_size(), bytes.len());
                            if status == SlotStatus::OutOfRange {
                                debug!("glyph {glyph} variant {variant}: ${pointer:04X} is out of range");
                            }
                            Slot { pointer, status }
                        })
                        .collect(),
                    SlotStatus::OutOfRange => {
                        debug!("glyph {glyph}: ${pointer:04X} is out of range");
                        Vec::new()
                    }
                };

                GlyphEntry { glyph, slot, variants }
            })
            .collect();

        Ok(Self { geometry, entries })
    }

    pub fn entries(&self) -> &[GlyphEntry] {
        &self.entries
    }

    pub fn geometry(&self) -> &GlyphGeometry {
        &self.geometry
    }

    /// File offset of the pixel block for `(glyph, variant)`.
    pub fn block_offset(&self, glyph: usize, variant: usize) -> Result<usize> {
        let entry = self.entries.get(glyph).ok_or(Error::NoSuchGlyph { glyph, variant })?;
        if variant >= self.geometry.variants {
            return Err(Error::NoSuchGlyph { glyph, variant });
        }

        // a bad top-level pointer takes all of its variants with it
        let slot = entry.variants.get(variant).unwrap_or(&entry.slot);
        slot.offset().ok_or(Error::GlyphOutOfRange {
            glyph,
            variant,
            pointer: slot.pointer,
        })
    }

    /// Number of variant blocks that can be read.
    pub fn resolved_blocks(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|entry| &entry.variants)
            .filter(|slot| slot.offset().is_some())
            .count()
    }
}

/// Decodes one glyph block: `rows` rows of `cols` packed bytes each.
pub fn decode_block(block: &[u8], geometry: &GlyphGeometry) -> Canvas {
    let mut canvas = Canvas::with_capacity(geometry.cols * PIXELS_PER_BYTE, geometry.rows);
    for row in block.chunks_exact(geometry.cols).take(geometry.rows) {
        canvas.push_row(&decode_row(row, 0));
    }
    canvas
}

pub fn patch_block(block: &mut [u8], geometry: &GlyphGeometry, canvas: &Canvas) -> Result<EncodeReport> {
    if canvas.height() != geometry.rows || bytes_for_width(canvas.width()) != geometry.cols {
        return Err(Error::DimensionMismatch {
            expected: (geometry.cols * PIXELS_PER_BYTE, geometry.rows),
            actual: canvas.dimensions(),
        });
    }

    let mut report = EncodeReport::default();
    for (row, pixels) in block.chunks_exact_mut(geometry.cols).zip(canvas.rows()) {
        report += patch_row(row, pixels, 0);
    }
    Ok(report)
}

/// Lays glyph blocks out on a blank page, one glyph per band of rows and one
/// variant per column, for viewing the whole set at once.
pub fn contact_sheet(bytes: &[u8], table: &GlyphTable) -> PackedPage {
    let geometry = table.geometry;
    let mut page: PackedPage = Box::new([0; PAGE_SIZE]);

    for entry in &table.entries {
        let top = entry.glyph * (geometry.rows + 1);
        for (variant, slot) in entry.variants.iter().enumerate() {
            let left = variant * (geometry.cols + 1);
            let Some(block) = slot.offset().and_then(|offset| bytes.get(offset..offset + geometry.data_size())) else {
                continue;
            };
            if top + geometry.rows > ROWS || left + geometry.cols > BYTES_PER_ROW {
                continue;
            }

            for (y, row) in block.chunks_exact(geometry.cols).enumerate() {
                let start = offset_for_row(0, top + y) + left;
                page[start..start + geometry.cols].copy_from_slice(row);
            }
        }
    }

    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BLOB_SIZE, GLYPH_COUNT, GLYPH_VARIANTS};
    use crate::region::fixtures::blob_with_glyphs;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn well_formed_table_resolves_everything() {
        let layout = Layout::builtin();
        let blob = blob_with_glyphs(&layout);
        let table = GlyphTable::scan(&blob, &layout).unwrap();

        assert_eq!(table.entries().len(), GLYPH_COUNT);
        assert_eq!(table.resolved_blocks(), GLYPH_COUNT * GLYPH_VARIANTS);
        assert!(table.block_offset(GLYPH_COUNT, 0).is_err());
        assert!(matches!(table.block_offset(0, GLYPH_VARIANTS), Err(Error::NoSuchGlyph { .. })));
    }

    #[test]
    fn bad_top_level_pointer_is_reported_not_followed() {
        let layout = Layout::builtin();
        let mut blob = blob_with_glyphs(&layout);
        let slot = layout.glyphs.table_offset + 2 * 2;
        blob[slot..slot + 2].copy_from_slice(&0xFFFFu16.to_le_bytes());

        let table = GlyphTable::scan(&blob, &layout).unwrap();
        let entry = &table.entries()[2];
        assert_eq!(entry.slot.status, SlotStatus::OutOfRange);
        assert!(entry.variants.is_empty());
        assert!(matches!(
            table.block_offset(2, 1),
            Err(Error::GlyphOutOfRange { glyph: 2, variant: 1, pointer: 0xFFFF })
        ));

        // the glyphs after it still resolve
        assert!(table.block_offset(3, 0).is_ok());
        assert_eq!(table.resolved_blocks(), (GLYPH_COUNT - 1) * GLYPH_VARIANTS);
    }

    #[test]
    fn pointers_below_the_load_address_are_out_of_range() {
        let layout = Layout::builtin();
        let mut blob = blob_with_glyphs(&layout);
        let variant_table = layout.glyphs.table_offset + layout.glyphs.count * 2;
        blob[variant_table..variant_table + 2].copy_from_slice(&0x0010u16.to_le_bytes());

        let table = GlyphTable::scan(&blob, &layout).unwrap();
        assert_eq!(table.entries()[0].variants[0].status, SlotStatus::OutOfRange);
        assert_eq!(table.entries()[0].slot.status, SlotStatus::Resolved(variant_table));
    }

    #[test]
    fn random_pointers_never_escape_the_data_region() {
        let layout = Layout::builtin();
        let region = layout.glyphs.data_region();
        let mut rng = StdRng::seed_from_u64(0x6A7E);

        for _ in 0..200 {
            let mut blob = vec![0u8; BLOB_SIZE];
            rng.fill(&mut blob[region.clone()]);

            let table = GlyphTable::scan(&blob, &layout).unwrap();
            for entry in table.entries() {
                let expected = layout
                    .to_offset(entry.slot.pointer)
                    .filter(|&offset| offset >= region.start && offset + GLYPH_VARIANTS * 2 <= region.end);
                assert_eq!(entry.slot.offset(), expected);

                for slot in &entry.variants {
                    match slot.status {
                        SlotStatus::Resolved(offset) => {
                            assert!(offset >= region.start && offset + layout.glyphs.data_size() <= region.end)
                        }
                        SlotStatus::OutOfRange => {
                            let offset = layout.to_offset(slot.pointer);
                            assert!(offset.map_or(true, |offset| offset < region.start
                                || offset + layout.glyphs.data_size() > region.end));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn truncated_buffer_is_an_error() {
        let layout = Layout::builtin();
        let blob = vec![0u8; layout.glyphs.table_offset + 3];
        assert!(matches!(GlyphTable::scan(&blob, &layout), Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn block_round_trip() {
        let layout = Layout::builtin();
        let geometry = layout.glyphs;
        let block: Vec<u8> = (0..geometry.data_size() as u8).map(|i| i.wrapping_mul(29)).collect();

        let canvas = decode_block(&block, &geometry);
        assert_eq!(canvas.dimensions(), (geometry.cols * 7, geometry.rows));

        let mut patched = vec![0u8; geometry.data_size()];
        assert!(patch_block(&mut patched, &geometry, &canvas).unwrap().is_exact());
        assert_eq!(decode_block(&patched, &geometry), canvas);

        let wrong = Canvas::new(geometry.cols * 7, geometry.rows + 1);
        assert!(patch_block(&mut patched, &geometry, &wrong).is_err());
    }

    #[test]
    fn contact_sheet_places_each_variant() {
        let layout = Layout::builtin();
        let blob = blob_with_glyphs(&layout);
        let table = GlyphTable::scan(&blob, &layout).unwrap();
        let page = contact_sheet(&blob, &table);

        let geometry = layout.glyphs;
        let offset = table.block_offset(1, 2).unwrap();
        let start = offset_for_row(0, geometry.rows + 1) + 2 * (geometry.cols + 1);
        assert_eq!(&page[start..start + geometry.cols], &blob[offset..offset + geometry.cols]);
    }
}
