//! Where things live inside the title resource.
//!
//! A [`Layout`] is plain data: the built-in one describes the stock resource,
//! and an edited copy can be loaded from JSON. It is validated once when it
//! is created and then handed to every resolver call.

use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scanline::{BYTES_PER_ROW, PAGE_SIZE, PIXELS_PER_BYTE, ROWS};

pub const BLOB_SIZE: usize = 0x6800;
/// Address the resource is loaded at; file offset 0 maps here.
pub const LOAD_ADDRESS: u16 = 0x2000;

pub const GLYPH_COUNT: usize = 5;
pub const GLYPH_VARIANTS: usize = 4;
pub const GLYPH_COLS: usize = 2;
pub const GLYPH_ROWS: usize = 16;
pub const GLYPH_DATA_SIZE: usize = GLYPH_COLS * GLYPH_ROWS;

// name, start row, rows, byte width, byte offset, description
const FRAMES: [(&str, usize, usize, usize, usize, &str); 6] = [
    ("serpent", 0, 32, 10, 0, "serpent coiling around the title"),
    ("flames", 32, 32, 8, 4, "torch flames either side of the gate"),
    ("banner", 64, 32, 20, 10, "banner unfurling under the title"),
    ("sword", 96, 32, 6, 17, "sword glint"),
    ("orb", 128, 32, 12, 14, "pulsing orb"),
    ("moongate", 160, 32, 16, 12, "moongate opening"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDescriptor {
    pub name: String,
    pub start_row: usize,
    pub row_count: usize,
    /// Width in packed bytes
    pub byte_width: usize,
    /// First byte column within each scanline
    pub byte_offset: usize,
    #[serde(default)]
    pub description: String,
}

impl FrameDescriptor {
    pub fn rows(&self) -> Range<usize> {
        self.start_row..self.start_row.saturating_add(self.row_count)
    }

    pub fn columns(&self) -> Range<usize> {
        self.byte_offset..self.byte_offset.saturating_add(self.byte_width)
    }

    pub fn pixel_width(&self) -> usize {
        self.byte_width.saturating_mul(PIXELS_PER_BYTE)
    }

    /// True if the two frames share any byte of the page.
    pub fn overlaps(&self, other: &FrameDescriptor) -> bool {
        ranges_overlap(&self.rows(), &other.rows()) && ranges_overlap(&self.columns(), &other.columns())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphGeometry {
    /// File offset of the top-level pointer table
    pub table_offset: usize,
    pub count: usize,
    pub variants: usize,
    /// Packed bytes per glyph row
    pub cols: usize,
    pub rows: usize,
    /// File offsets every resolved pointer must stay within
    pub data_start: usize,
    pub data_end: usize,
}

impl GlyphGeometry {
    #[inline]
    pub fn data_size(&self) -> usize {
        self.cols.saturating_mul(self.rows)
    }

    pub fn data_region(&self) -> Range<usize> {
        self.data_start..self.data_end
    }

    pub fn table_range(&self) -> Range<usize> {
        self.table_offset..self.table_offset.saturating_add(self.count.saturating_mul(2))
    }

    /// Bytes in one glyph's table of variant pointers.
    #[inline]
    pub fn variant_table_len(&self) -> usize {
        self.variants.saturating_mul(2)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRegion {
    pub start: usize,
    /// First byte belonging to the next structure
    pub end: usize,
}

impl CrawlRegion {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Points that fit alongside the terminating sentinel.
    pub fn capacity(&self) -> usize {
        self.end.saturating_sub(self.start).saturating_sub(1) / 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub blob_size: usize,
    pub load_address: u16,
    /// File offset of the full-screen title page
    pub title_page: usize,
    /// File offset of the page holding the animation frames
    pub frame_page: usize,
    pub frames: Vec<FrameDescriptor>,
    pub glyphs: GlyphGeometry,
    pub crawl: CrawlRegion,
}

impl Layout {
    pub fn builtin() -> Self {
        let frames = FRAMES
            .iter()
            .map(|&(name, start_row, row_count, byte_width, byte_offset, description)| FrameDescriptor {
                name: name.to_string(),
                start_row,
                row_count,
                byte_width,
                byte_offset,
                description: description.to_string(),
            })
            .collect();

        Self {
            blob_size: BLOB_SIZE,
            load_address: LOAD_ADDRESS,
            title_page: 0x0000,
            frame_page: 0x2000,
            frames,
            glyphs: GlyphGeometry {
                table_offset: 0x4000,
                count: GLYPH_COUNT,
                variants: GLYPH_VARIANTS,
                cols: GLYPH_COLS,
                rows: GLYPH_ROWS,
                data_start: 0x4000,
                data_end: 0x5800,
            },
            crawl: CrawlRegion {
                start: 0x5800,
                end: 0x5A00,
            },
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let layout: Layout = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn frame(&self, name: &str) -> Result<&FrameDescriptor> {
        self.frames
            .iter()
            .find(|frame| frame.name == name)
            .ok_or_else(|| Error::UnknownFrame(name.to_string()))
    }

    /// File offset a pointer refers to, if it is not below the load address.
    #[inline]
    pub fn to_offset(&self, pointer: u16) -> Option<usize> {
        pointer.checked_sub(self.load_address).map(usize::from)
    }

    #[inline]
    pub fn to_pointer(&self, offset: usize) -> Option<u16> {
        u16::try_from(offset).ok()?.checked_add(self.load_address)
    }

    /// Checks every region against the resource and against each other.
    ///
    /// Offsets and sizes come straight from JSON, so all arithmetic here is
    /// checked; an overflow is reported as an invalid layout.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(Error::InvalidLayout(reason));
        let within_blob = |range: &Range<usize>| range.start <= range.end && range.end <= self.blob_size;

        let mut pages = Vec::with_capacity(2);
        for (what, base) in [("title page", self.title_page), ("frame page", self.frame_page)] {
            match span(base, PAGE_SIZE) {
                Some(range) if within_blob(&range) => pages.push((what, range)),
                _ => return invalid(format!("{what} at ${base:04X} does not fit in the resource")),
            }
        }

        for (i, frame) in self.frames.iter().enumerate() {
            if frame.row_count == 0 || frame.byte_width == 0 {
                return invalid(format!("frame '{}' is empty", frame.name));
            }
            let rows = span(frame.start_row, frame.row_count);
            let columns = span(frame.byte_offset, frame.byte_width);
            if !rows.is_some_and(|rows| rows.end <= ROWS) || !columns.is_some_and(|columns| columns.end <= BYTES_PER_ROW) {
                return invalid(format!("frame '{}' extends past the page", frame.name));
            }

            for other in &self.frames[..i] {
                if other.name == frame.name {
                    return invalid(format!("frame '{}' is listed twice", frame.name));
                }
                if other.overlaps(frame) {
                    return invalid(format!("frames '{}' and '{}' overlap", other.name, frame.name));
                }
            }
        }

        let glyphs = &self.glyphs;
        if glyphs.data_start >= glyphs.data_end || !within_blob(&glyphs.data_region()) {
            return invalid("glyph data region does not fit in the resource".to_string());
        }
        let region_len = glyphs.data_end - glyphs.data_start;
        let fits_region = |size: Option<usize>| size.is_some_and(|size| size > 0 && size <= region_len);
        if !fits_region(glyphs.cols.checked_mul(glyphs.rows)) || !fits_region(glyphs.variants.checked_mul(2)) {
            return invalid("glyph geometry is empty or larger than its data region".to_string());
        }
        let table = glyphs.count.checked_mul(2).and_then(|len| span(glyphs.table_offset, len));
        if !table.is_some_and(|table| within_blob(&table)) {
            return invalid("glyph pointer table does not fit in the resource".to_string());
        }

        let crawl = self.crawl.range();
        if crawl.start >= crawl.end || !within_blob(&crawl) {
            return invalid("text crawl region does not fit in the resource".to_string());
        }
        pages.push(("glyph data", glyphs.data_region()));
        for (what, range) in pages {
            if ranges_overlap(&crawl, &range) {
                return invalid(format!("text crawl region overlaps the {what}"));
            }
        }

        Ok(())
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::builtin()
    }
}

/// `start..start + len`, or `None` if the end overflows.
fn span(start: usize, len: usize) -> Option<Range<usize>> {
    start.checked_add(len).map(|end| start..end)
}

fn ranges_overlap(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_layout_is_valid() {
        let layout = Layout::builtin();
        layout.validate().unwrap();
        assert_eq!(layout.frames.len(), 6);
        assert_eq!(layout.glyphs.data_size(), GLYPH_DATA_SIZE);
        assert_eq!(layout.crawl.capacity(), 255);
    }

    #[test]
    fn builtin_frames_are_disjoint() {
        let layout = Layout::builtin();
        for (i, a) in layout.frames.iter().enumerate() {
            for b in &layout.frames[i + 1..] {
                assert!(!a.overlaps(b), "{} overlaps {}", a.name, b.name);
            }
        }

        let rows: usize = layout.frames.iter().map(|frame| frame.row_count).sum();
        assert!(rows <= ROWS);
    }

    #[test]
    fn overlapping_frames_are_rejected() {
        let mut layout = Layout::builtin();
        layout.frames[1].start_row = 20;
        assert!(matches!(layout.validate(), Err(Error::InvalidLayout(_))));

        // same rows, separate byte columns is fine
        let mut layout = Layout::builtin();
        layout.frames[1].start_row = 0;
        layout.frames[1].byte_offset = 30;
        layout.validate().unwrap();
    }

    #[test]
    fn crawl_may_not_run_into_glyph_data() {
        let mut layout = Layout::builtin();
        layout.crawl.start = 0x57F0;
        assert!(layout.validate().is_err());
    }

    #[test]
    fn json_round_trip() {
        let layout = Layout::builtin();
        let json = layout.to_json().unwrap();
        assert_eq!(Layout::from_json(&json).unwrap(), layout);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["frames"][0]["row_count"] = 200.into();
        assert!(Layout::from_json(&value.to_string()).is_err());
    }

    #[test]
    fn huge_offsets_are_invalid_not_overflows() {
        let json = Layout::builtin().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let with = |path: &[&str], n: u64| {
            let mut value = value.clone();
            let mut field = &mut value;
            for key in path {
                field = match key.parse::<usize>() {
                    Ok(index) => &mut field[index],
                    Err(_) => &mut field[*key],
                };
            }
            *field = n.into();
            Layout::from_json(&value.to_string())
        };

        let max = usize::MAX as u64;
        for path in [
            &["title_page"][..],
            &["frame_page"],
            &["frames", "0", "start_row"],
            &["frames", "0", "byte_offset"],
            &["frames", "0", "row_count"],
            &["glyphs", "table_offset"],
            &["glyphs", "count"],
            &["glyphs", "variants"],
            &["glyphs", "cols"],
            &["glyphs", "data_end"],
            &["crawl", "end"],
        ] {
            assert!(matches!(with(path, max), Err(Error::InvalidLayout(_))), "{path:?}");
        }
    }

    #[test]
    fn glyph_blocks_must_fit_their_region() {
        let mut layout = Layout::builtin();
        layout.glyphs.rows = 0x1000;
        assert!(matches!(layout.validate(), Err(Error::InvalidLayout(_))));

        let mut layout = Layout::builtin();
        layout.glyphs.variants = 0;
        assert!(matches!(layout.validate(), Err(Error::InvalidLayout(_))));
    }

    #[test]
    fn pointer_conversion() {
        let layout = Layout::builtin();
        assert_eq!(layout.to_offset(0x6000), Some(0x4000));
        assert_eq!(layout.to_offset(0x1FFF), None);
        assert_eq!(layout.to_pointer(0x4000), Some(0x6000));
        assert_eq!(layout.to_pointer(0xE000), None);
        assert!(layout.frame("orb").is_ok());
        assert!(matches!(layout.frame("kraken"), Err(Error::UnknownFrame(_))));
    }
}
