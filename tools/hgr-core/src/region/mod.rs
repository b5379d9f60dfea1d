//! Named structures inside the title resource.
//!
//! [`Resolver::view`] hands out a read-only [`RegionHandle`] over `&[u8]`,
//! [`Resolver::edit`] one over `&mut [u8]`. Both decode the same structures;
//! only the mutable one can patch them back, and it records what it touched.

pub mod crawl;
pub mod glyph;

use std::ops::{Deref, DerefMut};

use log::debug;

use crate::canvas::Canvas;
use crate::error::{checked_range, Error, Result};
use crate::layout::Layout;
use crate::page::{decode_page, decode_span, patch_page, patch_span, PackedPage};
use crate::row::EncodeReport;
use crate::region::crawl::TextCrawl;
use crate::region::glyph::{contact_sheet, decode_block, patch_block, GlyphTable};

/// Structures modified through an editable handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dirty {
    TitlePage,
    Frame(String),
    Glyph { glyph: usize, variant: usize },
    TextCrawl,
}

#[derive(Debug, Copy, Clone)]
pub struct Resolver<'l> {
    layout: &'l Layout,
}

impl<'l> Resolver<'l> {
    pub fn new(layout: &'l Layout) -> Self {
        Self { layout }
    }

    pub fn view<'b>(&self, blob: &'b [u8]) -> Result<RegionHandle<'l, &'b [u8]>> {
        RegionHandle::new(self.layout, blob)
    }

    pub fn edit<'b>(&self, blob: &'b mut [u8]) -> Result<RegionHandle<'l, &'b mut [u8]>> {
        RegionHandle::new(self.layout, blob)
    }
}

pub type RegionView<'l, 'b> = RegionHandle<'l, &'b [u8]>;
pub type RegionEditor<'l, 'b> = RegionHandle<'l, &'b mut [u8]>;

#[derive(Debug)]
pub struct RegionHandle<'l, B> {
    layout: &'l Layout,
    blob: B,
    dirty: Vec<Dirty>,
}

impl<'l, B: Deref<Target = [u8]>> RegionHandle<'l, B> {
    /// Validates `layout` and checks `blob` is the size it expects.
    pub fn new(layout: &'l Layout, blob: B) -> Result<Self> {
        layout.validate()?;
        if blob.len() != layout.blob_size {
            return Err(Error::BlobSize {
                expected: layout.blob_size,
                actual: blob.len(),
            });
        }

        Ok(Self {
            layout,
            blob,
            dirty: Vec::new(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.blob
    }

    pub fn title_page(&self) -> Result<Canvas> {
        decode_page(&self.blob, self.layout.title_page)
    }

    pub fn frame(&self, name: &str) -> Result<Canvas> {
        let frame = self.layout.frame(name)?;
        debug!("extracting frame '{}' rows {:?} bytes {:?}", frame.name, frame.rows(), frame.columns());
        decode_span(&self.blob, self.layout.frame_page, frame.rows(), frame.columns())
    }

    pub fn glyph_table(&self) -> Result<GlyphTable> {
        GlyphTable::scan(&self.blob, self.layout)
    }

    pub fn glyph(&self, glyph: usize, variant: usize) -> Result<Canvas> {
        let geometry = &self.layout.glyphs;
        let offset = self.glyph_table()?.block_offset(glyph, variant)?;
        let block = checked_range("glyph block", offset, geometry.data_size(), self.blob.len())?;
        Ok(decode_block(&self.blob[block], geometry))
    }

    /// Every resolvable glyph variant laid out on one page.
    pub fn glyph_sheet(&self) -> Result<PackedPage> {
        Ok(contact_sheet(&self.blob, &self.glyph_table()?))
    }

    pub fn text_crawl(&self) -> Result<TextCrawl> {
        let crawl = self.layout.crawl.range();
        let region = checked_range("text crawl", crawl.start, crawl.len(), self.blob.len())?;
        TextCrawl::parse(&self.blob[region])
    }
}

impl<'l, B: DerefMut<Target = [u8]>> RegionHandle<'l, B> {
    fn mark(&mut self, dirty: Dirty) {
        if !self.dirty.contains(&dirty) {
            self.dirty.push(dirty);
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Structures patched since the handle was created or last drained.
    pub fn dirty(&self) -> &[Dirty] {
        &self.dirty
    }

    pub fn take_dirty(&mut self) -> Vec<Dirty> {
        std::mem::take(&mut self.dirty)
    }

    pub fn patch_title_page(&mut self, canvas: &Canvas) -> Result<EncodeReport> {
        let report = patch_page(&mut self.blob, self.layout.title_page, canvas)?;
        self.mark(Dirty::TitlePage);
        Ok(report)
    }

    /// Encodes `canvas` over one frame; the rest of the page is untouched.
    pub fn patch_frame(&mut self, name: &str, canvas: &Canvas) -> Result<EncodeReport> {
        let layout = self.layout;
        let frame = layout.frame(name)?;

        let report = patch_span(&mut self.blob, layout.frame_page, frame.rows(), frame.columns(), canvas)?;
        debug!("patched frame '{}': {} inexact pixels", frame.name, report.inexact);

        self.mark(Dirty::Frame(frame.name.clone()));
        Ok(report)
    }

    pub fn patch_glyph(&mut self, glyph: usize, variant: usize, canvas: &Canvas) -> Result<EncodeReport> {
        let layout = self.layout;
        let offset = self.glyph_table()?.block_offset(glyph, variant)?;
        let block = checked_range("glyph block", offset, layout.glyphs.data_size(), self.blob.len())?;

        let report = patch_block(&mut self.blob[block], &layout.glyphs, canvas)?;
        self.mark(Dirty::Glyph { glyph, variant });
        Ok(report)
    }

    /// Rewrites the crawl region. Returns the number of bytes written.
    pub fn patch_text_crawl(&mut self, crawl: &TextCrawl) -> Result<usize> {
        let region = self.layout.crawl.range();
        let region = checked_range("text crawl", region.start, region.len(), self.blob.len())?;

        let written = crawl.write_into(&mut self.blob[region])?;
        self.mark(Dirty::TextCrawl);
        Ok(written)
    }
}
