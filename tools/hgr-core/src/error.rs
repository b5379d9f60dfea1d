use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{what} at offset ${offset:04X} (+{len}) lies outside a {size}-byte buffer")]
    OutOfBounds {
        what: &'static str,
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("serialized size {needed} exceeds region capacity of {capacity} bytes")]
    CapacityExceeded { needed: usize, capacity: usize },

    #[error("glyph {glyph} variant {variant} points at ${pointer:04X}, outside the glyph data region")]
    GlyphOutOfRange {
        glyph: usize,
        variant: usize,
        pointer: u16,
    },

    #[error("no glyph {glyph} variant {variant} in this table")]
    NoSuchGlyph { glyph: usize, variant: usize },

    #[error("unknown frame '{0}'")]
    UnknownFrame(String),

    #[error("expected a {}x{} canvas, got {}x{}", expected.0, expected.1, actual.0, actual.1)]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("a {width}x{height} canvas needs {expected} pixels, got {actual}")]
    PixelCount {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("a {width}x{height} canvas is too large for an image")]
    RasterTooLarge { width: usize, height: usize },

    #[error("crawl point {index} ({x}, {y}) cannot be stored")]
    InvalidPoint { index: usize, x: u8, y: u8 },

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("resource is {actual} bytes, layout expects {expected}")]
    BlobSize { expected: usize, actual: usize },

    #[error(transparent)]
    Raster(#[from] image::ImageError),

    #[error(transparent)]
    Layout(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Bounds-checks `offset..offset + len` against a buffer of `size` bytes.
pub(crate) fn checked_range(
    what: &'static str,
    offset: usize,
    len: usize,
    size: usize,
) -> Result<std::ops::Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(offset..end),
        _ => Err(Error::OutOfBounds {
            what,
            offset,
            len,
            size,
        }),
    }
}
