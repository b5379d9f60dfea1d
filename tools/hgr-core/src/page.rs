use std::ops::Range;

use log::debug;

use crate::canvas::Canvas;
use crate::error::{checked_range, Error, Result};
use crate::row::{bytes_for_width, decode_row, patch_row, EncodeReport};
use crate::scanline::{offset_for_row, BYTES_PER_ROW, PAGE_SIZE, PIXELS_PER_BYTE, ROWS, WIDTH};

/// One full hi-res page, page-relative addressing.
pub type PackedPage = Box<[u8; PAGE_SIZE]>;

fn check_span(rows: &Range<usize>, columns: &Range<usize>) -> Result<()> {
    if rows.end > ROWS || rows.start > rows.end {
        return Err(Error::OutOfBounds {
            what: "scanline range",
            offset: rows.start,
            len: rows.len(),
            size: ROWS,
        });
    }
    if columns.end > BYTES_PER_ROW || columns.start > columns.end {
        return Err(Error::OutOfBounds {
            what: "byte column range",
            offset: columns.start,
            len: columns.len(),
            size: BYTES_PER_ROW,
        });
    }
    Ok(())
}

/// Decodes the rectangle `rows` x `columns` (byte columns) of the page at
/// `page_base`. Only bytes inside the rectangle are read.
pub fn decode_span(bytes: &[u8], page_base: usize, rows: Range<usize>, columns: Range<usize>) -> Result<Canvas> {
    check_span(&rows, &columns)?;
    checked_range("hi-res page", page_base, PAGE_SIZE, bytes.len())?;

    let mut canvas = Canvas::with_capacity(columns.len() * PIXELS_PER_BYTE, rows.len());
    for row in rows {
        let start = offset_for_row(page_base, row) + columns.start;
        canvas.push_row(&decode_row(&bytes[start..start + columns.len()], columns.start));
    }

    Ok(canvas)
}

/// Encodes `canvas` into the rectangle `rows` x `columns` of the page at
/// `page_base`, leaving every other byte untouched.
///
/// The canvas must have one pixel row per scanline and cover the same number
/// of byte groups as `columns`; a partial last group keeps its unused bits.
pub fn patch_span(
    bytes: &mut [u8],
    page_base: usize,
    rows: Range<usize>,
    columns: Range<usize>,
    canvas: &Canvas,
) -> Result<EncodeReport> {
    check_span(&rows, &columns)?;
    checked_range("hi-res page", page_base, PAGE_SIZE, bytes.len())?;

    if canvas.height() != rows.len() || bytes_for_width(canvas.width()) != columns.len() {
        return Err(Error::DimensionMismatch {
            expected: (columns.len() * PIXELS_PER_BYTE, rows.len()),
            actual: canvas.dimensions(),
        });
    }

    let mut report = EncodeReport::default();
    for (row, pixels) in rows.zip(canvas.rows()) {
        let start = offset_for_row(page_base, row) + columns.start;
        report += patch_row(&mut bytes[start..start + columns.len()], pixels, columns.start);
    }

    Ok(report)
}

/// Decodes the full 280x192 page starting at `page_base`.
pub fn decode_page(bytes: &[u8], page_base: usize) -> Result<Canvas> {
    debug!("decoding page at ${page_base:04X}");
    decode_span(bytes, page_base, 0..ROWS, 0..BYTES_PER_ROW)
}

fn check_page_canvas(canvas: &Canvas) -> Result<()> {
    if canvas.dimensions() != (WIDTH, ROWS) {
        return Err(Error::DimensionMismatch {
            expected: (WIDTH, ROWS),
            actual: canvas.dimensions(),
        });
    }
    Ok(())
}

/// Encodes a 280x192 canvas into a fresh page. Screen holes are zero.
pub fn encode_page(canvas: &Canvas) -> Result<(PackedPage, EncodeReport)> {
    check_page_canvas(canvas)?;

    let mut page: PackedPage = Box::new([0; PAGE_SIZE]);
    let report = patch_span(page.as_mut_slice(), 0, 0..ROWS, 0..BYTES_PER_ROW, canvas)?;

    debug!("encoded page: {} inexact pixels, error {}", report.inexact, report.error);
    Ok((page, report))
}

/// Encodes a 280x192 canvas over the page at `page_base` in place. Screen
/// holes keep whatever they held.
pub fn patch_page(bytes: &mut [u8], page_base: usize, canvas: &Canvas) -> Result<EncodeReport> {
    check_page_canvas(canvas)?;
    patch_span(bytes, page_base, 0..ROWS, 0..BYTES_PER_ROW, canvas)
}
