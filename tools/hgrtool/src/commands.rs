use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use hgr_core::page::decode_page;
use hgr_core::raster::{read_raster, write_raster};
use hgr_core::region::glyph::SlotStatus;
use hgr_core::region::RegionEditor;
use hgr_core::scanline::{offset_for_row, ROWS};
use hgr_core::{Canvas, CrawlPoint, EncodeReport, Layout, Resolver, TextCrawl};
use tracing::{info, warn};

use crate::resource::ResourceFile;

pub fn list_rows(out: &mut impl Write) -> Result<()> {
    for row in 0..ROWS {
        writeln!(out, "{row:3}  ${:04X}", offset_for_row(0, row))?;
    }
    Ok(())
}

pub fn list_frames(layout: &Layout, out: &mut impl Write) -> Result<()> {
    for frame in &layout.frames {
        writeln!(
            out,
            "{:<10} rows {:3}..{:<3} bytes {:2}..{:<2} {:3}x{:<3} {}",
            frame.name,
            frame.rows().start,
            frame.rows().end,
            frame.columns().start,
            frame.columns().end,
            frame.pixel_width(),
            frame.row_count,
            frame.description,
        )?;
    }
    Ok(())
}

pub fn dump_layout(layout: &Layout, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", layout.to_json()?)?;
    Ok(())
}

fn open_view<'l>(layout: &'l Layout, resource: &Path) -> Result<(ResourceFile, Resolver<'l>)> {
    let file = ResourceFile::open(resource)?;
    let resolver = Resolver::new(layout);
    // size check up front, so every command reports a mismatch the same way
    resolver
        .view(file.bytes())
        .with_context(|| format!("{} does not match the layout", resource.display()))?;
    Ok((file, resolver))
}

fn export(canvas: &Canvas, output: &Path, what: &str) -> Result<()> {
    write_raster(canvas, output).with_context(|| format!("failed to write {}", output.display()))?;
    info!("exported {what} ({}x{}) to {}", canvas.width(), canvas.height(), output.display());
    Ok(())
}

fn log_report(what: &str, report: &EncodeReport) {
    if report.is_exact() {
        info!("{what}: every pixel encoded exactly");
    } else {
        warn!(
            "{what}: {} pixels moved to the nearest displayable color (total error {})",
            report.inexact, report.error
        );
    }
}

/// Reads `input`, patches it into the resource and saves the result.
fn import_with(
    layout: &Layout,
    resource: &Path,
    input: &Path,
    output: Option<&Path>,
    what: &str,
    patch: impl FnOnce(&mut RegionEditor<'_, '_>, &Canvas) -> hgr_core::Result<EncodeReport>,
) -> Result<EncodeReport> {
    let canvas = read_raster(input).with_context(|| format!("failed to read {}", input.display()))?;
    let mut file = ResourceFile::open(resource)?;

    let mut editor = Resolver::new(layout)
        .edit(file.bytes_mut())
        .with_context(|| format!("{} does not match the layout", resource.display()))?;
    let report = patch(&mut editor, &canvas).with_context(|| format!("failed to import {what}"))?;
    log_report(what, &report);

    let dirty = editor.take_dirty();
    let saved = file.save(output)?;
    info!("updated {dirty:?} in {}", saved.display());

    Ok(report)
}

pub fn export_page(layout: &Layout, resource: &Path, output: &Path) -> Result<()> {
    let (file, resolver) = open_view(layout, resource)?;
    let canvas = resolver.view(file.bytes())?.title_page()?;
    export(&canvas, output, "title page")
}

pub fn import_page(layout: &Layout, resource: &Path, input: &Path, output: Option<&Path>) -> Result<EncodeReport> {
    import_with(layout, resource, input, output, "title page", |editor, canvas| {
        editor.patch_title_page(canvas)
    })
}

pub fn export_frame(layout: &Layout, resource: &Path, name: &str, output: &Path) -> Result<()> {
    let (file, resolver) = open_view(layout, resource)?;
    let canvas = resolver.view(file.bytes())?.frame(name)?;
    export(&canvas, output, &format!("frame '{name}'"))
}

pub fn import_frame(
    layout: &Layout,
    resource: &Path,
    name: &str,
    input: &Path,
    output: Option<&Path>,
) -> Result<EncodeReport> {
    import_with(layout, resource, input, output, &format!("frame '{name}'"), |editor, canvas| {
        editor.patch_frame(name, canvas)
    })
}

/// Prints the glyph pointer table, optionally exporting every variant on one sheet.
pub fn list_glyphs(layout: &Layout, resource: &Path, sheet: Option<&Path>, out: &mut impl Write) -> Result<()> {
    let (file, resolver) = open_view(layout, resource)?;
    let view = resolver.view(file.bytes())?;
    let table = view.glyph_table()?;

    let describe = |status: SlotStatus| match status {
        SlotStatus::Resolved(offset) => format!("-> +{offset:04X}"),
        SlotStatus::OutOfRange => "out of range".to_string(),
    };

    for entry in table.entries() {
        writeln!(out, "glyph {}: ${:04X} {}", entry.glyph, entry.slot.pointer, describe(entry.slot.status))?;
        for (variant, slot) in entry.variants.iter().enumerate() {
            writeln!(out, "  variant {variant}: ${:04X} {}", slot.pointer, describe(slot.status))?;
        }
    }
    writeln!(
        out,
        "{} of {} blocks readable",
        table.resolved_blocks(),
        table.geometry().count * table.geometry().variants
    )?;

    if let Some(sheet) = sheet {
        let page = view.glyph_sheet()?;
        export(&decode_page(page.as_slice(), 0)?, sheet, "glyph sheet")?;
    }
    Ok(())
}

pub fn export_glyph(layout: &Layout, resource: &Path, glyph: usize, variant: usize, output: &Path) -> Result<()> {
    let (file, resolver) = open_view(layout, resource)?;
    let canvas = resolver.view(file.bytes())?.glyph(glyph, variant)?;
    export(&canvas, output, &format!("glyph {glyph}/{variant}"))
}

pub fn import_glyph(
    layout: &Layout,
    resource: &Path,
    glyph: usize,
    variant: usize,
    input: &Path,
    output: Option<&Path>,
) -> Result<EncodeReport> {
    import_with(layout, resource, input, output, &format!("glyph {glyph}/{variant}"), |editor, canvas| {
        editor.patch_glyph(glyph, variant, canvas)
    })
}

pub fn list_crawl(layout: &Layout, resource: &Path, out: &mut impl Write) -> Result<()> {
    let (file, resolver) = open_view(layout, resource)?;
    let crawl = resolver.view(file.bytes())?.text_crawl()?;

    for (index, point) in crawl.points().iter().enumerate() {
        writeln!(out, "{index:3}: ({:3}, {:3})", point.x, point.y)?;
    }
    writeln!(out, "{} of {} points", crawl.len(), layout.crawl.capacity())?;
    Ok(())
}

/// Loads the crawl, applies `edit` and writes it back.
pub fn edit_crawl(
    layout: &Layout,
    resource: &Path,
    output: Option<&Path>,
    edit: impl FnOnce(&mut TextCrawl) -> Result<()>,
) -> Result<TextCrawl> {
    let mut file = ResourceFile::open(resource)?;
    let mut editor = Resolver::new(layout)
        .edit(file.bytes_mut())
        .with_context(|| format!("{} does not match the layout", resource.display()))?;

    let mut crawl = editor.text_crawl()?;
    edit(&mut crawl)?;
    let written = editor.patch_text_crawl(&crawl).context("failed to store the text crawl")?;
    info!("text crawl now holds {} points ({written} bytes)", crawl.len());

    file.save(output)?;
    Ok(crawl)
}

pub fn add_point(
    layout: &Layout,
    resource: &Path,
    point: CrawlPoint,
    at: Option<usize>,
    output: Option<&Path>,
) -> Result<TextCrawl> {
    edit_crawl(layout, resource, output, |crawl| {
        match at {
            Some(index) => crawl.insert(index, point),
            None => crawl.push(point),
        }
        Ok(())
    })
}

pub fn remove_point(layout: &Layout, resource: &Path, index: usize, output: Option<&Path>) -> Result<TextCrawl> {
    edit_crawl(layout, resource, output, |crawl| {
        let len = crawl.len();
        crawl
            .remove(index)
            .map(|_| ())
            .ok_or_else(|| anyhow!("no point {index}, the crawl has {len} points"))
    })
}

pub fn clear_crawl(layout: &Layout, resource: &Path, output: Option<&Path>) -> Result<TextCrawl> {
    edit_crawl(layout, resource, output, |crawl| {
        crawl.clear();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hgr_core::palette::{BLUE, WHITE};
    use std::fs;
    use tempfile::TempDir;

    fn blank_resource(layout: &Layout) -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("title.bin");
        fs::write(&path, vec![0u8; layout.blob_size]).unwrap();
        (dir, path)
    }

    #[test]
    fn frame_import_then_export() {
        let layout = Layout::builtin();
        let (dir, resource) = blank_resource(&layout);
        let flames = layout.frame("flames").unwrap();

        let mut canvas = Canvas::new(flames.pixel_width(), flames.row_count);
        canvas.set(4, 3, WHITE);
        canvas.set(5, 3, WHITE);
        canvas.set(2, 9, BLUE);
        let input = dir.path().join("flames.png");
        write_raster(&canvas, &input).unwrap();

        let report = import_frame(&layout, &resource, "flames", &input, None).unwrap();
        assert!(report.is_exact());

        let exported = dir.path().join("out.png");
        export_frame(&layout, &resource, "flames", &exported).unwrap();
        assert_eq!(read_raster(&exported).unwrap(), canvas);
    }

    #[test]
    fn import_to_a_separate_output_keeps_the_source() {
        let layout = Layout::builtin();
        let (dir, resource) = blank_resource(&layout);

        let mut canvas = Canvas::new(280, 192);
        canvas.set(100, 100, WHITE);
        canvas.set(101, 100, WHITE);
        let input = dir.path().join("title.png");
        write_raster(&canvas, &input).unwrap();

        let copy = dir.path().join("edited.bin");
        import_page(&layout, &resource, &input, Some(&copy)).unwrap();

        assert!(fs::read(&resource).unwrap().iter().all(|&b| b == 0));
        assert!(fs::read(&copy).unwrap().iter().any(|&b| b != 0));
    }

    #[test]
    fn wrong_sized_frame_is_rejected() {
        let layout = Layout::builtin();
        let (dir, resource) = blank_resource(&layout);
        let input = dir.path().join("small.png");
        write_raster(&Canvas::new(7, 7), &input).unwrap();

        let error = import_frame(&layout, &resource, "orb", &input, None).unwrap_err();
        assert!(format!("{error:#}").contains("frame 'orb'"));
        assert!(fs::read(&resource).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn crawl_editing_round_trip() {
        let layout = Layout::builtin();
        let (_dir, resource) = blank_resource(&layout);

        add_point(&layout, &resource, CrawlPoint::new(100, 59), None, None).unwrap();
        add_point(&layout, &resource, CrawlPoint::new(140, 91), None, None).unwrap();
        let crawl = add_point(&layout, &resource, CrawlPoint::new(20, 10), Some(0), None).unwrap();
        assert_eq!(crawl.points()[0], CrawlPoint::new(20, 10));

        let bytes = fs::read(&resource).unwrap();
        let start = layout.crawl.start;
        assert_eq!(&bytes[start..start + 7], &[20, 181, 100, 132, 140, 100, 0x00]);

        assert!(remove_point(&layout, &resource, 5, None).is_err());
        let crawl = remove_point(&layout, &resource, 0, None).unwrap();
        assert_eq!(crawl.len(), 2);

        let mut listing = Vec::new();
        list_crawl(&layout, &resource, &mut listing).unwrap();
        let listing = String::from_utf8(listing).unwrap();
        assert!(listing.contains("(100,  59)"));
        assert!(listing.ends_with("2 of 255 points\n"));

        assert!(clear_crawl(&layout, &resource, None).unwrap().is_empty());
    }

    #[test]
    fn glyph_listing_flags_bad_pointers() {
        let layout = Layout::builtin();
        let (dir, resource) = blank_resource(&layout);

        let sheet = dir.path().join("sheet.png");
        let mut listing = Vec::new();
        list_glyphs(&layout, &resource, Some(&sheet), &mut listing).unwrap();

        // a zeroed table points below the load address everywhere
        let listing = String::from_utf8(listing).unwrap();
        assert!(listing.contains("glyph 0: $0000 out of range"));
        assert!(listing.contains("0 of 20 blocks readable"));
        assert_eq!(read_raster(&sheet).unwrap().dimensions(), (280, 192));

        assert!(export_glyph(&layout, &resource, 0, 0, &dir.path().join("g.png")).is_err());
    }

    #[test]
    fn short_resource_is_reported() {
        let layout = Layout::builtin();
        let dir = tempfile::tempdir().unwrap();
        let resource = dir.path().join("short.bin");
        fs::write(&resource, [0u8; 16]).unwrap();

        let error = export_page(&layout, &resource, &dir.path().join("p.png")).unwrap_err();
        assert!(format!("{error:#}").contains("does not match the layout"));
    }

    #[test]
    fn static_listings() {
        let layout = Layout::builtin();
        let mut out = Vec::new();
        list_rows(&mut out).unwrap();
        list_frames(&layout, &mut out).unwrap();
        dump_layout(&layout, &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("  0  $0000\n  1  $0400\n"));
        assert!(out.contains("moongate"));
        assert!(out.contains("\"blob_size\""));
    }
}
