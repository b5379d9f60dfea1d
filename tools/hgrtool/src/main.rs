mod commands;
mod resource;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use hgr_core::{CrawlPoint, Layout};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hgrtool")]
#[command(version, about = "Apple II hi-res title resource editor", long_about = None)]
struct Cli {
    /// Layout override (JSON); defaults to the built-in layout
    #[arg(long, global = true)]
    layout: Option<PathBuf>,

    /// Log more; repeat for more detail
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the scanline address table
    Rows,

    /// List the animation frames
    Frames,

    /// Print the active layout as JSON
    Layout,

    /// Export or import the full-screen title page
    Page {
        #[command(subcommand)]
        action: PageAction,
    },

    /// Export or import one animation frame
    Frame {
        #[command(subcommand)]
        action: FrameAction,
    },

    /// Show the glyph pointer table
    Glyphs {
        /// Resource file
        resource: PathBuf,

        /// Also write every readable glyph to one PNG sheet
        #[arg(long)]
        sheet: Option<PathBuf>,
    },

    /// Export or import one glyph variant
    Glyph {
        #[command(subcommand)]
        action: GlyphAction,
    },

    /// Inspect or edit the text crawl
    Crawl {
        #[command(subcommand)]
        action: CrawlAction,
    },
}

#[derive(Subcommand)]
enum PageAction {
    Export {
        resource: PathBuf,
        png: PathBuf,
    },
    Import {
        resource: PathBuf,
        png: PathBuf,

        /// Write the edited resource here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum FrameAction {
    Export {
        resource: PathBuf,
        name: String,
        png: PathBuf,
    },
    Import {
        resource: PathBuf,
        name: String,
        png: PathBuf,

        /// Write the edited resource here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum GlyphAction {
    Export {
        resource: PathBuf,
        glyph: usize,
        variant: usize,
        png: PathBuf,
    },
    Import {
        resource: PathBuf,
        glyph: usize,
        variant: usize,
        png: PathBuf,

        /// Write the edited resource here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CrawlAction {
    /// Print every point, top-left origin
    List { resource: PathBuf },

    /// Append a point, or insert it before `--at`
    Add {
        resource: PathBuf,

        #[arg(value_parser = clap::value_parser!(u8).range(1..))]
        x: u8,

        #[arg(value_parser = clap::value_parser!(u8).range(..192))]
        y: u8,

        #[arg(long)]
        at: Option<usize>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    Remove {
        resource: PathBuf,
        index: usize,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    Clear {
        resource: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn load_layout(path: Option<&PathBuf>) -> Result<Layout> {
    match path {
        Some(path) => {
            debug!("loading layout from {}", path.display());
            Layout::load(path).with_context(|| format!("failed to load layout {}", path.display()))
        }
        None => Ok(Layout::builtin()),
    }
}

fn run(cli: Cli) -> Result<()> {
    let layout = load_layout(cli.layout.as_ref())?;
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Rows => commands::list_rows(&mut out),
        Commands::Frames => commands::list_frames(&layout, &mut out),
        Commands::Layout => commands::dump_layout(&layout, &mut out),

        Commands::Page { action } => match action {
            PageAction::Export { resource, png } => commands::export_page(&layout, &resource, &png),
            PageAction::Import { resource, png, output } => {
                commands::import_page(&layout, &resource, &png, output.as_deref()).map(|_| ())
            }
        },

        Commands::Frame { action } => match action {
            FrameAction::Export { resource, name, png } => commands::export_frame(&layout, &resource, &name, &png),
            FrameAction::Import { resource, name, png, output } => {
                commands::import_frame(&layout, &resource, &name, &png, output.as_deref()).map(|_| ())
            }
        },

        Commands::Glyphs { resource, sheet } => commands::list_glyphs(&layout, &resource, sheet.as_deref(), &mut out),

        Commands::Glyph { action } => match action {
            GlyphAction::Export { resource, glyph, variant, png } => {
                commands::export_glyph(&layout, &resource, glyph, variant, &png)
            }
            GlyphAction::Import { resource, glyph, variant, png, output } => {
                commands::import_glyph(&layout, &resource, glyph, variant, &png, output.as_deref()).map(|_| ())
            }
        },

        Commands::Crawl { action } => match action {
            CrawlAction::List { resource } => commands::list_crawl(&layout, &resource, &mut out),
            CrawlAction::Add { resource, x, y, at, output } => {
                commands::add_point(&layout, &resource, CrawlPoint::new(x, y), at, output.as_deref()).map(|_| ())
            }
            CrawlAction::Remove { resource, index, output } => {
                commands::remove_point(&layout, &resource, index, output.as_deref()).map(|_| ())
            }
            CrawlAction::Clear { resource, output } => {
                commands::clear_crawl(&layout, &resource, output.as_deref()).map(|_| ())
            }
        },
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn crawl_coordinates_are_range_checked() {
        assert!(Cli::try_parse_from(["hgrtool", "crawl", "add", "t.bin", "10", "191"]).is_ok());
        assert!(Cli::try_parse_from(["hgrtool", "crawl", "add", "t.bin", "0", "10"]).is_err());
        assert!(Cli::try_parse_from(["hgrtool", "crawl", "add", "t.bin", "10", "192"]).is_err());
    }

    #[test]
    fn global_flags_after_the_subcommand() {
        let cli = Cli::try_parse_from(["hgrtool", "frame", "export", "t.bin", "orb", "orb.png", "-vv", "--layout", "l.json"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.layout, Some(PathBuf::from("l.json")));
    }

    #[test]
    fn layout_override_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");

        let mut layout = Layout::builtin();
        std::fs::write(&path, layout.to_json().unwrap()).unwrap();
        assert_eq!(load_layout(Some(&path)).unwrap(), layout);

        layout.frames[0].byte_width = 41;
        std::fs::write(&path, layout.to_json().unwrap()).unwrap();
        assert!(load_layout(Some(&path)).is_err());
    }
}
