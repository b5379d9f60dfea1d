//! Apple II hi-res graphics codec and title resource editing.
//!
//! The low layers ([`scanline`], [`palette`], [`row`], [`page`]) convert
//! between packed hi-res bytes and RGB [`Canvas`]es. [`layout`] says where
//! the named structures of a title resource live, and [`region`] reads and
//! patches them in a loaded buffer.

pub mod canvas;
pub mod error;
pub mod layout;
pub mod page;
pub mod palette;
pub mod raster;
pub mod region;
pub mod row;
pub mod scanline;

pub use canvas::Canvas;
pub use error::{Error, Result};
pub use layout::{FrameDescriptor, GlyphGeometry, Layout};
pub use page::{decode_page, encode_page, patch_page, PackedPage};
pub use palette::{PaletteGroup, Rgb};
pub use region::crawl::{CrawlPoint, TextCrawl};
pub use region::{Dirty, RegionHandle, Resolver};
pub use row::EncodeReport;
