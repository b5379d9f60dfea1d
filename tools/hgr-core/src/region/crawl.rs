//! Text crawl point list.
//!
//! Stored as `(x, 191 - y)` byte pairs and closed by a single zero byte, so a
//! point can never have `x == 0`.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scanline::ROWS;

pub const SENTINEL: u8 = 0x00;

const SCREEN_BOTTOM: u8 = (ROWS - 1) as u8;

/// A point in screen coordinates, y growing downwards.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrawlPoint {
    pub x: u8,
    pub y: u8,
}

impl CrawlPoint {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextCrawl {
    points: Vec<CrawlPoint>,
}

impl TextCrawl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: Vec<CrawlPoint>) -> Self {
        Self { points }
    }

    /// Reads points from the start of `region` until the sentinel, or until
    /// as many points as the region can hold have been read.
    pub fn parse(region: &[u8]) -> Result<Self> {
        let capacity = region.len().saturating_sub(1) / 2;
        let mut points = Vec::new();

        for (index, record) in region.chunks_exact(2).take(capacity).enumerate() {
            let (x, stored_y) = (record[0], record[1]);
            if x == SENTINEL {
                return Ok(Self { points });
            }

            let y = SCREEN_BOTTOM
                .checked_sub(stored_y)
                .ok_or(Error::InvalidPoint { index, x, y: stored_y })?;
            points.push(CrawlPoint { x, y });
        }

        if region.get(points.len() * 2) != Some(&SENTINEL) {
            warn!("text crawl is unterminated after {} points", points.len());
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[CrawlPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, point: CrawlPoint) {
        self.points.push(point);
    }

    /// Inserts before `index`, clamped to the end of the list.
    pub fn insert(&mut self, index: usize, point: CrawlPoint) {
        self.points.insert(index.min(self.points.len()), point);
    }

    pub fn remove(&mut self, index: usize) -> Option<CrawlPoint> {
        (index < self.points.len()).then(|| self.points.remove(index))
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Bytes needed to store the list, sentinel included.
    pub fn serialized_len(&self) -> usize {
        self.points.len() * 2 + 1
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.serialized_len());

        for (index, &CrawlPoint { x, y }) in self.points.iter().enumerate() {
            if x == SENTINEL || y > SCREEN_BOTTOM {
                return Err(Error::InvalidPoint { index, x, y });
            }
            bytes.push(x);
            bytes.push(SCREEN_BOTTOM - y);
        }
        bytes.push(SENTINEL);

        Ok(bytes)
    }

    /// Serializes over the start of `region`. Fails without touching
    /// `region` if the list does not fit; bytes past the sentinel are left
    /// as they were.
    pub fn write_into(&self, region: &mut [u8]) -> Result<usize> {
        let bytes = self.to_bytes()?;
        if bytes.len() > region.len() {
            return Err(Error::CapacityExceeded {
                needed: bytes.len(),
                capacity: region.len(),
            });
        }

        region[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }
}

impl<'a> IntoIterator for &'a TextCrawl {
    type Item = &'a CrawlPoint;
    type IntoIter = std::slice::Iter<'a, CrawlPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
