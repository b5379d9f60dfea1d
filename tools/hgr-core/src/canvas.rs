use crate::error::{Error, Result};
use crate::palette::{Rgb, BLACK};

/// A fixed-size grid of RGB pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl Canvas {
    /// An all-black canvas.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![BLACK; width * height],
        }
    }

    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Rgb>) -> Result<Self> {
        let expected = width.checked_mul(height);
        if expected != Some(pixels.len()) {
            return Err(Error::PixelCount {
                width,
                height,
                expected: expected.unwrap_or(usize::MAX),
                actual: pixels.len(),
            });
        }

        Ok(Self { width, height, pixels })
    }

    pub(crate) fn with_capacity(width: usize, height: usize) -> Self {
        Self {
            width,
            height: 0,
            pixels: Vec::with_capacity(width * height),
        }
    }

    pub(crate) fn push_row(&mut self, row: &[Rgb]) {
        debug_assert_eq!(row.len(), self.width);
        self.pixels.extend_from_slice(row);
        self.height += 1;
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Sets one pixel; returns false if `(x, y)` is off the canvas.
    pub fn set(&mut self, x: usize, y: usize, color: Rgb) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.pixels[y * self.width + x] = color;
        true
    }

    pub fn row(&self, y: usize) -> &[Rgb] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        // chunks_exact panics on a zero chunk size
        self.pixels.chunks_exact(self.width.max(1)).take(self.height)
    }

    /// Packed `r, g, b` bytes for every pixel.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::WHITE;

    #[test]
    fn set_and_get() {
        let mut canvas = Canvas::new(3, 2);
        assert!(canvas.set(2, 1, WHITE));
        assert!(!canvas.set(3, 0, WHITE));
        assert_eq!(canvas.get(2, 1), Some(WHITE));
        assert_eq!(canvas.get(0, 2), None);
        assert_eq!(canvas.row(1), &[BLACK, BLACK, WHITE]);
        assert_eq!(canvas.rows().count(), 2);
        assert_eq!(canvas.as_bytes().len(), 18);
        assert_eq!(&canvas.as_bytes()[15..], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn from_pixels_checks_length() {
        let error = Canvas::from_pixels(2, 3, vec![BLACK; 5]).unwrap_err();
        assert!(matches!(
            error,
            Error::PixelCount {
                width: 2,
                height: 3,
                expected: 6,
                actual: 5
            }
        ));
        assert_eq!(error.to_string(), "a 2x3 canvas needs 6 pixels, got 5");

        assert!(Canvas::from_pixels(2, 3, vec![BLACK; 6]).is_ok());
        assert!(matches!(
            Canvas::from_pixels(usize::MAX, 2, Vec::new()),
            Err(Error::PixelCount { .. })
        ));
    }
}
