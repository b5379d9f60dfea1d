//! One scanline of packed bytes <-> one row of pixels.
//!
//! Bits 0-6 of each byte are pixels, left to right; bit 7 picks the palette
//! group for all seven. `first_column` is the byte column the span starts at,
//! which fixes the phase of every pixel.

use std::ops::AddAssign;

use bit_field::BitField;

use crate::palette::{displayed, PaletteGroup, Phase, Rgb};
use crate::scanline::PIXELS_PER_BYTE;

const HIGH_BIT: usize = 7;

/// How far an encode had to move pixels to reach representable colors.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct EncodeReport {
    /// Sum of per-pixel distances between the requested and displayed colors
    pub error: u64,
    /// Pixels that will display differently from the request
    pub inexact: usize,
}

impl EncodeReport {
    #[inline]
    pub fn is_exact(&self) -> bool {
        self.inexact == 0
    }

    #[inline]
    fn record(&mut self, error: u32) {
        self.error += error as u64;
        if error != 0 {
            self.inexact += 1;
        }
    }
}

impl AddAssign for EncodeReport {
    fn add_assign(&mut self, rhs: Self) {
        self.error += rhs.error;
        self.inexact += rhs.inexact;
    }
}

/// Number of packed bytes needed for `width` pixels.
#[inline]
pub fn bytes_for_width(width: usize) -> usize {
    width.div_ceil(PIXELS_PER_BYTE)
}

/// Decodes a run of packed bytes into `bytes.len() * 7` pixels.
///
/// A lit pixel with a lit neighbour shows white, a lone lit pixel shows its
/// group color. Neighbours outside `bytes` count as unlit.
pub fn decode_row(bytes: &[u8], first_column: usize) -> Vec<Rgb> {
    let lit: Vec<bool> = bytes
        .iter()
        .flat_map(|byte| (0..PIXELS_PER_BYTE).map(move |bit| byte.get_bit(bit)))
        .collect();

    lit.iter()
        .enumerate()
        .map(|(i, &on)| {
            let left = i > 0 && lit[i - 1];
            let right = lit.get(i + 1).copied().unwrap_or(false);
            let group = PaletteGroup::from_high_bit(bytes[i / PIXELS_PER_BYTE].get_bit(HIGH_BIT));
            displayed(group, Phase::of_column(first_column * PIXELS_PER_BYTE + i), on, left || right)
        })
        .collect()
}

/// Compares what `bytes` will display with the pixels that were asked for.
fn measure(bytes: &[u8], pixels: &[Rgb], first_column: usize) -> EncodeReport {
    let mut report = EncodeReport::default();
    for (shown, wanted) in decode_row(bytes, first_column).into_iter().zip(pixels) {
        report.record(shown.distance(*wanted));
    }
    report
}

// Search state after deciding pixel i: bit 0 is pixel i-1 lit, bit 1 is
// pixel i lit, bit 2 is the group of pixel i's byte.
const STATES: usize = 8;
const UNREACHED: u64 = u64::MAX;

#[inline]
fn state(previous: bool, current: bool, group: PaletteGroup) -> usize {
    previous as usize | (current as usize) << 1 | (group.high_bit() as usize) << 2
}

#[inline]
fn unpack(state: usize) -> (bool, bool, PaletteGroup) {
    (state.get_bit(0), state.get_bit(1), PaletteGroup::from_high_bit(state.get_bit(2)))
}

/// Picks bits and palette groups for a span so that the decoded row is as
/// close as possible to `pixels`.
///
/// Every pixel's displayed color depends on its neighbours' bits and on the
/// group of its byte, so the choice is made over the whole span at once: a
/// shortest-path search over the eight `(previous bit, bit, group)` states.
/// `pad` fixes the bits that follow `pixels` up to the end of the last byte.
/// Ties go to unlit bits and to the first group.
fn encode_span(pixels: &[Rgb], first_column: usize, pad: &[bool]) -> Vec<u8> {
    let len = pixels.len() + pad.len();
    debug_assert_eq!(len % PIXELS_PER_BYTE, 0);
    if len == 0 {
        return Vec::new();
    }

    let options = |i: usize| -> &'static [bool] {
        if i < pixels.len() {
            &[false, true]
        } else if pad[i - pixels.len()] {
            &[true]
        } else {
            &[false]
        }
    };
    // error of pixel `i` once both of its neighbours are known
    let cost = |i: usize, group: PaletteGroup, lit: bool, neighbour_lit: bool| -> u64 {
        pixels.get(i).map_or(0, |&wanted| {
            let phase = Phase::of_column(first_column * PIXELS_PER_BYTE + i);
            wanted.distance(displayed(group, phase, lit, neighbour_lit)) as u64
        })
    };

    let all_groups = PaletteGroup::ALL;
    let mut costs = [UNREACHED; STATES];
    let mut back = vec![[0u8; STATES]; len];
    for group in all_groups {
        for &lit in options(0) {
            costs[state(false, lit, group)] = 0;
        }
    }

    for i in 1..len {
        let mut next = [UNREACHED; STATES];
        let starts_byte = i % PIXELS_PER_BYTE == 0;

        for (from, &so_far) in costs.iter().enumerate() {
            if so_far == UNREACHED {
                continue;
            }
            let (previous, current, group) = unpack(from);

            for &lit in options(i) {
                let total = so_far + cost(i - 1, group, current, previous || lit);
                let groups = if starts_byte { &all_groups[..] } else { std::slice::from_ref(&group) };

                for &next_group in groups {
                    let to = state(current, lit, next_group);
                    if total < next[to] {
                        next[to] = total;
                        back[i][to] = from as u8;
                    }
                }
            }
        }
        costs = next;
    }

    let mut best = (UNREACHED, 0);
    for (end, &so_far) in costs.iter().enumerate() {
        if so_far == UNREACHED {
            continue;
        }
        let (previous, current, group) = unpack(end);
        let total = so_far + cost(len - 1, group, current, previous);
        if total < best.0 {
            best = (total, end);
        }
    }

    let mut states = vec![0usize; len];
    states[len - 1] = best.1;
    for i in (1..len).rev() {
        states[i - 1] = back[i][states[i]] as usize;
    }

    states
        .chunks_exact(PIXELS_PER_BYTE)
        .map(|byte_states| {
            let mut byte = 0u8;
            byte.set_bit(HIGH_BIT, unpack(byte_states[0]).2.high_bit());
            for (bit, &s) in byte_states.iter().enumerate() {
                byte.set_bit(bit, unpack(s).1);
            }
            byte
        })
        .collect()
}

/// Encodes a row of pixels starting at byte column `first_column`.
///
/// The row is padded with unlit pixels to a whole number of bytes. The
/// report compares the decoded result with `pixels`, so it is exact exactly
/// when the row decodes back unchanged.
pub fn encode_row(pixels: &[Rgb], first_column: usize) -> (Vec<u8>, EncodeReport) {
    let pad = vec![false; bytes_for_width(pixels.len()) * PIXELS_PER_BYTE - pixels.len()];
    let bytes = encode_span(pixels, first_column, &pad);
    let report = measure(&bytes, pixels, first_column);
    (bytes, report)
}

/// Encodes `pixels` over the start of `target`.
///
/// When the row ends partway through a byte, the unused pixel bits of that
/// byte keep their current value and are taken into account as neighbours.
/// `target` must hold at least [`bytes_for_width`] bytes.
pub fn patch_row(target: &mut [u8], pixels: &[Rgb], first_column: usize) -> EncodeReport {
    let width = bytes_for_width(pixels.len());
    debug_assert!(target.len() >= width);

    let used_bits = pixels.len() % PIXELS_PER_BYTE;
    let pad: Vec<bool> = match target[..width].last() {
        Some(last) if used_bits != 0 => (used_bits..PIXELS_PER_BYTE).map(|bit| last.get_bit(bit)).collect(),
        _ => Vec::new(),
    };

    let bytes = encode_span(pixels, first_column, &pad);
    target[..width].copy_from_slice(&bytes);

    measure(&bytes, pixels, first_column)
}
