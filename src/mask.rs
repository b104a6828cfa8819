//! Pixel-exact collision masks.
//!
//! Offsets follow the pygame convention: `a.overlap(&b, (dx, dy))` places the
//! upper-left corner of `b` at `(dx, dy)` in `a`'s coordinates.

use crate::body::PhysicsBody;
use crate::config::Tunables;
use crate::obstacle::Obstacle;

/// Alpha values strictly above this are solid.
pub const ALPHA_THRESHOLD: u8 = 127;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    words_per_row: usize,
    bits: Vec<u64>,
}

impl Mask {
    pub fn empty(width: u32, height: u32) -> Self {
        let words_per_row = (width as usize).div_ceil(64);
        Self {
            width,
            height,
            words_per_row,
            bits: vec![0; words_per_row * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, solid: impl Fn(u32, u32) -> bool) -> Self {
        let mut mask = Self::empty(width, height);
        for y in 0..height {
            for x in 0..width {
                if solid(x, y) {
                    mask.set(x, y);
                }
            }
        }
        mask
    }

    pub fn solid(width: u32, height: u32) -> Self {
        Self::from_fn(width, height, |_, _| true)
    }

    /// Ellipse inscribed in the `width` x `height` box, sampled at pixel centers.
    pub fn ellipse(width: u32, height: u32) -> Self {
        let rx = width as f32 / 2.0;
        let ry = height as f32 / 2.0;
        Self::from_fn(width, height, |x, y| {
            let dx = (x as f32 + 0.5 - rx) / rx;
            let dy = (y as f32 + 0.5 - ry) / ry;
            dx * dx + dy * dy <= 1.0
        })
    }

    /// Builds a mask from one alpha byte per pixel, row-major. Returns `None`
    /// when the buffer length does not match the dimensions.
    pub fn from_alpha(width: u32, height: u32, alpha: &[u8]) -> Option<Self> {
        if alpha.len() != width as usize * height as usize {
            return None;
        }
        Some(Self::from_fn(width, height, |x, y| {
            alpha[(y * width + x) as usize] > ALPHA_THRESHOLD
        }))
    }

    /// Same as [`Mask::from_alpha`] for RGBA8 pixel data.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Option<Self> {
        if rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        let alpha: Vec<u8> = rgba.chunks_exact(4).map(|px| px[3]).collect();
        Self::from_alpha(width, height, &alpha)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> (usize, u64) {
        let word = y as usize * self.words_per_row + x as usize / 64;
        (word, 1u64 << (x % 64))
    }

    pub fn set(&mut self, x: u32, y: u32) {
        if x < self.width && y < self.height {
            let (word, bit) = self.index(x, y);
            self.bits[word] |= bit;
        }
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let (word, bit) = self.index(x, y);
        self.bits[word] & bit != 0
    }

    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn flipped_vertical(&self) -> Self {
        let mut flipped = Self::empty(self.width, self.height);
        let row = self.words_per_row;
        for y in 0..self.height as usize {
            let src = (self.height as usize - 1 - y) * row;
            flipped.bits[y * row..(y + 1) * row].copy_from_slice(&self.bits[src..src + row]);
        }
        flipped
    }

    /// First solid pixel shared with `other` placed at `offset`, in this mask's
    /// coordinates. Scans row by row.
    pub fn overlap(&self, other: &Mask, offset: (i32, i32)) -> Option<(i32, i32)> {
        let (dx, dy) = offset;
        let x0 = dx.max(0);
        let y0 = dy.max(0);
        let x1 = (self.width as i32).min(dx + other.width as i32);
        let y1 = (self.height as i32).min(dy + other.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        for y in y0..y1 {
            for x in x0..x1 {
                if self.get(x as u32, y as u32) && other.get((x - dx) as u32, (y - dy) as u32) {
                    return Some((x, y));
                }
            }
        }
        None
    }
}

/// Masks for the body sprite and both obstacle segments.
#[derive(Debug, Clone)]
pub struct SpriteMasks {
    pub body: Mask,
    pub top_segment: Mask,
    pub bottom_segment: Mask,
}

impl SpriteMasks {
    /// The top segment is the bottom sprite flipped vertically.
    pub fn new(body: Mask, bottom_segment: Mask) -> Self {
        Self {
            body,
            top_segment: bottom_segment.flipped_vertical(),
            bottom_segment,
        }
    }

    /// Elliptical body and solid pipes sized from the tunables.
    pub fn standard(tunables: &Tunables) -> Self {
        Self::new(
            Mask::ellipse(tunables.body_width, tunables.body_height),
            Mask::solid(tunables.obstacle_width, tunables.segment_height),
        )
    }
}

/// Where `body` first touches either segment of `obstacle`, bottom segment first.
pub fn collision_point(
    body: &PhysicsBody,
    obstacle: &Obstacle,
    masks: &SpriteMasks,
) -> Option<(i32, i32)> {
    let dx = (obstacle.x - body.x).round() as i32;
    let body_y = body.y.round() as i32;
    let bottom = (dx, obstacle.bottom_segment_y() - body_y);
    let top = (dx, obstacle.top_segment_y() - body_y);
    masks
        .body
        .overlap(&masks.bottom_segment, bottom)
        .or_else(|| masks.body.overlap(&masks.top_segment, top))
}

pub fn overlaps(body: &PhysicsBody, obstacle: &Obstacle, masks: &SpriteMasks) -> bool {
    collision_point(body, obstacle, masks).is_some()
}
