//! Bilevel raster support.
//!
//! The rendering collaborator supplies each page twice: a full render and a
//! graphics-only render, both 1-bit-per-pixel at the same dimensions. This
//! module stores those bitmaps bit-packed by row, converts between page
//! coordinates and pixels via the raster scale factor, and pulls connected
//! blocks of "on" pixels out for region detection.

use crate::geometry::Rect;
use image::GrayImage;

/// A rectangle in pixel coordinates, end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left column (inclusive).
    pub x0: usize,
    /// Top row (inclusive).
    pub y0: usize,
    /// Right column (exclusive).
    pub x1: usize,
    /// Bottom row (exclusive).
    pub y1: usize,
}

impl PixelRect {
    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    /// Area in pixels.
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }
}

/// A 1-bit-per-pixel page raster.
///
/// An "on" pixel is inked content. `scale` is the number of pixels per page
/// unit (rendering resolution over base PDF units), which keeps the bitmap
/// pixel-aligned to the text layout's coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    scale: f32,
    stride: usize,
    bits: Vec<u8>,
}

impl Bitmap {
    /// Create an all-off bitmap.
    pub fn new(width: usize, height: usize, scale: f32) -> Self {
        let stride = width.div_ceil(8);
        Self {
            width,
            height,
            scale,
            stride,
            bits: vec![0u8; stride * height],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixels per page unit.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Read one pixel; out-of-bounds reads are off.
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[y * self.stride + x / 8] & (0x80 >> (x % 8)) != 0
    }

    /// Write one pixel; out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let byte = &mut self.bits[y * self.stride + x / 8];
        let mask = 0x80 >> (x % 8);
        if on {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// Convert a page-coordinate rectangle to a clamped pixel rectangle.
    pub fn to_pixels(&self, rect: &Rect) -> PixelRect {
        let x0 = (rect.x0 * self.scale).floor().max(0.0) as usize;
        let y0 = (rect.y0 * self.scale).floor().max(0.0) as usize;
        let x1 = ((rect.x1 * self.scale).ceil().max(0.0) as usize).min(self.width);
        let y1 = ((rect.y1 * self.scale).ceil().max(0.0) as usize).min(self.height);
        PixelRect {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1,
            y1,
        }
    }

    /// Convert a pixel rectangle back to page coordinates.
    pub fn to_page(&self, rect: &PixelRect) -> Rect {
        Rect::new(
            rect.x0 as f32 / self.scale,
            rect.y0 as f32 / self.scale,
            rect.x1 as f32 / self.scale,
            rect.y1 as f32 / self.scale,
        )
    }

    /// Keep only pixels that are on in both bitmaps.
    ///
    /// Both bitmaps must have identical dimensions; the pipeline validates
    /// this before pages enter processing.
    pub fn intersect_with(&mut self, other: &Bitmap) {
        debug_assert_eq!(self.width, other.width);
        debug_assert_eq!(self.height, other.height);
        for (dst, src) in self.bits.iter_mut().zip(other.bits.iter()) {
            *dst &= *src;
        }
    }

    /// Set every pixel in a pixel rectangle.
    pub fn fill(&mut self, rect: &PixelRect, on: bool) {
        for y in rect.y0..rect.y1.min(self.height) {
            for x in rect.x0..rect.x1.min(self.width) {
                self.set(x, y, on);
            }
        }
    }

    /// Clear every pixel under a page-coordinate rectangle.
    pub fn erase_page_rect(&mut self, rect: &Rect) {
        let px = self.to_pixels(rect);
        self.fill(&px, false);
    }

    /// Set every pixel under a page-coordinate rectangle (test scaffolding
    /// and synthetic pages).
    pub fn fill_page_rect(&mut self, rect: &Rect) {
        let px = self.to_pixels(rect);
        self.fill(&px, true);
    }

    /// Count on pixels inside a pixel rectangle.
    pub fn count_in(&self, rect: &PixelRect) -> usize {
        let mut count = 0;
        for y in rect.y0..rect.y1.min(self.height) {
            for x in rect.x0..rect.x1.min(self.width) {
                if self.get(x, y) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Fraction of on pixels under a page-coordinate rectangle.
    pub fn density_in(&self, rect: &Rect) -> f32 {
        let px = self.to_pixels(rect);
        let area = px.area();
        if area == 0 {
            return 0.0;
        }
        self.count_in(&px) as f32 / area as f32
    }

    /// Copy out a pixel rectangle as a new bitmap with the same scale.
    pub fn crop(&self, rect: &PixelRect) -> Bitmap {
        let mut out = Bitmap::new(rect.width(), rect.height(), self.scale);
        for y in 0..rect.height() {
            for x in 0..rect.width() {
                if self.get(rect.x0 + x, rect.y0 + y) {
                    out.set(x, y, true);
                }
            }
        }
        out
    }

    /// Render as an 8-bit grayscale image for export: on pixels black,
    /// off pixels white.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            if self.get(x as usize, y as usize) {
                image::Luma([0u8])
            } else {
                image::Luma([255u8])
            }
        })
    }
}

/// A connected block of on pixels.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    /// Tight pixel bounding box of the block.
    pub bbox: PixelRect,
    /// Number of on pixels in the block.
    pub pixels: usize,
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new() -> Self {
        Self { parent: Vec::new() }
    }

    fn make(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        id
    }

    fn find(&mut self, mut id: usize) -> usize {
        while self.parent[id] != id {
            self.parent[id] = self.parent[self.parent[id]];
            id = self.parent[id];
        }
        id
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Horizontal run of on pixels within one row.
#[derive(Debug, Clone, Copy)]
struct Run {
    x0: usize,
    x1: usize, // exclusive
    label: usize,
}

/// Extract connected blocks of on pixels (4-connectivity).
///
/// Rows are decomposed into runs; runs that overlap a run in the previous row
/// are merged with union-find. This is the adjacency-merge contract of region
/// detection; the choice of run merging over flood fill is an implementation
/// detail.
pub fn connected_blocks(bitmap: &Bitmap) -> Vec<Block> {
    let mut uf = UnionFind::new();
    let mut prev_runs: Vec<Run> = Vec::new();
    let mut row_runs: Vec<Run> = Vec::new();
    let mut labeled: Vec<(usize, Run)> = Vec::new();

    for y in 0..bitmap.height() {
        row_runs.clear();
        let mut x = 0;
        while x < bitmap.width() {
            if bitmap.get(x, y) {
                let x0 = x;
                while x < bitmap.width() && bitmap.get(x, y) {
                    x += 1;
                }
                row_runs.push(Run {
                    x0,
                    x1: x,
                    label: usize::MAX,
                });
            } else {
                x += 1;
            }
        }

        for run in row_runs.iter_mut() {
            for prev in prev_runs.iter() {
                // Column overlap with the row above joins the components
                if run.x0 < prev.x1 && run.x1 > prev.x0 {
                    if run.label == usize::MAX {
                        run.label = prev.label;
                    } else {
                        uf.union(run.label, prev.label);
                    }
                }
            }
            if run.label == usize::MAX {
                run.label = uf.make();
            }
            labeled.push((y, *run));
        }

        std::mem::swap(&mut prev_runs, &mut row_runs);
    }

    // Labels are only final once every row has been unioned, so bounding
    // boxes are accumulated in a second pass over the stored runs.
    let mut blocks: std::collections::HashMap<usize, Block> = std::collections::HashMap::new();
    for (y, run) in labeled {
        let root = uf.find(run.label);
        let entry = blocks.entry(root).or_insert(Block {
            bbox: PixelRect {
                x0: run.x0,
                y0: y,
                x1: run.x1,
                y1: y + 1,
            },
            pixels: 0,
        });
        entry.bbox.x0 = entry.bbox.x0.min(run.x0);
        entry.bbox.x1 = entry.bbox.x1.max(run.x1);
        entry.bbox.y0 = entry.bbox.y0.min(y);
        entry.bbox.y1 = entry.bbox.y1.max(y + 1);
        entry.pixels += run.x1 - run.x0;
    }

    let mut out: Vec<Block> = blocks.into_values().collect();
    // Deterministic order: top-to-bottom, then left-to-right
    out.sort_by(|a, b| (a.bbox.y0, a.bbox.x0).cmp(&(b.bbox.y0, b.bbox.x0)));
    out
}
