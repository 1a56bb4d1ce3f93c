//! Debug overlay rendering.
//!
//! Given a rendered page and the figures (or failures) found on it, produce
//! an annotated copy with each figure and caption region outlined, for visual
//! inspection of hits and near-misses.

use crate::figures::{Figure, FigureFailure};
use crate::geometry::Rect;
use crate::raster::Bitmap;

/// Outline thickness in pixels.
const OUTLINE_PX: usize = 2;

/// Copy the page bitmap with every figure's region and caption outlined.
pub fn draw_figure_regions(bitmap: &Bitmap, figures: &[Figure]) -> Bitmap {
    let mut out = bitmap.clone();
    for figure in figures {
        outline(&mut out, &figure.figure_region);
        outline(&mut out, &figure.caption_region);
    }
    out
}

/// Copy the page bitmap with whatever geometry each failure carries outlined.
pub fn draw_failure_regions(bitmap: &Bitmap, failures: &[FigureFailure]) -> Bitmap {
    let mut out = bitmap.clone();
    for failure in failures {
        if let Some(region) = failure.figure_region {
            outline(&mut out, &region);
        }
        if let Some(region) = failure.caption_region {
            outline(&mut out, &region);
        }
    }
    out
}

fn outline(bitmap: &mut Bitmap, rect: &Rect) {
    let px = bitmap.to_pixels(rect);
    if px.width() == 0 || px.height() == 0 {
        return;
    }
    for band in 0..OUTLINE_PX {
        for x in px.x0..px.x1 {
            bitmap.set(x, px.y0 + band, true);
            bitmap.set(x, px.y1.saturating_sub(1 + band), true);
        }
        for y in px.y0..px.y1 {
            bitmap.set(px.x0 + band, y, true);
            bitmap.set(px.x1.saturating_sub(1 + band), y, true);
        }
    }
}
