//! Final figure extraction and the output model.
//!
//! Every caption/region pair that survived association is cropped here, with
//! the rejects recorded as failures instead of silently dropped. `Figure` and
//! `FigureFailure` are the crate's serialized outputs: one JSON object per
//! figure with `{page, type, number, figureRegion, captionRegion}`.

use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::geometry::Rect;
use crate::raster::Bitmap;
use crate::regions::PageRegions;
use crate::stats::DocumentStatistics;

/// Whether a caption marks a figure or a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FigureType {
    /// "Figure N" captions.
    Figure,
    /// "Table N" captions.
    Table,
}

impl std::fmt::Display for FigureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FigureType::Figure => write!(f, "Figure"),
            FigureType::Table => write!(f, "Table"),
        }
    }
}

/// A successfully extracted figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// Zero-based page the figure was found on.
    pub page: usize,
    /// Figure or table.
    #[serde(rename = "type")]
    pub kind: FigureType,
    /// Number from the caption; a document-scoped sequence per type.
    pub number: u32,
    /// Bounding box of the cropped graphical region, page coordinates.
    #[serde(rename = "figureRegion")]
    pub figure_region: Rect,
    /// Bounding box of the assembled caption, page coordinates.
    #[serde(rename = "captionRegion")]
    pub caption_region: Rect,
}

impl Figure {
    /// Deterministic file-name stem for raster export: `Figure-3`, `Table-1`.
    pub fn export_stem(&self) -> String {
        format!("{}-{}", self.kind, self.number)
    }
}

/// Why a detected structure did not become a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// Caption-start pattern matched but its number broke the per-type
    /// monotonic sequence (probable false positive).
    OutOfSequence,
    /// Caption start found but no plausible body followed and no graphics
    /// sit next to it.
    NoCaptionBody,
    /// A caption was assembled but no graphical region could be associated
    /// with it.
    NoRegionForCaption,
    /// The cropped region held too little ink to be a real figure.
    RegionTooSmall,
    /// The region runs to the page edge or covers nearly the whole page,
    /// a page-bleed artifact rather than a figure.
    PageBleed,
    /// The crop overlapped a figure already accepted on the same page.
    OverlappingFigure,
}

/// A detected-but-not-extracted structure, kept for diagnostics.
///
/// Carries whatever geometry was known at the point of failure so callers can
/// overlay near-misses on the rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureFailure {
    /// Page the structure was found on.
    pub page: usize,
    /// Figure or table.
    #[serde(rename = "type")]
    pub kind: FigureType,
    /// Caption number, when one was parsed.
    pub number: u32,
    /// Caption bounding box, when a caption line was located.
    #[serde(rename = "captionRegion")]
    pub caption_region: Option<Rect>,
    /// Candidate region bounding box, when one was found.
    #[serde(rename = "figureRegion")]
    pub figure_region: Option<Rect>,
    /// What went wrong.
    pub reason: FailureReason,
}

/// Crop the final figures out of the claimed regions.
///
/// Each region is padded by `crop_padding` (clamped to the page) so
/// anti-aliased edges survive, then checked against the minimum ink area, the
/// page-bleed test, and overlap with figures already accepted on this page.
/// Rejects are appended to `failures`.
pub fn extract_figures(
    full_render: &Bitmap,
    regions: &PageRegions,
    stats: &DocumentStatistics,
    config: &ExtractionConfig,
    failures: &mut Vec<FigureFailure>,
) -> Vec<Figure> {
    let page_bounds = Rect::new(0.0, 0.0, stats.page_width(), stats.page_height());
    let scale = full_render.scale();
    let min_area_factor = if stats.is_body_text_graphical() {
        config.graphical_area_factor
    } else {
        1.0
    };
    let min_pixels = (config.min_region_area * min_area_factor * scale * scale) as usize;

    let mut figures: Vec<Figure> = Vec::new();
    for m in &regions.matches {
        let region = m.region;
        let crop_box = region.expanded(config.crop_padding).clamped_to(&page_bounds);

        let ink = full_render.count_in(&full_render.to_pixels(&region));
        if ink < min_pixels {
            log::debug!(
                "page {}: {} {} region rejected, {} ink pixels under minimum {}",
                m.caption.page,
                m.caption.kind,
                m.caption.number,
                ink,
                min_pixels
            );
            failures.push(FigureFailure {
                page: m.caption.page,
                kind: m.caption.kind,
                number: m.caption.number,
                caption_region: Some(m.caption.bbox),
                figure_region: Some(region),
                reason: FailureReason::RegionTooSmall,
            });
            continue;
        }

        // The bleed test uses the unpadded region; padding alone is allowed
        // to touch the edge on legitimately large figures.
        let slack = config.page_edge_slack;
        let bleeds = region.x0 <= slack
            || region.y0 <= slack
            || region.x1 >= page_bounds.x1 - slack
            || region.y1 >= page_bounds.y1 - slack
            || region.area() > 0.9 * page_bounds.area();
        if bleeds {
            failures.push(FigureFailure {
                page: m.caption.page,
                kind: m.caption.kind,
                number: m.caption.number,
                caption_region: Some(m.caption.bbox),
                figure_region: Some(region),
                reason: FailureReason::PageBleed,
            });
            continue;
        }

        if figures.iter().any(|f| f.figure_region.intersects(&crop_box)) {
            failures.push(FigureFailure {
                page: m.caption.page,
                kind: m.caption.kind,
                number: m.caption.number,
                caption_region: Some(m.caption.bbox),
                figure_region: Some(crop_box),
                reason: FailureReason::OverlappingFigure,
            });
            continue;
        }

        figures.push(Figure {
            page: m.caption.page,
            kind: m.caption.kind,
            number: m.caption.number,
            figure_region: crop_box,
            caption_region: m.caption.bbox,
        });
    }

    figures
}

/// Crop a figure's region out of the page's full render for export.
pub fn crop_figure(full_render: &Bitmap, figure: &Figure) -> Bitmap {
    full_render.crop(&full_render.to_pixels(&figure.figure_region))
}
