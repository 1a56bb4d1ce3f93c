//! Configuration for the extraction pipeline.
//!
//! The tolerances below were empirically tuned against real documents; they
//! are exposed here rather than hard-coded so callers can adapt them to
//! unusual layouts or raster resolutions. Lengths are in page units (PDF
//! points), areas in page units squared, so values are independent of the
//! raster scale the caller rendered at.

/// Tunable thresholds for caption assembly, region detection, and cropping.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// How far a line edge may sit from a recorded column margin and still
    /// count as aligned to it.
    pub margin_tolerance: f32,

    /// Maximum vertical gap between consecutive caption lines; a larger gap
    /// ends the caption.
    pub caption_gap_tolerance: f32,

    /// Minimum area of a graphical block to be considered a figure candidate.
    pub min_region_area: f32,

    /// Minimum ratio of a block's short side to its long side; filters out
    /// rules, underlines, and stray marks.
    pub min_region_aspect: f32,

    /// Blocks whose bounding boxes come within this distance are merged into
    /// one candidate region (multi-panel figures render as disjoint blocks).
    pub block_merge_gap: f32,

    /// Padding added around a region before cropping, so anti-aliased edges
    /// survive the crop.
    pub crop_padding: f32,

    /// A crop whose box comes within this distance of a page edge is treated
    /// as a page-bleed artifact and rejected.
    pub page_edge_slack: f32,

    /// Multiplier applied to `min_region_area` when body text sits over dense
    /// graphics (scanned documents), where lenient thresholds would pick up
    /// the text itself as figures.
    pub graphical_area_factor: f32,

    /// Words at or above `mode_font * large_font_ratio` are considered large
    /// (titles, section heads).
    pub large_font_ratio: f32,

    /// How far a bold line's center may sit from the page or column center
    /// and still count as centered.
    pub center_tolerance: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionConfig {
    /// Create a configuration with the tuned defaults.
    pub fn new() -> Self {
        Self {
            margin_tolerance: 2.0,
            caption_gap_tolerance: 8.0,
            min_region_area: 400.0,
            min_region_aspect: 0.04,
            block_merge_gap: 8.0,
            crop_padding: 4.0,
            page_edge_slack: 3.0,
            graphical_area_factor: 3.0,
            large_font_ratio: 1.5,
            center_tolerance: 10.0,
        }
    }

    /// Set the margin alignment tolerance.
    pub fn with_margin_tolerance(mut self, tol: f32) -> Self {
        self.margin_tolerance = tol;
        self
    }

    /// Set the caption continuation gap tolerance.
    pub fn with_caption_gap_tolerance(mut self, tol: f32) -> Self {
        self.caption_gap_tolerance = tol;
        self
    }

    /// Set the minimum candidate region area.
    pub fn with_min_region_area(mut self, area: f32) -> Self {
        self.min_region_area = area;
        self
    }

    /// Set the minimum candidate region aspect ratio.
    pub fn with_min_region_aspect(mut self, aspect: f32) -> Self {
        self.min_region_aspect = aspect;
        self
    }

    /// Set the block merge gap.
    pub fn with_block_merge_gap(mut self, gap: f32) -> Self {
        self.block_merge_gap = gap;
        self
    }

    /// Set the crop padding.
    pub fn with_crop_padding(mut self, padding: f32) -> Self {
        self.crop_padding = padding;
        self
    }
}
