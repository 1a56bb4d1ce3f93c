// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::match_like_matches_macro)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Figures
//!
//! Heuristic figure and table extraction from rendered documents.
//!
//! Given per-page text layouts and per-page bilevel rasters (a full render
//! and a graphics-only render), the pipeline locates figure and table
//! captions, finds the graphical regions they describe, and crops each as a
//! standalone image paired with its caption. Detected structure that cannot
//! be extracted is reported as a parallel collection of failures rather than
//! dropped, so near-misses stay inspectable.
//!
//! ## Pipeline
//!
//! Data flows strictly forward, once per page:
//!
//! 1. **Statistics**: one pass over the whole document producing the priors
//!    every later stage decides against (mode font, column margins, header
//!    patterns, scanned-page detection).
//! 2. **Caption starts**: "Figure N" / "Table N" markers, filtered by
//!    typographic plausibility and document-order numbering.
//! 3. **Captions**: each start grown forward through the following lines
//!    until a stopping condition.
//! 4. **Regions**: connected blocks of graphics-only ink, filtered, merged,
//!    and claimed by the nearest caption.
//! 5. **Figures**: final crops, with geometric rejects logged as failures.
//!
//! PDF parsing, page rendering, raster encoding, and the command line are
//! external collaborators: this crate starts from materialized
//! [`PageInput`]s and ends at [`Figure`] records plus crops.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_figures::{ExtractionConfig, FigurePipeline, PageInput};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let inputs: Vec<PageInput> = render_pages()?; // external renderer
//! let pipeline = FigurePipeline::new(&inputs, ExtractionConfig::new())?;
//! let output = pipeline.run(&inputs);
//!
//! for figure in output.figures() {
//!     println!("{}", serde_json::to_string(&figure)?);
//!     let crop = pdf_figures::crop_figure(&inputs[figure.page].full_render, &figure);
//!     crop.to_gray_image().save(format!("{}.png", figure.export_stem()))?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Geometry and input models
pub mod geometry;
pub mod raster;
pub mod text;

// Document-wide statistics
pub mod stats;

// The extraction stages
pub mod captions;
pub mod figures;
pub mod regions;

// Debug visualization
pub mod overlay;

// Per-document driver
pub mod pipeline;

// Re-exports
pub use captions::{build_captions, detect_caption_starts, Caption, CaptionStart};
pub use config::ExtractionConfig;
pub use error::{Error, Result};
pub use figures::{crop_figure, extract_figures, FailureReason, Figure, FigureFailure, FigureType};
pub use geometry::Rect;
pub use overlay::{draw_failure_regions, draw_figure_regions};
pub use pipeline::{DocumentOutput, FigurePipeline, PageInput, PageOutput, PageState};
pub use raster::{connected_blocks, Bitmap, Block, PixelRect};
pub use regions::{find_page_regions, PageRegions, RegionMatch};
pub use stats::{Column, DocumentStatistics};
pub use text::{Page, TextLine, TextWord};

// Internal utilities
pub(crate) mod utils {
    //! Internal utility functions for the library.

    use std::cmp::Ordering;

    /// Safely compare two floating point numbers, handling NaN cases.
    ///
    /// NaN values are treated as equal to each other and greater than all
    /// other values, so sorting never panics on a NaN comparison.
    #[inline]
    pub fn safe_float_cmp(a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => a.partial_cmp(&b).unwrap(),
        }
    }

}

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
