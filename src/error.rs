//! Error types for the figure extraction library.
//!
//! Heuristic misses (a caption with no region, a crop rejected at the margin
//! check) are not errors; they land in the per-page failure accumulator and
//! processing continues. `Error` is reserved for violations of the external
//! input contract that make a run meaningless.

/// Result type alias for figure extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Contract violations at the library boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Document contained no pages
    #[error("Empty document: no pages supplied")]
    EmptyDocument,

    /// Full-render and graphics-only bitmaps must be pixel-aligned
    #[error("Bitmap size mismatch on page {page}: full render {full_w}x{full_h}, graphics {gfx_w}x{gfx_h}")]
    BitmapSizeMismatch {
        /// Page the mismatch was found on
        page: usize,
        /// Full-render width in pixels
        full_w: usize,
        /// Full-render height in pixels
        full_h: usize,
        /// Graphics-only width in pixels
        gfx_w: usize,
        /// Graphics-only height in pixels
        gfx_h: usize,
    },

    /// Raster scale factor must be positive
    #[error("Invalid raster scale factor: {0}")]
    InvalidScale(f32),

    /// Requested page does not exist in the supplied document
    #[error("Page {requested} out of range: document has {available} pages")]
    PageOutOfRange {
        /// Page index requested by the caller
        requested: usize,
        /// Number of pages supplied
        available: usize,
    },

    /// Bitmap dimensions do not match the page dimensions at the given scale
    #[error("Bitmap for page {page} does not cover the page: {reason}")]
    BitmapCoverage {
        /// Page the bitmap belongs to
        page: usize,
        /// What did not line up
        reason: String,
    },
}
