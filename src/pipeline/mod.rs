//! The per-document extraction driver.
//!
//! Data flows strictly forward: statistics → caption starts → captions →
//! regions → figures, once per page, with statistics computed a single time
//! for the whole document. Page processing borrows the pipeline immutably,
//! so pages may be handed to concurrent workers; each page accumulates its
//! own failures and the caller merges outputs afterwards.

use std::collections::BTreeMap;

use crate::captions::{build_captions, detect_caption_starts, CaptionStart};
use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::figures::{extract_figures, Figure, FigureFailure};
use crate::raster::Bitmap;
use crate::regions::find_page_regions;
use crate::stats::DocumentStatistics;
use crate::text::Page;

/// Everything the rendering collaborator supplies for one page.
#[derive(Debug, Clone)]
pub struct PageInput {
    /// The page's text layout.
    pub page: Page,
    /// Full render at the caller's chosen resolution, 1 bit per pixel.
    pub full_render: Bitmap,
    /// Graphics-only render, same dimensions and scale as the full render.
    pub graphics: Bitmap,
}

/// How far a page made it through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Not touched yet.
    Unprocessed,
    /// Document statistics cover this page.
    StatisticsReady,
    /// Caption detection ran; a page with zero starts stops here and skips
    /// raster analysis entirely.
    CaptionsFound,
    /// Region detection ran.
    RegionsFound,
    /// Final figure extraction ran.
    FiguresExtracted,
}

/// The result of processing one page.
#[derive(Debug, Clone)]
pub struct PageOutput {
    /// Zero-based page index.
    pub page: usize,
    /// Terminal state the page reached.
    pub state: PageState,
    /// Figures extracted from this page.
    pub figures: Vec<Figure>,
    /// Structures detected on this page that failed extraction.
    pub failures: Vec<FigureFailure>,
}

/// The merged result of a document run.
#[derive(Debug, Clone)]
pub struct DocumentOutput {
    /// Per-page outputs, in the order pages were processed.
    pub pages: Vec<PageOutput>,
    /// Detection failures that are document-scoped rather than tied to a
    /// processed page (out-of-sequence caption numbers).
    pub detection_failures: Vec<FigureFailure>,
}

impl DocumentOutput {
    /// All extracted figures in ascending page order.
    pub fn figures(&self) -> Vec<Figure> {
        let mut pages: Vec<&PageOutput> = self.pages.iter().collect();
        pages.sort_by_key(|p| p.page);
        pages.iter().flat_map(|p| p.figures.iter().cloned()).collect()
    }

    /// All failures: detection-level first, then per page in ascending page
    /// order.
    pub fn failures(&self) -> Vec<FigureFailure> {
        let mut out = self.detection_failures.clone();
        let mut pages: Vec<&PageOutput> = self.pages.iter().collect();
        pages.sort_by_key(|p| p.page);
        out.extend(pages.iter().flat_map(|p| p.failures.iter().cloned()));
        out
    }
}

/// The four-stage extraction pipeline for one document.
///
/// Construction runs the one-shot statistics pass; afterwards the pipeline is
/// immutable and every method takes `&self`.
#[derive(Debug)]
pub struct FigurePipeline {
    config: ExtractionConfig,
    stats: DocumentStatistics,
}

impl FigurePipeline {
    /// Validate the inputs and compute document statistics.
    pub fn new(inputs: &[PageInput], config: ExtractionConfig) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::EmptyDocument);
        }
        for input in inputs {
            validate_page(input)?;
        }
        let view: Vec<(&Page, &Bitmap)> =
            inputs.iter().map(|i| (&i.page, &i.graphics)).collect();
        let stats = DocumentStatistics::analyze(&view, &config)?;
        Ok(Self { config, stats })
    }

    /// The document statistics this pipeline decides against.
    pub fn statistics(&self) -> &DocumentStatistics {
        &self.stats
    }

    /// Detect caption starts across the whole document (numbering is a
    /// document-scoped sequence per type, so detection cannot run per page).
    pub fn detect_captions(
        &self,
        inputs: &[PageInput],
    ) -> (BTreeMap<usize, Vec<CaptionStart>>, Vec<FigureFailure>) {
        let pages: Vec<&Page> = inputs.iter().map(|i| &i.page).collect();
        let mut failures = Vec::new();
        let starts = detect_caption_starts(&pages, &self.stats, &mut failures);
        if log::log_enabled!(log::Level::Debug) {
            for (page, on_page) in &starts {
                let inventory: Vec<String> = on_page
                    .iter()
                    .map(|s| format!("{} {}", s.kind, s.number))
                    .collect();
                log::debug!("page {}: caption starts [{}]", page, inventory.join(", "));
            }
        }
        (starts, failures)
    }

    /// Run the remaining stages for one page given its caption starts.
    ///
    /// Takes `&self` only; safe to call from concurrent page workers. The
    /// returned output owns this page's failure accumulator.
    pub fn process_page(&self, input: &PageInput, starts: &[CaptionStart]) -> PageOutput {
        let page_number = input.page.number;
        let mut failures = Vec::new();

        if starts.is_empty() {
            // No captions: skip raster analysis entirely
            return PageOutput {
                page: page_number,
                state: PageState::CaptionsFound,
                figures: Vec::new(),
                failures,
            };
        }
        log::debug!("working on page {}", page_number);

        // Mask graphics that never made it into the final render
        let mut graphics = input.graphics.clone();
        graphics.intersect_with(&input.full_render);

        let captions = build_captions(
            starts,
            &input.page,
            &self.stats,
            &graphics,
            &self.config,
            &mut failures,
        );
        if captions.is_empty() {
            return PageOutput {
                page: page_number,
                state: PageState::CaptionsFound,
                figures: Vec::new(),
                failures,
            };
        }

        let regions = find_page_regions(
            &input.page,
            &graphics,
            captions,
            &self.stats,
            &self.config,
            &mut failures,
        );
        if regions.is_empty() {
            return PageOutput {
                page: page_number,
                state: PageState::RegionsFound,
                figures: Vec::new(),
                failures,
            };
        }

        let figures = extract_figures(
            &input.full_render,
            &regions,
            &self.stats,
            &self.config,
            &mut failures,
        );
        if figures.is_empty() {
            log::debug!("page {}: no figures recovered", page_number);
        }

        PageOutput {
            page: page_number,
            state: PageState::FiguresExtracted,
            figures,
            failures,
        }
    }

    /// Process every page in document order.
    pub fn run(&self, inputs: &[PageInput]) -> DocumentOutput {
        self.run_order(inputs, false)
    }

    /// Process every page in reverse document order. Figure numbering was
    /// fixed at detection time, so iteration direction only changes the
    /// order of `pages` in the output.
    pub fn run_reverse(&self, inputs: &[PageInput]) -> DocumentOutput {
        self.run_order(inputs, true)
    }

    /// Process a single page by its zero-based index. Detection still scans
    /// the whole document so the numbering sequence stays correct.
    pub fn run_page(&self, inputs: &[PageInput], page: usize) -> Result<PageOutput> {
        let input = inputs
            .iter()
            .find(|i| i.page.number == page)
            .ok_or(Error::PageOutOfRange {
                requested: page,
                available: inputs.len(),
            })?;
        let (starts, _) = self.detect_captions(inputs);
        let empty = Vec::new();
        let on_page = starts.get(&page).unwrap_or(&empty);
        Ok(self.process_page(input, on_page))
    }

    fn run_order(&self, inputs: &[PageInput], reverse: bool) -> DocumentOutput {
        let (starts, detection_failures) = self.detect_captions(inputs);
        let empty = Vec::new();
        let mut pages = Vec::with_capacity(inputs.len());
        let process = |input: &PageInput| {
            let on_page = starts.get(&input.page.number).unwrap_or(&empty);
            self.process_page(input, on_page)
        };
        if reverse {
            for input in inputs.iter().rev() {
                pages.push(process(input));
            }
        } else {
            for input in inputs {
                pages.push(process(input));
            }
        }
        DocumentOutput {
            pages,
            detection_failures,
        }
    }
}

fn validate_page(input: &PageInput) -> Result<()> {
    let page = input.page.number;
    let full = &input.full_render;
    let gfx = &input.graphics;
    if full.width() != gfx.width() || full.height() != gfx.height() {
        return Err(Error::BitmapSizeMismatch {
            page,
            full_w: full.width(),
            full_h: full.height(),
            gfx_w: gfx.width(),
            gfx_h: gfx.height(),
        });
    }
    if full.scale() <= 0.0 {
        return Err(Error::InvalidScale(full.scale()));
    }
    if (full.scale() - gfx.scale()).abs() > f32::EPSILON {
        return Err(Error::InvalidScale(gfx.scale()));
    }
    // The raster must cover the page at its stated scale
    let expected_w = (input.page.width * full.scale()).round() as isize;
    let expected_h = (input.page.height * full.scale()).round() as isize;
    if (full.width() as isize - expected_w).abs() > 2 || (full.height() as isize - expected_h).abs() > 2
    {
        return Err(Error::BitmapCoverage {
            page,
            reason: format!(
                "expected about {}x{} pixels at scale {}, got {}x{}",
                expected_w,
                expected_h,
                full.scale(),
                full.width(),
                full.height()
            ),
        });
    }
    Ok(())
}
