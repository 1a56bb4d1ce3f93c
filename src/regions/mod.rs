//! Candidate region detection and caption association.
//!
//! The graphics-only bitmap (already intersected with the full render by the
//! driver) is the search space. Caption text and body-aligned lines are
//! erased from a working copy, connected blocks of the remaining ink are
//! extracted, implausible blocks are filtered out, nearby blocks are merged
//! (multi-panel figures render as several disjoint blocks), and each surviving
//! region is claimed by the nearest unclaimed caption in the same column.

use crate::captions::Caption;
use crate::config::ExtractionConfig;
use crate::figures::{FailureReason, FigureFailure};
use crate::geometry::Rect;
use crate::raster::{connected_blocks, Bitmap};
use crate::stats::DocumentStatistics;
use crate::text::Page;
use crate::utils::safe_float_cmp;

/// A candidate region paired with the caption that claimed it.
#[derive(Debug, Clone)]
pub struct RegionMatch {
    /// The claiming caption.
    pub caption: Caption,
    /// The region's bounding box in page coordinates.
    pub region: Rect,
}

/// The regions surviving detection on one page. Transient, scoped to the
/// page being processed.
#[derive(Debug, Clone, Default)]
pub struct PageRegions {
    /// Caption/region pairs, in region top-to-bottom order.
    pub matches: Vec<RegionMatch>,
}

impl PageRegions {
    /// True when no region was claimed by any caption.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Detect candidate figure regions on a page and associate them with its
/// captions.
///
/// Captions that end up with no associated region are appended to `failures`;
/// regions with no caption are discarded silently (figures without a caption
/// marker are out of scope).
pub fn find_page_regions(
    page: &Page,
    graphics: &Bitmap,
    captions: Vec<Caption>,
    stats: &DocumentStatistics,
    config: &ExtractionConfig,
    failures: &mut Vec<FigureFailure>,
) -> PageRegions {
    if captions.is_empty() {
        return PageRegions::default();
    }

    // Erase text from the search space: caption boxes always, body-aligned
    // lines so stray anti-aliased text ink never forms a block of its own.
    let mut working = graphics.clone();
    for caption in &captions {
        working.erase_page_rect(&caption.bbox);
    }
    for line in &page.lines {
        if line.words.is_empty() {
            continue;
        }
        let bbox = line.bbox();
        if stats.line_is_aligned(bbox.x0, bbox.x1).is_some() {
            working.erase_page_rect(&bbox);
        }
    }

    let scale = working.scale();
    let area_factor = if stats.is_body_text_graphical() {
        config.graphical_area_factor
    } else {
        1.0
    };
    let min_pixels = (config.min_region_area * area_factor * scale * scale) as usize;

    let mut candidates: Vec<Rect> = Vec::new();
    for block in connected_blocks(&working) {
        if block.pixels < min_pixels {
            continue;
        }
        let w = block.bbox.width() as f32;
        let h = block.bbox.height() as f32;
        let aspect = w.min(h) / w.max(h).max(1.0);
        if aspect < config.min_region_aspect {
            // Rules, underlines, stray marks
            continue;
        }
        candidates.push(working.to_page(&block.bbox));
    }
    log::debug!(
        "page {}: {} candidate regions after area/aspect filtering",
        page.number,
        candidates.len()
    );

    let merged = merge_adjacent(candidates, config.block_merge_gap);

    // Nearest-unclaimed-caption association: regions in top-to-bottom order,
    // captions claimed by index so nothing is double-counted.
    let mut claimed = vec![false; captions.len()];
    let mut matches: Vec<RegionMatch> = Vec::new();
    for region in merged {
        let best = captions
            .iter()
            .enumerate()
            .filter(|(i, c)| !claimed[*i] && c.bbox.horizontal_overlap(&region) > 0.0)
            .min_by(|(_, a), (_, b)| {
                safe_float_cmp(a.bbox.vertical_gap(&region), b.bbox.vertical_gap(&region))
            })
            .map(|(i, _)| i);
        match best {
            Some(i) => {
                claimed[i] = true;
                matches.push(RegionMatch {
                    caption: captions[i].clone(),
                    region,
                });
            },
            None => {
                log::debug!(
                    "page {}: region {:?} has no caption to claim it, discarding",
                    page.number,
                    region
                );
            },
        }
    }

    for (i, caption) in captions.iter().enumerate() {
        if !claimed[i] {
            failures.push(FigureFailure {
                page: caption.page,
                kind: caption.kind,
                number: caption.number,
                caption_region: Some(caption.bbox),
                figure_region: None,
                reason: FailureReason::NoRegionForCaption,
            });
        }
    }

    PageRegions { matches }
}

/// Merge rectangles whose boxes come within `gap` of each other, repeating
/// until no pair merges.
fn merge_adjacent(mut rects: Vec<Rect>, gap: f32) -> Vec<Rect> {
    loop {
        let mut merged_any = false;
        let mut out: Vec<Rect> = Vec::with_capacity(rects.len());
        'outer: for rect in rects.drain(..) {
            for existing in out.iter_mut() {
                if existing.expanded(gap).intersects(&rect) {
                    *existing = existing.union(&rect);
                    merged_any = true;
                    continue 'outer;
                }
            }
            out.push(rect);
        }
        rects = out;
        if !merged_any {
            break;
        }
    }
    // Top-to-bottom, then left-to-right, so association order is stable
    rects.sort_by(|a, b| safe_float_cmp(a.y0, b.y0).then(safe_float_cmp(a.x0, b.x0)));
    rects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figures::FigureType;
    use crate::text::{TextLine, TextWord};

    fn word(text: &str, x0: f32, y0: f32, x1: f32) -> TextWord {
        TextWord {
            text: text.to_string(),
            bbox: Rect::new(x0, y0, x1, y0 + 10.0),
            font_name: "Times-Roman".to_string(),
            font_size: 10.0,
            bold: false,
            italic: false,
        }
    }

    fn body_line(text: &str, y0: f32) -> TextLine {
        let words: Vec<&str> = text.split_whitespace().collect();
        let step = (540.0 - 72.0) / words.len().max(1) as f32;
        TextLine::new(
            words
                .iter()
                .enumerate()
                .map(|(i, w)| word(w, 72.0 + i as f32 * step, y0, 72.0 + (i + 1) as f32 * step - 2.0))
                .collect(),
        )
    }

    fn mock_page() -> Page {
        Page {
            number: 0,
            width: 612.0,
            height: 792.0,
            lines: vec![
                body_line("the quick brown fox jumps over dogs", 80.0),
                body_line("pack my box with five dozen liquor jugs", 94.0),
                body_line("sphinx of black quartz judge my vow", 700.0),
            ],
        }
    }

    fn mock_stats(page: &Page) -> DocumentStatistics {
        let graphics = Bitmap::new(612, 792, 1.0);
        DocumentStatistics::analyze(&[(page, &graphics)], &ExtractionConfig::new()).unwrap()
    }

    fn caption(kind: FigureType, number: u32, bbox: Rect) -> Caption {
        Caption {
            page: 0,
            kind,
            number,
            bbox,
            text: format!("{} {}: caption", kind, number),
            embedded_in_graphics: false,
        }
    }

    #[test]
    fn test_region_claimed_by_nearest_caption() {
        let page = mock_page();
        let stats = mock_stats(&page);
        let mut graphics = Bitmap::new(612, 792, 1.0);
        graphics.fill_page_rect(&Rect::new(150.0, 200.0, 450.0, 380.0));

        let captions = vec![caption(
            FigureType::Figure,
            1,
            Rect::new(150.0, 390.0, 450.0, 410.0),
        )];
        let mut failures = Vec::new();
        let regions = find_page_regions(
            &page,
            &graphics,
            captions,
            &stats,
            &ExtractionConfig::new(),
            &mut failures,
        );
        assert_eq!(regions.matches.len(), 1);
        assert!(failures.is_empty());
        let m = &regions.matches[0];
        assert_eq!(m.caption.number, 1);
        // Tight bounds on the solid block
        assert!((m.region.x0 - 150.0).abs() <= 1.0);
        assert!((m.region.y1 - 380.0).abs() <= 1.0);
    }

    #[test]
    fn test_caption_without_region_is_a_failure() {
        let page = mock_page();
        let stats = mock_stats(&page);
        let graphics = Bitmap::new(612, 792, 1.0);
        let captions = vec![caption(
            FigureType::Figure,
            3,
            Rect::new(150.0, 390.0, 450.0, 410.0),
        )];
        let mut failures = Vec::new();
        let regions = find_page_regions(
            &page,
            &graphics,
            captions,
            &stats,
            &ExtractionConfig::new(),
            &mut failures,
        );
        assert!(regions.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].reason, FailureReason::NoRegionForCaption);
        assert_eq!(failures[0].number, 3);
    }

    #[test]
    fn test_region_without_caption_is_discarded() {
        let page = mock_page();
        let stats = mock_stats(&page);
        let mut graphics = Bitmap::new(612, 792, 1.0);
        // One block near the caption, one far off to the side with no
        // horizontal overlap with any caption
        graphics.fill_page_rect(&Rect::new(150.0, 200.0, 300.0, 380.0));
        graphics.fill_page_rect(&Rect::new(480.0, 500.0, 560.0, 600.0));

        let captions = vec![caption(
            FigureType::Figure,
            1,
            Rect::new(150.0, 390.0, 300.0, 410.0),
        )];
        let mut failures = Vec::new();
        let regions = find_page_regions(
            &page,
            &graphics,
            captions,
            &stats,
            &ExtractionConfig::new(),
            &mut failures,
        );
        assert_eq!(regions.matches.len(), 1);
        assert!(failures.is_empty());
        assert!((regions.matches[0].region.x1 - 300.0).abs() <= 1.0);
    }

    #[test]
    fn test_multi_panel_blocks_merge() {
        let page = mock_page();
        let stats = mock_stats(&page);
        let mut graphics = Bitmap::new(612, 792, 1.0);
        // Two panels 6 units apart, within the merge gap
        graphics.fill_page_rect(&Rect::new(150.0, 200.0, 290.0, 380.0));
        graphics.fill_page_rect(&Rect::new(296.0, 200.0, 450.0, 380.0));

        let captions = vec![caption(
            FigureType::Figure,
            1,
            Rect::new(150.0, 390.0, 450.0, 410.0),
        )];
        let mut failures = Vec::new();
        let regions = find_page_regions(
            &page,
            &graphics,
            captions,
            &stats,
            &ExtractionConfig::new(),
            &mut failures,
        );
        assert_eq!(regions.matches.len(), 1);
        let region = regions.matches[0].region;
        assert!(region.x0 <= 151.0 && region.x1 >= 449.0);
    }

    #[test]
    fn test_thin_rule_is_filtered() {
        let page = mock_page();
        let stats = mock_stats(&page);
        let mut graphics = Bitmap::new(612, 792, 1.0);
        // A separator rule: long, 2 units tall, large enough in raw pixel
        // count to pass the area check but failing the aspect test
        graphics.fill_page_rect(&Rect::new(72.0, 300.0, 540.0, 302.0));

        let captions = vec![caption(
            FigureType::Figure,
            1,
            Rect::new(150.0, 390.0, 450.0, 410.0),
        )];
        let mut failures = Vec::new();
        let regions = find_page_regions(
            &page,
            &graphics,
            captions,
            &stats,
            &ExtractionConfig::new(),
            &mut failures,
        );
        assert!(regions.is_empty());
        assert_eq!(failures[0].reason, FailureReason::NoRegionForCaption);
    }

    #[test]
    fn test_two_captions_claim_two_regions() {
        let page = mock_page();
        let stats = mock_stats(&page);
        let mut graphics = Bitmap::new(612, 792, 1.0);
        graphics.fill_page_rect(&Rect::new(150.0, 150.0, 450.0, 250.0));
        graphics.fill_page_rect(&Rect::new(150.0, 450.0, 450.0, 550.0));

        let captions = vec![
            caption(FigureType::Figure, 1, Rect::new(150.0, 260.0, 450.0, 280.0)),
            caption(FigureType::Figure, 2, Rect::new(150.0, 560.0, 450.0, 580.0)),
        ];
        let mut failures = Vec::new();
        let regions = find_page_regions(
            &page,
            &graphics,
            captions,
            &stats,
            &ExtractionConfig::new(),
            &mut failures,
        );
        assert_eq!(regions.matches.len(), 2);
        assert!(failures.is_empty());
        assert_eq!(regions.matches[0].caption.number, 1);
        assert_eq!(regions.matches[1].caption.number, 2);
    }

    #[test]
    fn test_merge_adjacent_transitive() {
        let rects = vec![
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(30.0, 0.0, 40.0, 10.0),
            Rect::new(15.0, 0.0, 26.0, 10.0),
        ];
        // Chain: first and third within gap 8, third and second within gap 8
        let merged = merge_adjacent(rects, 8.0);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0], Rect::new(0.0, 0.0, 40.0, 10.0));
    }
}
