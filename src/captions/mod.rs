//! Caption detection and assembly.
//!
//! Two stages live here. The detector scans every page's lines for markers
//! that begin a caption ("Figure 3", "Table II", "Fig. 12:") and filters them
//! through typographic plausibility and document-order numbering. The builder
//! then grows each accepted start forward through following lines until a
//! stopping condition, producing the caption's full text and bounding box.

use std::collections::{BTreeMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::ExtractionConfig;
use crate::figures::{FailureReason, FigureFailure, FigureType};
use crate::geometry::Rect;
use crate::raster::Bitmap;
use crate::stats::DocumentStatistics;
use crate::text::Page;

lazy_static! {
    /// Caption keyword, number, optional trailing punctuation. The number may
    /// be arabic or a roman numeral (some venues number tables that way).
    static ref CAPTION_START_RE: Regex = Regex::new(
        r"(?i)^(fig(?:ure)?\.?|table|tab\.)\s*(\d{1,4}|[ivxlc]{1,7})\s*([:.)\]]?)"
    )
    .unwrap();
}

/// A lightweight marker pointing at the line where a caption begins.
///
/// Holds an index into the page's text layout, not a copy of the text; it is
/// consumed by the caption builder and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionStart {
    /// Page the marker is on.
    pub page: usize,
    /// Figure or table.
    pub kind: FigureType,
    /// Parsed caption number.
    pub number: u32,
    /// Index of the marker line within the page's `lines`.
    pub line_index: usize,
}

/// A fully assembled caption.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    /// Page the caption is on.
    pub page: usize,
    /// Figure or table.
    pub kind: FigureType,
    /// Caption number.
    pub number: u32,
    /// Union of all included lines' word boxes.
    pub bbox: Rect,
    /// The caption's full text.
    pub text: String,
    /// True if the caption sits inside a graphical region (label embedded in
    /// the figure itself). Metadata for callers; region detection erases
    /// every caption box from its search raster regardless of this flag.
    pub embedded_in_graphics: bool,
}

/// Scan every page for caption starts.
///
/// Returns accepted starts keyed by page, in page and line order. Matches
/// whose numbering breaks the per-type monotonic sequence are probable false
/// positives ("Figure 2 shows..." in running text) and are appended to
/// `failures` instead.
pub fn detect_caption_starts(
    pages: &[&Page],
    stats: &DocumentStatistics,
    failures: &mut Vec<FigureFailure>,
) -> BTreeMap<usize, Vec<CaptionStart>> {
    let mut starts: BTreeMap<usize, Vec<CaptionStart>> = BTreeMap::new();
    let mut last_number: [Option<u32>; 2] = [None, None];

    for page in pages {
        for (line_index, line) in page.lines.iter().enumerate() {
            let Some((kind, number, punctuated)) = parse_caption_marker(&line.text()) else {
                continue;
            };
            let Some(first) = line.first_word() else {
                continue;
            };
            let bbox = line.bbox();

            // Captions are typographically distinguished from body text:
            // a centered bold label, an italic label, a non-body font, an
            // indented start, or at minimum a punctuated marker. Boldness
            // alone is not enough (inline emphasis in running text).
            let bold_label = (stats.line_is_bold(line) || first.is_bold())
                && stats.is_bold_centered(bbox.x0, bbox.x1);
            let plausible = bold_label
                || first.is_italic()
                || !stats.word_is_standard_font(first)
                || stats.line_is_aligned(bbox.x0, bbox.x1).is_none()
                || punctuated;
            if !plausible {
                continue;
            }

            let slot = match kind {
                FigureType::Figure => 0,
                FigureType::Table => 1,
            };
            let in_sequence = last_number[slot].map_or(true, |last| number > last);
            if !in_sequence {
                log::debug!(
                    "page {}: '{} {}' breaks the {} numbering sequence, recording as a miss",
                    page.number,
                    kind,
                    number,
                    kind
                );
                failures.push(FigureFailure {
                    page: page.number,
                    kind,
                    number,
                    caption_region: Some(bbox),
                    figure_region: None,
                    reason: FailureReason::OutOfSequence,
                });
                continue;
            }
            last_number[slot] = Some(number);

            starts.entry(page.number).or_default().push(CaptionStart {
                page: page.number,
                kind,
                number,
                line_index,
            });
        }
    }

    starts
}

/// Parse a caption marker from the start of a line's text. Returns the type,
/// the number, and whether the marker carried trailing punctuation.
fn parse_caption_marker(text: &str) -> Option<(FigureType, u32, bool)> {
    let caps = CAPTION_START_RE.captures(text)?;
    let keyword = caps.get(1)?.as_str();
    let kind = if keyword.to_ascii_lowercase().starts_with('f') {
        FigureType::Figure
    } else {
        FigureType::Table
    };
    let raw = caps.get(2)?.as_str();
    let number = raw.parse::<u32>().ok().or_else(|| parse_roman(raw))?;
    let punctuated = caps.get(3).map(|m| !m.as_str().is_empty()).unwrap_or(false);
    Some((kind, number, punctuated))
}

/// Parse a roman numeral, case-insensitive. Rejects malformed sequences by
/// the usual subtractive rule.
fn parse_roman(text: &str) -> Option<u32> {
    let value = |c: char| match c.to_ascii_uppercase() {
        'I' => Some(1u32),
        'V' => Some(5),
        'X' => Some(10),
        'L' => Some(50),
        'C' => Some(100),
        _ => None,
    };
    let digits: Vec<u32> = text.chars().map(value).collect::<Option<_>>()?;
    // Signed accumulation: a subtractive prefix ("IV", "XL") goes negative
    // before the larger digit is added.
    let mut total = 0i64;
    for (i, &d) in digits.iter().enumerate() {
        if digits[i + 1..].iter().any(|&next| next > d) {
            total -= i64::from(d);
        } else {
            total += i64::from(d);
        }
    }
    u32::try_from(total).ok().filter(|&n| n > 0)
}

/// Assemble captions for one page from its accepted starts.
///
/// Each caption grows from its marker line through subsequent lines while
/// they continue the caption's alignment and font pattern; it stops at the
/// first line that fails the test, at a vertical gap above the configured
/// tolerance, at a page header or number, or at another caption start.
/// Degenerate marker-only captions with no adjacent graphics are routed to
/// `failures`.
pub fn build_captions(
    starts: &[CaptionStart],
    page: &Page,
    stats: &DocumentStatistics,
    graphics: &Bitmap,
    config: &ExtractionConfig,
    failures: &mut Vec<FigureFailure>,
) -> Vec<Caption> {
    let start_lines: HashSet<usize> = starts.iter().map(|s| s.line_index).collect();
    let mut captions = Vec::new();

    for start in starts {
        let Some(first_line) = page.lines.get(start.line_index) else {
            continue;
        };
        let mut bbox = first_line.bbox();
        let mut text = first_line.text();
        let mut prev_bbox = bbox;
        let mut line_count = 1usize;

        let start_alignment = stats.line_is_aligned(bbox.x0, bbox.x1);
        let start_bold = stats.line_is_bold(first_line);
        let start_standard_font = first_line
            .first_word()
            .map(|w| stats.word_is_standard_font(w))
            .unwrap_or(true);
        // A caption set in the body font at the body margin cannot be told
        // apart from the following paragraph by typography alone; for those,
        // the sentence end closes the caption.
        let in_body_flow = start_alignment.is_some() && start_standard_font && !start_bold;
        let mut ended_by_sentence = ends_with_sentence(first_line);

        for (offset, line) in page.lines[start.line_index + 1..].iter().enumerate() {
            let index = start.line_index + 1 + offset;
            if line.words.is_empty() {
                continue;
            }
            if start_lines.contains(&index) {
                break;
            }
            if in_body_flow && ended_by_sentence {
                break;
            }
            let lb = line.bbox();
            let gap = lb.y0 - prev_bbox.y1;
            // A negative gap beyond a line height means the layout jumped
            // back up (next column); either way the caption has ended.
            if gap > config.caption_gap_tolerance || gap < -lb.height() {
                break;
            }
            if stats.is_page_header(line) || stats.is_page_number(line) {
                break;
            }
            if stats.line_is_aligned(lb.x0, lb.x1) != start_alignment {
                break;
            }
            if stats.line_is_bold(line) != start_bold {
                break;
            }
            let standard = line
                .first_word()
                .map(|w| stats.word_is_standard_font(w))
                .unwrap_or(true);
            if standard != start_standard_font {
                break;
            }

            bbox = bbox.union(&lb);
            text.push(' ');
            text.push_str(&line.text());
            prev_bbox = lb;
            line_count += 1;
            ended_by_sentence = ends_with_sentence(line);
        }

        let embedded_in_graphics = graphics.density_in(&bbox) > 0.05;

        // Marker-only caption: "Figure 3" and nothing else. Only plausible
        // when graphics sit right next to it (a label inside the figure).
        let marker_only = line_count == 1 && first_line.words.len() <= 2;
        if marker_only && !embedded_in_graphics && !has_adjacent_graphics(graphics, &bbox, stats) {
            log::debug!(
                "page {}: '{} {}' has no caption body and no adjacent graphics",
                start.page,
                start.kind,
                start.number
            );
            failures.push(FigureFailure {
                page: start.page,
                kind: start.kind,
                number: start.number,
                caption_region: Some(bbox),
                figure_region: None,
                reason: FailureReason::NoCaptionBody,
            });
            continue;
        }

        captions.push(Caption {
            page: start.page,
            kind: start.kind,
            number: start.number,
            bbox,
            text,
            embedded_in_graphics,
        });
    }

    captions
}

fn ends_with_sentence(line: &crate::text::TextLine) -> bool {
    line.words.last().map(|w| w.ends_with_period()).unwrap_or(false)
}

/// Any ink in the bands directly above or below the caption?
fn has_adjacent_graphics(graphics: &Bitmap, bbox: &Rect, stats: &DocumentStatistics) -> bool {
    let band = 3.0 * stats.mode_font();
    let above = Rect::new(bbox.x0, bbox.y0 - band, bbox.x1, bbox.y0);
    let below = Rect::new(bbox.x0, bbox.y1, bbox.x1, bbox.y1 + band);
    graphics.density_in(&above) > 0.02 || graphics.density_in(&below) > 0.02
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{TextLine, TextWord};

    fn word(text: &str, x0: f32, y0: f32, x1: f32, bold: bool) -> TextWord {
        TextWord {
            text: text.to_string(),
            bbox: Rect::new(x0, y0, x1, y0 + 10.0),
            font_name: "Times-Roman".to_string(),
            font_size: 10.0,
            bold,
            italic: false,
        }
    }

    fn line(text: &str, x0: f32, y0: f32, x1: f32, bold: bool) -> TextLine {
        let words: Vec<&str> = text.split_whitespace().collect();
        let step = (x1 - x0) / words.len().max(1) as f32;
        TextLine::new(
            words
                .iter()
                .enumerate()
                .map(|(i, w)| word(w, x0 + i as f32 * step, y0, x0 + (i + 1) as f32 * step - 2.0, bold))
                .collect(),
        )
    }

    fn body_page(number: usize) -> Page {
        let fillers = [
            "the quick brown fox jumps over the dog",
            "pack my box with five dozen liquor jugs",
            "how vexingly quick daft zebras jump by",
            "sphinx of black quartz judge my vow now",
        ];
        let mut lines = Vec::new();
        for i in 0..16 {
            lines.push(line(fillers[i % fillers.len()], 72.0, 80.0 + i as f32 * 14.0, 540.0, false));
        }
        Page {
            number,
            width: 612.0,
            height: 792.0,
            lines,
        }
    }

    fn stats_for(pages: &[&Page]) -> DocumentStatistics {
        let graphics = Bitmap::new(612, 792, 1.0);
        let view: Vec<(&Page, &Bitmap)> = pages.iter().map(|p| (*p, &graphics)).collect();
        DocumentStatistics::analyze(&view, &ExtractionConfig::new()).unwrap()
    }

    #[test]
    fn test_parse_caption_marker() {
        assert_eq!(
            parse_caption_marker("Figure 3: results"),
            Some((FigureType::Figure, 3, true))
        );
        assert_eq!(
            parse_caption_marker("fig. 12 shows"),
            Some((FigureType::Figure, 12, false))
        );
        assert_eq!(
            parse_caption_marker("TABLE IV."),
            Some((FigureType::Table, 4, true))
        );
        assert_eq!(parse_caption_marker("Tab. 2)"), Some((FigureType::Table, 2, true)));
        assert_eq!(parse_caption_marker("Figures are nice"), None);
        assert_eq!(parse_caption_marker("The figure 3 shows"), None);
    }

    #[test]
    fn test_parse_roman() {
        assert_eq!(parse_roman("iv"), Some(4));
        assert_eq!(parse_roman("XIX"), Some(19));
        assert_eq!(parse_roman("C"), Some(100));
        assert_eq!(parse_roman("q"), None);
    }

    #[test]
    fn test_parse_roman_subtractive_prefix() {
        // The subtracted digit comes first, so accumulation dips below zero
        assert_eq!(parse_roman("IV"), Some(4));
        assert_eq!(parse_roman("ix"), Some(9));
        assert_eq!(parse_roman("XL"), Some(40));
        assert_eq!(parse_roman("xc"), Some(90));
        assert_eq!(parse_roman("XLIV"), Some(44));
    }

    #[test]
    fn test_detects_bold_caption() {
        let mut page = body_page(0);
        page.lines.push(line("Figure 1: a bold caption", 150.0, 400.0, 460.0, true));
        let pages = [&page];
        let stats = stats_for(&pages);
        let mut failures = Vec::new();
        let starts = detect_caption_starts(&pages, &stats, &mut failures);
        assert!(failures.is_empty());
        let on_page = &starts[&0];
        assert_eq!(on_page.len(), 1);
        assert_eq!(on_page[0].kind, FigureType::Figure);
        assert_eq!(on_page[0].number, 1);
    }

    #[test]
    fn test_out_of_sequence_is_a_failure() {
        let mut page = body_page(0);
        page.lines.push(line("Figure 2: second", 150.0, 380.0, 460.0, true));
        page.lines.push(line("Figure 1: stale reference", 150.0, 420.0, 460.0, true));
        let pages = [&page];
        let stats = stats_for(&pages);
        let mut failures = Vec::new();
        let starts = detect_caption_starts(&pages, &stats, &mut failures);
        assert_eq!(starts[&0].len(), 1);
        assert_eq!(starts[&0][0].number, 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].reason, FailureReason::OutOfSequence);
    }

    #[test]
    fn test_duplicate_number_is_a_failure() {
        let mut page = body_page(0);
        page.lines.push(line("Figure 1: the real one", 150.0, 380.0, 460.0, true));
        page.lines.push(line("Figure 1 again", 150.0, 420.0, 460.0, true));
        let pages = [&page];
        let stats = stats_for(&pages);
        let mut failures = Vec::new();
        let starts = detect_caption_starts(&pages, &stats, &mut failures);
        assert_eq!(starts[&0].len(), 1);
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn test_figure_and_table_sequences_are_independent() {
        let mut page = body_page(0);
        page.lines.push(line("Figure 1: first figure", 150.0, 360.0, 460.0, true));
        page.lines.push(line("Table 1: first table", 150.0, 400.0, 460.0, true));
        page.lines.push(line("Figure 2: second figure", 150.0, 440.0, 460.0, true));
        let pages = [&page];
        let stats = stats_for(&pages);
        let mut failures = Vec::new();
        let starts = detect_caption_starts(&pages, &stats, &mut failures);
        assert!(failures.is_empty());
        assert_eq!(starts[&0].len(), 3);
    }

    #[test]
    fn test_bold_needs_centering_when_body_aligned() {
        // Both lines are bold, unpunctuated, and body-aligned; only the one
        // centered on the page qualifies as a caption start
        let mut page = body_page(0);
        page.lines.push(line("Figure 1 results were strong", 72.0, 380.0, 300.0, true));
        page.lines.push(line("Figure 2 overview of the system", 72.0, 420.0, 540.0, true));
        let pages = [&page];
        let stats = stats_for(&pages);
        let mut failures = Vec::new();
        let starts = detect_caption_starts(&pages, &stats, &mut failures);
        assert!(failures.is_empty());
        let on_page = &starts[&0];
        assert_eq!(on_page.len(), 1);
        assert_eq!(on_page[0].number, 2);
    }

    #[test]
    fn test_roman_numbered_table_is_detected() {
        let mut page = body_page(0);
        page.lines.push(line("TABLE IV. summary of measurements", 150.0, 400.0, 460.0, true));
        let pages = [&page];
        let stats = stats_for(&pages);
        let mut failures = Vec::new();
        let starts = detect_caption_starts(&pages, &stats, &mut failures);
        assert!(failures.is_empty());
        let on_page = &starts[&0];
        assert_eq!(on_page.len(), 1);
        assert_eq!(on_page[0].kind, FigureType::Table);
        assert_eq!(on_page[0].number, 4);
    }

    #[test]
    fn test_body_aligned_plain_text_is_not_a_start() {
        // "Figure 3" with no punctuation, body font, body margin: implausible
        let mut page = body_page(0);
        page.lines.push(line("Figure 3 shows how captions work out", 72.0, 380.0, 540.0, false));
        let pages = [&page];
        let stats = stats_for(&pages);
        let mut failures = Vec::new();
        let starts = detect_caption_starts(&pages, &stats, &mut failures);
        assert!(starts.is_empty());
        assert!(failures.is_empty());
    }

    #[test]
    fn test_builds_multiline_caption() {
        let mut page = body_page(0);
        let start_index = page.lines.len();
        page.lines.push(line("Figure 1: a caption that keeps", 150.0, 400.0, 420.0, true));
        page.lines.push(line("going on a second line", 150.0, 413.0, 400.0, true));
        // Body text after a clear gap must not be swallowed
        page.lines.push(line("normal body text resumes here", 72.0, 440.0, 540.0, false));
        let pages = [&page];
        let stats = stats_for(&pages);
        let graphics = Bitmap::new(612, 792, 1.0);
        let starts = vec![CaptionStart {
            page: 0,
            kind: FigureType::Figure,
            number: 1,
            line_index: start_index,
        }];
        let mut failures = Vec::new();
        let captions =
            build_captions(&starts, &page, &stats, &graphics, &ExtractionConfig::new(), &mut failures);
        assert_eq!(captions.len(), 1);
        let caption = &captions[0];
        assert!(caption.text.starts_with("Figure 1:"));
        assert!(caption.text.contains("second line"));
        assert!(!caption.text.contains("body text"));
        assert_eq!(caption.bbox.y0, 400.0);
        assert_eq!(caption.bbox.y1, 423.0);
    }

    #[test]
    fn test_caption_stops_at_next_start() {
        let mut page = body_page(0);
        let first = page.lines.len();
        page.lines.push(line("Figure 1: one", 150.0, 400.0, 420.0, true));
        page.lines.push(line("Figure 2: two", 150.0, 413.0, 420.0, true));
        let pages = [&page];
        let stats = stats_for(&pages);
        let graphics = Bitmap::new(612, 792, 1.0);
        let starts = vec![
            CaptionStart {
                page: 0,
                kind: FigureType::Figure,
                number: 1,
                line_index: first,
            },
            CaptionStart {
                page: 0,
                kind: FigureType::Figure,
                number: 2,
                line_index: first + 1,
            },
        ];
        let mut failures = Vec::new();
        let captions =
            build_captions(&starts, &page, &stats, &graphics, &ExtractionConfig::new(), &mut failures);
        assert_eq!(captions.len(), 2);
        assert!(!captions[0].text.contains("two"));
    }

    #[test]
    fn test_marker_only_without_graphics_is_a_failure() {
        let mut page = body_page(0);
        let start_index = page.lines.len();
        page.lines.push(line("Figure 1", 280.0, 400.0, 330.0, true));
        let pages = [&page];
        let stats = stats_for(&pages);
        let graphics = Bitmap::new(612, 792, 1.0);
        let starts = vec![CaptionStart {
            page: 0,
            kind: FigureType::Figure,
            number: 1,
            line_index: start_index,
        }];
        let mut failures = Vec::new();
        let captions =
            build_captions(&starts, &page, &stats, &graphics, &ExtractionConfig::new(), &mut failures);
        assert!(captions.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].reason, FailureReason::NoCaptionBody);
    }

    #[test]
    fn test_marker_only_inside_graphics_is_tagged_embedded() {
        let mut page = body_page(0);
        let start_index = page.lines.len();
        page.lines.push(line("Figure 1", 280.0, 400.0, 330.0, true));
        let pages = [&page];
        let stats = stats_for(&pages);
        let mut graphics = Bitmap::new(612, 792, 1.0);
        graphics.fill_page_rect(&Rect::new(200.0, 300.0, 400.0, 450.0));
        let starts = vec![CaptionStart {
            page: 0,
            kind: FigureType::Figure,
            number: 1,
            line_index: start_index,
        }];
        let mut failures = Vec::new();
        let captions =
            build_captions(&starts, &page, &stats, &graphics, &ExtractionConfig::new(), &mut failures);
        assert_eq!(captions.len(), 1);
        assert!(captions[0].embedded_in_graphics);
        assert!(failures.is_empty());
    }
}
