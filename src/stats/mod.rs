//! Document-wide statistics.
//!
//! One pass over every page's text layout (plus the graphics-only rasters)
//! produces the priors every later stage decides against: the body-text font,
//! column margins, header and page-number patterns, and whether body text
//! sits on top of dense graphics. Built once per document, immutable after
//! construction, and shared by reference across page workers.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::raster::Bitmap;
use crate::text::{font_base_name, Page, TextLine, TextWord};

lazy_static! {
    static ref PAGE_NUMBER_RE: Regex =
        Regex::new(r"(?i)^[\s\-–—.]*(page\s+)?\d+[\s\-–—.]*$").unwrap();
}

/// Left-margin clusters are only treated as separate columns when they sit at
/// least this far apart; closer clusters are paragraph indentation.
const COLUMN_SEPARATION_MIN: f32 = 40.0;

/// Which body column a line's edges align to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// The leftmost (or only) column.
    First,
    /// The second column of a two-column layout.
    Second,
}

/// Immutable document-level priors consumed by every pipeline stage.
#[derive(Debug)]
pub struct DocumentStatistics {
    total_words: usize,
    total_lines: usize,
    num_pages: usize,
    mode_font: f32,
    mode_font_name: String,
    l_margin_first: f32,
    l_margin_second: f32,
    r_margin_first: f32,
    r_margin_second: f32,
    two_column: bool,
    has_page_numbers: bool,
    image_filled: bool,
    page_center: f32,
    page_width: f32,
    page_height: f32,
    bold_centers: HashMap<i32, u32>,
    page_headers: HashMap<String, u32>,
    margin_tolerance: f32,
    large_font_ratio: f32,
    center_tolerance: f32,
}

impl DocumentStatistics {
    /// Aggregate statistics over the whole document.
    ///
    /// `pages` pairs each page's text layout with its graphics-only bitmap
    /// (already intersected with the full render by the driver). The bitmap
    /// is only consulted for the `image_filled` prior; everything else comes
    /// from the text layout.
    pub fn analyze(pages: &[(&Page, &Bitmap)], config: &ExtractionConfig) -> Result<Self> {
        if pages.is_empty() {
            return Err(Error::EmptyDocument);
        }

        let mut font_sizes: HashMap<i32, u32> = HashMap::new();
        let mut font_names: HashMap<String, u32> = HashMap::new();
        let mut l_margins: HashMap<i32, u32> = HashMap::new();
        let mut r_margins: HashMap<i32, u32> = HashMap::new();
        let mut bold_centers: HashMap<i32, u32> = HashMap::new();
        let mut page_headers: HashMap<String, u32> = HashMap::new();
        let mut total_words = 0usize;
        let mut total_lines = 0usize;
        let mut pages_with_numbers = 0usize;

        for (page, _) in pages {
            let mut top_line: Option<(&TextLine, f32)> = None;
            let mut bottom_line: Option<(&TextLine, f32)> = None;

            for line in &page.lines {
                if line.words.is_empty() {
                    continue;
                }
                total_lines += 1;
                total_words += line.words.len();
                let bbox = line.bbox();

                *l_margins.entry(bbox.x0.round() as i32).or_insert(0) += 1;
                *r_margins.entry(bbox.x1.round() as i32).or_insert(0) += 1;

                for word in &line.words {
                    *font_sizes.entry((word.font_size * 2.0).round() as i32).or_insert(0) += 1;
                    *font_names
                        .entry(font_base_name(&word.font_name).to_string())
                        .or_insert(0) += 1;
                }

                if majority_bold(line) {
                    *bold_centers.entry(center_bucket(bbox.center_x())).or_insert(0) += 1;
                }

                if top_line.map(|(_, y)| bbox.y0 < y).unwrap_or(true) {
                    top_line = Some((line, bbox.y0));
                }
                if bottom_line.map(|(_, y)| bbox.y1 > y).unwrap_or(true) {
                    bottom_line = Some((line, bbox.y1));
                }
            }

            if let Some((line, _)) = top_line {
                let key = normalize_header_text(&line.text());
                if !key.is_empty() {
                    *page_headers.entry(key).or_insert(0) += 1;
                }
            }
            let numbered = [top_line, bottom_line]
                .iter()
                .flatten()
                .any(|(line, _)| PAGE_NUMBER_RE.is_match(&line.text()));
            if numbered {
                pages_with_numbers += 1;
            }
        }

        let mode_font_key = top_key(&font_sizes).unwrap_or(24); // 12pt fallback
        let mode_font = mode_font_key as f32 / 2.0;
        let mode_font_name = font_names
            .iter()
            .max_by_key(|(_, &count)| count)
            .map(|(name, _)| name.clone())
            .unwrap_or_default();

        // Margin clusters: most frequent left edge is the first column; a
        // second frequent edge at column distance signals two-column layout.
        let (l_first_key, l_first_count) = top_entry(&l_margins).unwrap_or((0, 0));
        let second = l_margins
            .iter()
            .filter(|(&k, _)| (k - l_first_key).abs() as f32 > COLUMN_SEPARATION_MIN)
            .max_by_key(|(_, &count)| count)
            .map(|(&k, &count)| (k, count));

        let two_column = match second {
            Some((_, count)) => count * 3 >= l_first_count,
            None => false,
        };

        // Keep left-to-right order for the columns regardless of frequency
        let (l1, l2) = match second {
            Some((k, _)) if two_column && k < l_first_key => (k, l_first_key),
            Some((k, _)) if two_column => (l_first_key, k),
            _ => (l_first_key, l_first_key),
        };
        let l_margin_first = l1 as f32;
        let l_margin_second = l2 as f32;

        // Right margin per column: mode of right edges among the lines whose
        // left edge belongs to that column.
        let margin_tol = config.margin_tolerance;
        let mut r_first: HashMap<i32, u32> = HashMap::new();
        let mut r_second: HashMap<i32, u32> = HashMap::new();
        for (page, _) in pages {
            for line in &page.lines {
                if line.words.is_empty() {
                    continue;
                }
                let bbox = line.bbox();
                if (bbox.x0 - l_margin_first).abs() <= margin_tol {
                    *r_first.entry(bbox.x1.round() as i32).or_insert(0) += 1;
                } else if two_column && (bbox.x0 - l_margin_second).abs() <= margin_tol {
                    *r_second.entry(bbox.x1.round() as i32).or_insert(0) += 1;
                }
            }
        }
        let r_margin_first = top_key(&r_first)
            .or_else(|| top_key(&r_margins))
            .unwrap_or(0) as f32;
        let r_margin_second = if two_column {
            top_key(&r_second).unwrap_or(r_margin_first.round() as i32) as f32
        } else {
            r_margin_first
        };

        let num_pages = pages.len();
        let has_page_numbers = pages_with_numbers * 2 > num_pages;
        let (page_width, page_height) = (pages[0].0.width, pages[0].0.height);

        let mut stats = Self {
            total_words,
            total_lines,
            num_pages,
            mode_font,
            mode_font_name,
            l_margin_first,
            l_margin_second,
            r_margin_first,
            r_margin_second,
            two_column,
            has_page_numbers,
            image_filled: false,
            page_center: page_width / 2.0,
            page_width,
            page_height,
            bold_centers,
            page_headers,
            margin_tolerance: margin_tol,
            large_font_ratio: config.large_font_ratio,
            center_tolerance: config.center_tolerance,
        };

        // Body text over dense graphics signals a scanned or image-heavy
        // document; region detection has to raise its thresholds there.
        let mut body_lines = 0usize;
        let mut graphical_lines = 0usize;
        for (page, graphics) in pages {
            for line in &page.lines {
                if line.words.is_empty() {
                    continue;
                }
                let bbox = line.bbox();
                if stats.line_is_aligned(bbox.x0, bbox.x1).is_some() {
                    body_lines += 1;
                    if graphics.density_in(&bbox) > 0.5 {
                        graphical_lines += 1;
                    }
                }
            }
        }
        stats.image_filled = body_lines > 0 && graphical_lines * 2 > body_lines;

        log::debug!(
            "document statistics: {} pages, {} lines, mode font {:.1}pt '{}', \
             margins L[{:.0}, {:.0}] R[{:.0}, {:.0}], two_column={}, \
             page_numbers={}, image_filled={}",
            stats.num_pages,
            stats.total_lines,
            stats.mode_font,
            stats.mode_font_name,
            stats.l_margin_first,
            stats.l_margin_second,
            stats.r_margin_first,
            stats.r_margin_second,
            stats.two_column,
            stats.has_page_numbers,
            stats.image_filled,
        );

        Ok(stats)
    }

    /// The most frequent font size across the document, the body-text proxy.
    pub fn mode_font(&self) -> f32 {
        self.mode_font
    }

    /// The dominant font family name.
    pub fn mode_font_name(&self) -> &str {
        &self.mode_font_name
    }

    /// Number of pages the statistics were computed from.
    pub fn num_pages(&self) -> usize {
        self.num_pages
    }

    /// Total words seen during analysis.
    pub fn total_words(&self) -> usize {
        self.total_words
    }

    /// True if the word is notably larger than body text.
    pub fn word_is_large(&self, word: &TextWord) -> bool {
        word.font_size >= self.mode_font * self.large_font_ratio
    }

    /// True if the word's font family matches the document's dominant family.
    pub fn word_is_standard_font(&self, word: &TextWord) -> bool {
        font_base_name(&word.font_name) == self.mode_font_name
    }

    /// Which body column a line with edges `(x, x2)` aligns to, using the
    /// configured margin tolerance. `None` means the line does not sit in the
    /// body-text flow.
    pub fn line_is_aligned(&self, x: f32, x2: f32) -> Option<Column> {
        self.line_is_aligned_to_tol(x, x2, self.margin_tolerance, self.margin_tolerance)
    }

    /// Like [`line_is_aligned`](Self::line_is_aligned) with explicit left and
    /// right tolerances. The left edge must match a column's left margin; the
    /// right edge must not extend past that column's right margin (short last
    /// lines of a paragraph still count as body text).
    pub fn line_is_aligned_to_tol(&self, x: f32, x2: f32, l_tol: f32, r_tol: f32) -> Option<Column> {
        if (x - self.l_margin_first).abs() <= l_tol && x2 <= self.r_margin_first + r_tol {
            return Some(Column::First);
        }
        if self.two_column
            && (x - self.l_margin_second).abs() <= l_tol
            && x2 <= self.r_margin_second + r_tol
        {
            return Some(Column::Second);
        }
        None
    }

    /// True if the line's normalized text repeats at the top of a majority of
    /// pages (a running header).
    pub fn is_page_header(&self, line: &TextLine) -> bool {
        if self.num_pages < 2 {
            return false;
        }
        let key = normalize_header_text(&line.text());
        if key.is_empty() {
            return false;
        }
        self.page_headers
            .get(&key)
            .map(|&count| count as usize * 2 > self.num_pages)
            .unwrap_or(false)
    }

    /// True if the line looks like a page number on a document that numbers
    /// its pages.
    pub fn is_page_number(&self, line: &TextLine) -> bool {
        self.has_page_numbers && line.words.len() <= 3 && PAGE_NUMBER_RE.is_match(&line.text())
    }

    /// True if margin statistics show two stable left-margin clusters.
    pub fn document_is_two_column(&self) -> bool {
        self.two_column
    }

    /// True if a majority of the line's words render bold.
    pub fn line_is_bold(&self, line: &TextLine) -> bool {
        majority_bold(line)
    }

    /// True if a bold line with edges `(x, x2)` is centered: on the page (or
    /// column) center within tolerance, or on a horizontal position bold lines
    /// repeatedly center on across the document.
    pub fn is_bold_centered(&self, x: f32, x2: f32) -> bool {
        let center = (x + x2) / 2.0;
        let mut targets = vec![self.page_center];
        if self.two_column {
            targets.push((self.l_margin_first + self.r_margin_first) / 2.0);
            targets.push((self.l_margin_second + self.r_margin_second) / 2.0);
        }
        if targets.iter().any(|t| (center - t).abs() <= self.center_tolerance) {
            return true;
        }
        self.bold_centers
            .get(&center_bucket(center))
            .map(|&count| count >= 3)
            .unwrap_or(false)
    }

    /// True if body text commonly overlaps dense raster graphics (scanned or
    /// image-heavy documents).
    pub fn is_body_text_graphical(&self) -> bool {
        self.image_filled
    }

    /// Page width in page units (from the first page).
    pub fn page_width(&self) -> f32 {
        self.page_width
    }

    /// Page height in page units (from the first page).
    pub fn page_height(&self) -> f32 {
        self.page_height
    }

    /// Leftmost body margin.
    pub fn left_margin(&self) -> f32 {
        self.l_margin_first
    }

    /// Rightmost body margin across columns.
    pub fn right_margin(&self) -> f32 {
        self.r_margin_first.max(self.r_margin_second)
    }
}

fn majority_bold(line: &TextLine) -> bool {
    if line.words.is_empty() {
        return false;
    }
    let bold = line.words.iter().filter(|w| w.is_bold()).count();
    bold * 2 > line.words.len()
}

fn center_bucket(center: f32) -> i32 {
    (center / 5.0).round() as i32
}

/// Lowercase, digits collapsed, whitespace normalized: "Page 12 of 30" and
/// "Page 13 of 30" hash to the same header key.
fn normalize_header_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else if ch.is_ascii_digit() {
            if !out.ends_with('#') {
                out.push('#');
            }
            last_space = false;
        } else {
            out.extend(ch.to_lowercase());
            last_space = false;
        }
    }
    out.trim().to_string()
}

fn top_key(map: &HashMap<i32, u32>) -> Option<i32> {
    top_entry(map).map(|(k, _)| k)
}

fn top_entry(map: &HashMap<i32, u32>) -> Option<(i32, u32)> {
    // Ties broken toward the smaller key so results do not depend on hash
    // iteration order
    map.iter()
        .map(|(&k, &v)| (k, v))
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
}
