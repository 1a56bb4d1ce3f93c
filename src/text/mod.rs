//! Text-layout input model.
//!
//! The rendering collaborator supplies each page as ordered lines of words
//! with font and position metadata. These types are read-only for the
//! duration of the pipeline; every later stage borrows them.

use crate::geometry::Rect;

/// A single word as placed on the page.
#[derive(Debug, Clone)]
pub struct TextWord {
    /// The word's text content.
    pub text: String,
    /// Bounding box in page coordinates.
    pub bbox: Rect,
    /// Font name as reported by the renderer (may carry a subset prefix
    /// such as `ABCDEF+` and a style suffix).
    pub font_name: String,
    /// Font size in points.
    pub font_size: f32,
    /// Bold flag from the renderer.
    pub bold: bool,
    /// Italic flag from the renderer.
    pub italic: bool,
}

impl TextWord {
    /// True if the word renders bold, either by flag or by font name.
    pub fn is_bold(&self) -> bool {
        self.bold || self.font_name.to_ascii_lowercase().contains("bold")
    }

    /// True if the word renders italic, either by flag or by font name.
    pub fn is_italic(&self) -> bool {
        let lower = self.font_name.to_ascii_lowercase();
        self.italic || lower.contains("italic") || lower.contains("oblique")
    }

    /// True if the word's text ends with a period.
    pub fn ends_with_period(&self) -> bool {
        self.text.ends_with('.')
    }
}

/// An ordered sequence of words sharing a baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Words on the line, in reading order.
    pub words: Vec<TextWord>,
}

impl TextLine {
    /// Create a line from its words.
    pub fn new(words: Vec<TextWord>) -> Self {
        Self { words }
    }

    /// Bounding box covering every word on the line.
    ///
    /// Empty lines do not occur in renderer output; an empty line yields a
    /// degenerate zero rectangle.
    pub fn bbox(&self) -> Rect {
        Rect::union_all(self.words.iter().map(|w| w.bbox))
            .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0))
    }

    /// The line's text with single spaces between words.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&word.text);
        }
        out
    }

    /// First word of the line, if any.
    pub fn first_word(&self) -> Option<&TextWord> {
        self.words.first()
    }
}

/// One page of text layout.
#[derive(Debug, Clone)]
pub struct Page {
    /// Zero-based page index in document order.
    pub number: usize,
    /// Page width in page units.
    pub width: f32,
    /// Page height in page units.
    pub height: f32,
    /// Lines in layout order (top to bottom within each column).
    pub lines: Vec<TextLine>,
}

impl Page {
    /// The page rectangle in page coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Strip a subset prefix (`ABCDEF+Times-Bold` → `Times-Bold`) and a style
/// suffix (`Times-Bold` → `Times`) from a renderer font name, leaving the
/// family. Caption and figure-label text often shares a family with body text
/// but never the exact subset name, so comparisons must use the family.
pub fn font_base_name(font_name: &str) -> &str {
    let name = match font_name.split_once('+') {
        Some((prefix, rest)) if prefix.len() == 6 => rest,
        _ => font_name,
    };
    name.split(['-', ',']).next().unwrap_or(name)
}
