//! Book text segmentation: title, chapters, paragraphs.
//!
//! Chapter detection is an ordered table of marker-regex families tried
//! in priority order; the first family producing more than one match
//! partitions the book. Books without recognizable markers fall back to
//! ten equal-length chunks.

use once_cell::sync::Lazy;
use regex::Regex;

/// Title returned when no plausible title line is found.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Number of fallback chunks for books without chapter markers.
const FALLBACK_CHUNKS: usize = 10;

/// Chapter-marker families, in fixed priority order.
static CHAPTER_RULES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        ("chapter-arabic", Regex::new(r"Chapter \d+").unwrap()),
        ("chapter-upper", Regex::new(r"CHAPTER \d+").unwrap()),
        ("chapter-roman", Regex::new(r"Chapter [IVXLC]+").unwrap()),
        ("part-arabic", Regex::new(r"Part \d+").unwrap()),
    ]
});

/// One chapter (or fallback chunk) of the book.
#[derive(Debug, Clone)]
pub struct Chapter {
    /// 1-based chapter number.
    pub number: u32,
    /// Chapter text, marker included.
    pub text: String,
}

/// Extract the book title: the first non-empty line among the first ten
/// that is shorter than 100 characters and is not a chapter marker.
pub fn extract_title(text: &str) -> String {
    for line in text.lines().take(10) {
        let line = line.trim();
        if !line.is_empty() && line.chars().count() < 100 && !line.starts_with("Chapter") {
            return line.to_string();
        }
    }
    UNKNOWN_TITLE.to_string()
}

/// Split book text into chapters.
///
/// Tries each marker family in priority order and uses the first one
/// that matches more than once. Text before the first marker is treated
/// as front matter and dropped.
pub fn split_chapters(text: &str) -> Vec<Chapter> {
    for (family, rule) in CHAPTER_RULES.iter() {
        let starts: Vec<usize> = rule.find_iter(text).map(|m| m.start()).collect();
        if starts.len() > 1 {
            tracing::debug!(family, chapters = starts.len(), "chapter markers found");
            return starts
                .iter()
                .enumerate()
                .map(|(i, &start)| {
                    let end = starts.get(i + 1).copied().unwrap_or(text.len());
                    Chapter {
                        number: (i + 1) as u32,
                        text: text[start..end].to_string(),
                    }
                })
                .collect();
        }
    }

    tracing::debug!("no chapter markers; splitting into equal chunks");
    split_into_chunks(text, FALLBACK_CHUNKS)
}

/// Split a chapter into paragraphs on blank-line boundaries.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Partition text into roughly equal chunks, honoring char boundaries.
fn split_into_chunks(text: &str, count: usize) -> Vec<Chapter> {
    if text.is_empty() {
        return Vec::new();
    }

    let chunk_size = (text.len() / count).max(1);
    let mut chapters = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let end = floor_char_boundary(text, (start + chunk_size).min(text.len()));
        let end = if end <= start { text.len() } else { end };
        chapters.push(Chapter {
            number: (chapters.len() + 1) as u32,
            text: text[start..end].to_string(),
        });
        start = end;
    }
    chapters
}

/// Largest char boundary at or below `index`.
pub(crate) fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
