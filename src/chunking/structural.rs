//! Heading-based structural splitting of Markdown documents.
//!
//! The splitter walks the document line by line and opens a new segment at
//! every `#`, `##`, or `###` heading, tracking the heading hierarchy as it
//! goes. Splitting is verbatim: each source character lands in exactly one
//! segment, so concatenating segment contents reproduces the document.

use super::types::StructuralSegment;

/// Splits Markdown text into heading-scoped segments.
///
/// Heading lines stay inside the segment they introduce. Deeper headings
/// (`####` and below) and headings inside fenced code blocks are ordinary
/// content. A document with no recognized headings yields a single segment
/// with empty header fields.
pub fn split_by_headings(text: &str) -> Vec<StructuralSegment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut header_1 = String::new();
    let mut header_2 = String::new();
    let mut header_3 = String::new();
    let mut in_fence = false;

    let mut flush = |content: &mut String, h1: &str, h2: &str, h3: &str| {
        if !content.is_empty() {
            segments.push(StructuralSegment {
                header_1: h1.to_string(),
                header_2: h2.to_string(),
                header_3: h3.to_string(),
                content: std::mem::take(content),
            });
        }
    };

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            current.push_str(line);
            continue;
        }
        if in_fence {
            current.push_str(line);
            continue;
        }
        match heading_level(trimmed) {
            Some((level, title)) => {
                flush(&mut current, &header_1, &header_2, &header_3);
                match level {
                    1 => {
                        header_1 = title;
                        header_2.clear();
                        header_3.clear();
                    }
                    2 => {
                        header_2 = title;
                        header_3.clear();
                    }
                    _ => header_3 = title,
                }
                current.push_str(line);
            }
            None => current.push_str(line),
        }
    }
    flush(&mut current, &header_1, &header_2, &header_3);

    if segments.is_empty() {
        segments.push(StructuralSegment {
            header_1: String::new(),
            header_2: String::new(),
            header_3: String::new(),
            content: String::new(),
        });
    }
    segments
}

/// Recognizes an ATX heading of depth 1-3 on an already-trimmed line.
fn heading_level(line: &str) -> Option<(u8, String)> {
    for (marker, level) in [("###", 3u8), ("##", 2), ("#", 1)] {
        if let Some(rest) = line.strip_prefix(marker) {
            if rest.is_empty() {
                return Some((level, String::new()));
            }
            return rest
                .strip_prefix(' ')
                .map(|title| (level, title.trim().to_string()));
        }
    }
    None
}
