//! Size-bounded refinement of over-long structural segments.
//!
//! Header-scoped segments preserve topical coherence but can exceed the
//! embedding window. The refiner re-splits them along a prioritized
//! separator hierarchy, falling through to finer separators only where a
//! fragment is still too long, then repacks fragments into pieces of at
//! most `max_safe_len` characters with `overlap` characters of trailing
//! context carried into each subsequent piece.
//!
//! All lengths are character counts. The character-level separator of last
//! resort splits on grapheme-cluster boundaries so combined glyphs are
//! never torn apart.

use unicode_segmentation::UnicodeSegmentation;

use super::types::char_len;

/// Outcome of refining one segment's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refined {
    /// The content fit within the bound and passes through unchanged.
    Intact(String),
    /// The content was re-split into overlapping, bounded pieces.
    Split(Vec<String>),
}

/// Re-splits over-long text into overlapping, length-bounded pieces.
#[derive(Debug, Clone)]
pub struct SizeBoundedRefiner {
    max_safe_len: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl SizeBoundedRefiner {
    /// Create a refiner.
    ///
    /// # Panics
    ///
    /// Panics if `max_safe_len == 0`, `overlap >= max_safe_len`, or
    /// `separators` is empty.
    #[must_use]
    pub fn new(max_safe_len: usize, overlap: usize, separators: &[String]) -> Self {
        assert!(max_safe_len > 0, "max_safe_len must be > 0");
        assert!(overlap < max_safe_len, "overlap must be < max_safe_len");
        assert!(!separators.is_empty(), "separators must not be empty");
        Self {
            max_safe_len,
            overlap,
            separators: separators.to_vec(),
        }
    }

    /// Refine one segment's content.
    pub fn refine(&self, content: &str) -> Refined {
        if char_len(content) <= self.max_safe_len {
            return Refined::Intact(content.to_string());
        }
        // Fragments are bounded by max_safe_len - overlap so that a piece
        // seeded with the full overlap still fits the outer bound.
        let budget = self.max_safe_len - self.overlap;
        let mut fragments = Vec::new();
        self.fragment(content, 0, budget, &mut fragments);
        Refined::Split(self.repack(fragments))
    }

    /// Break `text` into fragments of at most `budget` characters, trying
    /// each separator in priority order before recursing into finer ones.
    fn fragment(&self, text: &str, sep_index: usize, budget: usize, out: &mut Vec<String>) {
        if char_len(text) <= budget {
            out.push(text.to_string());
            return;
        }
        if sep_index >= self.separators.len() {
            force_split(text, budget, out);
            return;
        }
        let sep = &self.separators[sep_index];
        if sep.is_empty() {
            force_split(text, budget, out);
            return;
        }
        let parts: Vec<&str> = text.split_inclusive(sep.as_str()).collect();
        if parts.len() == 1 {
            // Separator not present, try the next one.
            self.fragment(text, sep_index + 1, budget, out);
            return;
        }
        for part in parts {
            if char_len(part) <= budget {
                out.push(part.to_string());
            } else {
                self.fragment(part, sep_index + 1, budget, out);
            }
        }
    }

    /// Greedily merge fragments into pieces of at most `max_safe_len`
    /// characters, seeding each piece after the first with the trailing
    /// `overlap` characters of its predecessor.
    fn repack(&self, fragments: Vec<String>) -> Vec<String> {
        let mut pieces: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for fragment in fragments {
            let fragment_len = char_len(&fragment);
            if current_len > 0 && current_len + fragment_len > self.max_safe_len {
                let seed = tail_chars(&current, self.overlap);
                current_len = char_len(&seed);
                pieces.push(std::mem::replace(&mut current, seed));
            }
            current.push_str(&fragment);
            current_len += fragment_len;
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }
}

/// Unconditional splitting at grapheme-cluster boundaries, the separator of
/// last resort.
fn force_split(text: &str, budget: usize, out: &mut Vec<String>) {
    let mut piece = String::new();
    let mut count = 0usize;
    for grapheme in text.graphemes(true) {
        if count == budget {
            out.push(std::mem::take(&mut piece));
            count = 0;
        }
        piece.push_str(grapheme);
        count += 1;
    }
    if !piece.is_empty() {
        out.push(piece);
    }
}

/// The trailing `n` characters of `s` (all of `s` if it is shorter).
fn tail_chars(s: &str, n: usize) -> String {
    let total = char_len(s);
    if total <= n {
        return s.to_string();
    }
    s.chars().skip(total - n).collect()
}
