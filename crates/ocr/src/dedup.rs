//! L3 Semantic Deduplication (§4.3): collapses runs of `BestShot`s whose OCR
//! text is near-identical to the last retained slide, using the same
//! Gestalt pattern-matching ratio as Python's `difflib.SequenceMatcher`.

use similar::TextDiff;

/// Stateful deduplicator: remembers only the last *retained* slide's text,
/// never the full history, matching the funnel's one-in-flight contract.
pub struct SemanticDedup {
    similarity_threshold: f64,
    last_retained: Option<String>,
}

impl SemanticDedup {
    #[must_use]
    pub fn new(similarity_threshold: f64) -> Self {
        Self { similarity_threshold, last_retained: None }
    }

    /// Decides whether `text` describes a new slide worth keeping.
    ///
    /// A blank OCR result is always rejected — no text means no reliable
    /// signal to distinguish it from its neighbors. The first non-empty
    /// text is always retained. After that, `text` is kept only if its
    /// similarity ratio against the last retained text falls below the
    /// configured threshold.
    pub fn should_retain(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }

        let Some(last) = &self.last_retained else {
            self.last_retained = Some(trimmed.to_string());
            return true;
        };

        let ratio = similarity_ratio(last, trimmed);
        if ratio < self.similarity_threshold {
            self.last_retained = Some(trimmed.to_string());
            true
        } else {
            false
        }
    }
}

/// Normalizes text the way `ocr_deduper.py::calculate_similarity` does:
/// lowercase, then drop all whitespace, so OCR case jitter and line-wrap
/// differences never register as a change in content.
fn normalize(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect()
}

/// Gestalt pattern-matching ratio over normalized, character-level text —
/// the Rust equivalent of `difflib.SequenceMatcher(None, a, b).ratio()`.
fn similarity_ratio(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize(a), normalize(b));
    f64::from(TextDiff::from_chars(a.as_str(), b.as_str()).ratio())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_always_rejected() {
        let mut dedup = SemanticDedup::new(0.90);
        assert!(!dedup.should_retain(""));
        assert!(!dedup.should_retain("   "));
    }

    #[test]
    fn test_first_nonempty_text_always_retained() {
        let mut dedup = SemanticDedup::new(0.90);
        assert!(dedup.should_retain("Quarterly Results"));
    }

    #[test]
    fn test_near_identical_text_is_rejected() {
        let mut dedup = SemanticDedup::new(0.90);
        assert!(dedup.should_retain("Quarterly Results 2024"));
        // Single stray OCR character, still effectively the same slide.
        assert!(!dedup.should_retain("Quarterly Resu1ts 2024"));
    }

    #[test]
    fn test_distinct_text_is_retained() {
        let mut dedup = SemanticDedup::new(0.90);
        assert!(dedup.should_retain("Introduction"));
        assert!(dedup.should_retain("Architecture Overview and System Design"));
    }

    #[test]
    fn test_similarity_ratio_identity() {
        assert_eq!(similarity_ratio("Quarterly Results 2024", "Quarterly Results 2024"), 1.0);
    }

    #[test]
    fn test_similarity_ratio_against_empty_is_zero() {
        assert_eq!(similarity_ratio("Quarterly Results 2024", ""), 0.0);
    }

    #[test]
    fn test_similarity_ratio_ignores_case_and_whitespace() {
        // Same content, different case and line-wrapping: must still read
        // as identical, since OCR case jitter carries no semantic change.
        assert_eq!(similarity_ratio("Agenda", "AGENDA"), 1.0);
        assert_eq!(similarity_ratio("Quarterly\nResults  2024", "quarterly results 2024"), 1.0);
    }
}
