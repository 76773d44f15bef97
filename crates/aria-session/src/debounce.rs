//! Voice command duplicate filtering.
//!
//! Speech transcription sometimes finalizes the same utterance twice in
//! quick succession (or as a near-superset, "stop" then "stop that").
//! [`VoiceCommandDebouncer`] drops the repeats before they turn into
//! duplicate commands.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Sliding-window duplicate detector for finalized transcripts.
///
/// Not thread safe by itself; the orchestrator wraps it in a mutex.
pub struct VoiceCommandDebouncer {
    window: Duration,
    min_overlap: f64,
    recent: Vec<(Instant, String)>,
}

impl VoiceCommandDebouncer {
    /// Create a debouncer.
    ///
    /// `min_overlap` is the minimum shorter/longer length ratio (0..=1)
    /// for a containment match to count as a duplicate.
    pub fn new(window: Duration, min_overlap: f64) -> Self {
        Self {
            window,
            min_overlap,
            recent: Vec::new(),
        }
    }

    /// Check a finalized transcript against recent ones.
    ///
    /// Non-duplicates are recorded; duplicates are not, so a stream of
    /// repeats cannot extend the window forever.
    pub fn is_duplicate(&mut self, text: &str) -> bool {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return false;
        }

        let now = Instant::now();
        self.recent.retain(|(at, _)| now - *at < self.window);

        let duplicate = self
            .recent
            .iter()
            .any(|(_, prior)| self.matches(prior, &normalized));
        if duplicate {
            debug!(text, "duplicate voice command dropped");
        } else {
            self.recent.push((now, normalized));
        }
        duplicate
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.recent.clear();
    }

    /// Containment in either direction plus a length-ratio floor:
    /// "stop" inside "stop that" matches, "a" inside a paragraph does not.
    fn matches(&self, a: &str, b: &str) -> bool {
        if !a.contains(b) && !b.contains(a) {
            return false;
        }
        let (shorter, longer) = if a.len() <= b.len() {
            (a.len(), b.len())
        } else {
            (b.len(), a.len())
        };
        shorter as f64 / longer as f64 >= self.min_overlap
    }
}

/// Lowercase, strip non-alphanumerics, collapse whitespace.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        } else {
            pending_space = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn debouncer() -> VoiceCommandDebouncer {
        VoiceCommandDebouncer::new(Duration::from_millis(3_000), 0.6)
    }

    #[test]
    fn normalization_strips_punctuation_and_case() {
        assert_eq!(normalize("Stop, please!"), "stop please");
        assert_eq!(normalize("  STOP   that  "), "stop that");
        assert_eq!(normalize("..."), "");
    }

    #[tokio::test(start_paused = true)]
    async fn exact_repeat_within_window_is_duplicate() {
        let mut d = debouncer();
        assert!(!d.is_duplicate("cancel that"));
        assert!(d.is_duplicate("cancel that"));
        assert!(d.is_duplicate("Cancel that!"));
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_after_window_is_fresh() {
        let mut d = debouncer();
        assert!(!d.is_duplicate("cancel that"));
        advance(Duration::from_millis(3_001)).await;
        assert!(!d.is_duplicate("cancel that"));
    }

    #[tokio::test(start_paused = true)]
    async fn near_superset_is_duplicate() {
        let mut d = debouncer();
        assert!(!d.is_duplicate("stop that"));
        // "stop tha" wouldn't arrive, but "stop that now" contains it
        // with ratio 9/13 ≈ 0.69 ≥ 0.6
        assert!(d.is_duplicate("stop that now"));
    }

    #[tokio::test(start_paused = true)]
    async fn small_substring_is_not_duplicate() {
        let mut d = debouncer();
        assert!(!d.is_duplicate("please summarize the whole document for me"));
        // contained, but ratio far below the floor
        assert!(!d.is_duplicate("me"));
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_text_is_fresh() {
        let mut d = debouncer();
        assert!(!d.is_duplicate("what's the weather"));
        assert!(!d.is_duplicate("send a message"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_transcript_is_never_duplicate() {
        let mut d = debouncer();
        assert!(!d.is_duplicate(""));
        assert!(!d.is_duplicate("   "));
        assert!(!d.is_duplicate("?!"));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicates_do_not_extend_the_window() {
        let mut d = debouncer();
        assert!(!d.is_duplicate("cancel"));
        advance(Duration::from_millis(2_000)).await;
        assert!(d.is_duplicate("cancel"));
        // 3s past the ORIGINAL record; the duplicate at 2s didn't renew it
        advance(Duration::from_millis(1_500)).await;
        assert!(!d.is_duplicate("cancel"));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_forgets_history() {
        let mut d = debouncer();
        assert!(!d.is_duplicate("cancel"));
        d.clear();
        assert!(!d.is_duplicate("cancel"));
    }
}
