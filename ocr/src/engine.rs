use crate::OcrResult;
use crate::result::TextMatch;
use image::DynamicImage;

/// Default confidence floor for extraction.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.3;

/// A text-recognition backend.
///
/// The only required operation is [`extract_text`](OcrEngine::extract_text);
/// the matching helpers are layered on top of it and shared by every
/// backend. Engines take `&mut self` because backend model instances are
/// generally not safe to invoke concurrently.
pub trait OcrEngine {
    /// Extract all text regions at or above `min_confidence`.
    ///
    /// Regions come back in the backend's native detection order; callers
    /// must not assume top-to-bottom reading order. A frame with no text is
    /// a normal outcome and yields an empty vec, not an error.
    fn extract_text(
        &mut self,
        frame: &DynamicImage,
        min_confidence: f32,
    ) -> OcrResult<Vec<TextMatch>>;

    /// First region whose text matches `target`, case-insensitively.
    ///
    /// Substring containment by default; `exact` requires full equality.
    fn find_text(
        &mut self,
        frame: &DynamicImage,
        target: &str,
        exact: bool,
        min_confidence: f32,
    ) -> OcrResult<Option<TextMatch>> {
        let matches = self.extract_text(frame, min_confidence)?;
        Ok(matches
            .into_iter()
            .find(|m| matches_target(&m.text, target, exact)))
    }

    /// All regions whose text matches `target`, same predicate as
    /// [`find_text`](OcrEngine::find_text).
    fn find_all_text(
        &mut self,
        frame: &DynamicImage,
        target: &str,
        exact: bool,
        min_confidence: f32,
    ) -> OcrResult<Vec<TextMatch>> {
        let mut matches = self.extract_text(frame, min_confidence)?;
        matches.retain(|m| matches_target(&m.text, target, exact));
        Ok(matches)
    }
}

/// Case-insensitive match predicate shared by the trait helpers.
///
/// Substring containment by default because on-screen labels often carry
/// decoration (truncation ellipses, badge counts, icons recognized as stray
/// characters) that defeats equality; `exact` is the escape hatch for
/// ambiguous short labels such as "Go" vs "Google".
pub fn matches_target(text: &str, target: &str, exact: bool) -> bool {
    let text = text.to_lowercase();
    let target = target.to_lowercase();
    if exact {
        text == target
    } else {
        text.contains(&target)
    }
}
