/// Bounding box of a detected text region, in frame pixels with a
/// top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center of the box in integer pixels.
    pub fn center(&self) -> (i32, i32) {
        (
            (self.x + self.width / 2) as i32,
            (self.y + self.height / 2) as i32,
        )
    }
}

/// A located text observation: one recognized region of a single frame.
///
/// Constructed fresh on every OCR pass and never mutated; matches must not
/// be cached across frames because the UI may have moved underneath them.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    /// Raw recognized content, not normalized.
    pub text: String,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl TextMatch {
    /// Build a match, clamping `confidence` into `[0, 1]`.
    pub fn new(text: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            bbox,
        }
    }

    /// Canonical tap target: the center of the bounding box.
    pub fn center(&self) -> (i32, i32) {
        self.bbox.center()
    }
}

/// Normalize a backend-native percentage confidence (0–100) into `[0, 1]`.
///
/// Order-preserving, so a floor configured against either scale filters
/// the same set of regions.
pub fn confidence_from_percent(percent: f32) -> f32 {
    (percent / 100.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::confidence_from_percent;

    #[test]
    fn percent_scale_maps_into_unit_range() {
        assert_eq!(confidence_from_percent(0.0), 0.0);
        assert_eq!(confidence_from_percent(30.0), 0.3);
        assert_eq!(confidence_from_percent(100.0), 1.0);
        assert_eq!(confidence_from_percent(250.0), 1.0);
    }

    #[test]
    fn normalization_preserves_ordering() {
        let raw = [12.0_f32, 45.0, 45.5, 88.0, 99.9];
        let normalized: Vec<f32> = raw.iter().map(|r| confidence_from_percent(*r)).collect();
        assert!(normalized.windows(2).all(|w| w[0] < w[1]));
    }
}
