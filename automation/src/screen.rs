use crate::surface::UiSurface;
use anyhow::{Context, Result};
use image::{DynamicImage, Rgba};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use ocr::{OcrEngine, TextMatch};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default poll pacing for [`ScreenText::wait_for_text`]. OCR inference
/// costs hundreds of milliseconds per frame, which bounds how fast polling
/// can usefully go.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Couples a frame source with an OCR engine and exposes text-oriented
/// queries with explicit freshness control.
///
/// The last captured frame is cached; it goes stale the instant the UI
/// changes, so every operation takes a `refresh` flag stating whether it
/// may reuse the cache or must re-capture. Decisions that must reflect
/// current state should always refresh.
pub struct ScreenText<S: UiSurface> {
    surface: S,
    engine: Box<dyn OcrEngine>,
    min_confidence: f32,
    last_frame: Option<DynamicImage>,
}

impl<S: UiSurface> ScreenText<S> {
    pub fn new(surface: S, engine: Box<dyn OcrEngine>, min_confidence: f32) -> Self {
        Self {
            surface,
            engine,
            min_confidence,
            last_frame: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Force a new capture, replacing the cached frame.
    pub fn refresh(&mut self) -> Result<&DynamicImage> {
        let frame = self.surface.capture().context("frame capture failed")?;
        self.last_frame = Some(frame);
        Ok(self.last_frame.as_ref().expect("frame was just cached"))
    }

    /// Invalidate the cache, forcing the next read to re-capture.
    pub fn invalidate(&mut self) {
        self.last_frame = None;
    }

    /// Find `target` on screen. Recognition misses are a normal outcome,
    /// never an error.
    pub fn find_text(
        &mut self,
        target: &str,
        refresh: bool,
        exact: bool,
    ) -> Result<Option<TextMatch>> {
        if refresh || self.last_frame.is_none() {
            self.refresh()?;
        }
        let frame = self.last_frame.as_ref().expect("cache filled above");
        self.engine
            .find_text(frame, target, exact, self.min_confidence)
    }

    /// All occurrences of `target` on screen.
    pub fn find_all_text(
        &mut self,
        target: &str,
        refresh: bool,
        exact: bool,
    ) -> Result<Vec<TextMatch>> {
        if refresh || self.last_frame.is_none() {
            self.refresh()?;
        }
        let frame = self.last_frame.as_ref().expect("cache filled above");
        self.engine
            .find_all_text(frame, target, exact, self.min_confidence)
    }

    /// Every text region on screen, in backend detection order.
    pub fn get_all_text(&mut self, refresh: bool) -> Result<Vec<TextMatch>> {
        if refresh || self.last_frame.is_none() {
            self.refresh()?;
        }
        let frame = self.last_frame.as_ref().expect("cache filled above");
        self.engine.extract_text(frame, self.min_confidence)
    }

    /// Find `target` and tap its center. Returns whether a match was found
    /// and tapped; the tap itself is not separately confirmed.
    pub fn tap_text(&mut self, target: &str, refresh: bool, exact: bool) -> Result<bool> {
        match self.find_text(target, refresh, exact)? {
            Some(hit) => {
                let (x, y) = hit.center();
                self.surface.send_tap(x, y)?;
                self.invalidate();
                info!(target, x, y, "tapped text");
                Ok(true)
            }
            None => {
                warn!(target, "text not found");
                Ok(false)
            }
        }
    }

    /// Poll until `target` appears or `timeout` elapses.
    ///
    /// The surface offers no event stream, so periodic re-capture and
    /// re-recognition is the only way to observe a change. Timeout is a
    /// normal outcome (`None`), not an error.
    pub fn wait_for_text(
        &mut self,
        target: &str,
        timeout: Duration,
        interval: Duration,
        exact: bool,
    ) -> Result<Option<TextMatch>> {
        let start = Instant::now();
        loop {
            if let Some(hit) = self.find_text(target, true, exact)? {
                info!(target, elapsed = ?start.elapsed(), "text appeared");
                return Ok(Some(hit));
            }
            if start.elapsed() >= timeout {
                warn!(target, ?timeout, "timed out waiting for text");
                return Ok(None);
            }
            thread::sleep(interval);
        }
    }

    /// Wait for `target`, then tap it.
    pub fn wait_and_tap_text(&mut self, target: &str, timeout: Duration, exact: bool) -> Result<bool> {
        match self.wait_for_text(target, timeout, DEFAULT_POLL_INTERVAL, exact)? {
            Some(hit) => {
                let (x, y) = hit.center();
                self.surface.send_tap(x, y)?;
                self.invalidate();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn text_exists(&mut self, target: &str, refresh: bool, exact: bool) -> Result<bool> {
        Ok(self.find_text(target, refresh, exact)?.is_some())
    }

    /// Save the current frame with recognized boxes drawn, for debugging
    /// recognition quality.
    pub fn save_annotated(&mut self, path: impl AsRef<Path>, refresh: bool) -> Result<()> {
        let matches = self.get_all_text(refresh)?;
        let frame = self.last_frame.as_ref().expect("get_all_text fills the cache");

        let mut annotated = frame.to_rgba8();
        for m in &matches {
            let rect = Rect::at(m.bbox.x as i32, m.bbox.y as i32)
                .of_size(m.bbox.width.max(1), m.bbox.height.max(1));
            draw_hollow_rect_mut(&mut annotated, rect, Rgba([0, 255, 0, 255]));
        }
        annotated
            .save(path.as_ref())
            .context("failed to save annotated screenshot")?;
        debug!(path = %path.as_ref().display(), boxes = matches.len(), "saved annotated screenshot");
        Ok(())
    }
}
