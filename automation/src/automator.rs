use crate::screen::{DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT, ScreenText};
use crate::surface::UiSurface;
use anyhow::{Result, anyhow, bail};
use image::DynamicImage;
use ocr::OcrEngine;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use wda_client::WdaClient;

/// Select-all / backspace key values sent through the generic key channel
/// when clearing a field (WebDriver key codes).
const KEY_SELECT_ALL: &str = "\u{e009}a";
const KEY_BACKSPACE: &str = "\u{e003}";

const SWIPE_DURATION: Duration = Duration::from_millis(500);

/// Swipe direction for center-relative gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Tunable policy for the automator.
#[derive(Debug, Clone)]
pub struct AutomatorConfig {
    /// Settle delay after every discrete gesture. The protocol does not
    /// confirm that the UI has rendered its response, so the next
    /// screenshot is only meaningful after a pause.
    pub action_delay: Duration,
    /// Confidence floor handed to the OCR engine.
    pub min_confidence: f32,
    /// Default timeout for wait-style operations.
    pub wait_timeout: Duration,
    /// Poll pacing for wait-style operations.
    pub poll_interval: Duration,
    /// Extra settle time after launching an app.
    pub launch_settle: Duration,
    /// Default swipe distance in points.
    pub swipe_distance: u32,
}

impl Default for AutomatorConfig {
    fn default() -> Self {
        Self {
            action_delay: Duration::from_millis(300),
            min_confidence: ocr::DEFAULT_MIN_CONFIDENCE,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            launch_settle: Duration::from_secs(1),
            swipe_distance: 300,
        }
    }
}

/// Task-level automation over any [`UiSurface`], adding the policy the
/// lower layers intentionally omit: waiting, retrying, and action pacing.
///
/// Lower layers surface failures immediately; this is the one place that
/// absorbs them into control flow (`bool` / `Option`) for user-facing
/// operations. A failed find or tap reports `false` and logs a warning; it
/// never silently succeeds.
pub struct Automator<S: UiSurface> {
    screen: ScreenText<S>,
    config: AutomatorConfig,
    connected: bool,
}

impl<S: UiSurface> Automator<S> {
    pub fn new(surface: S, engine: Box<dyn OcrEngine>, config: AutomatorConfig) -> Self {
        let screen = ScreenText::new(surface, engine, config.min_confidence);
        Self {
            screen,
            config,
            connected: false,
        }
    }

    /// The screen-text coordinator, for callers that need finer freshness
    /// control than the task-level operations expose.
    pub fn screen(&mut self) -> &mut ScreenText<S> {
        &mut self.screen
    }

    fn settle(&self) {
        thread::sleep(self.config.action_delay);
    }

    // ---- basic actions ----

    /// Tap at frame coordinates, then settle.
    pub fn tap(&mut self, x: i32, y: i32) -> Result<()> {
        self.screen.surface_mut().send_tap(x, y)?;
        self.screen.invalidate();
        self.settle();
        Ok(())
    }

    /// Wait for `target` up to the configured `wait_timeout`, tap it if it
    /// appears. A miss is reported as `false`, not an error.
    pub fn tap_text(&mut self, target: &str) -> Result<bool> {
        self.tap_text_within(target, self.config.wait_timeout)
    }

    /// [`tap_text`](Self::tap_text) with an explicit timeout.
    pub fn tap_text_within(&mut self, target: &str, timeout: Duration) -> Result<bool> {
        let Some(hit) = self
            .screen
            .wait_for_text(target, timeout, self.config.poll_interval, false)?
        else {
            return Ok(false);
        };
        let (x, y) = hit.center();
        self.tap(x, y)?;
        Ok(true)
    }

    /// Single-shot check-and-tap with no wait, for optional UI such as
    /// dismissable dialogs.
    pub fn tap_if_exists(&mut self, target: &str) -> Result<bool> {
        let tapped = self.screen.tap_text(target, true, false)?;
        if tapped {
            self.settle();
        }
        Ok(tapped)
    }

    /// Swipe from the surface center in `direction`.
    pub fn swipe(&mut self, direction: SwipeDirection, distance: u32) -> Result<()> {
        let (w, h) = self.screen.surface_mut().size()?;
        let (cx, cy) = (w as i32 / 2, h as i32 / 2);
        let d = distance as i32 / 2;
        let (from, to) = match direction {
            SwipeDirection::Up => ((cx, cy + d), (cx, cy - d)),
            SwipeDirection::Down => ((cx, cy - d), (cx, cy + d)),
            SwipeDirection::Left => ((cx + d, cy), (cx - d, cy)),
            SwipeDirection::Right => ((cx - d, cy), (cx + d, cy)),
        };
        self.screen
            .surface_mut()
            .send_swipe(from, to, SWIPE_DURATION)?;
        self.screen.invalidate();
        self.settle();
        Ok(())
    }

    /// Type text, optionally clearing the field first with select-all +
    /// backspace. The clear is two sequential key events with a short
    /// settle between them.
    pub fn type_text(&mut self, text: &str, clear_first: bool) -> Result<()> {
        if clear_first {
            self.screen.surface_mut().send_keys(KEY_SELECT_ALL)?;
            thread::sleep(Duration::from_millis(100));
            self.screen.surface_mut().send_keys(KEY_BACKSPACE)?;
            thread::sleep(Duration::from_millis(100));
        }
        self.screen.surface_mut().send_keys(text)?;
        self.screen.invalidate();
        self.settle();
        Ok(())
    }

    // ---- screen state ----

    /// Wait for `target` up to the configured `wait_timeout`.
    pub fn wait_for_text(&mut self, target: &str) -> Result<bool> {
        self.wait_for_text_within(target, self.config.wait_timeout)
    }

    /// [`wait_for_text`](Self::wait_for_text) with an explicit timeout.
    pub fn wait_for_text_within(&mut self, target: &str, timeout: Duration) -> Result<bool> {
        Ok(self
            .screen
            .wait_for_text(target, timeout, self.config.poll_interval, false)?
            .is_some())
    }

    pub fn text_exists(&mut self, target: &str) -> Result<bool> {
        self.screen.text_exists(target, true, false)
    }

    /// All visible text, content only.
    pub fn get_all_text(&mut self) -> Result<Vec<String>> {
        Ok(self
            .screen
            .get_all_text(true)?
            .into_iter()
            .map(|m| m.text)
            .collect())
    }

    /// Center coordinates of `target`, if visible.
    pub fn find_text_location(&mut self, target: &str) -> Result<Option<(i32, i32)>> {
        Ok(self
            .screen
            .find_text(target, true, false)?
            .map(|m| m.center()))
    }

    /// Swipe in `direction` until `target` becomes visible, at most
    /// `max_scrolls` times, then check once more. Text already visible
    /// means no scroll at all.
    pub fn scroll_to_text(
        &mut self,
        target: &str,
        direction: SwipeDirection,
        max_scrolls: u32,
    ) -> Result<bool> {
        for attempt in 0..max_scrolls {
            if self.text_exists(target)? {
                debug!(target, attempt, "text visible");
                return Ok(true);
            }
            self.swipe(direction, self.config.swipe_distance)?;
        }
        self.text_exists(target)
    }

    // ---- utilities ----

    /// Block for `duration`.
    pub fn wait(&self, duration: Duration) {
        thread::sleep(duration);
    }

    /// Capture a frame, optionally saving it.
    pub fn screenshot(&mut self, save_path: Option<&Path>) -> Result<DynamicImage> {
        let frame = self.screen.refresh()?.clone();
        if let Some(path) = save_path {
            frame.save(path)?;
            debug!(path = %path.display(), "screenshot saved");
        }
        Ok(frame)
    }

    /// Run `op` up to `max_attempts` times, sleeping `delay` between failed
    /// attempts. The sole generic failure-recovery primitive: when every
    /// attempt fails, the last failure propagates.
    pub fn retry<T>(
        &mut self,
        max_attempts: u32,
        delay: Duration,
        mut op: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let mut last_err = None;
        for attempt in 1..=max_attempts {
            match op(self) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(attempt, max_attempts, error = %err, "attempt failed");
                    last_err = Some(err);
                    if attempt < max_attempts {
                        thread::sleep(delay);
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("retry invoked with zero attempts")))
    }
}

/// Session-aware operations for the WDA backend.
///
/// State machine: Disconnected → Connected → Disconnected, linear, one
/// session at a time. Re-entrant connect is a warning no-op.
impl Automator<WdaClient> {
    /// Build an automator over a WDA endpoint.
    pub fn over_wda(
        wda_url: &str,
        engine: Box<dyn OcrEngine>,
        config: AutomatorConfig,
    ) -> Result<Self> {
        let client = WdaClient::new(wda_url)?;
        Ok(Self::new(client, engine, config))
    }

    /// Health-check the endpoint and create the session.
    pub fn connect(&mut self) -> Result<()> {
        if self.connected {
            warn!("already connected; ignoring re-entrant connect");
            return Ok(());
        }
        if !self.wda().health_check() {
            bail!("WebDriverAgent endpoint is not responding");
        }
        self.wda().create_session(None)?;
        self.connected = true;
        info!("connected to device");
        Ok(())
    }

    /// Delete the session. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        self.wda().delete_session();
        self.connected = false;
        info!("disconnected from device");
    }

    /// Scoped session: connect, run `body`, and disconnect on every exit
    /// path, including when `body` fails.
    pub fn run_session<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.connect()?;
        let result = body(self);
        self.disconnect();
        result
    }

    fn wda(&mut self) -> &mut WdaClient {
        self.screen.surface_mut()
    }

    pub fn double_tap(&mut self, x: i32, y: i32) -> Result<()> {
        self.wda().double_tap(x, y)?;
        self.screen.invalidate();
        self.settle();
        Ok(())
    }

    pub fn long_press(&mut self, x: i32, y: i32, duration: Duration) -> Result<()> {
        self.wda().long_press(x, y, duration.as_secs_f64())?;
        self.screen.invalidate();
        self.settle();
        Ok(())
    }

    pub fn press_home(&mut self) -> Result<()> {
        self.wda().home_screen()?;
        self.screen.invalidate();
        self.settle();
        Ok(())
    }

    /// Launch an app and give it time to draw its first screen.
    pub fn launch_app(&mut self, bundle_id: &str) -> Result<()> {
        self.wda().launch_app(bundle_id)?;
        self.screen.invalidate();
        thread::sleep(self.config.launch_settle);
        Ok(())
    }

    pub fn close_app(&mut self, bundle_id: &str) -> Result<()> {
        self.wda().terminate_app(bundle_id)?;
        self.screen.invalidate();
        self.settle();
        Ok(())
    }

    /// Bundle id of the foreground app.
    pub fn current_app(&mut self) -> Result<String> {
        let info = self.wda().active_app_info()?;
        Ok(info
            .get("bundleId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    /// Tap a native element by accessibility label. Faster than OCR when
    /// the label exists; `false` when it does not.
    pub fn tap_element_by_label(&mut self, label: &str) -> Result<bool> {
        let Some(element) = self.wda().find_element("accessibility id", label)? else {
            return Ok(false);
        };
        self.wda().element_click(&element)?;
        self.screen.invalidate();
        self.settle();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::test_support::{FakeSurface, StubEngine};
    use ocr::BoundingBox;

    fn automator_with_region(text: &str) -> (
        Automator<FakeSurface>,
        std::rc::Rc<std::cell::RefCell<crate::screen::test_support::SurfaceLog>>,
    ) {
        let (surface, log) = FakeSurface::new(390, 844);
        let engine = StubEngine::with_region(text, BoundingBox::new(100, 200, 80, 30));
        let config = AutomatorConfig {
            action_delay: Duration::from_millis(1),
            poll_interval: Duration::from_millis(10),
            ..AutomatorConfig::default()
        };
        (Automator::new(surface, engine, config), log)
    }

    fn automator_blank() -> (
        Automator<FakeSurface>,
        std::rc::Rc<std::cell::RefCell<crate::screen::test_support::SurfaceLog>>,
    ) {
        let (surface, log) = FakeSurface::new(390, 844);
        let config = AutomatorConfig {
            action_delay: Duration::from_millis(1),
            poll_interval: Duration::from_millis(10),
            ..AutomatorConfig::default()
        };
        (Automator::new(surface, StubEngine::empty(), config), log)
    }

    #[test]
    fn tap_text_taps_region_center_and_reports_true() {
        let (mut auto, log) = automator_with_region("General");
        let tapped = auto.tap_text("general").unwrap();
        assert!(tapped);
        assert_eq!(log.borrow().taps, vec![(140, 215)]);
    }

    #[test]
    fn tap_text_miss_is_false_not_error() {
        let (mut auto, log) = automator_blank();
        let tapped = auto
            .tap_text_within("general", Duration::from_millis(30))
            .unwrap();
        assert!(!tapped);
        assert!(log.borrow().taps.is_empty());
    }

    #[test]
    fn tap_text_defaults_to_the_configured_wait_timeout() {
        let (surface, log) = FakeSurface::new(390, 844);
        let config = AutomatorConfig {
            action_delay: Duration::from_millis(1),
            poll_interval: Duration::from_millis(10),
            wait_timeout: Duration::from_millis(25),
            ..AutomatorConfig::default()
        };
        let mut auto = Automator::new(surface, StubEngine::empty(), config);

        let start = std::time::Instant::now();
        assert!(!auto.tap_text("general").unwrap());
        // Bounded by the configured timeout, not the 10 s fallback.
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(log.borrow().captures >= 2);
    }

    #[test]
    fn retry_invokes_exactly_max_attempts_and_returns_last_error() {
        let (mut auto, _log) = automator_blank();
        let mut calls = 0;
        let err = auto
            .retry(3, Duration::from_millis(1), |_| {
                calls += 1;
                Err::<(), _>(anyhow!("boom {calls}"))
            })
            .unwrap_err();
        assert_eq!(calls, 3);
        assert_eq!(err.to_string(), "boom 3");
    }

    #[test]
    fn retry_stops_on_first_success() {
        let (mut auto, _log) = automator_blank();
        let mut calls = 0;
        let value = auto
            .retry(5, Duration::from_millis(1), |_| {
                calls += 1;
                if calls < 3 { Err(anyhow!("not yet")) } else { Ok(42) }
            })
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn scroll_to_text_does_not_scroll_when_already_visible() {
        let (mut auto, log) = automator_with_region("Bluetooth");
        assert!(auto.scroll_to_text("bluetooth", SwipeDirection::Up, 5).unwrap());
        assert!(log.borrow().swipes.is_empty());
    }

    #[test]
    fn scroll_to_text_exhausts_scrolls_then_reports_false() {
        let (mut auto, log) = automator_blank();
        assert!(!auto.scroll_to_text("bluetooth", SwipeDirection::Up, 3).unwrap());
        assert_eq!(log.borrow().swipes.len(), 3);
        // max_scrolls checks plus the final one
        assert_eq!(log.borrow().captures, 4);
    }

    #[test]
    fn swipe_up_is_center_relative() {
        let (mut auto, log) = automator_blank();
        auto.swipe(SwipeDirection::Up, 300).unwrap();
        assert_eq!(log.borrow().swipes, vec![((195, 572), (195, 272))]);
    }

    #[test]
    fn clear_first_sends_select_all_then_backspace_then_text() {
        let (mut auto, log) = automator_blank();
        auto.type_text("hello", true).unwrap();
        assert_eq!(
            log.borrow().keys,
            vec![
                KEY_SELECT_ALL.to_string(),
                KEY_BACKSPACE.to_string(),
                "hello".to_string()
            ]
        );
    }

    #[test]
    fn tap_if_exists_is_single_shot() {
        let (mut auto, log) = automator_blank();
        assert!(!auto.tap_if_exists("maybe").unwrap());
        assert_eq!(log.borrow().captures, 1);
    }
}
