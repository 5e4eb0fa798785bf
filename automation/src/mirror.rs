use crate::surface::UiSurface;
use anyhow::{Context, Result, anyhow};
use enigo::{Enigo, KeyboardControllable, MouseButton, MouseControllable};
use image::DynamicImage;
use std::process::Command;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use xcap::Window;

/// Settle time after asking the OS to raise the window.
const ACTIVATE_SETTLE: Duration = Duration::from_millis(150);

/// Alternate [`UiSurface`] over a desktop screen-mirroring window.
///
/// A workaround for when no WDA endpoint is available: some mirroring tool
/// shows the device screen in a desktop window, this surface captures that
/// window and injects synthetic mouse/keyboard events into it. Frame
/// coordinates are physical pixels of the capture; the window position and
/// logical size are re-queried before every translation because the window
/// may move or resize between gestures. No app control is possible through
/// a mirror.
pub struct MirrorSurface {
    title_fragment: String,
    window: Option<Window>,
    enigo: Enigo,
    /// Dimensions of the most recent capture, for the pixel → logical
    /// transform. Defaults to the logical size until the first capture.
    frame_dims: Option<(u32, u32)>,
}

impl MirrorSurface {
    /// Bind to the first window whose title contains `title_fragment`.
    pub fn new(title_fragment: &str) -> Result<Self> {
        let mut surface = Self {
            title_fragment: title_fragment.to_string(),
            window: None,
            enigo: Enigo::new(),
            frame_dims: None,
        };
        surface.find_window()?;
        Ok(surface)
    }

    fn find_window(&mut self) -> Result<&Window> {
        if self.window.is_none() {
            let windows = Window::all().context("failed to enumerate desktop windows")?;
            let hit = windows
                .into_iter()
                .find(|w| match w.title() {
                    Ok(title) => title.contains(&self.title_fragment),
                    Err(_) => false,
                })
                .ok_or_else(|| {
                    anyhow!("no window with title containing {:?}", self.title_fragment)
                })?;
            info!(title = %hit.title().unwrap_or_default(), "bound mirror window");
            self.window = Some(hit);
        }
        Ok(self.window.as_ref().expect("window bound above"))
    }

    /// Bring the mirror window to the front. Synthetic events land on
    /// whichever window has focus, not at a position, so every input
    /// delivery activates first. Raising by pid is preferred; activating by
    /// app name is the fallback and is best-effort.
    fn activate(&mut self) -> Result<()> {
        let window = self.find_window()?;
        let pid = window.pid()? as i32;
        let app_name = window.app_name()?;

        let status = Command::new("osascript")
            .args(["-e", &frontmost_by_pid_script(pid)])
            .status();
        if !matches!(status, Ok(s) if s.success()) {
            warn!(pid, "raising by pid failed; activating by app name");
            let _ = Command::new("osascript")
                .args(["-e", &activate_by_name_script(&app_name)])
                .status();
        }

        thread::sleep(ACTIVATE_SETTLE);
        Ok(())
    }

    /// Translate frame pixels into desktop coordinates: frame pixels →
    /// window logical coordinates → absolute screen position.
    fn to_screen(&mut self, x: i32, y: i32) -> Result<(i32, i32)> {
        let window = self.find_window()?;
        let (win_x, win_y) = (window.x()?, window.y()?);
        let (win_w, win_h) = (window.width()?, window.height()?);
        let (frame_w, frame_h) = self.frame_dims.unwrap_or((win_w, win_h));

        let scale_x = win_w as f32 / frame_w.max(1) as f32;
        let scale_y = win_h as f32 / frame_h.max(1) as f32;
        let screen_x = win_x + (x as f32 * scale_x).round() as i32;
        let screen_y = win_y + (y as f32 * scale_y).round() as i32;
        debug!(x, y, screen_x, screen_y, "translated mirror coordinates");
        Ok((screen_x, screen_y))
    }
}

impl UiSurface for MirrorSurface {
    fn capture(&mut self) -> Result<DynamicImage> {
        let window = self.find_window()?;
        let image = window
            .capture_image()
            .context("failed to capture mirror window")?;
        let (w, h) = (image.width(), image.height());
        // Rebuild the buffer so xcap's image version need not match ours.
        let buffer = image::RgbaImage::from_raw(w, h, image.into_raw())
            .ok_or_else(|| anyhow!("capture buffer does not match its dimensions"))?;
        self.frame_dims = Some((w, h));
        Ok(DynamicImage::ImageRgba8(buffer))
    }

    fn send_tap(&mut self, x: i32, y: i32) -> Result<()> {
        self.activate()?;
        let (sx, sy) = self.to_screen(x, y)?;
        self.enigo.mouse_move_to(sx, sy);
        // Brief pause so the move registers before the click.
        thread::sleep(Duration::from_millis(60));
        self.enigo.mouse_click(MouseButton::Left);
        Ok(())
    }

    fn send_swipe(&mut self, from: (i32, i32), to: (i32, i32), duration: Duration) -> Result<()> {
        self.activate()?;
        let (fx, fy) = self.to_screen(from.0, from.1)?;
        let (tx, ty) = self.to_screen(to.0, to.1)?;

        const STEPS: i32 = 12;
        self.enigo.mouse_move_to(fx, fy);
        self.enigo.mouse_down(MouseButton::Left);
        for step in 1..=STEPS {
            let x = fx + (tx - fx) * step / STEPS;
            let y = fy + (ty - fy) * step / STEPS;
            self.enigo.mouse_move_to(x, y);
            thread::sleep(duration / STEPS as u32);
        }
        self.enigo.mouse_up(MouseButton::Left);
        Ok(())
    }

    fn send_keys(&mut self, text: &str) -> Result<()> {
        self.activate()?;
        self.enigo.key_sequence(text);
        Ok(())
    }

    fn size(&mut self) -> Result<(u32, u32)> {
        let window = self.find_window()?;
        Ok((window.width()?, window.height()?))
    }
}

fn frontmost_by_pid_script(pid: i32) -> String {
    format!(
        "tell application \"System Events\" to set frontmost of (first process whose unix id is {pid}) to true"
    )
}

fn activate_by_name_script(app_name: &str) -> String {
    format!("tell application \"{app_name}\" to activate")
}

#[cfg(test)]
mod tests {
    use super::{activate_by_name_script, frontmost_by_pid_script};

    #[test]
    fn pid_script_targets_system_events_with_the_unix_id() {
        let script = frontmost_by_pid_script(4242);
        assert!(script.contains("System Events"));
        assert!(script.contains("unix id is 4242"));
        assert!(script.contains("frontmost"));
    }

    #[test]
    fn name_script_activates_the_named_app() {
        assert_eq!(
            activate_by_name_script("QuickTime Player"),
            "tell application \"QuickTime Player\" to activate"
        );
    }
}
