use anyhow::Result;
use image::DynamicImage;
use std::time::Duration;
use wda_client::WdaClient;

/// Capabilities the text-driven loop needs from a UI surface: a frame
/// source and a coordinate-addressed input sink.
///
/// The WDA client is the primary implementation; [`MirrorSurface`]
/// (screen mirroring plus synthetic desktop input) is the alternate one.
/// Coordinates are pixels in the most recently captured frame; backends
/// whose input space differs from their capture space own the transform.
///
/// [`MirrorSurface`]: crate::MirrorSurface
pub trait UiSurface {
    /// Capture a fresh frame of the surface.
    fn capture(&mut self) -> Result<DynamicImage>;

    /// Deliver a tap at frame coordinates.
    fn send_tap(&mut self, x: i32, y: i32) -> Result<()>;

    /// Deliver a drag between frame coordinates over `duration`.
    fn send_swipe(&mut self, from: (i32, i32), to: (i32, i32), duration: Duration) -> Result<()>;

    /// Deliver a string of key events.
    fn send_keys(&mut self, text: &str) -> Result<()>;

    /// Logical size of the surface, for center-relative gestures.
    fn size(&mut self) -> Result<(u32, u32)>;
}

impl UiSurface for WdaClient {
    fn capture(&mut self) -> Result<DynamicImage> {
        Ok(self.screenshot()?)
    }

    fn send_tap(&mut self, x: i32, y: i32) -> Result<()> {
        Ok(self.tap(x, y)?)
    }

    fn send_swipe(&mut self, from: (i32, i32), to: (i32, i32), duration: Duration) -> Result<()> {
        Ok(self.swipe(from.0, from.1, to.0, to.1, duration.as_secs_f64())?)
    }

    fn send_keys(&mut self, text: &str) -> Result<()> {
        Ok(self.type_text(text)?)
    }

    fn size(&mut self) -> Result<(u32, u32)> {
        Ok(self.window_size()?)
    }
}
