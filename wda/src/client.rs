use crate::error::{Result, WdaError};
use crate::protocol::{ElementRect, ElementRef, Envelope, SessionResponse, WindowSize};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::DynamicImage;
use reqwest::blocking::{Client, Response};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default WDA endpoint, reachable once USB tunneling is set up.
pub const DEFAULT_WDA_URL: &str = "http://localhost:8100";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Stateful client for one WebDriverAgent endpoint.
///
/// Owns at most one live session. Every session-scoped operation passes
/// through [`ensure_session`](Self::ensure_session), so a missing session is
/// created implicitly exactly once and reused afterwards; WDA behavior with
/// two concurrent sessions is undefined, and the guard never double-creates.
pub struct WdaClient {
    base_url: String,
    http: Client,
    session_id: Option<String>,
}

impl WdaClient {
    pub fn new(wda_url: &str) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: wda_url.trim_end_matches('/').to_string(),
            http,
            session_id: None,
        })
    }

    /// Id of the live session, if one exists.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    // ---- transport helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(resp: Response) -> Result<Value> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(WdaError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json()?)
    }

    fn get(&self, path: &str) -> Result<Value> {
        Self::check(self.http.get(self.url(path)).send()?)
    }

    fn post(&self, path: &str, body: Option<Value>) -> Result<Value> {
        let mut req = self.http.post(self.url(path));
        if let Some(body) = body {
            req = req.json(&body);
        }
        Self::check(req.send()?)
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
        serde_json::from_value(value).map_err(|e| WdaError::Decode(e.to_string()))
    }

    // ---- session lifecycle ----

    /// Create a session, optionally launching an app. Returns the existing
    /// session instead of creating a second one.
    pub fn create_session(&mut self, bundle_id: Option<&str>) -> Result<String> {
        if let Some(id) = &self.session_id {
            warn!(session = %id, "session already exists; not creating another");
            return Ok(id.clone());
        }

        let mut always_match = serde_json::Map::new();
        if let Some(bundle_id) = bundle_id {
            always_match.insert("bundleId".to_string(), json!(bundle_id));
        }
        let payload = json!({
            "capabilities": {
                "alwaysMatch": always_match,
                "firstMatch": [{}],
            }
        });

        let value = self.post("/session", Some(payload))?;
        let resp: SessionResponse = Self::decode(value)?;
        let id = resp
            .into_session_id()
            .ok_or_else(|| WdaError::Decode("session response carries no sessionId".into()))?;

        info!(session = %id, "created WDA session");
        self.session_id = Some(id.clone());
        Ok(id)
    }

    /// Delete the live session, if any. Best-effort: a failed deletion is
    /// logged and the local handle is cleared regardless.
    pub fn delete_session(&mut self) {
        let Some(id) = self.session_id.take() else {
            return;
        };
        match self.http.delete(self.url(&format!("/session/{id}"))).send() {
            Ok(resp) if resp.status().is_success() => info!(session = %id, "deleted session"),
            Ok(resp) => {
                warn!(session = %id, status = %resp.status(), "session deletion rejected")
            }
            Err(err) => warn!(session = %id, error = %err, "failed to delete session"),
        }
    }

    /// Central lazy-session guard: the single place where a missing session
    /// is created.
    fn ensure_session(&mut self) -> Result<String> {
        match &self.session_id {
            Some(id) => Ok(id.clone()),
            None => self.create_session(None),
        }
    }

    fn session_path(&mut self, suffix: &str) -> Result<String> {
        let id = self.ensure_session()?;
        Ok(format!("/session/{id}{suffix}"))
    }

    // ---- queries ----

    /// Liveness probe. Never fails: transport errors and non-2xx statuses
    /// both report `false`.
    pub fn health_check(&self) -> bool {
        match self
            .http
            .get(self.url("/status"))
            .timeout(HEALTH_TIMEOUT)
            .send()
        {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                warn!(error = %err, "WDA health check failed");
                false
            }
        }
    }

    /// Full status payload (liveness + version info).
    pub fn status(&self) -> Result<Value> {
        self.get("/status")
    }

    /// Device screen size in points.
    pub fn window_size(&mut self) -> Result<(u32, u32)> {
        let path = self.session_path("/window/size")?;
        let env: Envelope<WindowSize> = Self::decode(self.get(&path)?)?;
        Ok((env.value.width, env.value.height))
    }

    /// Info about the foreground app.
    pub fn active_app_info(&mut self) -> Result<Value> {
        let path = self.session_path("/wda/activeAppInfo")?;
        let env: Envelope<Value> = Self::decode(self.get(&path)?)?;
        Ok(env.value)
    }

    /// Current UI hierarchy as XML, useful for debugging element locations.
    pub fn page_source(&mut self) -> Result<String> {
        let path = self.session_path("/source")?;
        let env: Envelope<String> = Self::decode(self.get(&path)?)?;
        Ok(env.value)
    }

    // ---- capture ----

    /// Screenshot of the device screen, decoded from the base64 PNG payload.
    pub fn screenshot(&self) -> Result<DynamicImage> {
        let bytes = self.screenshot_png()?;
        image::load_from_memory(&bytes)
            .map_err(|e| WdaError::Decode(format!("screenshot is not a valid image: {e}")))
    }

    /// Screenshot as raw PNG bytes.
    pub fn screenshot_png(&self) -> Result<Vec<u8>> {
        let env: Envelope<String> = Self::decode(self.get("/screenshot")?)?;
        BASE64
            .decode(env.value.as_bytes())
            .map_err(|e| WdaError::Decode(format!("screenshot payload is not base64: {e}")))
    }

    // ---- gestures ----

    pub fn tap(&mut self, x: i32, y: i32) -> Result<()> {
        let path = self.session_path("/wda/tap/0")?;
        self.post(&path, Some(json!({"x": x, "y": y})))?;
        debug!(x, y, "tapped");
        Ok(())
    }

    pub fn double_tap(&mut self, x: i32, y: i32) -> Result<()> {
        let path = self.session_path("/wda/doubleTap")?;
        self.post(&path, Some(json!({"x": x, "y": y})))?;
        debug!(x, y, "double tapped");
        Ok(())
    }

    /// Touch and hold for `duration` seconds.
    pub fn long_press(&mut self, x: i32, y: i32, duration: f64) -> Result<()> {
        let path = self.session_path("/wda/touchAndHold")?;
        self.post(&path, Some(json!({"x": x, "y": y, "duration": duration})))?;
        debug!(x, y, duration, "long pressed");
        Ok(())
    }

    /// Drag from start to end over `duration` seconds.
    pub fn swipe(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, duration: f64) -> Result<()> {
        let path = self.session_path("/wda/dragfromtoforduration")?;
        self.post(
            &path,
            Some(json!({
                "fromX": x1, "fromY": y1,
                "toX": x2, "toY": y2,
                "duration": duration,
            })),
        )?;
        debug!(x1, y1, x2, y2, "swiped");
        Ok(())
    }

    pub fn swipe_up(&mut self, distance: i32, duration: f64) -> Result<()> {
        let (cx, cy) = self.screen_center()?;
        self.swipe(cx, cy + distance / 2, cx, cy - distance / 2, duration)
    }

    pub fn swipe_down(&mut self, distance: i32, duration: f64) -> Result<()> {
        let (cx, cy) = self.screen_center()?;
        self.swipe(cx, cy - distance / 2, cx, cy + distance / 2, duration)
    }

    pub fn swipe_left(&mut self, distance: i32, duration: f64) -> Result<()> {
        let (cx, cy) = self.screen_center()?;
        self.swipe(cx + distance / 2, cy, cx - distance / 2, cy, duration)
    }

    pub fn swipe_right(&mut self, distance: i32, duration: f64) -> Result<()> {
        let (cx, cy) = self.screen_center()?;
        self.swipe(cx - distance / 2, cy, cx + distance / 2, cy, duration)
    }

    fn screen_center(&mut self) -> Result<(i32, i32)> {
        let (w, h) = self.window_size()?;
        Ok((w as i32 / 2, h as i32 / 2))
    }

    /// Type text through the keyboard; each character becomes a discrete
    /// key value.
    pub fn type_text(&mut self, text: &str) -> Result<()> {
        let keys: Vec<String> = text.chars().map(|c| c.to_string()).collect();
        let count = keys.len();
        let path = self.session_path("/wda/keys")?;
        self.post(&path, Some(json!({"value": keys})))?;
        debug!(chars = count, "typed text");
        Ok(())
    }

    /// Press a physical button: `home`, `volumeUp`, `volumeDown`.
    pub fn press_button(&mut self, name: &str) -> Result<()> {
        let path = self.session_path("/wda/pressButton")?;
        self.post(&path, Some(json!({"name": name})))?;
        debug!(button = name, "pressed button");
        Ok(())
    }

    pub fn home_screen(&mut self) -> Result<()> {
        self.press_button("home")
    }

    // ---- app control ----

    pub fn launch_app(&mut self, bundle_id: &str) -> Result<()> {
        let path = self.session_path("/wda/apps/launch")?;
        self.post(&path, Some(json!({"bundleId": bundle_id})))?;
        info!(bundle_id, "launched app");
        Ok(())
    }

    pub fn terminate_app(&mut self, bundle_id: &str) -> Result<()> {
        let path = self.session_path("/wda/apps/terminate")?;
        self.post(&path, Some(json!({"bundleId": bundle_id})))?;
        info!(bundle_id, "terminated app");
        Ok(())
    }

    // ---- native element lookup ----

    /// Find one element. A 404 is the protocol's "no such element" and maps
    /// to `Ok(None)`; every other non-2xx status propagates.
    pub fn find_element(&mut self, using: &str, value: &str) -> Result<Option<ElementRef>> {
        let path = self.session_path("/element")?;
        match self.post(&path, Some(json!({"using": using, "value": value}))) {
            Ok(resp) => {
                let env: Envelope<Value> = Self::decode(resp)?;
                Ok(ElementRef::from_value(&env.value))
            }
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn find_elements(&mut self, using: &str, value: &str) -> Result<Vec<ElementRef>> {
        let path = self.session_path("/elements")?;
        let resp = self.post(&path, Some(json!({"using": using, "value": value})))?;
        let env: Envelope<Vec<Value>> = Self::decode(resp)?;
        Ok(env
            .value
            .iter()
            .filter_map(ElementRef::from_value)
            .collect())
    }

    pub fn element_click(&mut self, element: &ElementRef) -> Result<()> {
        let path = self.session_path(&format!("/element/{}/click", element.id))?;
        self.post(&path, None)?;
        Ok(())
    }

    pub fn element_text(&mut self, element: &ElementRef) -> Result<String> {
        let path = self.session_path(&format!("/element/{}/text", element.id))?;
        let env: Envelope<String> = Self::decode(self.get(&path)?)?;
        Ok(env.value)
    }

    pub fn element_rect(&mut self, element: &ElementRef) -> Result<ElementRect> {
        let path = self.session_path(&format!("/element/{}/rect", element.id))?;
        let env: Envelope<ElementRect> = Self::decode(self.get(&path)?)?;
        Ok(env.value)
    }

    // ---- device state ----

    pub fn lock(&mut self) -> Result<()> {
        let path = self.session_path("/wda/lock")?;
        self.post(&path, None)?;
        Ok(())
    }

    pub fn unlock(&mut self) -> Result<()> {
        let path = self.session_path("/wda/unlock")?;
        self.post(&path, None)?;
        Ok(())
    }

    pub fn is_locked(&mut self) -> Result<bool> {
        let path = self.session_path("/wda/locked")?;
        let env: Envelope<bool> = Self::decode(self.get(&path)?)?;
        Ok(env.value)
    }

    pub fn set_clipboard(&mut self, content: &str, content_type: &str) -> Result<()> {
        let path = self.session_path("/wda/setPasteboard")?;
        self.post(
            &path,
            Some(json!({
                "content": BASE64.encode(content.as_bytes()),
                "contentType": content_type,
            })),
        )?;
        Ok(())
    }

    pub fn get_clipboard(&mut self) -> Result<String> {
        let path = self.session_path("/wda/getPasteboard")?;
        let env: Envelope<String> = Self::decode(self.post(&path, Some(json!({})))?)?;
        let bytes = BASE64
            .decode(env.value.as_bytes())
            .map_err(|e| WdaError::Decode(format!("clipboard payload is not base64: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| WdaError::Decode(format!("clipboard payload is not utf-8: {e}")))
    }
}

impl Drop for WdaClient {
    /// Backstop so a live session does not leak when the client is dropped
    /// on a panic or early return; scoped callers should still call
    /// `delete_session` explicitly.
    fn drop(&mut self) {
        self.delete_session();
    }
}
