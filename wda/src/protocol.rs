use serde::Deserialize;
use serde_json::Value;

/// The W3C element key; older WDA builds use the bare `ELEMENT` key.
const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Generic `{"value": ...}` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub value: T,
}

/// Session creation response; the id shows up either at the top level or
/// nested under `value` depending on the WDA build.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionResponse {
    pub session_id: Option<String>,
    #[serde(default)]
    pub value: Option<SessionValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionValue {
    pub session_id: Option<String>,
}

impl SessionResponse {
    pub fn into_session_id(self) -> Option<String> {
        self.session_id
            .or_else(|| self.value.and_then(|v| v.session_id))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WindowSize {
    pub width: u32,
    pub height: u32,
}

/// Handle to a native UI element returned by element lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub id: String,
}

impl ElementRef {
    /// Extract the element id from a lookup response value, accepting both
    /// the W3C key and the legacy `ELEMENT` key.
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        let id = value
            .get(W3C_ELEMENT_KEY)
            .or_else(|| value.get("ELEMENT"))?
            .as_str()?;
        Some(Self { id: id.to_string() })
    }
}

/// Bounding rectangle of a native element, in points.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct ElementRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}
