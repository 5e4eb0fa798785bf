//! Session lifecycle tests for the WDA-backed automator, against a mock
//! endpoint.

use anyhow::anyhow;
use automation::{Automator, AutomatorConfig};
use image::DynamicImage;
use ocr::{OcrEngine, TextMatch};
use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Engine that never recognizes anything; these tests only exercise the
/// session machinery.
struct BlindEngine;

impl OcrEngine for BlindEngine {
    fn extract_text(
        &mut self,
        _frame: &DynamicImage,
        _min_confidence: f32,
    ) -> anyhow::Result<Vec<TextMatch>> {
        Ok(Vec::new())
    }
}

fn start_endpoint(rt: &Runtime, expected_deletes: u64) -> MockServer {
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": {}})))
            .mount(&server),
    );
    rt.block_on(
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"sessionId": "S1", "value": {}})),
            )
            .expect(1)
            .mount(&server),
    );
    rt.block_on(
        Mock::given(method("DELETE"))
            .and(path("/session/S1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(expected_deletes)
            .mount(&server),
    );
    server
}

fn automator(url: &str) -> Automator<wda_client::WdaClient> {
    Automator::over_wda(url, Box::new(BlindEngine), AutomatorConfig::default())
        .expect("automator builds")
}

#[test]
fn session_is_released_when_the_body_fails() {
    let rt = Runtime::new().unwrap();
    let server = start_endpoint(&rt, 1);

    let mut auto = automator(&server.uri());
    let result: anyhow::Result<()> = auto.run_session(|_auto| Err(anyhow!("scripted failure")));

    assert!(result.is_err());
    // Mock expectations verify exactly one DELETE /session/S1 on drop of
    // the server; the failing body must not skip the release.
    rt.block_on(server.verify());
}

#[test]
fn successful_body_returns_its_value_and_releases() {
    let rt = Runtime::new().unwrap();
    let server = start_endpoint(&rt, 1);

    let mut auto = automator(&server.uri());
    let value = auto.run_session(|_auto| Ok(7)).unwrap();

    assert_eq!(value, 7);
    rt.block_on(server.verify());
}

#[test]
fn reentrant_connect_is_a_noop() {
    let rt = Runtime::new().unwrap();
    let server = start_endpoint(&rt, 1);

    let mut auto = automator(&server.uri());
    auto.connect().unwrap();
    // Second connect must not create a second session; POST /session is
    // mounted with expect(1).
    auto.connect().unwrap();
    auto.disconnect();
    rt.block_on(server.verify());
}
