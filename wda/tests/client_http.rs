//! Protocol-level tests against a mock WDA endpoint.
//!
//! The client is synchronous, so the mock server runs on a multi-threaded
//! tokio runtime while the blocking calls are made from the test thread.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;
use tokio::runtime::Runtime;
use wda_client::{WdaClient, WdaError};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    rt: Runtime,
    server: MockServer,
}

impl Harness {
    fn start() -> Self {
        let rt = Runtime::new().expect("tokio runtime");
        let server = rt.block_on(MockServer::start());
        Self { rt, server }
    }

    fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    fn client(&self) -> WdaClient {
        WdaClient::new(&self.server.uri()).expect("client builds")
    }

    fn session_mock(&self) {
        self.mount(
            Mock::given(method("POST"))
                .and(path("/session"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"sessionId": "S1", "value": {}})),
                )
                .expect(1),
        );
    }

    fn delete_mock(&self) {
        self.mount(
            Mock::given(method("DELETE"))
                .and(path("/session/S1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null}))),
        );
    }
}

#[test]
fn create_session_reads_nested_session_id() {
    let h = Harness::start();
    h.mount(
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"value": {"sessionId": "NESTED"}})),
            ),
    );
    h.delete_mock();

    let mut client = h.client();
    let id = client.create_session(None).unwrap();
    assert_eq!(id, "NESTED");
    // The harness delete mock targets S1; clear manually so Drop is quiet.
    client.delete_session();
}

#[test]
fn gestures_create_one_implicit_session_and_reuse_it() {
    let h = Harness::start();
    h.session_mock(); // expect(1): a second creation would fail the test
    h.delete_mock();
    h.mount(
        Mock::given(method("POST"))
            .and(path("/session/S1/wda/tap/0"))
            .and(body_json(json!({"x": 10, "y": 20})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(2),
    );

    let mut client = h.client();
    assert!(client.session_id().is_none());
    client.tap(10, 20).unwrap();
    assert_eq!(client.session_id(), Some("S1"));
    client.tap(10, 20).unwrap();
    client.delete_session();
    assert!(client.session_id().is_none());
}

#[test]
fn swipe_up_is_computed_from_window_center() {
    let h = Harness::start();
    h.session_mock();
    h.delete_mock();
    h.mount(
        Mock::given(method("GET"))
            .and(path("/session/S1/window/size"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"value": {"width": 400, "height": 800}})),
            ),
    );
    h.mount(
        Mock::given(method("POST"))
            .and(path("/session/S1/wda/dragfromtoforduration"))
            .and(body_json(json!({
                "fromX": 200, "fromY": 550,
                "toX": 200, "toY": 250,
                "duration": 0.5,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(1),
    );

    let mut client = h.client();
    client.swipe_up(300, 0.5).unwrap();
}

#[test]
fn element_lookup_treats_404_as_absent() {
    let h = Harness::start();
    h.session_mock();
    h.delete_mock();
    h.mount(
        Mock::given(method("POST"))
            .and(path("/session/S1/element"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": {"error": "no such element"}
            }))),
    );

    let mut client = h.client();
    let found = client.find_element("accessibility id", "Missing").unwrap();
    assert!(found.is_none());
}

#[test]
fn other_protocol_errors_surface_status_and_body() {
    let h = Harness::start();
    h.session_mock();
    h.delete_mock();
    h.mount(
        Mock::given(method("POST"))
            .and(path("/session/S1/element"))
            .respond_with(ResponseTemplate::new(500).set_body_string("keyboard not present")),
    );

    let mut client = h.client();
    let err = client
        .find_element("accessibility id", "Anything")
        .unwrap_err();
    match err {
        WdaError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("keyboard not present"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[test]
fn health_check_swallows_transport_errors() {
    // Nothing listens on this port.
    let client = WdaClient::new("http://127.0.0.1:9").unwrap();
    assert!(!client.health_check());
}

#[test]
fn health_check_true_on_reachable_endpoint() {
    let h = Harness::start();
    h.mount(
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": {"ready": true}}))),
    );
    assert!(h.client().health_check());
}

#[test]
fn screenshot_decodes_base64_png() {
    let h = Harness::start();

    let mut png = Vec::new();
    image::DynamicImage::new_rgba8(4, 6)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    h.mount(
        Mock::given(method("GET"))
            .and(path("/screenshot"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"value": BASE64.encode(&png)})),
            ),
    );

    let client = h.client();
    let frame = client.screenshot().unwrap();
    assert_eq!((frame.width(), frame.height()), (4, 6));
}

#[test]
fn clipboard_round_trips_base64_payloads() {
    let h = Harness::start();
    h.session_mock();
    h.delete_mock();
    h.mount(
        Mock::given(method("POST"))
            .and(path("/session/S1/wda/setPasteboard"))
            .and(body_json(json!({
                "content": BASE64.encode("hello"),
                "contentType": "plaintext",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(1),
    );
    h.mount(
        Mock::given(method("POST"))
            .and(path("/session/S1/wda/getPasteboard"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"value": BASE64.encode("hello")})),
            ),
    );

    let mut client = h.client();
    client.set_clipboard("hello", "plaintext").unwrap();
    assert_eq!(client.get_clipboard().unwrap(), "hello");
}
