//! HTTP recommendation client against a local one-shot server.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::{json, Value};

use roomscan::{
    BoundingBox, Detection, HttpRecommendationClient, RecommendError, RecommendationClient,
    RecommendationSettings,
};

struct CapturedRequest {
    request_line: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Serve the given `(status, body)` responses, one per connection, in order.
fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<CapturedRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let mut captured = Vec::new();
        for (status, body) in responses {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));

            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");
            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header");
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((k, v)) = line.split_once(':') {
                    headers.push((k.trim().to_string(), v.trim().to_string()));
                }
            }
            let length = headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.parse::<usize>().ok())
                .unwrap_or(0);
            let mut body_bytes = vec![0u8; length];
            reader.read_exact(&mut body_bytes).expect("body");

            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let mut stream = stream;
            stream.write_all(response.as_bytes()).expect("write");
            stream.flush().expect("flush");

            captured.push(CapturedRequest {
                request_line: request_line.trim_end().to_string(),
                headers,
                body: String::from_utf8(body_bytes).expect("utf8 body"),
            });
        }
        captured
    });
    (format!("http://{}/analyze", addr), handle)
}

fn client(endpoint: String) -> HttpRecommendationClient {
    HttpRecommendationClient::new(&RecommendationSettings {
        endpoint,
        api_key: "test-key".to_string(),
        timeout: Duration::from_secs(5),
    })
}

fn detections() -> Vec<Detection> {
    vec![
        Detection::new("chair", 0.8734, BoundingBox::new(10, 20, 110, 220).unwrap()),
        Detection::new("bed", 0.5, BoundingBox::new(0, 0, 300, 200).unwrap()),
    ]
}

#[test]
fn posts_detections_with_bearer_token() {
    let (endpoint, server) = serve(vec![(200, r#"{"suggestions":["repaint"]}"#)]);
    let mut client = client(endpoint);

    let recommendation = client.analyze(&detections()).expect("recommendation");
    assert_eq!(
        recommendation.as_json(),
        &json!({"suggestions": ["repaint"]})
    );

    let requests = server.join().expect("server");
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.request_line.starts_with("POST /analyze"));
    assert_eq!(request.header("Authorization"), Some("Bearer test-key"));
    assert!(request
        .header("Content-Type")
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false));

    let body: Value = serde_json::from_str(&request.body).expect("json body");
    assert_eq!(
        body,
        json!({
            "objects": [
                {"label": "chair", "confidence": 0.87, "bbox": [10, 20, 110, 220]},
                {"label": "bed", "confidence": 0.5, "bbox": [0, 0, 300, 200]}
            ],
            "task": "room_renovation_analysis"
        })
    );
}

#[test]
fn empty_detection_list_is_sent_as_empty_array() {
    let (endpoint, server) = serve(vec![(200, "{}")]);
    let mut client = client(endpoint);

    client.analyze(&[]).expect("recommendation");

    let requests = server.join().expect("server");
    let body: Value = serde_json::from_str(&requests[0].body).expect("json body");
    assert_eq!(
        body,
        json!({"objects": [], "task": "room_renovation_analysis"})
    );
}

#[test]
fn server_error_carries_status_and_body() {
    let (endpoint, server) = serve(vec![(500, "\"internal error\"")]);
    let mut client = client(endpoint);

    let err = client.analyze(&detections()).unwrap_err();
    assert_eq!(
        err,
        RecommendError::Remote {
            status: 500,
            body: "\"internal error\"".to_string(),
        }
    );
    assert_eq!(err.to_string(), "500 \"internal error\"");
    server.join().expect("server");
}

#[test]
fn non_json_success_is_a_remote_error() {
    let (endpoint, server) = serve(vec![(200, "not json")]);
    let mut client = client(endpoint);

    match client.analyze(&detections()) {
        Err(RecommendError::Remote { status, body }) => {
            assert_eq!(status, 200);
            assert_eq!(body, "not json");
        }
        other => panic!("unexpected result {:?}", other),
    }
    server.join().expect("server");
}

#[test]
fn unreachable_endpoint_is_a_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let mut client = client(format!("http://127.0.0.1:{}/analyze", port));

    match client.analyze(&detections()) {
        Err(RecommendError::Transport(message)) => assert!(!message.is_empty()),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn identical_requests_are_sent_identically() {
    let (endpoint, server) = serve(vec![(200, r#"{"n":1}"#), (200, r#"{"n":1}"#)]);
    let mut client = client(endpoint);
    let objects = detections();

    let first = client.analyze(&objects).expect("first");
    let second = client.analyze(&objects).expect("second");
    assert_eq!(first, second);

    let requests = server.join().expect("server");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].body, requests[1].body);
}
