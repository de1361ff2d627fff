//! Dashboard HTTP contract against the bundled sample archives.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use rrdserve_core::store::RrdArchiveReader;
use rrdserve_gateway::{annotations::AnnotationStore, app_state::AppState, config, router};

const SAMPLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../sample");

const QUERY: &str = r#"{
  "panelId": 1,
  "range": {"from": "2017-01-17T05:14:42.237Z", "to": "2017-01-18T05:14:42.237Z",
            "raw": {"from": "now-24h", "to": "now"}},
  "rangeRaw": {"from": "now-24h", "to": "now"},
  "interval": "1m",
  "intervalMs": 60000,
  "targets": [
    {"target": "sample:ClientJobsIdle", "refId": "A", "hide": false, "type": "timeserie"},
    {"target": "sample:ClientJobsRunning", "refId": "B", "hide": false, "type": "timeserie"}
  ],
  "format": "json",
  "maxDataPoints": 1812
}"#;

const EVENTS: &str = r#"
- time: "2017-01-17T12:00:00Z"
  title: deploy
  tags: [release]
- time: "2017-01-16T00:00:00Z"
  title: too early
"#;

fn app_with_root(root: &str) -> Router {
    let cfg = config::load_from_str(&format!("version: 1\nserver:\n  rrdPath: \"{root}\"\n")).unwrap();
    let reader = Arc::new(RrdArchiveReader::new(root));
    let annotations = AnnotationStore::load_from_str(EVENTS).unwrap();
    router::build_router(AppState::with_parts(cfg, reader, annotations))
}

fn app() -> Router {
    app_with_root(SAMPLE)
}

async fn call(app: &Router, method: Method, uri: &str, body: &str) -> Response {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

async fn body_bytes(resp: Response) -> Vec<u8> {
    to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()
}

fn assert_cors(resp: &Response) {
    let h = resp.headers();
    assert_eq!(h["access-control-allow-origin"], "*");
    assert_eq!(h["access-control-allow-headers"], "accept, content-type");
    assert_eq!(h["access-control-allow-methods"], "GET,POST,HEAD,OPTIONS");
}

#[tokio::test]
async fn root_says_hello() {
    let resp = call(&app(), Method::GET, "/", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, br#"{"message":"hello"}"#);
}

#[tokio::test]
async fn preflight_carries_cors_headers() {
    let app = app();
    for uri in ["/query", "/search", "/annotations"] {
        let resp = call(&app, Method::OPTIONS, uri, "").await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        assert_cors(&resp);
    }
}

#[tokio::test]
async fn search_filters_by_prefix() {
    let app = app();

    let resp = call(&app, Method::POST, "/search", r#"{"target":"hoge"}"#).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, b"[]");

    let resp = call(&app, Method::POST, "/search", r#"{"target":"sample:"}"#).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_cors(&resp);
    let ids: Vec<String> = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(ids, vec!["sample:ClientJobsIdle", "sample:ClientJobsRunning"]);
}

#[tokio::test]
async fn search_against_missing_root_is_500() {
    let app = app_with_root("/definitely/not/here");
    let resp = call(&app, Method::POST, "/search", r#"{"target":""}"#).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let v: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(v["error"], "CATALOG_UNAVAILABLE");
}

#[tokio::test]
async fn query_returns_targets_in_order_within_budget() {
    let resp = call(&app(), Method::POST, "/query", QUERY).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_cors(&resp);

    let v: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    let entries = v.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["target"], "A");
    assert_eq!(entries[1]["target"], "B");

    for e in entries {
        let points = e["datapoints"].as_array().unwrap();
        assert!(!points.is_empty());
        assert!(points.len() <= 1812);
        assert!(points.iter().any(|p| p[0].is_number()));
        let ts: Vec<i64> = points.iter().map(|p| p[1].as_i64().unwrap()).collect();
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
        assert!(ts[0] >= 1_484_630_082_237);
        assert!(*ts.last().unwrap() < 1_484_716_482_237);
    }
}

#[tokio::test]
async fn repeated_query_is_byte_identical() {
    let app = app();
    let first = body_bytes(call(&app, Method::POST, "/query", QUERY).await).await;
    let second = body_bytes(call(&app, Method::POST, "/query", QUERY).await).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_metric_yields_empty_series_not_error() {
    let body = QUERY.replace("sample:ClientJobsRunning", "sample:NoSuchSource");
    let resp = call(&app(), Method::POST, "/query", &body).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let v: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(v[1]["target"], "B");
    assert_eq!(v[1]["datapoints"], serde_json::json!([]));
    assert!(!v[0]["datapoints"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_query_is_400_with_code() {
    let app = app();
    let zero_points = QUERY.replace("1812", "0");
    let huge_points = QUERY
        .replace("2017-01-17T05:14:42.237Z", "1970-01-01T00:00:00Z")
        .replace("1812", "1000000000000000");
    for body in ["{", r#"{"targets":[]}"#, zero_points.as_str(), huge_points.as_str()] {
        let resp = call(&app, Method::POST, "/query", body).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
        assert_cors(&resp);
        let v: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(v["error"], "INVALID_REQUEST");
    }
}

#[tokio::test]
async fn annotations_probe_and_lookup() {
    let app = app();

    let resp = call(&app, Method::GET, "/annotations", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, br#"{"message":"annotations"}"#);

    let req = r#"{
      "range": {"from": "2017-01-17T05:14:42.237Z", "to": "2017-01-18T05:14:42.237Z"},
      "rangeRaw": {"from": "now-24h", "to": "now"},
      "annotation": {"name": "deploys", "enable": true}
    }"#;
    let resp = call(&app, Method::POST, "/annotations", req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_cors(&resp);
    let v: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    let items = v.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "deploy");
    assert_eq!(items[0]["time"], 1_484_654_400_000_i64);
    assert_eq!(items[0]["annotation"]["name"], "deploys");
    assert_eq!(items[0]["isRegion"], false);
}

#[tokio::test]
async fn ops_endpoints_report_state() {
    let app = app();
    call(&app, Method::POST, "/search", r#"{"target":"hoge"}"#).await;
    call(&app, Method::POST, "/query", "{").await;

    let resp = call(&app, Method::GET, "/healthz", "").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&app, Method::GET, "/readyz", "").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&app, Method::GET, "/metrics", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(text.contains("rrdserve_requests_total{endpoint=\"search\",status=\"200\"} 1"));
    assert!(text.contains("rrdserve_requests_total{endpoint=\"query\",status=\"400\"} 1"));
    assert!(text.contains("rrdserve_draining 0"));
}
