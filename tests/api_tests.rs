use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use voxgate::core::tts::StubTTS;
use voxgate::{ServerConfig, routes, state::AppState};

fn stub_config() -> ServerConfig {
    ServerConfig {
        tts_provider: "stub".to_string(),
        ..Default::default()
    }
}

async fn test_app() -> (Router, Arc<AppState>) {
    let app_state = AppState::with_provider(stub_config(), Arc::new(StubTTS::new()))
        .await
        .unwrap();
    (routes::create_app(app_state.clone()), app_state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header<'a>(response: &'a Response, name: &str) -> &'a str {
    response.headers()[name].to_str().unwrap()
}

async fn wait_for_job(app: &Router, job_id: &str) -> Value {
    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(get(&format!("/jobs/{job_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let status = body_json(response).await;
        if status["state"] == "completed" {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {job_id} did not complete");
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "OK");
}

#[tokio::test]
async fn test_synthesize_miss_then_hit() {
    let (app, state) = test_app().await;
    let body = json!({
        "text": "Your appointment is confirmed for Tuesday.",
        "voice_profile_id": "rachel",
        "language": "en"
    });

    let first = app
        .clone()
        .oneshot(json_request("POST", "/synthesize", body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header(&first, "x-cached"), "false");
    assert_eq!(header(&first, "x-audio-format"), "pcm");
    assert_eq!(header(&first, "x-voice-profile"), "rachel");
    assert_eq!(header(&first, "content-type"), "audio/pcm");
    let quality: f32 = header(&first, "x-quality-score").parse().unwrap();
    assert!(quality > 0.0 && quality <= 1.0);
    let first_audio = body_bytes(first).await;
    assert!(!first_audio.is_empty());

    let second = app
        .oneshot(json_request("POST", "/synthesize", body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header(&second, "x-cached"), "true");
    assert_eq!(body_bytes(second).await, first_audio);

    let (hits, misses, _, _) = state.core_state.cache.metrics().get_stats();
    assert_eq!((hits, misses), (1, 1));
}

#[tokio::test]
async fn test_synthesize_validation_errors() {
    let (app, _) = test_app().await;

    let cases = [
        json!({"text": "   ", "voice_profile_id": "rachel", "language": "en"}),
        json!({"text": "Hello", "voice_profile_id": "nobody", "language": "en"}),
        json!({"text": "Hello", "voice_profile_id": "rachel", "language": "ja"}),
    ];

    for body in cases {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/synthesize", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["status"], 400);
    }
}

#[tokio::test]
async fn test_provider_failure_maps_to_bad_gateway() {
    let stub = Arc::new(StubTTS::new());
    stub.set_fail_all(true);
    let app_state = AppState::with_provider(stub_config(), stub).await.unwrap();
    let app = routes::create_app(app_state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/synthesize",
            json!({"text": "Hello", "voice_profile_id": "rachel", "language": "en"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["kind"], "provider");
}

#[tokio::test]
async fn test_bulk_foreground_preserves_order() {
    let (app, _) = test_app().await;
    let texts = ["First sentence.", "A somewhat longer second sentence.", "Third."];

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/synthesize/bulk",
            json!({
                "texts": texts,
                "voice_profile_id": "adam",
                "language": "en",
                "background": false
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    for (text, result) in texts.iter().zip(results) {
        assert_eq!(result["cached"], false);

        // Each text is cached under its own key
        let single = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/synthesize",
                json!({"text": text, "voice_profile_id": "adam", "language": "en"}),
            ))
            .await
            .unwrap();
        assert_eq!(header(&single, "x-cached"), "true");
        let audio = body_bytes(single).await;
        assert_eq!(result["audio"].as_str().unwrap(), BASE64.encode(audio));
    }
}

#[tokio::test]
async fn test_bulk_rejects_empty_and_unknown_voice() {
    let (app, _) = test_app().await;

    let empty = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/synthesize/bulk",
            json!({"texts": [], "voice_profile_id": "adam", "language": "en"}),
        ))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .oneshot(json_request(
            "POST",
            "/synthesize/bulk",
            json!({"texts": ["Hi"], "voice_profile_id": "ghost", "language": "en"}),
        ))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bulk_background_job() {
    let (app, _) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/synthesize/bulk",
            json!({
                "texts": ["One.", "Two.", "   "],
                "voice_profile_id": "bella",
                "language": "en",
                "background": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let job_id = body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let status = wait_for_job(&app, &job_id).await;
    assert_eq!(status["kind"], "bulk");
    assert_eq!(status["total"], 3);
    assert_eq!(status["succeeded"], 2);
    assert_eq!(status["failed"], 1);
}

#[tokio::test]
async fn test_pregenerate_warms_cache() {
    let (app, state) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/pregenerate",
            json!({"voice_profile_id": "antoni", "language": "en"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    let phrases = state.core_state.coordinator.phrases().phrases().len();
    assert_eq!(json["phrases"], phrases);

    let status = wait_for_job(&app, json["job_id"].as_str().unwrap()).await;
    assert_eq!(status["kind"], "pregeneration");
    assert_eq!(status["succeeded"], phrases);

    let response = app
        .oneshot(json_request(
            "POST",
            "/synthesize",
            json!({"text": "One moment, please.", "voice_profile_id": "antoni", "language": "en"}),
        ))
        .await
        .unwrap();
    assert_eq!(header(&response, "x-cached"), "true");
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/jobs/does-not-exist")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["kind"], "not_found");
}

#[tokio::test]
async fn test_cache_invalidation() {
    let (app, _) = test_app().await;
    let body = json!({"text": "Invalidate me.", "voice_profile_id": "rachel", "language": "en"});

    let response = app
        .clone()
        .oneshot(json_request("POST", "/synthesize", body.clone()))
        .await
        .unwrap();
    assert_eq!(header(&response, "x-cached"), "false");

    let response = app
        .clone()
        .oneshot(json_request("DELETE", "/cache", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["invalidated"].as_str().unwrap().starts_with("tts:"));

    let response = app
        .oneshot(json_request("POST", "/synthesize", body))
        .await
        .unwrap();
    assert_eq!(header(&response, "x-cached"), "false");
}

#[tokio::test]
async fn test_voices_listing() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/voices")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let ids: Vec<&str> = json["voices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["rachel", "adam", "bella", "antoni"]);
}

#[tokio::test]
async fn test_health_report_reflects_traffic() {
    let (app, _) = test_app().await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/synthesize",
                json!({"text": "Health check.", "voice_profile_id": "rachel", "language": "en"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "OK");
    assert_eq!(json["windows"]["default"]["total"], 2);
    assert_eq!(json["windows"]["default"]["cache_hits"], 1);
    assert_eq!(json["sessions"]["active"], 0);
    assert_eq!(json["limiter"]["max_concurrent"], 50);
    assert_eq!(json["limiter"]["in_flight"], 0);
    assert_eq!(json["cache"]["sets"], 1);
}
