// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, with a mock
// LLM client injected through AppState.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use politicview::llm::{DisabledClient, DynLlmClient, MockClient};
use politicview::{router, AppState, Settings};

const BODY_LIMIT: usize = 1024 * 1024;

fn app_with(llm: DynLlmClient) -> Router {
    router(AppState::new(Settings::default(), llm))
}

fn test_router() -> Router {
    app_with(Arc::new(MockClient::new("mock reply")))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    send(app, req).await
}

async fn post(app: Router, uri: &str, payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST");
    send(app, req).await
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

#[tokio::test]
async fn health_reports_app_name() {
    let (status, v) = get(test_router(), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, json!({"status": "ok", "app": "PoliticView"}));
}

#[tokio::test]
async fn parties_lists_builtin_registry() {
    let (status, v) = get(test_router(), "/api/parties").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["region"], "Tamil Nadu");
    let ids: Vec<_> = v["parties"]
        .as_array()
        .expect("parties array")
        .iter()
        .map(|p| p["id"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(ids, vec!["ADMK", "BJP", "DMK", "TVK"]);
    assert_eq!(v["parties"][2]["searchTerms"], "DMK Stalin Tamil Nadu");
}

#[tokio::test]
async fn rank_filters_and_sorts_provider_records() {
    let payload = json!({
        "party": "dmk",
        "source": "newsdata",
        "items": [
            {"title": "Cricket scores", "description": "nothing political"},
            {"title": "DMK cadres meet", "pubDate": "2024-01-01 10:00:00"},
            {"title": "Stalin &amp; Udhayanidhi tour <b>Chennai</b>", "link": "https://x/1"}
        ]
    });
    let (status, v) = post(test_router(), "/api/rank", payload).await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["party"], "DMK");
    assert_eq!(v["minScore"], 40);
    assert_eq!(v["total"], 3);
    assert_eq!(v["kept"], 2);
    assert_eq!(v["items"][0]["title"], "Stalin & Udhayanidhi tour Chennai");
    assert_eq!(v["items"][0]["relevanceScore"], 100);
    assert_eq!(v["items"][0]["sourceType"], "newsdata");
    assert_eq!(v["items"][1]["relevanceScore"], 50);
}

#[tokio::test]
async fn rank_honours_strictness_and_explicit_min_score() {
    let items = json!([{"title": "Jayalalithaa anniversary"}]);
    let lenient = json!({"party": "ADMK", "source": "news", "items": items, "strictness": "lenient"});
    let (_, v) = post(test_router(), "/api/rank", lenient).await;
    assert_eq!(v["minScore"], 30);
    assert_eq!(v["kept"], 1);

    let strict = json!({"party": "ADMK", "source": "news", "items": items, "minScore": 41});
    let (_, v) = post(test_router(), "/api/rank", strict).await;
    assert_eq!(v["kept"], 0);
}

#[tokio::test]
async fn malformed_shapes_are_400() {
    let cases = [
        ("/api/rank", json!({"party": "DMK", "source": "news", "items": {"title": "x"}})),
        ("/api/rank", json!({"party": "DMK", "source": "telegram", "items": []})),
        ("/api/rank", json!({"party": "DMK", "source": "news", "items": [1, 2]})),
        ("/api/aggregate", json!({"party": "DMK", "feeds": {"fax": []}})),
        ("/api/aggregate", json!({"party": "DMK", "feeds": {"news": "x"}})),
        ("/api/quality", json!({"items": "nope"})),
    ];
    for (uri, payload) in cases {
        let (status, v) = post(test_router(), uri, payload.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {payload}");
        assert_eq!(v["error"], "invalid argument");
        assert!(v["message"].is_string());
    }
}

#[tokio::test]
async fn aggregate_builds_report_across_sources() {
    let payload = json!({
        "party": "TVK",
        "feeds": {
            "news": [
                {"title": "Vijay rally draws huge support", "publishedAt": "2024-02-01T08:00:00Z"},
                {"title": "Monsoon update"}
            ],
            "reddit": [
                {"title": "TVK manifesto", "selftext": "Critics oppose the plan", "created_utc": 1706774400}
            ],
            "youtube": []
        }
    });
    let (status, v) = post(test_router(), "/api/aggregate", payload).await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["totalItems"], 3);
    assert_eq!(v["filteredItems"], 2);
    assert_eq!(v["bySource"]["news"]["filtered"], 1);
    assert_eq!(v["bySource"]["youtube"]["total"], 0);
    assert_eq!(v["sentiment"]["positive"], 1);
    assert_eq!(v["sentiment"]["negative"], 1);
    assert_eq!(v["sentiment"]["score"], 0.0);
    assert!(v["topKeywords"].as_array().is_some_and(|k| !k.is_empty()));
}

#[tokio::test]
async fn quality_reports_batch_health() {
    let payload = json!({"items": [
        {"title": "BJP rally"},
        {"url": "https://x"},
        {"description": "only a teaser"},
        {"selftext": "Reddit body"}
    ]});
    let (status, v) = post(test_router(), "/api/quality", payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["validCount"], 2);
    assert_eq!(v["totalCount"], 4);
    assert_eq!(v["validRatio"], 0.5);
    assert_eq!(v["issues"][1], "Item 2: Missing title and content");
}

#[tokio::test]
async fn sentiment_uses_llm_json_when_parseable() {
    let app = app_with(Arc::new(MockClient::new(
        "```json\n{\"sentiment_score\": 0.6, \"confidence\": 0.9, \"keywords\": [\"metro\"]}\n```",
    )));
    let (status, v) = post(app, "/api/analyze/sentiment", json!({"text": "Metro success", "party": "DMK"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["source"], "llm");
    assert_eq!(v["score"], 0.6);
    assert_eq!(v["llm"]["confidence"], 0.9);
    assert_eq!(v["lexical"]["positive"], 1);
}

#[tokio::test]
async fn sentiment_falls_back_to_lexical_when_llm_is_down() {
    let app = app_with(Arc::new(DisabledClient));
    let (status, v) = post(app, "/api/analyze/sentiment", json!({"text": "Scandal and crisis"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["source"], "lexical");
    assert_eq!(v["score"], -1.0);
    assert!(v["llm"].is_null());
}

#[tokio::test]
async fn sentiment_requires_text() {
    let (status, _) = post(test_router(), "/api/analyze/sentiment", json!({"party": "DMK"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sentiment_over_party_items_uses_filtered_context() {
    let app = app_with(Arc::new(MockClient::new(r#"{"sentiment_score": -0.3, "confidence": 0.7}"#)));
    let payload = json!({
        "party": "DMK",
        "items": [
            {"title": "Stalin opens metro line", "description": "Chennai commuters cheer"},
            {"title": "Monsoon forecast"}
        ],
        "feeds": {"reddit": [{"title": "DMK cadre protest", "created_utc": 1704189600.0}]}
    });
    let (status, v) = post(app, "/api/analyze/sentiment", payload).await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["source"], "llm");
    assert_eq!(v["score"], -0.3);
    assert_eq!(v["context"]["party"], "DMK");
    assert_eq!(v["context"]["itemCount"], 2);
    let text = v["context"]["text"].as_str().unwrap();
    assert!(text.contains("Stalin opens metro line. Chennai commuters cheer"));
    assert!(!text.contains("Monsoon"));

    let (status, _) = post(
        test_router(),
        "/api/analyze/sentiment",
        json!({"party": "DMK", "items": [], "source": "telegram"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bot_detection_contract() {
    let app = app_with(Arc::new(MockClient::new(
        "```json\n{\"bot_probability\": 0.8, \"suspicious_patterns\": [\"copy-paste\"], \"coordinated_accounts\": [], \"recommendation\": \"flag\"}\n```",
    )));
    let posts = json!({"posts": [{"author": "a", "content": "Vote now"}, {"author": "b", "content": "Vote now"}]});
    let (status, v) = post(app, "/api/analyze/bot-detection", posts.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["bot_probability"], 0.8);
    assert_eq!(v["recommendation"], "flag");

    let (_, v) = post(test_router(), "/api/analyze/bot-detection", posts).await;
    assert_eq!(
        v,
        json!({"bot_probability": 0.0, "suspicious_patterns": [], "coordinated_accounts": [], "recommendation": "Analysis failed"})
    );

    let (status, v) = post(test_router(), "/api/analyze/bot-detection", json!({"posts": "x"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["message"], "Posts array required");
}

#[tokio::test]
async fn pr_detection_contract() {
    let app = app_with(Arc::new(MockClient::new(
        r#"{"pr_score": 0.9, "is_artificial": true, "patterns": ["same wording"], "affected_sources": ["x.com"], "analysis": "coordinated"}"#,
    )));
    let payload = json!({"party": "BJP", "headlines": ["BJP surges", "BJP surges again"]});
    let (status, v) = post(app, "/api/analyze/pr-detection", payload.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["is_artificial"], true);
    assert_eq!(v["affected_sources"][0], "x.com");

    let down = app_with(Arc::new(DisabledClient));
    let (status, v) = post(down, "/api/analyze/pr-detection", payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["pr_score"], 0.0);
    assert_eq!(v["analysis"], "Analysis failed");

    let (status, v) = post(test_router(), "/api/analyze/pr-detection", json!({"party": "BJP"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["message"], "Headlines array required");
}

#[tokio::test]
async fn validate_contract() {
    let app = app_with(Arc::new(MockClient::new(
        r#"{"is_valid": false, "confidence": 0.8, "issues": ["stale"], "summary": "old news"}"#,
    )));
    let (status, v) = post(app, "/api/analyze/validate", json!({"data": {"title": "x"}, "context": "DMK"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["is_valid"], false);
    assert_eq!(v["issues"][0], "stale");

    let (_, v) = post(test_router(), "/api/analyze/validate", json!({"data": [1, 2]})).await;
    assert_eq!(v["is_valid"], true);
    assert_eq!(v["confidence"], 0.5);
    assert_eq!(v["summary"], "Validation unavailable");

    let (status, _) = post(test_router(), "/api/analyze/validate", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn heatmap_parses_or_degrades_to_empty() {
    let app = app_with(Arc::new(MockClient::new(r#"{"Chennai": 70, "Madurai": 45}"#)));
    let (_, v) = post(app, "/api/analyze/heatmap", json!({"context": "Stalin in Madurai"})).await;
    assert_eq!(v, json!({"Chennai": 70, "Madurai": 45}));

    let (status, v) = post(test_router(), "/api/analyze/heatmap", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, json!({}));
}

#[tokio::test]
async fn llm_generate_contract() {
    let (status, v) = post(test_router(), "/api/llm/generate", json!({"prompt": "hello"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, json!({"provider": "mock", "content": "mock reply"}));

    let (status, _) = post(test_router(), "/api/llm/generate", json!({"system": "x"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let down = app_with(Arc::new(DisabledClient));
    let (status, v) = post(down, "/api/llm/generate", json!({"prompt": "hello"})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(v["provider"], "disabled");
}

#[tokio::test]
async fn strategist_accepts_party_and_custom_prompt() {
    let (status, v) = post(
        test_router(),
        "/api/llm/strategist",
        json!({"prompt": "What next?", "party": "BJP"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["content"], "mock reply");

    let (status, _) = post(
        test_router(),
        "/api/llm/strategist",
        json!({"prompt": "What next?", "systemPrompt": "Be brief."}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(test_router(), "/api/llm/strategist", json!({"party": "BJP"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
