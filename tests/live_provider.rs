//! Tests for the live summarizer against mocked HTTP endpoints.
//!
//! A wiremock server plays both roles: the article host the provider
//! fetches, and the chat-completions API it calls afterwards.

use pagesum::config::SummarizerConfig;
use pagesum::summarizer::{LiveSummarizer, Summarizer};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE_HTML: &str = r#"<html><body>
<h1>Rust in Production</h1>
<p>Rust has seen growing adoption in network services where predictable
latency and memory safety matter. Teams report fewer production incidents
after migrating hot paths away from garbage-collected runtimes.</p>
<p>The ecosystem around async runtimes has matured considerably over the
last several releases, making it a practical default for new services.</p>
</body></html>"#;

fn api_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [
            { "message": { "role": "assistant", "content": text } }
        ]
    }))
}

fn live_config(server: &MockServer) -> SummarizerConfig {
    SummarizerConfig {
        provider: "live".to_string(),
        model: Some("test-model".to_string()),
        api_base: format!("{}/v1", server.uri()),
        timeout_secs: 5,
        max_retries: 2,
        max_words: 300,
    }
}

fn make_summarizer(server: &MockServer) -> LiveSummarizer {
    std::env::set_var("OPENAI_API_KEY", "test-key");
    LiveSummarizer::new(&live_config(server)).unwrap()
}

#[tokio::test]
async fn test_live_summarizer_happy_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE_HTML))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(api_response("Rust adoption is growing in network services."))
        .mount(&server)
        .await;

    let summarizer = make_summarizer(&server);
    let url = format!("{}/article", server.uri());

    let summary = summarizer.summarize(&url).await.unwrap();
    assert_eq!(summary, "Rust adoption is growing in network services.");
}

#[tokio::test]
async fn test_live_summarizer_retries_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE_HTML))
        .mount(&server)
        .await;

    // First API call fails with a 500, the retry succeeds.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream error"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(api_response("Recovered summary."))
        .mount(&server)
        .await;

    let summarizer = make_summarizer(&server);
    let url = format!("{}/article", server.uri());

    let summary = summarizer.summarize(&url).await.unwrap();
    assert_eq!(summary, "Recovered summary.");
}

#[tokio::test]
async fn test_live_summarizer_does_not_retry_client_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE_HTML))
        .mount(&server)
        .await;

    // A 401 must fail immediately: exactly one API call, no retries.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let summarizer = make_summarizer(&server);
    let url = format!("{}/article", server.uri());

    let err = summarizer.summarize(&url).await.unwrap_err();
    assert!(err.to_string().contains("401"));

    server.verify().await;
}

#[tokio::test]
async fn test_live_summarizer_rejects_thin_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body><p>hi</p></body></html>"),
        )
        .mount(&server)
        .await;

    let summarizer = make_summarizer(&server);
    let url = format!("{}/article", server.uri());

    let err = summarizer.summarize(&url).await.unwrap_err();
    assert!(err.to_string().contains("Insufficient content"));
}

#[tokio::test]
async fn test_live_summarizer_propagates_fetch_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let summarizer = make_summarizer(&server);
    let url = format!("{}/article", server.uri());

    let err = summarizer.summarize(&url).await.unwrap_err();
    assert!(err.to_string().contains("HTTP 404"));
}

#[tokio::test]
async fn test_live_summarizer_rejects_empty_api_output() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE_HTML))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(api_response("   "))
        .mount(&server)
        .await;

    let summarizer = make_summarizer(&server);
    let url = format!("{}/article", server.uri());

    let err = summarizer.summarize(&url).await.unwrap_err();
    assert!(err.to_string().contains("empty summary"));
}
