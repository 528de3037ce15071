//! HTTP-level tests for the task service and chat clients.

use std::time::Duration;

use artefact_remote::{
    ChatConfig, ContentGenerator, OpenAiContentGenerator, OpenAiTranslator, RemoteError,
    ServiceKind, SourceSearch, TaskKind, TaskRequest, TaskService, TaskState, TavilyConfig,
    TavilySearch, TripoClient, TripoConfig, Translator, sample_content,
};
use artefact_types::{CalendarKey, SourceItem};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tripo(server: &MockServer) -> TripoClient {
    TripoClient::new(
        TripoConfig::new("test-key")
            .with_base_url(server.uri())
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_create_image_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/task"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "type": "generate_image",
            "prompt": "a ceramic owl"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 0, "data": {"task_id": "img-42"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = tripo(&server)
        .create_task(&TaskRequest::image("a ceramic owl"))
        .await
        .unwrap();
    assert_eq!(id, "img-42");
}

#[tokio::test]
async fn test_create_model_task_sends_image_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/task"))
        .and(body_partial_json(json!({
            "type": "image_to_model",
            "file": {"type": "png", "url": "https://cdn.test/owl.png"},
            "pbr": true,
            "face_limit": 9000
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 0, "data": {"task_id": "mdl-7"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = tripo(&server)
        .create_task(&TaskRequest::image_to_model("https://cdn.test/owl.png"))
        .await
        .unwrap();
    assert_eq!(id, "mdl-7");
}

#[tokio::test]
async fn test_poll_parses_status_and_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/task/mdl-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "task_id": "mdl-7",
                "status": "success",
                "progress": 100,
                "output": {"model": "https://cdn.test/base.glb", "pbr_model": "https://cdn.test/pbr.glb"}
            }
        })))
        .mount(&server)
        .await;

    let status = tripo(&server).poll_once("mdl-7").await.unwrap();
    assert_eq!(status.state, TaskState::Success);
    assert_eq!(status.progress, Some(100));
    assert_eq!(
        status.result_ref(TaskKind::ImageToModel),
        Some("https://cdn.test/pbr.glb")
    );
}

#[tokio::test]
async fn test_poll_running_without_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/task/img-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"status": "running", "progress": 37.5}
        })))
        .mount(&server)
        .await;

    let status = tripo(&server).poll_once("img-1").await.unwrap();
    assert_eq!(status.state, TaskState::Running);
    assert_eq!(status.progress, Some(37));
    assert_eq!(status.result_ref(TaskKind::Image), None);
}

#[tokio::test]
async fn test_http_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/task"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let err = tripo(&server)
        .create_task(&TaskRequest::image("owl"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ServiceKind::TaskService));
    assert_eq!(err.http_status(), Some(503));
    assert!(err.to_string().contains("overloaded"));
}

#[tokio::test]
async fn test_service_code_and_garbage_are_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/task/bad-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 2010,
            "message": "insufficient credit"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/task/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = tripo(&server);
    let err = client.poll_once("bad-code").await.unwrap_err();
    assert!(err.to_string().contains("insufficient credit"));

    let err = client.poll_once("garbage").await.unwrap_err();
    assert!(matches!(err, RemoteError::Service { status: None, .. }));
}

#[tokio::test]
async fn test_content_generator_round_trip() {
    let server = MockServer::start().await;
    let content = serde_json::to_string(&sample_content("Glass Owl")).unwrap();
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gen-model",
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = OpenAiContentGenerator::new(
        ChatConfig::new("k", "gen-model").with_base_url(server.uri()),
    )
    .unwrap();
    let sources = vec![SourceItem {
        title: "Owls".into(),
        url: "https://news.test/owls".into(),
        content: "Owls everywhere".into(),
        score: 0.5,
    }];
    let key = CalendarKey::parse("2024-06-02").unwrap();
    let generated = generator.generate(key, &sources, &[]).await.unwrap();
    assert_eq!(generated.title, "Glass Owl");
}

#[tokio::test]
async fn test_chat_client_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let translator = OpenAiTranslator::new(
        ChatConfig::new("bad", "gpt-5-mini").with_base_url(server.uri()),
        vec!["ja".to_string()],
    )
    .unwrap();
    let err = translator
        .translate(&sample_content("Owl").translatable())
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), Some(401));
    assert!(err.to_string().contains("Incorrect API key"));
}

#[tokio::test]
async fn test_search_posts_query_for_previous_day() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({
            "api_key": "tv",
            "topic": "news",
            "max_results": 5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"title": "A", "url": "https://a.test", "content": "aaa", "score": 0.9},
                {"title": "B", "url": "https://b.test", "content": "bbb"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let search = TavilySearch::new(
        TavilyConfig::new("tv")
            .with_url(format!("{}/search", server.uri()))
            .with_max_results(5),
    )
    .unwrap();
    let items = search
        .search(CalendarKey::parse("2024-01-01").unwrap())
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].score, 0.0);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body["query"].as_str().unwrap().contains("2023-12-31"));
}
