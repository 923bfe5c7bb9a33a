use std::sync::Arc;
use std::time::Duration;

use formfill_core::{JobPhase, StartRequest};
use formfill_engine::{
    decode_page, CompletionSettings, EngineConfig, EngineEvent, EngineHandle, StaticPages,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &[u8] = br#"<!doctype html>
<html><head><meta charset="utf-8"></head><body>
  <form id="order">
    <label for="email">Email</label><input id="email" name="email" type="email">
    <fieldset name="size">
      <legend>Size</legend>
      <label><input type="radio" name="size" value="s"> Small</label>
      <label><input type="radio" name="size" value="l"> Large</label>
    </fieldset>
  </form>
</body></html>"#;

fn sse(fragments: &[&str]) -> String {
    fragments
        .iter()
        .map(|fragment| {
            let chunk = serde_json::json!({ "choices": [{ "delta": { "content": fragment } }] });
            format!("data: {chunk}\n\n")
        })
        .chain(std::iter::once("data: [DONE]\n\n".to_string()))
        .collect()
}

fn events_until_finished(engine: &EngineHandle) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Some(event) = engine.recv_timeout(Duration::from_secs(10)) {
        let done = matches!(event, EngineEvent::JobFinished { .. });
        events.push(event);
        if done {
            break;
        }
    }
    events
}

#[test]
fn saved_page_is_filled_from_a_streamed_chat_completion() {
    formfill_logging::initialize_for_tests();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = runtime.block_on(MockServer::start());
    runtime.block_on(
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                sse(&["```json\n{\"email\": \"ada@example.com\",", " \"size\": \"Large\"}", "\n```"]),
                "text/event-stream",
            ))
            .expect(1)
            .mount(&server),
    );

    let page = decode_page(PAGE, None).unwrap();
    let pages = StaticPages::new().with_page(7, page.html);
    let config = EngineConfig {
        completion: CompletionSettings {
            base_url: format!("{}/v1", server.uri()),
            api_key: Some("sk-test".to_string()),
            ..CompletionSettings::default()
        },
        ..EngineConfig::default()
    };
    let engine = EngineHandle::with_openai(config, Arc::new(pages));

    engine.start(StartRequest::new(7, "#order")).unwrap();
    let events = events_until_finished(&engine);

    match events.last() {
        Some(EngineEvent::JobFinished { status, form, .. }) => {
            assert_eq!(status.phase, JobPhase::Success);
            let form = form.as_ref().unwrap();
            assert_eq!(form.value("email"), Some("ada@example.com"));
            assert_eq!(form.checked("size"), vec!["Large"]);
        }
        other => panic!("expected JobFinished, got {other:?}"),
    }
}

#[test]
fn missing_api_key_is_a_configuration_error() {
    formfill_logging::initialize_for_tests();
    let pages = StaticPages::new().with_page(1, String::from_utf8_lossy(PAGE).into_owned());
    let engine = EngineHandle::with_openai(EngineConfig::default(), Arc::new(pages));

    engine.start(StartRequest::new(1, "#order")).unwrap();
    let events = events_until_finished(&engine);

    match events.last() {
        Some(EngineEvent::JobFinished { status, .. }) => {
            assert_eq!(status.phase, JobPhase::Error);
            assert_eq!(status.message.as_deref(), Some("no API key configured"));
        }
        other => panic!("expected JobFinished, got {other:?}"),
    }
}
