//! Downloading generated audio and listing voices

mod harness;

use harness::config::ConfigBuilder;
use harness::mock_tts::{MOCK_WAV, MockTts};
use harness::server::TestServer;
use reqwest::StatusCode;

async fn server(mock: &MockTts) -> TestServer {
    let config = ConfigBuilder::new()
        .with_coqui_provider("neural", &mock.coqui_url())
        .with_voice("male_deep", "neural", |voice| {
            voice.speaker = Some("p226".to_owned());
            voice.label = Some("Deep Male".to_owned());
        })
        .with_voice("female_clear", "neural", |voice| voice.speaker = Some("p245".to_owned()))
        .build();

    TestServer::start(config).await.unwrap()
}

#[tokio::test]
async fn generated_audio_is_downloadable() {
    let mock = MockTts::start().await.unwrap();
    let server = server(&mock).await;

    let body: serde_json::Value = server.generate("hello", "male_deep").await.json().await.unwrap();
    let audio_url = body["audio_url"].as_str().unwrap();

    let resp = server.client().get(server.url(audio_url)).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "audio/wav");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), MOCK_WAV);
}

#[tokio::test]
async fn missing_audio_is_not_found() {
    let mock = MockTts::start().await.unwrap();
    let server = server(&mock).await;

    let resp = server
        .client()
        .get(server.url("/audio/00000000-0000-0000-0000-000000000000.mp3"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "not_found_error");
}

#[tokio::test]
async fn path_traversal_is_not_found() {
    let mock = MockTts::start().await.unwrap();
    let server = server(&mock).await;

    let body: serde_json::Value = server.generate("hello", "male_deep").await.json().await.unwrap();
    let filename = body["filename"].as_str().unwrap();
    assert!(server.audio_dir().join(filename).is_file());

    let resp = server
        .client()
        .get(server.url("/audio/..%2Fsecret.mp3"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let nested = format!("/audio/..%2F{}%2F{filename}", dir_name(&server));
    let resp = server.client().get(server.url(&nested)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

fn dir_name(server: &TestServer) -> String {
    server.audio_dir().file_name().unwrap().to_string_lossy().into_owned()
}

#[tokio::test]
async fn voices_are_listed_in_config_order() {
    let mock = MockTts::start().await.unwrap();
    let server = server(&mock).await;

    let resp = server.client().get(server.url("/voices")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!([
            { "voice_type": "male_deep", "provider": "neural", "label": "Deep Male" },
            { "voice_type": "female_clear", "provider": "neural", "label": "female clear" },
        ])
    );
}
