use wiremock::matchers::{ body_partial_json, body_string_contains, header, method, path };
use wiremock::{ Mock, MockServer, ResponseTemplate };

use voice_relay::llm::chat::{ ChatClient, OllamaChatClient, OpenAIChatClient };
use voice_relay::llm::transcription::{ OpenAIWhisperClient, Transcriber, TranscriptionError };

#[tokio::test]
async fn chat_completion_sends_prompt_and_trims_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(
            body_partial_json(
                serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [{ "role": "user", "content": "hello" }]
            })
            )
        )
        .respond_with(
            ResponseTemplate::new(200).set_body_json(
                serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "  hi there\n" } }]
            })
            )
        )
        .expect(1)
        .mount(&server).await;

    let client = OpenAIChatClient::new("sk-test".into(), None, Some(server.uri())).unwrap();
    let answer = client.complete("hello").await.unwrap();

    assert_eq!(answer.response, "hi there");
}

#[tokio::test]
async fn chat_completion_error_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server).await;

    let client = OpenAIChatClient::new("sk-test".into(), None, Some(server.uri())).unwrap();

    let err = client.complete("hello").await.unwrap_err();
    assert!(err.to_string().contains("overloaded"));
}

#[tokio::test]
async fn chat_completion_without_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
        .mount(&server).await;

    let client = OpenAIChatClient::new("sk-test".into(), None, Some(server.uri())).unwrap();

    assert!(client.complete("hello").await.is_err());
}

#[tokio::test]
async fn whisper_uploads_file_and_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_string_contains("whisper-1"))
        .and(body_string_contains("note.mp3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": " what's the weather " }))
        )
        .expect(1)
        .mount(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("note.mp3");
    std::fs::write(&audio, b"ID3-fake-audio").unwrap();

    let client = OpenAIWhisperClient::new("sk-test".into(), Some(server.uri()), None);
    let text = client.transcribe(&audio).await.unwrap();

    assert_eq!(text, "what's the weather");
}

#[tokio::test]
async fn whisper_error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("unsupported format"))
        .mount(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("note.ogg");
    std::fs::write(&audio, b"OggS").unwrap();

    let client = OpenAIWhisperClient::new("sk-test".into(), Some(server.uri()), None);
    let err = client.transcribe(&audio).await.unwrap_err();

    match err {
        TranscriptionError::ApiRequestFailed(msg) => {
            assert!(msg.contains("400"));
            assert!(msg.contains("unsupported format"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn whisper_missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let client = OpenAIWhisperClient::new("sk-test".into(), Some("http://127.0.0.1:9".into()), None);

    let err = client.transcribe(&dir.path().join("gone.mp3")).await.unwrap_err();

    assert!(matches!(err, TranscriptionError::ReadFailed(_)));
}

#[tokio::test]
async fn ollama_generate_returns_trimmed_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({ "model": "llama3", "prompt": "hello", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": " hi \n" })))
        .expect(1)
        .mount(&server).await;

    let client = OllamaChatClient::new(Some(server.uri()), None);

    assert_eq!(client.complete("hello").await.unwrap().response, "hi");
}
