#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use warp::http::Response;

use chat::auth::JwtAuthProvider;
use chat::chat::{ChatService, ChatSettings};
use chat::config::AppConfig;
use chat::db::Database;
use chat::llm::{
    ContentDelta, EventStream, FinishReason, GenerateRequest, LlmError, LlmProvider, StreamEvent,
    UsageMetadata,
};
use chat::routes::configure_routes;
use chat::state::AppState;

pub const PASSWORD: &str = "correct-horse";
pub const BOUNDARY: &str = "chat-test-boundary";

/// What the scripted provider does when called
#[derive(Debug, Clone)]
pub enum Script {
    Reply {
        chunks: Vec<String>,
        input_tokens: u32,
        output_tokens: u32,
    },
    /// The request is refused before any event
    FailToStart(String),
    /// Some text, then an error inside the stream
    FailMidStream { chunks: Vec<String>, error: String },
}

impl Script {
    pub fn reply(chunks: &[&str], input_tokens: u32, output_tokens: u32) -> Self {
        Script::Reply {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            input_tokens,
            output_tokens,
        }
    }
}

/// Provider that plays back a fixed script and records requests
#[derive(Clone)]
pub struct ScriptedProvider {
    script: Script,
    pub requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn recorded(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<EventStream, LlmError> {
        self.requests.lock().unwrap().push(request);

        match self.script.clone() {
            Script::FailToStart(message) => Err(LlmError::HttpError {
                status: 500,
                body: message,
            }),
            Script::Reply {
                chunks,
                input_tokens,
                output_tokens,
            } => Ok(Box::pin(async_stream::stream! {
                yield Ok::<_, LlmError>(StreamEvent::MessageDelta {
                    usage: Some(UsageMetadata::new(input_tokens, 0)),
                });
                for text in chunks {
                    yield Ok(StreamEvent::ContentDelta {
                        index: 0,
                        delta: ContentDelta::TextDelta { text },
                    });
                }
                yield Ok(StreamEvent::MessageEnd {
                    finish_reason: FinishReason::EndTurn,
                    usage: UsageMetadata::new(input_tokens, output_tokens),
                });
            })),
            Script::FailMidStream { chunks, error } => Ok(Box::pin(async_stream::stream! {
                for text in chunks {
                    yield Ok(StreamEvent::ContentDelta {
                        index: 0,
                        delta: ContentDelta::TextDelta { text },
                    });
                }
                yield Err(LlmError::StreamError(error));
            })),
        }
    }
}

pub struct TestApp {
    pub db: Database,
    pub state: AppState,
    pub provider: ScriptedProvider,
}

impl TestApp {
    pub async fn new(script: Script) -> Self {
        let db = Database::in_memory().await.expect("in-memory database");
        let config = AppConfig {
            jwt_secret: "test-secret".to_string(),
            ..AppConfig::default()
        };
        let provider = ScriptedProvider::new(script);

        let auth = Arc::new(JwtAuthProvider::new(
            db.clone(),
            &config.jwt_secret,
            config.jwt_expiration_hours,
        ));
        let chat = ChatService::new(
            db.clone(),
            Arc::new(provider.clone()),
            ChatSettings::from(&config),
        );

        Self {
            db,
            state: AppState::new(config, auth, chat),
            provider,
        }
    }

    /// Send a request through the full route tree
    pub async fn request(&self, request: warp::test::RequestBuilder) -> Response<Bytes> {
        request.reply(&configure_routes(self.state.clone())).await
    }

    /// Register a user over HTTP and return the session token
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .request(
                warp::test::request()
                    .method("POST")
                    .path("/api/v1/auth/register")
                    .json(&json!({
                        "username": username,
                        "email": format!("{}@example.com", username),
                        "password": PASSWORD,
                    })),
            )
            .await;
        assert_eq!(response.status(), 201, "{:?}", response.body());
        body_json(&response)["token"]
            .as_str()
            .expect("token in register response")
            .to_string()
    }

    pub async fn get(&self, path: &str, token: &str) -> Response<Bytes> {
        self.request(
            warp::test::request()
                .method("GET")
                .path(path)
                .header("authorization", format!("Bearer {}", token)),
        )
        .await
    }

    pub async fn post_json(&self, path: &str, token: &str, body: &Value) -> Response<Bytes> {
        self.request(
            warp::test::request()
                .method("POST")
                .path(path)
                .header("authorization", format!("Bearer {}", token))
                .json(body),
        )
        .await
    }

    pub async fn patch_json(&self, path: &str, token: &str, body: &Value) -> Response<Bytes> {
        self.request(
            warp::test::request()
                .method("PATCH")
                .path(path)
                .header("authorization", format!("Bearer {}", token))
                .json(body),
        )
        .await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Response<Bytes> {
        self.request(
            warp::test::request()
                .method("DELETE")
                .path(path)
                .header("authorization", format!("Bearer {}", token)),
        )
        .await
    }

    /// POST a multipart send form
    pub async fn send(
        &self,
        path: &str,
        token: &str,
        text: &str,
        files: &[(&str, &[u8])],
    ) -> Response<Bytes> {
        self.request(
            warp::test::request()
                .method("POST")
                .path(path)
                .header("authorization", format!("Bearer {}", token))
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(multipart_body(text, files)),
        )
        .await
    }
}

pub fn body_json(response: &Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).expect("JSON body")
}

/// Multipart body with a `text` field and one `file` part per file
pub fn multipart_body(text: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n{}\r\n",
            BOUNDARY, text
        )
        .as_bytes(),
    );
    for (name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// (event name, JSON data) pairs of an event-stream body, skipping keep-alive comments
pub fn sse_events(response: &Response<Bytes>) -> Vec<(String, Value)> {
    let body = String::from_utf8_lossy(response.body()).replace('\r', "");
    body.split("\n\n")
        .filter_map(|raw| {
            let mut name = None;
            let mut data = Vec::new();
            for line in raw.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    name = Some(value.trim().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push(value.strip_prefix(' ').unwrap_or(value));
                }
            }
            let name = name?;
            let data = serde_json::from_str(&data.join("\n")).ok()?;
            Some((name, data))
        })
        .collect()
}

pub fn event_names(events: &[(String, Value)]) -> Vec<&str> {
    events.iter().map(|(name, _)| name.as_str()).collect()
}
