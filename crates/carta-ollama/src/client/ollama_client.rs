//! Ollama client implementation
//!
//! Non-streaming generation and model listing over the Ollama HTTP API.

use carta_core::{Completion, PostProcessor};
use reqwest::{Client as HttpClient, ClientBuilder, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{OllamaConfig, OllamaCredentials};
use crate::{Error, Result, TRACING_TARGET_API, TRACING_TARGET_CLIENT};

/// Sampling options forwarded with a generate request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerateOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum number of tokens to generate
    pub num_predict: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    think: bool,
    options: GenerateOptions,
}

/// Body of a completed, non-streaming generate call.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    /// Model that produced the answer
    #[serde(default)]
    pub model: String,
    /// Generated text
    pub response: String,
    /// Reasoning trace, present when thinking mode was on
    #[serde(default)]
    pub thinking: Option<String>,
    /// Number of generated tokens
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Wall time spent by the server, in nanoseconds
    #[serde(default)]
    pub total_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Ollama client for post-processing OCR text
///
/// # Examples
///
/// ```rust,no_run
/// use carta_ollama::{OllamaClient, OllamaConfig, OllamaCredentials};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = OllamaConfig::builder()
///     .with_base_url("http://localhost:11434")?
///     .with_timeout(Duration::from_secs(30))
///     .build()?;
///
/// let client = OllamaClient::new(config, OllamaCredentials::none())?;
/// client.health_check().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http_client: HttpClient,
    base_url: Url,
    config: OllamaConfig,
    credentials: OllamaCredentials,
}

impl OllamaClient {
    /// Create a new Ollama client with the given configuration and credentials
    ///
    /// No request is made; call [`OllamaClient::health_check`] to verify the
    /// server and model.
    pub fn new(config: OllamaConfig, credentials: OllamaCredentials) -> Result<Self> {
        let base_url = config.parsed_base_url()?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            base_url = %base_url,
            model = config.effective_model(),
            credentials = credentials.kind(),
            "Creating Ollama client"
        );

        let http_client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            http_client,
            base_url,
            config,
            credentials,
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Model tag used for generation.
    pub fn model(&self) -> &str {
        self.config.effective_model()
    }

    /// List the model tags installed on the server.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self.request(Method::GET, "/api/tags")?.send().await?;
        let response = self.check_status(response).await?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("Failed to decode model list: {e}")))?;

        Ok(tags.models.into_iter().map(|tag| tag.name).collect())
    }

    /// Verify that the server answers and the effective model is installed.
    pub async fn health_check(&self) -> Result<()> {
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            "Performing health check"
        );

        let model = self.model();
        let models = self.list_models().await?;
        let latest = format!("{model}:latest");

        if !models.iter().any(|name| name == model || *name == latest) {
            tracing::error!(
                target: TRACING_TARGET_CLIENT,
                model,
                available = models.len(),
                "Model is not installed"
            );
            return Err(Error::ModelNotFound {
                model: model.to_owned(),
            });
        }

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            model,
            "Health check successful"
        );
        Ok(())
    }

    /// Run a single non-streaming generation.
    pub async fn generate(&self, prompt: &str, think: bool) -> Result<GenerateResponse> {
        let body = GenerateRequest {
            model: self.model(),
            prompt,
            stream: false,
            think,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.num_predict,
            },
        };

        tracing::debug!(
            target: TRACING_TARGET_API,
            model = body.model,
            think,
            prompt_chars = prompt.len(),
            "Sending generate request"
        );

        let response = self
            .request(Method::POST, "/api/generate")?
            .json(&body)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("Failed to decode generation: {e}")))?;

        tracing::debug!(
            target: TRACING_TARGET_API,
            model = %generated.model,
            eval_count = generated.eval_count,
            total_duration_ms = generated.total_duration.map(|ns| ns / 1_000_000),
            "Generate request completed"
        );

        Ok(generated)
    }

    /// Create a new request builder with base configuration
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| Error::invalid_config(format!("Invalid request URL: {e}")))?;

        Ok(self
            .credentials
            .apply(self.http_client.request(method, url)))
    }

    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);

        tracing::warn!(
            target: TRACING_TARGET_CLIENT,
            status = status.as_u16(),
            error = %message,
            "Ollama request failed"
        );

        if status == reqwest::StatusCode::NOT_FOUND && message.contains("not found") {
            return Err(Error::ModelNotFound {
                model: self.model().to_owned(),
            });
        }

        Err(Error::api_error(status.as_u16(), message))
    }
}

#[async_trait::async_trait]
impl PostProcessor for OllamaClient {
    async fn complete(&self, prompt: &str, thinking_mode: bool) -> carta_core::Result<Completion> {
        let generated = self.generate(prompt, thinking_mode).await?;

        Ok(Completion {
            text: generated.response,
            thinking: generated.thinking.filter(|t| !t.trim().is_empty()),
        })
    }

    async fn health_check(&self) -> carta_core::Result<()> {
        OllamaClient::health_check(self).await.map_err(Into::into)
    }

    fn model(&self) -> &str {
        OllamaClient::model(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::Json;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use carta_core::ErrorCode;
    use serde_json::{Value, json};

    use super::*;

    async fn serve(router: Router, adapter: Option<&str>) -> OllamaClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let mut builder = OllamaConfig::builder()
            .with_base_url(&format!("http://{address}"))
            .unwrap();
        if let Some(adapter) = adapter {
            builder = builder.with_adapter(adapter);
        }
        OllamaClient::new(builder.build().unwrap(), OllamaCredentials::none()).unwrap()
    }

    fn tags() -> Router {
        Router::new().route(
            "/api/tags",
            get(|| async {
                Json(json!({"models": [
                    {"name": "qwen3:0.6b", "size": 522653767},
                    {"name": "cni-extractor:latest"}
                ]}))
            }),
        )
    }

    #[tokio::test]
    async fn generate_sends_model_and_thinking_flag() {
        let seen = Arc::new(Mutex::new(Value::Null));
        let captured = Arc::clone(&seen);
        let router = Router::new().route(
            "/api/generate",
            post(move |Json(body): Json<Value>| async move {
                *captured.lock().unwrap() = body;
                Json(json!({
                    "model": "qwen3:0.6b",
                    "response": "{\"nom\": \"NGONO\"}",
                    "thinking": "reading the surname line",
                    "done": true,
                    "eval_count": 12
                }))
            }),
        );
        let client = serve(router, None).await;

        let completion = PostProcessor::complete(&client, "Texte OCR", true)
            .await
            .unwrap();
        assert_eq!(completion.text, "{\"nom\": \"NGONO\"}");
        assert_eq!(completion.thinking.as_deref(), Some("reading the surname line"));

        let body = seen.lock().unwrap().clone();
        assert_eq!(body["model"], json!("qwen3:0.6b"));
        assert_eq!(body["stream"], json!(false));
        assert_eq!(body["think"], json!(true));
        assert_eq!(body["options"]["num_predict"], json!(512));
    }

    #[tokio::test]
    async fn adapter_tag_is_the_model_sent() {
        let router = Router::new().route(
            "/api/generate",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"model": body["model"], "response": body["model"]}))
            }),
        );
        let client = serve(router, Some("cni-extractor")).await;

        let generated = client.generate("x", false).await.unwrap();
        assert_eq!(generated.response, "cni-extractor");
        assert_eq!(PostProcessor::model(&client), "cni-extractor");
    }

    #[tokio::test]
    async fn health_check_requires_installed_model() {
        assert!(serve(tags(), None).await.health_check().await.is_ok());
        assert!(serve(tags(), Some("cni-extractor")).await.health_check().await.is_ok());

        let missing = serve(tags(), Some("cni-v2")).await;
        let error = PostProcessor::health_check(&missing).await.unwrap_err();
        assert_eq!(error.code(), ErrorCode::WorkerUnavailable);
    }

    #[tokio::test]
    async fn unknown_model_on_generate_is_unavailable() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({"error": "model 'qwen9' not found"})),
                )
            }),
        );
        let client = serve(router, None).await;

        let error = PostProcessor::complete(&client, "x", false)
            .await
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::WorkerUnavailable);
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "llama runner process has terminated"})),
                )
            }),
        );
        let client = serve(router, None).await;

        let error = PostProcessor::complete(&client, "x", false)
            .await
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::TransientInferenceError);
        assert!(error.message().contains("llama runner"));
    }

    #[tokio::test]
    async fn undecodable_body_is_inference_failure() {
        let router = Router::new().route("/api/generate", post(|| async { "not json" }));
        let client = serve(router, None).await;

        let error = PostProcessor::complete(&client, "x", false)
            .await
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::InferenceFailure);
    }
}
