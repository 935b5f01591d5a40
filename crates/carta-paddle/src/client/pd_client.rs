//! Paddle HTTP client implementation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use carta_core::{ExtractionRequest, RecognizedText, TextLine, TextRecognizer};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, PdConfig, Result, TRACING_TARGET_CLIENT, TRACING_TARGET_OCR};

/// Longest body excerpt kept in [`Error::InvalidResponse`].
const BODY_EXCERPT: usize = 512;

/// `fileType` value for single images.
const FILE_TYPE_IMAGE: u8 = 1;

/// HTTP client for a Paddle OCR serving endpoint.
///
/// # Examples
///
/// ```ignore
/// use carta_paddle::{PdClient, PdConfig};
///
/// let client = PdClient::new(PdConfig::new("http://localhost:8866")?)?;
/// let lines = client.recognize_bytes(&std::fs::read("front.png")?).await?;
/// println!("{}", lines.texts.join(" "));
/// ```
#[derive(Debug, Clone)]
pub struct PdClient {
    http_client: Client,
    config: PdConfig,
}

impl PdClient {
    /// Create a new client with the given configuration.
    pub fn new(config: PdConfig) -> Result<Self> {
        let mut client_builder = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent());

        if let Some(api_key) = config.api_key() {
            let mut headers = HeaderMap::new();
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {api_key}"))
                    .map_err(|e| Error::config(format!("Invalid API key: {e}")))?,
            );
            client_builder = client_builder.default_headers(headers);
        }

        let http_client = client_builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        debug!(
            target: TRACING_TARGET_CLIENT,
            base_url = %config.base_url(),
            timeout = ?config.timeout(),
            "Paddle client initialized"
        );

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Get a reference to the client configuration.
    pub fn config(&self) -> &PdConfig {
        &self.config
    }

    /// Run text recognition on a single encoded image.
    pub async fn recognize_bytes(&self, image: &[u8]) -> Result<OcrLines> {
        let url = self.config.endpoint("/ocr")?;
        let body = OcrRequest {
            file: STANDARD.encode(image),
            file_type: FILE_TYPE_IMAGE,
            use_doc_orientation_classify: self.config.use_doc_orientation_classify(),
            use_doc_unwarping: self.config.use_doc_unwarping(),
            use_textline_orientation: self.config.use_textline_orientation(),
        };

        debug!(
            target: TRACING_TARGET_OCR,
            url = %url,
            size = image.len(),
            "Sending image to Paddle"
        );

        let response = self.http_client.post(url).json(&body).send().await?;
        let response = self.handle_response(response).await?;

        let lines = response
            .result
            .map(OcrResultSet::into_lines)
            .ok_or_else(|| Error::invalid_response("response carries no result", None))?;

        debug!(
            target: TRACING_TARGET_OCR,
            log_id = response.log_id.as_deref().unwrap_or("-"),
            lines = lines.texts.len(),
            "Paddle recognition completed"
        );

        Ok(lines)
    }

    /// Health check for the Paddle service.
    pub async fn health_check(&self) -> Result<()> {
        let url = self.config.endpoint("/health")?;

        debug!(target: TRACING_TARGET_CLIENT, url = %url, "Performing health check");

        let response = self.http_client.get(url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::service_unavailable(format!(
                "Health check failed with status {}",
                response.status()
            )))
        }
    }

    /// Turn an HTTP response into a decoded body or an error.
    async fn handle_response(&self, response: reqwest::Response) -> Result<OcrResponse> {
        let status = response.status();
        let body = response.text().await?;

        debug!(
            target: TRACING_TARGET_CLIENT,
            status = status.as_u16(),
            bytes = body.len(),
            "Received response from Paddle"
        );

        if !status.is_success() {
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => Error::rate_limit("Rate limit exceeded"),
                StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                    Error::service_unavailable("Service temporarily unavailable")
                }
                StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                    Error::timeout(self.config.timeout())
                }
                _ => match serde_json::from_str::<OcrResponse>(&body) {
                    Ok(parsed) => Error::api(
                        status.as_u16(),
                        parsed.error_msg.unwrap_or_else(|| status.to_string()),
                        None,
                    ),
                    Err(_) => Error::api(status.as_u16(), excerpt(&body), None),
                },
            });
        }

        let parsed: OcrResponse = serde_json::from_str(&body).map_err(|e| {
            Error::invalid_response(
                format!("Failed to parse success response: {e}"),
                Some(excerpt(&body)),
            )
        })?;

        if parsed.error_code != 0 {
            return Err(Error::api(
                status.as_u16(),
                parsed
                    .error_msg
                    .unwrap_or_else(|| "Unknown error".to_string()),
                Some(parsed.error_code),
            ));
        }

        Ok(parsed)
    }
}

#[async_trait::async_trait]
impl TextRecognizer for PdClient {
    async fn recognize(&self, request: &ExtractionRequest) -> carta_core::Result<RecognizedText> {
        let lines = self.recognize_bytes(&request.image).await.map_err(|error| {
            warn!(
                target: TRACING_TARGET_OCR,
                request_id = %request.request_id,
                category = error.category(),
                error = %error,
                "Paddle recognition failed"
            );
            carta_core::Error::from(error)
        })?;

        Ok(lines.into_recognized())
    }

    async fn health_check(&self) -> carta_core::Result<()> {
        PdClient::health_check(self).await.map_err(Into::into)
    }
}

/// Parallel text and score arrays for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrLines {
    /// Recognized text lines in reading order.
    pub texts: Vec<String>,
    /// Recognition confidence per line.
    pub scores: Vec<f32>,
}

impl OcrLines {
    /// Pair texts with scores. Unpaired trailing entries are dropped.
    pub fn into_recognized(self) -> RecognizedText {
        if self.texts.len() != self.scores.len() {
            warn!(
                target: TRACING_TARGET_OCR,
                texts = self.texts.len(),
                scores = self.scores.len(),
                "text and score counts differ"
            );
        }

        self.texts
            .into_iter()
            .zip(self.scores)
            .map(|(text, score)| TextLine::new(text, score))
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OcrRequest {
    file: String,
    file_type: u8,
    use_doc_orientation_classify: bool,
    use_doc_unwarping: bool,
    use_textline_orientation: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OcrResponse {
    #[serde(default)]
    log_id: Option<String>,
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_msg: Option<String>,
    #[serde(default)]
    result: Option<OcrResultSet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OcrResultSet {
    #[serde(default)]
    ocr_results: Vec<OcrPage>,
}

impl OcrResultSet {
    /// Concatenate the lines of every page.
    fn into_lines(self) -> OcrLines {
        self.ocr_results
            .into_iter()
            .fold(OcrLines::default(), |mut acc, page| {
                acc.texts.extend(page.pruned_result.rec_texts);
                acc.scores.extend(page.pruned_result.rec_scores);
                acc
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OcrPage {
    pruned_result: PrunedResult,
}

#[derive(Debug, Default, Deserialize)]
struct PrunedResult {
    #[serde(default)]
    rec_texts: Vec<String>,
    #[serde(default)]
    rec_scores: Vec<f32>,
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((index, _)) => format!("{}...", &body[..index]),
        None => body.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::extract::Json;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post};
    use carta_core::{DocumentSide, DocumentVersion, ErrorCode};
    use carta_test::fixtures;
    use serde_json::{Value, json};

    use super::*;

    async fn serve(router: Router) -> PdClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let config = PdConfig::new(format!("http://{address}")).unwrap();
        PdClient::new(config).unwrap()
    }

    fn front() -> ExtractionRequest {
        ExtractionRequest::new(
            fixtures::png_bytes(),
            DocumentVersion::V2018,
            DocumentSide::Recto,
            false,
        )
    }

    #[test]
    fn parses_paged_results() {
        let body = json!({
            "logId": "abc",
            "errorCode": 0,
            "errorMsg": "Success",
            "result": {
                "ocrResults": [
                    {"prunedResult": {"rec_texts": ["REPUBLIQUE", "DU"], "rec_scores": [0.99, 0.97]}},
                    {"prunedResult": {"rec_texts": ["CAMEROUN"], "rec_scores": [0.95]}}
                ]
            }
        });

        let parsed: OcrResponse = serde_json::from_value(body).unwrap();
        let lines = parsed.result.unwrap().into_lines();
        assert_eq!(lines.texts, ["REPUBLIQUE", "DU", "CAMEROUN"]);
        assert_eq!(lines.scores.len(), 3);
    }

    #[test]
    fn unpaired_entries_are_dropped() {
        let lines = OcrLines {
            texts: vec!["NOM".into(), "NGONO".into()],
            scores: vec![0.9],
        };

        let recognized = lines.into_recognized();
        assert_eq!(recognized.lines.len(), 1);
        assert_eq!(recognized.lines[0].text, "NOM");
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let body = "é".repeat(BODY_EXCERPT + 10);
        let cut = excerpt(&body);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), BODY_EXCERPT + 3);
    }

    #[tokio::test]
    async fn recognizes_through_http() {
        let router = Router::new().route(
            "/ocr",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["fileType"], json!(1));
                assert!(!body["file"].as_str().unwrap_or_default().is_empty());
                Json(json!({
                    "errorCode": 0,
                    "errorMsg": "Success",
                    "result": {"ocrResults": [{"prunedResult": {
                        "rec_texts": ["NOM/SURNAME", "NGONO"],
                        "rec_scores": [0.98, 0.93]
                    }}]}
                }))
            }),
        );
        let client = serve(router).await;

        let text = TextRecognizer::recognize(&client, &front()).await.unwrap();
        assert_eq!(text.joined(), "NOM/SURNAME NGONO");
    }

    #[tokio::test]
    async fn nonzero_error_code_is_inference_failure() {
        let router = Router::new().route(
            "/ocr",
            post(|| async {
                Json(json!({"errorCode": 1001, "errorMsg": "image decode failed"}))
            }),
        );
        let client = serve(router).await;

        let error = TextRecognizer::recognize(&client, &front())
            .await
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::InferenceFailure);
        assert!(error.message().contains("image decode failed"));
    }

    #[tokio::test]
    async fn overloaded_service_is_transient() {
        let router = Router::new().route(
            "/ocr",
            post(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "loading model") }),
        );
        let client = serve(router).await;

        let error = TextRecognizer::recognize(&client, &front())
            .await
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::TransientInferenceError);
    }

    #[tokio::test]
    async fn malformed_body_is_inference_failure() {
        let router = Router::new().route("/ocr", post(|| async { "<html>oops</html>" }));
        let client = serve(router).await;

        let error = client.recognize_bytes(b"png").await.unwrap_err();
        assert_eq!(error.category(), "invalid_response");
        assert!(!error.is_retryable());
    }

    #[tokio::test]
    async fn health_check_hits_health_route() {
        let router = Router::new().route("/health", get(|| async { "ok" }));
        let client = serve(router).await;
        assert!(client.health_check().await.is_ok());

        let down = serve(Router::new()).await;
        let error = TextRecognizer::health_check(&down).await.unwrap_err();
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn refused_connection_is_transient() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let client = PdClient::new(PdConfig::new(format!("http://{address}")).unwrap()).unwrap();
        let error = TextRecognizer::recognize(&client, &front())
            .await
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::TransientInferenceError);
    }
}
