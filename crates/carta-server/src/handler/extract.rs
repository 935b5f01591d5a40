//! Multipart extraction endpoint.

use axum::Router;
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::routing::post;
use bytes::Bytes;
use carta_core::{Error, ExtractionInput, Result};
use carta_inference::RequestOrchestrator;

use super::response::ExtractionResponse;
use crate::service::ServiceState;

/// Tracing target for extraction handlers.
const TRACING_TARGET: &str = "carta_server::handler::extract";

const DEFAULT_VERSION: &str = "2018";
const DEFAULT_SIDE: &str = "recto";

/// Fields read from the multipart body.
#[derive(Debug, Default)]
struct ExtractForm {
    image: Bytes,
    filename: Option<String>,
    version: Option<String>,
    side: Option<String>,
    thinking_mode: bool,
}

impl ExtractForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "image" => {
                    form.filename = field.file_name().map(str::to_owned);
                    form.image = field.bytes().await.map_err(malformed)?;
                }
                "version" => form.version = non_blank(text(field).await?),
                "side" => form.side = non_blank(text(field).await?),
                "thinking_mode" => form.thinking_mode = parse_flag(&text(field).await?)?,
                other => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        field = other,
                        "ignoring unknown multipart field"
                    );
                }
            }
        }

        Ok(form)
    }

    fn into_input(self) -> ExtractionInput {
        let version = self.version.unwrap_or_else(|| DEFAULT_VERSION.to_owned());
        let side = self.side.unwrap_or_else(|| DEFAULT_SIDE.to_owned());

        let input = ExtractionInput::new(self.image, version, side)
            .with_thinking_mode(self.thinking_mode);
        match self.filename {
            Some(filename) => input.with_filename(filename),
            None => input,
        }
    }
}

async fn text(field: Field<'_>) -> Result<String> {
    field.text().await.map_err(malformed)
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Parses a form boolean. A blank value is false.
fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(Error::validation(format!(
            "invalid thinking_mode '{other}', expected true or false"
        ))),
    }
}

fn malformed(error: MultipartError) -> Error {
    Error::validation(format!("unreadable multipart body: {}", error.body_text())).with_source(error)
}

#[tracing::instrument(skip_all)]
async fn extract(
    State(orchestrator): State<RequestOrchestrator>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ExtractionResponse {
    let form = match multipart {
        Ok(multipart) => ExtractForm::read(multipart).await,
        Err(rejection) => Err(Error::validation(format!(
            "invalid multipart request: {}",
            rejection.body_text()
        ))),
    };

    let result = match form {
        Ok(form) => {
            tracing::debug!(
                target: TRACING_TARGET,
                image_bytes = form.image.len(),
                filename = form.filename.as_deref(),
                version = form.version.as_deref(),
                side = form.side.as_deref(),
                thinking_mode = form.thinking_mode,
                "extraction form received"
            );
            orchestrator.handle(form.into_input()).await
        }
        Err(error) => orchestrator.reject(error),
    };

    ExtractionResponse::from(result)
}

/// Returns a [`Router`] with the extraction route.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/api/extract", post(extract))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use carta_core::ErrorCode;
    use carta_test::{Reply, ScriptedWorker, fixtures};
    use serde_json::{Value, json};

    use super::*;
    use crate::handler::test::create_test_server;

    fn image_part() -> Part {
        Part::bytes(fixtures::png_bytes().to_vec())
            .file_name("front.png")
            .mime_type("image/png")
    }

    #[test]
    fn flags() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag(" on ").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(!parse_flag("").unwrap());
        assert!(parse_flag("maybe").is_err());
    }

    #[tokio::test]
    async fn extracts_with_defaults() -> anyhow::Result<()> {
        let (server, _) = create_test_server(ScriptedWorker::new())?;

        let form = MultipartForm::new().add_part("image", image_part());
        let response = server.post("/api/extract").multipart(form).await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["extracted_data"]["nom"], json!("NGONO"));
        assert_eq!(body["meta"]["retry_count"], json!(0));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_side_is_bad_request() -> anyhow::Result<()> {
        let worker = ScriptedWorker::new();
        let probe = worker.probe();
        let (server, state) = create_test_server(worker)?;

        let form = MultipartForm::new()
            .add_text("version", "2025")
            .add_text("side", "back")
            .add_part("image", image_part());
        let response = server.post("/api/extract").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["error_code"], json!("VALIDATION_ERROR"));
        assert_eq!(body["can_retry"], json!(false));
        assert_eq!(probe.calls(), 0);
        assert_eq!(state.metrics().snapshot().failed_requests, 1);
        Ok(())
    }

    #[tokio::test]
    async fn missing_image_is_bad_request() -> anyhow::Result<()> {
        let (server, _) = create_test_server(ScriptedWorker::new())?;

        let form = MultipartForm::new().add_text("version", "2018");
        let response = server.post("/api/extract").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn non_multipart_body_is_counted() -> anyhow::Result<()> {
        let (server, state) = create_test_server(ScriptedWorker::new())?;

        let response = server
            .post("/api/extract")
            .json(&json!({"image": "base64"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(state.metrics().snapshot().total_requests, 1);
        Ok(())
    }

    #[tokio::test]
    async fn bad_thinking_flag_is_bad_request() -> anyhow::Result<()> {
        let (server, _) = create_test_server(ScriptedWorker::new())?;

        let form = MultipartForm::new()
            .add_text("thinking_mode", "perhaps")
            .add_part("image", image_part());
        let response = server.post("/api/extract").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(
            response.json::<Value>()["error"]
                .as_str()
                .unwrap_or_default()
                .contains("thinking_mode")
        );
        Ok(())
    }

    #[tokio::test]
    async fn inference_failure_is_unprocessable() -> anyhow::Result<()> {
        let worker = ScriptedWorker::new()
            .then(Reply::Failure(ErrorCode::InferenceFailure, "no JSON".into()));
        let (server, _) = create_test_server(worker)?;

        let form = MultipartForm::new().add_part("image", image_part());
        let response = server.post("/api/extract").multipart(form).await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<Value>()["error_code"], json!("INFERENCE_FAILURE"));
        Ok(())
    }

    #[tokio::test]
    async fn panicking_worker_is_internal_error() -> anyhow::Result<()> {
        let worker = ScriptedWorker::new().then(Reply::Panic);
        let (server, _) = create_test_server(worker)?;

        let form = MultipartForm::new().add_part("image", image_part());
        let response = server.post("/api/extract").multipart(form).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json::<Value>()["error_code"], json!("INTERNAL_ERROR"));
        Ok(())
    }
}
