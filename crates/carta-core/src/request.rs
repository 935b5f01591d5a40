//! Extraction request types and boundary validation.
//!
//! Transports hand the orchestrator an untyped [`ExtractionInput`]. It is
//! turned into an immutable [`ExtractionRequest`] by
//! [`ExtractionInput::validate`], which is the only way to obtain one from
//! untrusted data.

use std::fmt;

use bytes::Bytes;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::TRACING_TARGET_VALIDATION;
use crate::error::{Error, Result};

/// Default upper bound for the image payload (16 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 16 * 1024 * 1024;

/// Identity card generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, AsRefStr, IntoStaticStr, EnumString)]
pub enum DocumentVersion {
    /// Cards issued under the 2018 format.
    #[serde(rename = "2018")]
    #[strum(serialize = "2018")]
    V2018,
    /// Cards issued under the 2025 format.
    #[serde(rename = "2025")]
    #[strum(serialize = "2025")]
    V2025,
}

/// Face of the card shown in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, AsRefStr, IntoStaticStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentSide {
    /// Front side with the holder's identity.
    Recto,
    /// Back side with parents, dates and issuing details.
    Verso,
}

/// Image container formats accepted for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, AsRefStr, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageType {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    WebP,
}

impl ImageType {
    /// Sniffs the container format from the leading magic bytes.
    ///
    /// Returns `None` for unknown data and for formats outside the accepted
    /// set.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        match image::guess_format(data).ok()? {
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::Bmp => Some(Self::Bmp),
            ImageFormat::Tiff => Some(Self::Tiff),
            ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }

    /// Returns the MIME type of the format.
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::WebP => "image/webp",
        }
    }
}

/// Payload bounds enforced during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadLimits {
    /// Largest accepted image, in bytes.
    pub max_image_bytes: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl PayloadLimits {
    /// Creates limits with the given maximum image size.
    pub fn new(max_image_bytes: usize) -> Self {
        Self { max_image_bytes }
    }
}

/// Untyped submission as received by a transport.
#[derive(Clone)]
pub struct ExtractionInput {
    /// Correlation id, generated on construction.
    pub request_id: Uuid,
    /// Raw image payload.
    pub image: Bytes,
    /// Card version as submitted.
    pub version: String,
    /// Card side as submitted.
    pub side: String,
    /// Whether the post-processor should reason before answering.
    pub thinking_mode: bool,
    /// Original file name, if the transport provided one.
    pub filename: Option<String>,
}

impl ExtractionInput {
    /// Creates a new input with a fresh request id.
    pub fn new(image: impl Into<Bytes>, version: impl Into<String>, side: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            image: image.into(),
            version: version.into(),
            side: side.into(),
            thinking_mode: false,
            filename: None,
        }
    }

    /// Sets the thinking mode flag.
    pub fn with_thinking_mode(mut self, thinking_mode: bool) -> Self {
        self.thinking_mode = thinking_mode;
        self
    }

    /// Sets the original file name.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Validates the submission and converts it into a typed request.
    ///
    /// Checks run in a fixed order: version, side, non-empty payload,
    /// payload size, then payload type. The first failing check is reported
    /// as a [`ErrorCode::ValidationError`](crate::ErrorCode::ValidationError).
    pub fn validate(self, limits: &PayloadLimits) -> Result<ExtractionRequest> {
        let version: DocumentVersion = self.version.parse().map_err(|_| {
            Error::validation(format!(
                "unsupported document version '{}', expected '2018' or '2025'",
                self.version
            ))
        })?;

        let side: DocumentSide = self.side.parse().map_err(|_| {
            Error::validation(format!(
                "unsupported document side '{}', expected 'recto' or 'verso'",
                self.side
            ))
        })?;

        if self.image.is_empty() {
            return Err(Error::validation("image payload is empty"));
        }

        if self.image.len() > limits.max_image_bytes {
            return Err(Error::validation(format!(
                "image payload of {} bytes exceeds the {} byte limit",
                self.image.len(),
                limits.max_image_bytes
            )));
        }

        let image_type = ImageType::sniff(&self.image).ok_or_else(|| {
            Error::validation("unsupported image type, expected PNG, JPEG, GIF, BMP, TIFF or WebP")
        })?;

        tracing::trace!(
            target: TRACING_TARGET_VALIDATION,
            request_id = %self.request_id,
            %version,
            %side,
            %image_type,
            image_bytes = self.image.len(),
            "request validated"
        );

        Ok(ExtractionRequest {
            request_id: self.request_id,
            image: self.image,
            image_type,
            version,
            side,
            thinking_mode: self.thinking_mode,
        })
    }
}

impl fmt::Debug for ExtractionInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionInput")
            .field("request_id", &self.request_id)
            .field("image_bytes", &self.image.len())
            .field("version", &self.version)
            .field("side", &self.side)
            .field("thinking_mode", &self.thinking_mode)
            .field("filename", &self.filename)
            .finish()
    }
}

/// Validated extraction request.
///
/// Cloning is cheap: the image is reference counted.
#[derive(Clone)]
pub struct ExtractionRequest {
    /// Correlation id carried into every log line.
    pub request_id: Uuid,
    /// Image payload.
    pub image: Bytes,
    /// Sniffed container format.
    pub image_type: ImageType,
    /// Card version.
    pub version: DocumentVersion,
    /// Card side.
    pub side: DocumentSide,
    /// Whether the post-processor should reason before answering.
    pub thinking_mode: bool,
}

impl ExtractionRequest {
    /// Creates a request from already typed parts.
    ///
    /// The image type is sniffed and falls back to PNG when unknown, which
    /// keeps this constructor usable for synthetic payloads in tests.
    pub fn new(
        image: impl Into<Bytes>,
        version: DocumentVersion,
        side: DocumentSide,
        thinking_mode: bool,
    ) -> Self {
        let image = image.into();
        let image_type = ImageType::sniff(&image).unwrap_or(ImageType::Png);

        Self {
            request_id: Uuid::now_v7(),
            image,
            image_type,
            version,
            side,
            thinking_mode,
        }
    }
}

impl fmt::Debug for ExtractionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionRequest")
            .field("request_id", &self.request_id)
            .field("image_bytes", &self.image.len())
            .field("image_type", &self.image_type)
            .field("version", &self.version)
            .field("side", &self.side)
            .field("thinking_mode", &self.thinking_mode)
            .finish()
    }
}
