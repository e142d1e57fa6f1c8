//! Submission client for the try-on synthesis service.
//!
//! The client validates both inputs, sends them as a single multipart
//! `POST /api/try-on`, and classifies every possible failure into a
//! [`SubmissionError`]. It never retries.
//!
//! # Example
//!
//! ```no_run
//! use tryon_client::{Config, HttpSubmissionClient, ImageInput, SubmissionClient};
//!
//! # async fn example() -> tryon_client::Result<()> {
//! let client = HttpSubmissionClient::new(Config::default())?;
//! let portrait = ImageInput::load("me.jpg").await?;
//! let clothing = ImageInput::load("jacket.png").await?;
//!
//! let result = client.submit_try_on(&portrait, &clothing).await?;
//! println!("{}", result.image_url);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::path::Path;

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{ImageSlot, Result, SubmissionError, TryOnError};
use crate::image::ImageInput;

/// Maximum accepted size of a single input in bytes (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Name of the response field carrying the result reference.
const IMAGE_URL_FIELD: &str = "imageUrl";

/// Reference to a synthesized try-on image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnResult {
    /// URL of the composited image, as returned by the service.
    pub image_url: String,

    /// When the service's answer was received.
    pub received_at: DateTime<Utc>,
}

impl TryOnResult {
    /// Creates a result received now.
    #[must_use]
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            received_at: Utc::now(),
        }
    }
}

/// Performs a try-on submission.
///
/// Implemented by [`HttpSubmissionClient`] for the real service; the
/// orchestrator is generic over this trait so it can be driven by any
/// implementation.
pub trait SubmissionClient: Send + Sync {
    /// Validates both inputs and submits them in a single request.
    fn submit_try_on(
        &self,
        portrait: &ImageInput,
        clothing: &ImageInput,
    ) -> impl Future<Output = std::result::Result<TryOnResult, SubmissionError>> + Send;
}

/// Checks one input against the format and size rules.
///
/// # Errors
///
/// Returns `SubmissionError::InvalidFormat` if the declared media type is not
/// a well-formed `image/*` type, or `SubmissionError::FileTooLarge` if the
/// payload exceeds [`MAX_FILE_SIZE`].
pub fn validate_input(
    slot: ImageSlot,
    input: &ImageInput,
) -> std::result::Result<(), SubmissionError> {
    if !input.is_image() || Part::text("").mime_str(input.media_type()).is_err() {
        return Err(SubmissionError::InvalidFormat {
            slot,
            media_type: input.media_type().to_string(),
        });
    }

    if input.size_bytes() > MAX_FILE_SIZE {
        return Err(SubmissionError::FileTooLarge {
            slot,
            size_bytes: input.size_bytes(),
        });
    }

    Ok(())
}

/// Validates the portrait, then the clothing; the first failure wins.
///
/// # Errors
///
/// Returns the first validation failure, see [`validate_input`].
pub fn validate_inputs(
    portrait: &ImageInput,
    clothing: &ImageInput,
) -> std::result::Result<(), SubmissionError> {
    validate_input(ImageSlot::Portrait, portrait)?;
    validate_input(ImageSlot::Clothing, clothing)
}

/// Extracts the result reference from a success response body.
///
/// # Errors
///
/// Returns `SubmissionError::UnknownError` if the body is not JSON, and
/// `SubmissionError::MalformedResponse` if it has no non-empty `imageUrl`
/// string.
pub fn parse_try_on_response(body: &[u8]) -> std::result::Result<TryOnResult, SubmissionError> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(SubmissionError::unknown)?;

    match value.get(IMAGE_URL_FIELD).and_then(serde_json::Value::as_str) {
        Some(url) if !url.is_empty() => Ok(TryOnResult::new(url)),
        _ => Err(SubmissionError::MalformedResponse),
    }
}

/// Builds the `HTTP {status}: {reason}` message used when a failure body is unusable.
#[must_use]
pub fn status_fallback_message(status: StatusCode) -> String {
    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    )
}

/// Maps a transport-level `reqwest` failure onto the taxonomy.
fn classify_transport(err: &reqwest::Error) -> SubmissionError {
    if err.is_timeout() {
        SubmissionError::timeout()
    } else if err.is_connect() || err.is_request() || err.is_body() {
        SubmissionError::network()
    } else {
        SubmissionError::unknown(err)
    }
}

/// Reads a failure response into a `ServerError`.
async fn server_error(response: reqwest::Response) -> SubmissionError {
    let status = response.status();
    let message = match response.text().await {
        Ok(body) if !body.is_empty() => body,
        Ok(_) => status_fallback_message(status),
        Err(e) => {
            warn!(error = %e, status = status.as_u16(), "Failed to read error response body");
            status_fallback_message(status)
        }
    };
    SubmissionError::server(status.as_u16(), message)
}

/// Builds the multipart part for one input, sharing its payload buffer.
fn image_part(slot: ImageSlot, input: &ImageInput) -> std::result::Result<Part, SubmissionError> {
    Part::stream_with_length(input.payload(), input.size_bytes())
        .file_name(input.file_name().to_string())
        .mime_str(input.media_type())
        .map_err(|_| SubmissionError::InvalidFormat {
            slot,
            media_type: input.media_type().to_string(),
        })
}

/// HTTP implementation of [`SubmissionClient`].
#[derive(Debug, Clone)]
pub struct HttpSubmissionClient {
    /// The pooled HTTP client.
    http: reqwest::Client,
    /// Full URL of the try-on endpoint.
    endpoint: Url,
    /// Configuration the client was built from.
    config: Config,
}

impl HttpSubmissionClient {
    /// Creates a client for the service described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `TryOnError::ConfigValidationError` if the configuration is
    /// invalid or the HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let endpoint = config.endpoint_url()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| {
                TryOnError::config_validation(
                    format!("failed to build HTTP client: {e}"),
                    "Check the TLS configuration of this machine",
                )
            })?;

        debug!(endpoint = %endpoint, "Submission client ready");

        Ok(Self {
            http,
            endpoint,
            config,
        })
    }

    /// Full URL submissions are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Configuration the client was built from.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Downloads the image behind `result` and writes it to `destination`.
    ///
    /// Relative references are resolved against the configured base URL.
    /// Parent directories of `destination` are created as needed. Returns the
    /// number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `TryOnError::Submission` with `ServerError` for a non-success
    /// status or `NetworkError` for a transport failure, and `TryOnError::Io`
    /// if the file cannot be written.
    #[instrument(skip(self, result), fields(image_url = %result.image_url))]
    pub async fn download_result(&self, result: &TryOnResult, destination: &Path) -> Result<u64> {
        let url = self.config.resolve_reference(&result.image_url)?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        if !response.status().is_success() {
            return Err(server_error(response).await.into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_transport(&e))?;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(destination, &bytes).await?;

        info!(
            destination = %destination.display(),
            size = bytes.len(),
            "Downloaded try-on result"
        );

        Ok(bytes.len() as u64)
    }
}

impl SubmissionClient for HttpSubmissionClient {
    #[instrument(
        skip(self, portrait, clothing),
        fields(
            endpoint = %self.endpoint,
            portrait_size = portrait.size_bytes(),
            clothing_size = clothing.size_bytes()
        )
    )]
    async fn submit_try_on(
        &self,
        portrait: &ImageInput,
        clothing: &ImageInput,
    ) -> std::result::Result<TryOnResult, SubmissionError> {
        validate_inputs(portrait, clothing).inspect_err(|e| {
            warn!(kind = %e.kind(), "Input rejected before upload");
        })?;

        let form = Form::new()
            .part(
                ImageSlot::Portrait.field_name(),
                image_part(ImageSlot::Portrait, portrait)?,
            )
            .part(
                ImageSlot::Clothing.field_name(),
                image_part(ImageSlot::Clothing, clothing)?,
            );

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Try-on request failed in transport");
                classify_transport(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = server_error(response).await;
            warn!(status = status.as_u16(), "Try-on service returned an error");
            return Err(err);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport(&e))?;

        let result = parse_try_on_response(&body).inspect_err(|e| {
            warn!(kind = %e.kind(), body_len = body.len(), "Unusable try-on response");
        })?;

        info!(image_url = %result.image_url, "Try-on succeeded");
        Ok(result)
    }
}
