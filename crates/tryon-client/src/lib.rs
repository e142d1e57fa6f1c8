//! Virtual Try-On Client
//!
//! Validates and submits a portrait and a clothing photo to the try-on
//! synthesis service, and tracks the request lifecycle for a front end.

pub mod client;
pub mod config;
pub mod error;
pub mod image;
pub mod orchestrator;

pub use client::{
    parse_try_on_response, status_fallback_message, validate_input, validate_inputs,
    HttpSubmissionClient, SubmissionClient, TryOnResult, MAX_FILE_SIZE,
};
pub use config::{Config, TRY_ON_PATH};
pub use error::{FailureKind, ImageSlot, Result, SubmissionError, TryOnError};
pub use image::{ImageFormat, ImageInput, ImageSummary, FALLBACK_MEDIA_TYPE};
pub use orchestrator::{FailureInfo, Orchestrator, SubmissionState, SubmitOutcome, TryOnSnapshot};
