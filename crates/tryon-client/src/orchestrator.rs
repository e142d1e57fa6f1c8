//! Request orchestrator for the try-on lifecycle.
//!
//! The [`Orchestrator`] owns the selected inputs, the submission status, and
//! the last result or failure. State can only change through its operations:
//!
//! - `Idle` -> `Loading` -> `Succeeded` | `Failed`
//! - `Succeeded` -> `Loading` (resubmission) or `Idle` (reset)
//! - `Failed` -> `Idle` (clear error or reset) or `Loading` (resubmission)
//!
//! There is no terminal state. While a submission is `Loading`, further
//! `submit()` calls are ignored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::{SubmissionClient, TryOnResult};
use crate::error::{FailureKind, SubmissionError};
use crate::image::{ImageInput, ImageSummary};

// ============================================================================
// SubmissionState
// ============================================================================

/// Lifecycle status of the current submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// Nothing submitted, or the last outcome was dismissed.
    #[default]
    Idle,
    /// A request is in flight.
    Loading,
    /// The last request produced a result.
    Succeeded,
    /// The last attempt failed.
    Failed,
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ============================================================================
// FailureInfo
// ============================================================================

/// A classified failure as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureInfo {
    /// Which kind of failure occurred.
    pub kind: FailureKind,

    /// Human-readable message.
    pub message: String,

    /// HTTP status code, for server errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// When the failure was recorded.
    pub occurred_at: DateTime<Utc>,
}

impl From<&SubmissionError> for FailureInfo {
    fn from(err: &SubmissionError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            status_code: err.status_code(),
            occurred_at: Utc::now(),
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Read-only view of the orchestrator state for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnSnapshot {
    /// Current lifecycle status.
    pub status: SubmissionState,

    /// Selected portrait, if any.
    pub portrait: Option<ImageSummary>,

    /// Selected clothing, if any.
    pub clothing: Option<ImageSummary>,

    /// Result of the last successful submission.
    pub result: Option<TryOnResult>,

    /// Whether a request is in flight.
    pub is_loading: bool,

    /// The last failure, until dismissed.
    pub error: Option<FailureInfo>,
}

/// What a call to [`Orchestrator::submit`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A submission was already in flight; nothing changed.
    Ignored,
    /// The submission produced a result.
    Succeeded(TryOnResult),
    /// The submission failed; the orchestrator is now `Failed`.
    Failed(SubmissionError),
    /// The orchestrator was reset while the request was in flight and the
    /// outcome was dropped.
    Superseded,
}

// ============================================================================
// Internal state container
// ============================================================================

#[derive(Debug, Default)]
struct TryOnState {
    status: SubmissionState,
    portrait: Option<ImageInput>,
    clothing: Option<ImageInput>,
    result: Option<TryOnResult>,
    failure: Option<FailureInfo>,
    /// Incremented on every submission and reset; an in-flight call only
    /// applies its outcome if this still matches.
    attempt: u64,
}

impl TryOnState {
    fn begin(&mut self) -> u64 {
        self.attempt += 1;
        self.status = SubmissionState::Loading;
        self.result = None;
        self.failure = None;
        self.attempt
    }

    fn succeed(&mut self, result: TryOnResult) {
        self.status = SubmissionState::Succeeded;
        self.failure = None;
        self.result = Some(result);
    }

    fn fail(&mut self, err: &SubmissionError) {
        self.status = SubmissionState::Failed;
        self.result = None;
        self.failure = Some(FailureInfo::from(err));
    }

    fn snapshot(&self) -> TryOnSnapshot {
        TryOnSnapshot {
            status: self.status,
            portrait: self.portrait.as_ref().map(ImageInput::summary),
            clothing: self.clothing.as_ref().map(ImageInput::summary),
            result: self.result.clone(),
            is_loading: self.status == SubmissionState::Loading,
            error: self.failure.clone(),
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Owns the try-on lifecycle and drives a [`SubmissionClient`].
///
/// Cloning an `Orchestrator` yields another handle to the same state.
///
/// # Examples
///
/// ```no_run
/// use tryon_client::{Config, HttpSubmissionClient, ImageInput, Orchestrator, SubmitOutcome};
///
/// # async fn example() -> tryon_client::Result<()> {
/// let orchestrator = Orchestrator::new(HttpSubmissionClient::new(Config::default())?);
/// orchestrator.set_portrait(Some(ImageInput::load("me.jpg").await?)).await;
/// orchestrator.set_clothing(Some(ImageInput::load("coat.png").await?)).await;
///
/// if let SubmitOutcome::Succeeded(result) = orchestrator.submit().await {
///     println!("{}", result.image_url);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Orchestrator<C> {
    client: Arc<C>,
    state: Arc<Mutex<TryOnState>>,
}

impl<C> Clone for Orchestrator<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            state: Arc::clone(&self.state),
        }
    }
}

impl<C: SubmissionClient> Orchestrator<C> {
    /// Creates an idle orchestrator with no inputs selected.
    pub fn new(client: C) -> Self {
        Self {
            client: Arc::new(client),
            state: Arc::new(Mutex::new(TryOnState::default())),
        }
    }

    /// The submission client this orchestrator drives.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Replaces the portrait slot.
    pub async fn set_portrait(&self, input: Option<ImageInput>) {
        debug!(selected = input.is_some(), "Portrait updated");
        self.state.lock().await.portrait = input;
    }

    /// Replaces the clothing slot.
    pub async fn set_clothing(&self, input: Option<ImageInput>) {
        debug!(selected = input.is_some(), "Clothing updated");
        self.state.lock().await.clothing = input;
    }

    /// Submits the selected inputs.
    ///
    /// Ignored while a submission is already `Loading`. Fails immediately
    /// with `MissingInputs` if either slot is empty. Otherwise clears the
    /// previous outcome, moves to `Loading`, and awaits the client.
    pub async fn submit(&self) -> SubmitOutcome {
        let (attempt, portrait, clothing) = {
            let mut state = self.state.lock().await;

            if state.status == SubmissionState::Loading {
                debug!(attempt = state.attempt, "Submission already in flight, ignoring");
                return SubmitOutcome::Ignored;
            }

            let (Some(portrait), Some(clothing)) = (state.portrait.clone(), state.clothing.clone())
            else {
                let err = SubmissionError::MissingInputs;
                warn!(
                    portrait = state.portrait.is_some(),
                    clothing = state.clothing.is_some(),
                    "Cannot submit without both images"
                );
                state.fail(&err);
                return SubmitOutcome::Failed(err);
            };

            (state.begin(), portrait, clothing)
        };

        info!(attempt, "Submitting try-on request");
        let outcome = self.client.submit_try_on(&portrait, &clothing).await;

        let mut state = self.state.lock().await;
        if state.attempt != attempt {
            info!(attempt, current = state.attempt, "Discarding outcome of superseded submission");
            return SubmitOutcome::Superseded;
        }

        match outcome {
            Ok(result) => {
                info!(attempt, image_url = %result.image_url, "Try-on submission succeeded");
                state.succeed(result.clone());
                SubmitOutcome::Succeeded(result)
            }
            Err(err) => {
                warn!(
                    attempt,
                    kind = %err.kind(),
                    status_code = ?err.status_code(),
                    rejected_before_upload = err.is_validation(),
                    error = %err,
                    "Try-on submission failed"
                );
                state.fail(&err);
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// Dismisses the current failure.
    ///
    /// Only acts in the `Failed` state, moving to `Idle` with the inputs
    /// kept. Returns whether anything changed.
    pub async fn clear_error(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.status != SubmissionState::Failed {
            return false;
        }
        state.status = SubmissionState::Idle;
        state.failure = None;
        debug!("Failure dismissed");
        true
    }

    /// Clears inputs, result, and failure, and returns to `Idle`.
    ///
    /// An in-flight submission keeps running, but its outcome is discarded.
    /// Since the state is `Idle` again, a `submit()` made before that request
    /// finishes starts a second one, so two requests can briefly be in flight.
    /// Only the newest one's outcome is applied.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        let attempt = state.attempt + 1;
        *state = TryOnState {
            attempt,
            ..TryOnState::default()
        };
        debug!("Orchestrator reset");
    }

    /// Current lifecycle status.
    pub async fn status(&self) -> SubmissionState {
        self.state.lock().await.status
    }

    /// Read-only view of the whole state.
    pub async fn snapshot(&self) -> TryOnSnapshot {
        self.state.lock().await.snapshot()
    }
}

// ============================================================================
// Tests
// ============================================================================
