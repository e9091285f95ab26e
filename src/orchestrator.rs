//! Per-modality submission state machine.
//!
//! `Idle -> Validating -> Submitting -> Idle`. Validation failures never touch
//! the conversation or the backend. Once a submission reaches `Submitting`, an
//! [`InFlightGuard`] owns the exit: whatever happens afterwards (reply, error,
//! panic, dropped future) the placeholder is resolved, the modality returns to
//! `Idle` and, for images, the stager is cleared.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::{BackendError, ImagePayload, NotesBackend, NotesResponse};
use crate::classifier::classify_video_error;
use crate::config::UiConfig;
use crate::conversation::{ConversationLog, Modality, Resolution};
use crate::preferences::StyleSelector;
use crate::surface::{Control, InputTarget, UiSurface};
use crate::upload::{ImageFile, PreviewStore, StageError, UploadStager};
use crate::validator::{self, ValidationError};

const TEXT_FAILURE: &str = "Sorry, something went wrong while generating notes. Please try again.";
const IMAGE_FAILURE: &str = "Sorry, something went wrong while processing the image. Please try again.";
const MALFORMED_VIDEO_URL: &str =
    "Please enter a valid YouTube URL (e.g., https://www.youtube.com/watch?v=VIDEO_ID).";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight,
}

/// Where a video URL came from. Example links leave the URL input alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoOrigin {
    Input,
    Example,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Text(String),
    Image,
    Video { url: String, origin: VideoOrigin },
}

impl Submission {
    pub fn modality(&self) -> Modality {
        match self {
            Submission::Text(_) => Modality::Text,
            Submission::Image => Modality::Image,
            Submission::Video { .. } => Modality::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Failed local validation; nothing was sent.
    Rejected(ValidationError),
    /// The modality already has a request in flight.
    Busy,
    /// The exchange finished and the placeholder was resolved.
    Settled(Resolution),
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub shake: Duration,
    pub max_image_bytes: u64,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            shake: Duration::from_millis(500),
            max_image_bytes: validator::MAX_IMAGE_BYTES,
        }
    }
}

impl From<&UiConfig> for OrchestratorOptions {
    fn from(ui: &UiConfig) -> Self {
        Self {
            shake: Duration::from_millis(ui.shake_millis),
            max_image_bytes: ui.max_image_bytes,
        }
    }
}

pub struct SubmissionOrchestrator {
    backend: Arc<dyn NotesBackend>,
    surface: Arc<dyn UiSurface>,
    log: Mutex<ConversationLog>,
    stager: UploadStager,
    style: StyleSelector,
    states: Mutex<[SubmissionState; 3]>,
    shake: Duration,
}

/// Payload captured once a submission has passed validation.
enum Validated {
    Text(String),
    Image(ImagePayload, String),
    Video(String, VideoOrigin),
}

impl SubmissionOrchestrator {
    pub fn new(
        backend: Arc<dyn NotesBackend>,
        surface: Arc<dyn UiSurface>,
        previews: Arc<dyn PreviewStore>,
        style: StyleSelector,
        options: OrchestratorOptions,
    ) -> Self {
        let stager = UploadStager::with_limit(previews, surface.clone(), options.max_image_bytes);
        let log = ConversationLog::new(surface.clone());

        // Nothing is staged yet
        surface.set_control_enabled(Control::SubmitImage, false);

        Self {
            backend,
            surface,
            log: Mutex::new(log),
            stager,
            style,
            states: Mutex::new([SubmissionState::Idle; 3]),
            shake: options.shake,
        }
    }

    fn lock_log(&self) -> MutexGuard<'_, ConversationLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_states(&self) -> MutexGuard<'_, [SubmissionState; 3]> {
        self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self, modality: Modality) -> SubmissionState {
        self.lock_states()[modality.index()]
    }

    /// Read access to the conversation.
    pub fn with_log<R>(&self, f: impl FnOnce(&ConversationLog) -> R) -> R {
        f(&self.lock_log())
    }

    pub fn stager(&self) -> &UploadStager {
        &self.stager
    }

    pub fn style(&self) -> &StyleSelector {
        &self.style
    }

    /// Stages an image for the next image submission. Rejections are reported
    /// in the conversation as assistant errors.
    pub async fn select_image(&self, file: ImageFile) -> Result<(), StageError> {
        match self.stager.select(file).await {
            Ok(()) => {
                if self.state(Modality::Image) == SubmissionState::InFlight {
                    self.surface.set_control_enabled(Control::SubmitImage, false);
                }
                Ok(())
            }
            Err(e) => {
                if let Some(message) = e.user_message() {
                    warn!("image selection rejected: {}", e);
                    self.lock_log().append_error(Modality::Image, message);
                }
                Err(e)
            }
        }
    }

    pub fn remove_image(&self) {
        self.stager.clear();
    }

    pub async fn submit_text(&self, raw: &str) -> SubmitOutcome {
        self.submit(Submission::Text(raw.to_string())).await
    }

    pub async fn submit_image(&self) -> SubmitOutcome {
        self.submit(Submission::Image).await
    }

    pub async fn submit_video(&self, raw: &str, origin: VideoOrigin) -> SubmitOutcome {
        self.submit(Submission::Video {
            url: raw.to_string(),
            origin,
        })
        .await
    }

    pub async fn submit(&self, submission: Submission) -> SubmitOutcome {
        let modality = submission.modality();
        if self.state(modality) == SubmissionState::InFlight {
            debug!(%modality, "submission ignored, request already in flight");
            return SubmitOutcome::Busy;
        }

        let validated = match self.validate(submission) {
            Ok(validated) => validated,
            Err(e) => return SubmitOutcome::Rejected(e),
        };

        let Some(guard) = InFlightGuard::enter(self, modality) else {
            return SubmitOutcome::Busy;
        };

        {
            let mut log = self.lock_log();
            match &validated {
                Validated::Text(text) => {
                    log.append_user_echo(modality, text.as_str());
                    self.surface.clear_input(InputTarget::TextInput);
                }
                Validated::Image(_, preview_url) => {
                    log.append_user_echo(modality, preview_url.as_str());
                }
                Validated::Video(url, origin) => {
                    log.append_user_echo(modality, url.as_str());
                    if *origin == VideoOrigin::Input {
                        self.surface.clear_input(InputTarget::VideoUrlInput);
                    }
                }
            }
            log.append_placeholder(modality);
        }

        let style = self.style.current();
        info!(%modality, style = %style, "submitting");
        let reply = match validated {
            Validated::Text(text) => self.backend.generate_from_text(&text, &style).await,
            Validated::Image(payload, _) => self.backend.generate_from_image(payload, &style).await,
            Validated::Video(url, _) => self.backend.generate_from_video(&url, &style).await,
        };

        let resolution = resolve_reply(modality, reply);
        self.lock_log().resolve_placeholder(modality, resolution.clone());
        drop(guard);

        info!(%modality, success = resolution.is_success(), "submission settled");
        SubmitOutcome::Settled(resolution)
    }

    fn validate(&self, submission: Submission) -> Result<Validated, ValidationError> {
        match submission {
            Submission::Text(raw) => validator::validate_text(&raw)
                .map(Validated::Text)
                .inspect_err(|_| self.surface.shake(InputTarget::TextInput, self.shake)),
            Submission::Image => match self.stager.staged() {
                Some(staged) => {
                    let payload = ImagePayload {
                        file_name: staged.file_name,
                        mime: staged.mime,
                        bytes: staged.bytes,
                    };
                    Ok(Validated::Image(payload, staged.preview_url))
                }
                None => {
                    self.surface.shake(InputTarget::ImageUploadArea, self.shake);
                    // A half-loaded selection is dropped as well
                    self.stager.clear();
                    Err(ValidationError::EmptyInput)
                }
            },
            Submission::Video { url, origin } => match validator::validate_video_url(&url) {
                Ok(url) => Ok(Validated::Video(url, origin)),
                Err(e) => {
                    self.surface.shake(InputTarget::VideoUrlInput, self.shake);
                    if e == ValidationError::MalformedUrl {
                        self.lock_log().append_error(Modality::Video, MALFORMED_VIDEO_URL);
                    }
                    Err(e)
                }
            },
        }
    }
}

/// Generic failure for a modality when the transport gives us nothing usable.
fn transport_failure(modality: Modality, raw: &str) -> Resolution {
    let message = match modality {
        Modality::Text => TEXT_FAILURE,
        Modality::Image => IMAGE_FAILURE,
        Modality::Video => classify_video_error(raw).user_message(),
    };
    Resolution::Failure(message.to_string())
}

fn resolve_reply(modality: Modality, reply: Result<NotesResponse, BackendError>) -> Resolution {
    let response = match reply {
        Ok(response) => response,
        Err(e) => {
            warn!(%modality, "notes request failed: {}", e);
            return transport_failure(modality, &e.to_string());
        }
    };

    match (response.error.filter(|e| !e.is_empty()), response.notes) {
        (Some(error), _) => {
            warn!(%modality, error = %error, "notes service reported an error");
            match modality {
                Modality::Video => {
                    Resolution::Failure(classify_video_error(&error).user_message().to_string())
                }
                Modality::Text | Modality::Image => Resolution::Failure(error),
            }
        }
        (None, Some(notes)) => Resolution::Notes(notes),
        (None, None) => {
            warn!(%modality, "notes service reply had neither notes nor error");
            transport_failure(modality, "response carried no notes")
        }
    }
}

/// Marks a modality in flight for as long as it lives.
struct InFlightGuard<'a> {
    orchestrator: &'a SubmissionOrchestrator,
    modality: Modality,
}

impl<'a> InFlightGuard<'a> {
    fn enter(orchestrator: &'a SubmissionOrchestrator, modality: Modality) -> Option<Self> {
        {
            let mut states = orchestrator.lock_states();
            let state = &mut states[modality.index()];
            if *state == SubmissionState::InFlight {
                return None;
            }
            *state = SubmissionState::InFlight;
        }
        orchestrator
            .surface
            .set_control_enabled(Control::for_modality(modality), false);
        debug!(%modality, "in flight");
        Some(Self { orchestrator, modality })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let orchestrator = self.orchestrator;
        let modality = self.modality;

        // Only reachable with a placeholder still up if the exchange never settled
        let mut log = orchestrator.lock_log();
        if log.has_placeholder(modality) {
            warn!(%modality, "submission ended without a reply");
            log.resolve_placeholder(modality, transport_failure(modality, ""));
        }
        drop(log);

        orchestrator.lock_states()[modality.index()] = SubmissionState::Idle;

        let control = Control::for_modality(modality);
        if modality == Modality::Image {
            orchestrator.stager.clear();
            orchestrator
                .surface
                .set_control_enabled(control, orchestrator.stager.is_ready());
        } else {
            orchestrator.surface.set_control_enabled(control, true);
        }
        debug!(%modality, "idle");
    }
}
