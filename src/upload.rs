use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use base64::Engine;
use thiserror::Error;
use tracing::{debug, warn};

use crate::surface::{Control, UiSurface};
use crate::validator::{self, FileFacts, ValidationError};

/// A file the user picked, before anything has been read from it.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub size: u64,
    source: ImageSource,
}

#[derive(Debug, Clone)]
enum ImageSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

impl ImageFile {
    /// Describes a file on disk. The MIME type comes from the extension.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to read file metadata: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            name,
            mime: mime_from_extension(path).to_string(),
            size: metadata.len(),
            source: ImageSource::Path(path.to_path_buf()),
        })
    }

    pub fn in_memory(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            size: bytes.len() as u64,
            source: ImageSource::Memory(bytes),
        }
    }

    pub async fn read(&self) -> io::Result<Vec<u8>> {
        match &self.source {
            ImageSource::Path(path) => tokio::fs::read(path).await,
            ImageSource::Memory(bytes) => Ok(bytes.clone()),
        }
    }
}

impl FileFacts for ImageFile {
    fn mime_type(&self) -> &str {
        &self.mime
    }

    fn byte_size(&self) -> u64 {
        self.size
    }
}

pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "txt" | "md" => "text/plain",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Locally derived reference used to display a staged image.
///
/// Deliberately not `Clone`: [`PreviewStore::release`] consumes it, so a
/// reference can be released at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewRef(String);

impl PreviewRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Issues and releases preview references.
pub trait PreviewStore: Send + Sync {
    fn create(&self, mime: &str, bytes: &[u8]) -> PreviewRef;
    fn release(&self, preview: PreviewRef);
}

/// Previews as `data:` URLs.
#[derive(Debug, Default)]
pub struct DataUrlPreviews {
    live: AtomicUsize,
}

impl DataUrlPreviews {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl PreviewStore for DataUrlPreviews {
    fn create(&self, mime: &str, bytes: &[u8]) -> PreviewRef {
        self.live.fetch_add(1, Ordering::SeqCst);
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        PreviewRef(format!("data:{mime};base64,{encoded}"))
    }

    fn release(&self, preview: PreviewRef) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!(bytes = preview.0.len(), "released image preview");
    }
}

/// The single staged image awaiting submission.
#[derive(Debug)]
pub struct PendingUpload {
    pub file: ImageFile,
    pub bytes: Vec<u8>,
    pub preview: PreviewRef,
}

/// What a submission needs from the staged image.
#[derive(Debug, Clone)]
pub struct StagedImage {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub preview_url: String,
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("failed to read image: {0}")]
    Read(#[from] io::Error),
    #[error("selection was replaced before its preview was ready")]
    Superseded,
}

impl StageError {
    /// Assistant-channel text for this failure; `None` when nothing should be shown.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            StageError::Invalid(ValidationError::TooLarge) => Some("Image size should be less than 5MB."),
            StageError::Invalid(_) => Some("Please upload an image file (JPEG, PNG, etc.)."),
            StageError::Read(_) => Some("Error reading the image file. Please try another file."),
            StageError::Superseded => None,
        }
    }
}

#[derive(Debug)]
enum Slot {
    Empty,
    Loading { generation: u64 },
    Ready(PendingUpload),
}

#[derive(Debug)]
struct StagerState {
    slot: Slot,
    generation: u64,
}

/// Handed out by [`UploadStager::begin`]; redeemed once the file has been read.
#[derive(Debug)]
pub(crate) struct StagingTicket {
    generation: u64,
    file: ImageFile,
}

/// Owner of the single [`PendingUpload`] slot and of its preview reference.
pub struct UploadStager {
    state: Mutex<StagerState>,
    previews: Arc<dyn PreviewStore>,
    surface: Arc<dyn UiSurface>,
    max_bytes: u64,
}

impl UploadStager {
    pub fn new(previews: Arc<dyn PreviewStore>, surface: Arc<dyn UiSurface>) -> Self {
        Self::with_limit(previews, surface, validator::MAX_IMAGE_BYTES)
    }

    pub fn with_limit(previews: Arc<dyn PreviewStore>, surface: Arc<dyn UiSurface>, max_bytes: u64) -> Self {
        Self {
            state: Mutex::new(StagerState {
                slot: Slot::Empty,
                generation: 0,
            }),
            previews,
            surface,
            max_bytes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StagerState> {
        // Nothing panics while the lock is held, but don't wedge the slot if it ever does.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Validates and stages `file`. On failure any existing selection is left alone.
    pub async fn select(&self, file: ImageFile) -> Result<(), StageError> {
        let ticket = self.begin(file)?;
        let bytes = ticket.file.read().await;
        self.complete(ticket, bytes)
    }

    pub(crate) fn begin(&self, file: ImageFile) -> Result<StagingTicket, StageError> {
        validator::validate_image_file_with_limit(&file, self.max_bytes)?;

        let mut state = self.lock();
        state.generation += 1;
        let generation = state.generation;
        let previous = std::mem::replace(&mut state.slot, Slot::Loading { generation });
        drop(state);

        if let Slot::Ready(old) = previous {
            debug!(file = %old.file.name, "replacing staged image");
            self.previews.release(old.preview);
        }
        self.surface.set_control_enabled(Control::SubmitImage, false);
        self.surface.show_preview(None);

        debug!(file = %file.name, size = file.size, generation, "staging image");
        Ok(StagingTicket { generation, file })
    }

    pub(crate) fn complete(&self, ticket: StagingTicket, bytes: io::Result<Vec<u8>>) -> Result<(), StageError> {
        let mut state = self.lock();
        let current = matches!(state.slot, Slot::Loading { generation } if generation == ticket.generation);
        if !current {
            debug!(file = %ticket.file.name, "discarding superseded image read");
            return Err(StageError::Superseded);
        }

        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %ticket.file.name, "failed to read image: {}", e);
                state.slot = Slot::Empty;
                return Err(StageError::Read(e));
            }
        };

        let preview = self.previews.create(&ticket.file.mime, &bytes);
        self.surface.show_preview(Some(&preview));
        state.slot = Slot::Ready(PendingUpload {
            file: ticket.file,
            bytes,
            preview,
        });
        drop(state);

        self.surface.set_control_enabled(Control::SubmitImage, true);
        Ok(())
    }

    /// Releases the preview and drops the staged image. Returns whether
    /// anything was staged; a no-op on an empty stager.
    pub fn clear(&self) -> bool {
        let mut state = self.lock();
        let previous = std::mem::replace(&mut state.slot, Slot::Empty);
        drop(state);

        match previous {
            Slot::Empty => false,
            Slot::Loading { .. } => {
                self.restore_prompt();
                true
            }
            Slot::Ready(pending) => {
                debug!(file = %pending.file.name, "clearing staged image");
                self.previews.release(pending.preview);
                self.restore_prompt();
                true
            }
        }
    }

    fn restore_prompt(&self) {
        self.surface.show_preview(None);
        self.surface.set_control_enabled(Control::SubmitImage, false);
    }

    /// Whether a staged image with a materialised preview exists.
    pub fn is_ready(&self) -> bool {
        matches!(self.lock().slot, Slot::Ready(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.lock().slot, Slot::Empty)
    }

    /// Copy of the staged image for submission. The slot itself is untouched.
    pub fn staged(&self) -> Option<StagedImage> {
        match &self.lock().slot {
            Slot::Ready(pending) => Some(StagedImage {
                file_name: pending.file.name.clone(),
                mime: pending.file.mime.clone(),
                bytes: pending.bytes.clone(),
                preview_url: pending.preview.as_str().to_string(),
            }),
            _ => None,
        }
    }
}
