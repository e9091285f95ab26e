//! Test doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::backend::{BackendError, ImagePayload, NotesBackend, NotesResponse};
use crate::conversation::{Modality, Turn, TurnId, TurnKind};
use crate::surface::{Control, InputTarget, UiSurface};
use crate::upload::{PreviewRef, PreviewStore};

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Appended(TurnId, TurnKind),
    Replaced(TurnId, TurnKind),
    Control(Control, bool),
    Shake(InputTarget, Duration),
    Cleared(InputTarget),
    Preview(bool),
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    fn record(&self, event: SurfaceEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn control_history(&self, control: Control) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SurfaceEvent::Control(c, enabled) if c == control => Some(enabled),
                _ => None,
            })
            .collect()
    }

    pub fn control_enabled(&self, control: Control) -> Option<bool> {
        self.control_history(control).last().copied()
    }

    pub fn preview_visible(&self) -> bool {
        self.events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                SurfaceEvent::Preview(visible) => Some(visible),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn shakes(&self, target: InputTarget) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SurfaceEvent::Shake(t, d) if t == target => Some(d),
                _ => None,
            })
            .collect()
    }
}

impl UiSurface for RecordingSurface {
    fn turn_appended(&self, turn: &Turn) {
        self.record(SurfaceEvent::Appended(turn.id, turn.kind));
    }

    fn turn_replaced(&self, turn: &Turn) {
        self.record(SurfaceEvent::Replaced(turn.id, turn.kind));
    }

    fn set_control_enabled(&self, control: Control, enabled: bool) {
        self.record(SurfaceEvent::Control(control, enabled));
    }

    fn shake(&self, target: InputTarget, duration: Duration) {
        self.record(SurfaceEvent::Shake(target, duration));
    }

    fn clear_input(&self, target: InputTarget) {
        self.record(SurfaceEvent::Cleared(target));
    }

    fn show_preview(&self, preview: Option<&PreviewRef>) {
        self.record(SurfaceEvent::Preview(preview.is_some()));
    }
}

#[derive(Debug, Default)]
pub struct CountingPreviews {
    created: AtomicUsize,
    released: AtomicUsize,
}

impl CountingPreviews {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.created() - self.released()
    }
}

impl PreviewStore for CountingPreviews {
    fn create(&self, _mime: &str, _bytes: &[u8]) -> PreviewRef {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        PreviewRef::new(format!("preview://{n}"))
    }

    fn release(&self, _preview: PreviewRef) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub enum Reply {
    Notes(String),
    Error(String),
    Empty,
    Transport(BackendError),
    Panic,
}

/// Backend that answers from a per-modality script. Gated modalities wait
/// for [`ScriptedBackend::release`] before answering.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<HashMap<Modality, VecDeque<Reply>>>,
    gates: HashMap<Modality, Arc<Notify>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn reply(self, modality: Modality, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(modality)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn gate(mut self, modality: Modality) -> Self {
        self.gates.insert(modality, Arc::new(Notify::new()));
        self
    }

    pub fn release(&self, modality: Modality) {
        if let Some(gate) = self.gates.get(&modality) {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, modality: Modality, call: String) -> Result<NotesResponse, BackendError> {
        self.calls.lock().unwrap().push(call);
        if let Some(gate) = self.gates.get(&modality).cloned() {
            gate.notified().await;
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&modality)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| panic!("no scripted reply left for {modality}"));

        match reply {
            Reply::Notes(notes) => Ok(NotesResponse {
                notes: Some(notes),
                error: None,
            }),
            Reply::Error(error) => Ok(NotesResponse {
                notes: None,
                error: Some(error),
            }),
            Reply::Empty => Ok(NotesResponse::default()),
            Reply::Transport(e) => Err(e),
            Reply::Panic => panic!("scripted backend panic"),
        }
    }
}

#[async_trait]
impl NotesBackend for ScriptedBackend {
    async fn generate_from_text(&self, text: &str, style: &str) -> Result<NotesResponse, BackendError> {
        self.answer(Modality::Text, format!("text:{text}:{style}")).await
    }

    async fn generate_from_image(&self, image: ImagePayload, style: &str) -> Result<NotesResponse, BackendError> {
        let call = format!("image:{}:{}:{style}", image.file_name, image.bytes.len());
        self.answer(Modality::Image, call).await
    }

    async fn generate_from_video(&self, video_url: &str, style: &str) -> Result<NotesResponse, BackendError> {
        self.answer(Modality::Video, format!("video:{video_url}:{style}")).await
    }
}
