pub mod markup;
pub mod types;

use std::sync::Arc;

use chrono::Local;
use tracing::debug;

use crate::surface::UiSurface;

pub use types::{Author, Modality, Resolution, Turn, TurnId, TurnKind};

/// Append-only, ordered record of the conversation.
///
/// The only in-place mutation allowed is resolving a placeholder, which keeps
/// the placeholder's position. Each modality may have at most one placeholder
/// outstanding; the orchestrator's per-modality exclusion guarantees that.
pub struct ConversationLog {
    turns: Vec<Turn>,
    next_id: u64,
    surface: Arc<dyn UiSurface>,
}

impl ConversationLog {
    pub fn new(surface: Arc<dyn UiSurface>) -> Self {
        Self {
            turns: Vec::new(),
            next_id: 0,
            surface,
        }
    }

    fn push(&mut self, author: Author, kind: TurnKind, modality: Modality, content: String) -> TurnId {
        let id = TurnId(self.next_id);
        self.next_id += 1;
        let turn = Turn {
            id,
            author,
            kind,
            modality,
            content,
            created_at: Local::now(),
        };
        self.surface.turn_appended(&turn);
        self.turns.push(turn);
        id
    }

    pub fn append_user_echo(&mut self, modality: Modality, content: impl Into<String>) -> TurnId {
        let id = self.push(Author::User, TurnKind::echo_for(modality), modality, content.into());
        debug!(turn = id.0, %modality, "appended user echo");
        id
    }

    /// Appends the in-flight indicator for `modality`.
    ///
    /// # Panics
    /// If that modality already has a placeholder outstanding.
    pub fn append_placeholder(&mut self, modality: Modality) -> TurnId {
        assert!(
            self.placeholder_for(modality).is_none(),
            "a {modality} placeholder is already outstanding"
        );
        self.push(Author::Assistant, TurnKind::Placeholder, modality, String::new())
    }

    /// Assistant error that does not replace a placeholder (e.g. a rejected file).
    pub fn append_error(&mut self, modality: Modality, message: impl Into<String>) -> TurnId {
        self.push(Author::Assistant, TurnKind::ErrorResult, modality, message.into())
    }

    /// Swaps the modality's placeholder for a result or error turn at the same
    /// position. Returns `None` when there was no placeholder to resolve.
    pub fn resolve_placeholder(&mut self, modality: Modality, resolution: Resolution) -> Option<TurnId> {
        let index = self.placeholder_for(modality)?;
        let (kind, content) = match resolution {
            Resolution::Notes(notes) => (TurnKind::Result, notes),
            Resolution::Failure(message) => (TurnKind::ErrorResult, message),
        };

        let turn = &mut self.turns[index];
        turn.kind = kind;
        turn.content = content;
        turn.created_at = Local::now();
        self.surface.turn_replaced(turn);
        debug!(turn = turn.id.0, %modality, ?kind, "resolved placeholder");
        Some(turn.id)
    }

    fn placeholder_for(&self, modality: Modality) -> Option<usize> {
        self.turns
            .iter()
            .position(|t| t.is_placeholder() && t.modality == modality)
    }

    pub fn has_placeholder(&self, modality: Modality) -> bool {
        self.placeholder_for(modality).is_some()
    }

    pub fn placeholder_count(&self) -> usize {
        self.turns.iter().filter(|t| t.is_placeholder()).count()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent successful notes, if any.
    pub fn last_notes(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.kind == TurnKind::Result)
    }

    /// The whole conversation as chat-box HTML, in render order.
    pub fn to_html(&self) -> String {
        self.turns.iter().map(markup::turn_to_html).collect()
    }
}
