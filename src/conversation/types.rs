use chrono::{DateTime, Local};

/// The three supported input kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Text,
    Image,
    Video,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
            Modality::Video => "video",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Modality::Text => 0,
            Modality::Image => 1,
            Modality::Video => 2,
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a turn in the conversation. Monotonic, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurnId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    TextEcho,
    ImageEcho,
    VideoEcho,
    Result,
    ErrorResult,
    Placeholder,
}

impl TurnKind {
    pub fn echo_for(modality: Modality) -> Self {
        match modality {
            Modality::Text => TurnKind::TextEcho,
            Modality::Image => TurnKind::ImageEcho,
            Modality::Video => TurnKind::VideoEcho,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Turn {
    pub id: TurnId,
    pub author: Author,
    pub kind: TurnKind,
    /// The modality whose submission produced this turn.
    pub modality: Modality,
    /// Raw text, preview reference or URL depending on `kind`. Never pre-rendered.
    pub content: String,
    pub created_at: DateTime<Local>,
}

impl Turn {
    pub fn is_placeholder(&self) -> bool {
        self.kind == TurnKind::Placeholder
    }
}

/// How an in-flight submission settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Note content from the backend, markdown-ish.
    Notes(String),
    /// User-facing failure message, shown literally.
    Failure(String),
}

impl Resolution {
    pub fn is_success(&self) -> bool {
        matches!(self, Resolution::Notes(_))
    }
}
