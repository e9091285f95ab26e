use std::time::Duration;

use crate::conversation::{Modality, Turn};
use crate::upload::PreviewRef;

/// The submit controls, one per modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    SubmitText,
    SubmitImage,
    SubmitVideo,
}

impl Control {
    pub fn for_modality(modality: Modality) -> Self {
        match modality {
            Modality::Text => Control::SubmitText,
            Modality::Image => Control::SubmitImage,
            Modality::Video => Control::SubmitVideo,
        }
    }
}

/// Input surfaces that can be cleared or shaken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputTarget {
    TextInput,
    ImageUploadArea,
    VideoUrlInput,
}

impl InputTarget {
    pub fn for_modality(modality: Modality) -> Self {
        match modality {
            Modality::Text => InputTarget::TextInput,
            Modality::Image => InputTarget::ImageUploadArea,
            Modality::Video => InputTarget::VideoUrlInput,
        }
    }
}

/// Rendering capability supplied by whatever UI hosts the core.
///
/// Calls arrive on the event flow that triggered them and must not block.
pub trait UiSurface: Send + Sync {
    /// A turn was appended at the end of the conversation.
    fn turn_appended(&self, turn: &Turn);

    /// A placeholder was resolved in place; `turn.id` is the placeholder's id.
    fn turn_replaced(&self, turn: &Turn);

    fn set_control_enabled(&self, control: Control, enabled: bool);

    /// Transient "nothing to submit" affordance.
    fn shake(&self, target: InputTarget, duration: Duration);

    fn clear_input(&self, target: InputTarget);

    /// `Some` shows the preview surface, `None` restores the upload prompt.
    fn show_preview(&self, preview: Option<&PreviewRef>);
}
