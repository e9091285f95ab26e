/// User-facing category for a failed video submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoErrorKind {
    CaptionsUnavailable,
    InvalidUrl,
    TooLong,
    Unknown,
}

impl VideoErrorKind {
    pub fn user_message(&self) -> &'static str {
        match self {
            VideoErrorKind::CaptionsUnavailable => {
                "This video has no captions. Notes were generated from title/description only."
            }
            VideoErrorKind::InvalidUrl => "Please check the YouTube URL and try again.",
            VideoErrorKind::TooLong => {
                "For videos longer than 15 minutes, please provide timestamps."
            }
            VideoErrorKind::Unknown => "Sorry, something went wrong while processing the video.",
        }
    }
}

// Checked in order; first match wins.
const MARKERS: [(&str, VideoErrorKind); 3] = [
    ("No captions available", VideoErrorKind::CaptionsUnavailable),
    ("Invalid URL", VideoErrorKind::InvalidUrl),
    ("Video too long", VideoErrorKind::TooLong),
];

/// Maps raw backend diagnostic text onto a [`VideoErrorKind`].
pub fn classify_video_error(raw: &str) -> VideoErrorKind {
    MARKERS
        .iter()
        .find(|(needle, _)| raw.contains(needle))
        .map(|(_, kind)| *kind)
        .unwrap_or(VideoErrorKind::Unknown)
}
