use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Largest image accepted for upload (5 MiB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(https?://)?(www\.)?(youtube\.com/(watch\?v=|embed/|v/|shorts/)|youtu\.be/)([a-zA-Z0-9_-]{11})(\S*)?$",
    )
    .expect("youtube url pattern is valid")
});

/// Client-side validation failures. None of these ever reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("input is empty")]
    EmptyInput,
    #[error("not a recognised YouTube URL")]
    MalformedUrl,
    #[error("file is not an image")]
    NotAnImage,
    #[error("image exceeds the upload size limit")]
    TooLarge,
}

/// What the validator needs to know about a selected file.
pub trait FileFacts {
    fn mime_type(&self) -> &str;
    fn byte_size(&self) -> u64;
}

pub fn validate_text(s: &str) -> Result<String, ValidationError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    Ok(trimmed.to_string())
}

pub fn validate_image_file<F: FileFacts + ?Sized>(file: &F) -> Result<(), ValidationError> {
    validate_image_file_with_limit(file, MAX_IMAGE_BYTES)
}

/// Same as [`validate_image_file`] with a configurable size ceiling.
pub fn validate_image_file_with_limit<F: FileFacts + ?Sized>(
    file: &F,
    max_bytes: u64,
) -> Result<(), ValidationError> {
    if !file.mime_type().starts_with("image/") {
        return Err(ValidationError::NotAnImage);
    }
    if file.byte_size() > max_bytes {
        return Err(ValidationError::TooLarge);
    }
    Ok(())
}

pub fn validate_video_url(u: &str) -> Result<String, ValidationError> {
    let trimmed = u.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    if !YOUTUBE_URL.is_match(trimmed) {
        return Err(ValidationError::MalformedUrl);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Facts(&'static str, u64);

    impl FileFacts for Facts {
        fn mime_type(&self) -> &str {
            self.0
        }
        fn byte_size(&self) -> u64 {
            self.1
        }
    }

    #[test]
    fn test_text_is_trimmed() {
        assert_eq!(validate_text("  explain TCP \n").unwrap(), "explain TCP");
        assert_eq!(validate_text("x").unwrap(), "x");
    }

    #[test]
    fn test_whitespace_text_is_empty() {
        for input in ["", " ", "\t\n  ", "\u{3000}"] {
            assert_eq!(validate_text(input), Err(ValidationError::EmptyInput));
        }
    }

    #[test]
    fn test_accepted_youtube_shapes() {
        let urls = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "youtube.com/shorts/dQw4w9WgXcQ",
            "http://youtube.com/embed/dQw4w9WgXcQ",
            "www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "  https://youtu.be/dQw4w9WgXcQ  ",
        ];
        for url in urls {
            assert_eq!(validate_video_url(url).unwrap(), url.trim(), "{url}");
        }
    }

    #[test]
    fn test_rejected_urls() {
        let urls = [
            "https://vimeo.com/123",
            "https://www.youtube.com/watch?v=short",
            "https://youtu.be/dQw4w9WgXcQ trailing words",
            "ftp://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/playlist?list=dQw4w9WgXcQ",
        ];
        for url in urls {
            assert_eq!(validate_video_url(url), Err(ValidationError::MalformedUrl), "{url}");
        }
        assert_eq!(validate_video_url("   "), Err(ValidationError::EmptyInput));
    }

    #[test]
    fn test_image_rules() {
        assert_eq!(
            validate_image_file(&Facts("text/plain", 10)),
            Err(ValidationError::NotAnImage)
        );
        assert_eq!(
            validate_image_file(&Facts("image/png", 6 * 1024 * 1024)),
            Err(ValidationError::TooLarge)
        );
        assert!(validate_image_file(&Facts("image/png", 1024 * 1024)).is_ok());
        assert!(validate_image_file(&Facts("image/jpeg", MAX_IMAGE_BYTES)).is_ok());
        assert_eq!(
            validate_image_file(&Facts("image/jpeg", MAX_IMAGE_BYTES + 1)),
            Err(ValidationError::TooLarge)
        );
    }
}
