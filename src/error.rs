//! Structured error types for the examset layout engine.
//!
//! Decode failures are expected at runtime and carry the offending record's
//! id. Parse and configuration errors are reported before any layout work
//! starts. Layout itself never returns an error: malformed sizes there are
//! bugs and panic.

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The unified error type returned by all public examset API functions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// JSON input failed to parse as a question set or layout config.
    #[error("Failed to parse input: {source}")]
    Parse {
        source: serde_json::Error,
        /// A human-oriented hint derived from the serde error category.
        hint: String,
    },

    /// A question's image could not be decoded. Fatal to the whole build.
    #[error("Question '{id}': {source}")]
    Decode {
        id: String,
        #[source]
        source: DecodeError,
    },

    /// The layout configuration describes an impossible page.
    #[error("Invalid layout configuration: {0}")]
    Config(String),

    /// The build was cancelled before the document was finalized.
    #[error("Build cancelled before the document was finalized")]
    Cancelled,

    /// A background decode task panicked or was aborted.
    #[error("Image decode task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The parse hint, if this is a parse error with one.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Error::Parse { hint, .. } if !hint.is_empty() => Some(hint),
            _ => None,
        }
    }
}

/// Why a byte buffer could not be read as an image.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("image data too short")]
    TooShort,
    #[error("unsupported image format (expected JPEG or PNG)")]
    UnsupportedFormat,
    #[error("image has zero width or height")]
    EmptyImage,
    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid data URI: missing comma before the payload")]
    InvalidDataUri,
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to read image data: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names \
                 and types."
                    .to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input; is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        Error::Parse { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_has_hint() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{,}")
            .unwrap_err()
            .into();
        assert!(err.hint().unwrap().contains("trailing commas"));
    }

    #[test]
    fn decode_error_names_record() {
        let err = Error::Decode {
            id: "q-17".to_string(),
            source: DecodeError::UnsupportedFormat,
        };
        let msg = err.to_string();
        assert!(msg.contains("q-17"));
        assert!(msg.contains("unsupported image format"));
    }
}
