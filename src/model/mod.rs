//! # Question Model
//!
//! The input representation: an ordered list of finalized question records,
//! each with an optional image, its topic labels, and optional text. The JSON
//! shape matches what the question service returns, so a `get-questions`
//! response body can be fed in directly:
//!
//! ```json
//! { "questions": [ { "id": 12, "base64": "iVBORw0...", "topics": ["MA-C1: ..."] } ] }
//! ```

use std::borrow::Cow;

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DecodeError, Result};

/// One exam question, already classified upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    /// Upstream ids are sometimes integers; they are kept as text.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    /// The question image (PNG or JPEG). On the wire this is base64 or a
    /// `data:image/...;base64,` URI under `imageData` or `base64`. An empty
    /// string means no image. The text is only decoded when the document is
    /// built, so bad data is reported against this record's id.
    #[serde(default, alias = "base64", with = "base64_image")]
    pub image_data: Option<ImageSource>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub topics: Vec<String>,

    #[serde(default)]
    pub text: Option<String>,
}

impl QuestionRecord {
    /// The topic label shown under the question: topics joined with `", "`,
    /// or `fallback` when there are none.
    pub fn topic_label(&self, fallback: &str) -> String {
        if self.topics.is_empty() {
            fallback.to_string()
        } else {
            self.topics.join(", ")
        }
    }
}

/// A titled, ordered set of questions: the unit a document is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionSet {
    pub title: String,
    pub subtitle: String,
    pub questions: Vec<QuestionRecord>,
}

impl Default for QuestionSet {
    fn default() -> Self {
        Self {
            title: "Practice Set".to_string(),
            subtitle: String::new(),
            questions: Vec::new(),
        }
    }
}

impl QuestionSet {
    /// Parse a question set from JSON. A bare array is read as the question
    /// list with the default title.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.is_array() {
            let questions: Vec<QuestionRecord> = serde_json::from_value(value)?;
            return Ok(Self {
                questions,
                ..Default::default()
            });
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Document metadata embedded in the PDF.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Float(f) => f.to_string(),
    })
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Where a question's image bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Encoded PNG or JPEG bytes.
    Bytes(Vec<u8>),
    /// Base64 text or a `data:` URI, as received.
    Base64(String),
}

impl ImageSource {
    /// The encoded image bytes, decoding base64 if needed.
    pub fn bytes(&self) -> std::result::Result<Cow<'_, [u8]>, DecodeError> {
        match self {
            ImageSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
            ImageSource::Base64(src) => Ok(Cow::Owned(decode_image_source(src)?)),
        }
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

mod base64_image {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::ImageSource;

    pub fn serialize<S: Serializer>(data: &Option<ImageSource>, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(ImageSource::Bytes(bytes)) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Some(ImageSource::Base64(src)) => serializer.serialize_str(src),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ImageSource>, D::Error> {
        let src = Option::<String>::deserialize(deserializer)?;
        Ok(src
            .filter(|s| !super::payload(s).trim().is_empty())
            .map(ImageSource::Base64))
    }
}

/// The base64 part of an image source: everything after the comma of a
/// `data:` URI, or the whole string.
fn payload(src: &str) -> &str {
    match src.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or(rest, |(_, data)| data),
        None => src,
    }
}

/// Decode an image source string to raw bytes.
///
/// Accepts raw base64 or a `data:image/...;base64,` URI. Whitespace inside
/// the payload is ignored.
pub fn decode_image_source(src: &str) -> std::result::Result<Vec<u8>, DecodeError> {
    if src.starts_with("data:") && !src.contains(',') {
        return Err(DecodeError::InvalidDataUri);
    }
    let compact: String = payload(src).chars().filter(|c| !c.is_whitespace()).collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_response_shape() {
        let json = r#"{
            "questions": [
                { "id": 42, "QuestionId": 42, "base64": "", "text": "Find f'(x).",
                  "topics": ["MA-C1: Introduction to Differentiation (Year 11)"] },
                { "id": "q-7", "topics": [] }
            ]
        }"#;
        let set = QuestionSet::from_json(json).unwrap();
        assert_eq!(set.title, "Practice Set");
        assert_eq!(set.questions.len(), 2);
        assert_eq!(set.questions[0].id, "42");
        assert_eq!(set.questions[0].image_data, None);
        assert_eq!(set.questions[0].text.as_deref(), Some("Find f'(x)."));
        assert_eq!(set.questions[1].id, "q-7");
    }

    #[test]
    fn bare_array_is_question_list() {
        let set = QuestionSet::from_json(r#"[{ "id": "a" }, { "id": "b" }]"#).unwrap();
        assert_eq!(set.questions.len(), 2);
        assert!(set.questions[1].topics.is_empty());
    }

    #[test]
    fn image_data_accepts_data_uri() {
        let json = r#"{ "id": "x", "imageData": "data:image/png;base64,AAEC" }"#;
        let record: QuestionRecord = serde_json::from_str(json).unwrap();
        let source = record.image_data.unwrap();
        assert_eq!(source.bytes().unwrap().as_ref(), &[0, 1, 2]);
    }

    #[test]
    fn empty_data_uri_means_no_image() {
        let json = r#"{ "id": "x", "imageData": "data:image/png;base64," }"#;
        let record: QuestionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.image_data, None);
    }

    #[test]
    fn invalid_base64_parses_and_fails_on_decode() {
        let set = QuestionSet::from_json(r#"{ "questions": [{ "id": "q-bad", "base64": "@@@" }] }"#)
            .unwrap();
        let source = set.questions[0].image_data.as_ref().unwrap();
        assert!(matches!(source.bytes(), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn data_uri_without_comma_is_rejected() {
        assert!(matches!(
            decode_image_source("data:image/png;base64"),
            Err(DecodeError::InvalidDataUri)
        ));
    }

    #[test]
    fn null_topics_read_as_empty() {
        let record: QuestionRecord = serde_json::from_str(r#"{ "id": 1, "topics": null }"#).unwrap();
        assert!(record.topics.is_empty());
    }

    #[test]
    fn topic_label_joins_or_falls_back() {
        let mut record = QuestionRecord {
            id: "1".to_string(),
            ..Default::default()
        };
        assert_eq!(record.topic_label("No prediction"), "No prediction");
        record.topics = vec!["MA-C1".to_string(), "MA-C2".to_string()];
        assert_eq!(record.topic_label("No prediction"), "MA-C1, MA-C2");
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = QuestionRecord {
            id: "r1".to_string(),
            image_data: Some(vec![0x89, 0x50, 0x4E, 0x47].into()),
            topics: vec!["MS-S5".to_string()],
            text: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"imageData\":\"iVBORw==\""));
        let back: QuestionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.image_data, Some(ImageSource::Base64("iVBORw==".to_string())));
        assert_eq!(back.image_data.unwrap().bytes().unwrap().as_ref(), &[0x89, 0x50, 0x4E, 0x47]);
    }
}
