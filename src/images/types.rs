//! Image record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Literal stored when the service could not read a code from the photo.
pub const NOT_FOUND_CODE: &str = "No encontrado";

/// Processing status of an image record
///
/// Transitions are `pending -> processing -> {success | error}`. A record
/// never moves back to `pending`; clearing destroys records instead of
/// transitioning them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Success,
    Error,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "success" => Self::Success,
            "error" => Self::Error,
            _ => Self::Pending,
        }
    }

    /// Terminal for a run: the record has been attempted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// One uploaded photo and its extraction state
///
/// File bytes are not carried here; they are immutable after ingestion and
/// live in the [`super::ImageStore`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub status: ProcessingStatus,
    /// Extracted serial code on `success`, failure message on `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_code: Option<String>,
    /// True only when the service actually returned a code. Kept as explicit
    /// state so nothing has to sniff `extracted_code` text to tell a found
    /// code apart from the not-found fallback.
    pub found: bool,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    /// Create a fresh `pending` record for a newly ingested file
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            status: ProcessingStatus::Pending,
            extracted_code: None,
            found: false,
            created_at: Utc::now(),
        }
    }

    /// Apply the outcome of one extraction attempt
    pub fn apply(&mut self, outcome: &CodeOutcome) {
        match outcome {
            CodeOutcome::Found(code) => {
                self.status = ProcessingStatus::Success;
                self.extracted_code = Some(code.clone());
                self.found = true;
            }
            CodeOutcome::NotFound => {
                self.status = ProcessingStatus::Success;
                self.extracted_code = Some(NOT_FOUND_CODE.to_string());
                self.found = false;
            }
            CodeOutcome::Failed(message) => {
                self.status = ProcessingStatus::Error;
                self.extracted_code = Some(message.clone());
                self.found = false;
            }
        }
    }
}

/// Outcome of one extraction attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeOutcome {
    /// The service returned a non-empty code (already trimmed).
    Found(String),
    /// The service answered with empty or whitespace-only text.
    NotFound,
    /// The extraction call failed; the message becomes the record's text.
    Failed(String),
}
