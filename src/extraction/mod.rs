//! Code Extraction Module
//!
//! Wraps the remote vision-language OCR call that reads the hand-painted
//! serial code off a fixture photo. One outbound request per image; the
//! caller supplies the image bytes and the API credential and gets back the
//! extracted text (possibly empty) or a failure.

mod provider;
mod types;

pub use provider::{CodeExtractor, GeminiExtractor, MockExtractor};
pub use types::ExtractionError;
