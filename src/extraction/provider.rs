//! Extraction providers
//!
//! Defines the extractor trait, the Gemini-backed implementation and a
//! scriptable mock for tests.

use async_trait::async_trait;
use base64::Engine;

use crate::config::ExtractionConfig;

use super::types::ExtractionError;

/// Prompt sent alongside each photo. Carried over verbatim from the field
/// operators' tuning; the service is instructed to answer with the serial
/// alone, or with "No encontrado".
const GEMINI_PROMPT: &str = "Tu tarea es actuar como un experto en OCR para infraestructura urbana. Extrae el número de serie de la luminaria en la imagen. Presta mucha atención a los siguientes detalles:\n1. Los números suelen estar pintados a mano y pueden estar desgastados, distorsionados o en un ángulo difícil.\n2. El código suele ser de 5 dígitos.\n3. Un '0' puede parecer una 'O', o incluso una 'W' o '11' si está mal pintado, como en el caso de '08390'. Sé muy cuidadoso al diferenciar.\n4. Ignora cualquier otro texto o símbolo que no sea parte del código principal.\nResponde únicamente con el número de serie extraído. Si no puedes determinar el número con certeza, responde con 'No encontrado'.";

/// Code extractor trait
#[async_trait]
pub trait CodeExtractor: Send + Sync {
    /// Extract the serial code from one photo
    ///
    /// Returns the raw text the service answered with; empty text means the
    /// service could not find a code. The credential is passed per call so
    /// the operator can change it between runs.
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
        credential: &str,
    ) -> Result<String, ExtractionError>;
}

/// Gemini vision model provider
pub struct GeminiExtractor {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl CodeExtractor for GeminiExtractor {
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
        credential: &str,
    ) -> Result<String, ExtractionError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, credential
        );

        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image);

        let request = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inline_data": { "mime_type": mime_type, "data": image_base64 } },
                    { "text": GEMINI_PROMPT }
                ]
            }]
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::Api(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if body.contains("API key not valid") || body.contains("API_KEY_INVALID") {
                return Err(ExtractionError::InvalidCredential);
            }
            return Err(ExtractionError::Api(format!("{}: {}", status, body)));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;

        let text = result["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        Ok(text)
    }
}

/// Scriptable extractor used by tests
///
/// Pops one scripted result per call; once the script is exhausted every
/// call answers with the default text. Calls are counted so tests can assert
/// that preconditions short-circuit before any network work.
pub struct MockExtractor {
    script: tokio::sync::Mutex<std::collections::VecDeque<Result<String, ExtractionError>>>,
    default: String,
    calls: std::sync::atomic::AtomicUsize,
    delay: Option<std::time::Duration>,
}

impl MockExtractor {
    /// Always answer with the same text
    pub fn returning(text: &str) -> Self {
        Self {
            script: tokio::sync::Mutex::new(std::collections::VecDeque::new()),
            default: text.to_string(),
            calls: std::sync::atomic::AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Answer with the given results in order, then with empty text
    pub fn with_script(script: Vec<Result<String, ExtractionError>>) -> Self {
        Self {
            script: tokio::sync::Mutex::new(script.into()),
            default: String::new(),
            calls: std::sync::atomic::AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Sleep this long inside every call, to let tests overlap runs
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeExtractor for MockExtractor {
    async fn extract(
        &self,
        _image: &[u8],
        _mime_type: &str,
        _credential: &str,
    ) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script.lock().await;
        script.pop_front().unwrap_or_else(|| Ok(self.default.clone()))
    }
}
