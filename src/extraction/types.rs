//! Extraction error types

/// Errors from the remote extraction call
///
/// Display texts are operator-facing: they end up verbatim in the record's
/// `extracted_code` field when an item fails.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The service rejected the API key.
    #[error("La clave de API no es válida. Por favor, revísala.")]
    InvalidCredential,

    /// Transport failure or a non-success response from the service.
    #[error("Fallo al procesar la imagen con la API de Gemini: {0}")]
    Api(String),

    /// The service answered with a body we could not interpret.
    #[error("Respuesta inesperada del servicio de extracción: {0}")]
    InvalidResponse(String),
}
