//! Error types for landscape generation.

/// Errors that can occur while generating a landscape result.
#[derive(Debug, thiserror::Error)]
pub enum UbahLansError {
    /// Provider (or proxy) returned a non-2xx response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Generation stopped by the safety filter or a recitation block.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Generation stopped at the output token limit.
    #[error("Response exceeded maximum length. Try simplifying your request.")]
    Truncated,

    /// The model answered with an explicit refusal.
    #[error("Model cannot generate image: {0}")]
    Refused(String),

    /// The model described the image instead of editing it.
    #[error(
        "The model returned a text description instead of an edited image. \
         This usually means the model doesn't support image editing. Response: \"{0}...\""
    )]
    TextInsteadOfImage(String),

    /// Response was missing candidates or content.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Response parts carried neither image data nor text.
    #[error("No edited image in response. The model may not support image editing.")]
    NoImageData,

    /// Candidate list exhausted without a recorded substitutable error.
    #[error("All image generation models failed")]
    AllModelsFailed,

    /// Missing credential or an operation unsupported by the transport mode.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., reading a photo, saving a result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UbahLansError {
    /// Returns true if trying the next model candidate may succeed.
    ///
    /// Only provider responses classified by status (503, 404) or by message
    /// ("overloaded", "not found") qualify. Network and parse failures do not.
    pub fn is_substitutable(&self) -> bool {
        match self {
            Self::Api { status, message } => {
                let lower = message.to_lowercase();
                *status == 503
                    || *status == 404
                    || lower.contains("overloaded")
                    || lower.contains("not found")
            }
            _ => false,
        }
    }

    /// Returns true for failures tied to the content rather than the model.
    pub fn is_content_policy(&self) -> bool {
        matches!(
            self,
            Self::ContentBlocked(_)
                | Self::Truncated
                | Self::Refused(_)
                | Self::TextInsteadOfImage(_)
        )
    }
}

/// Result type alias for landscape generation operations.
pub type Result<T> = std::result::Result<T, UbahLansError>;
