//! Model-fallback orchestration for image generation.
//!
//! Candidates are tried strictly in order. A candidate that is unavailable
//! (overloaded or not found) hands over to the next one; anything else ends
//! the run.

use crate::error::{Result, UbahLansError};
use crate::extract::extract_image;
use crate::transport::Transport;
use crate::types::{GenerationConfig, GenerationRequest, ImagePayload};
use crate::wire::GenerateContentResponse;

/// Ordered, deduplicated model identifiers. First occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCandidates(Vec<String>);

impl ModelCandidates {
    /// Builds a candidate list, dropping blanks and repeats.
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = Vec::new();
        for model in models {
            let model = model.into();
            let model = model.trim();
            if !model.is_empty() && !list.iter().any(|m| m == model) {
                list.push(model.to_string());
            }
        }
        Self(list)
    }

    /// Returns the candidates in order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Number of distinct candidates.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there is nothing to try.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The image a run produced and the candidate that produced it.
#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    /// Edited image.
    pub image: ImagePayload,
    /// Model that produced it, as requested.
    pub model: String,
    /// Calls issued, including the successful one.
    pub attempts: usize,
}

/// How one candidate call ended.
enum Attempt {
    Image(ImagePayload),
    Substitute(UbahLansError),
    Terminal(UbahLansError),
}

impl Attempt {
    fn classify(result: Result<GenerateContentResponse>) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_substitutable() => return Self::Substitute(e),
            Err(e) => return Self::Terminal(e),
        };
        match extract_image(&response) {
            Ok(image) => Self::Image(image),
            Err(e) => Self::Terminal(e),
        }
    }
}

/// Generates an edited image, substituting models on unavailability.
///
/// Returns the first image produced. Fails immediately on any error that
/// is not substitutable, including text answers. When every candidate is
/// unavailable, fails with the last candidate's error.
pub async fn generate_image(
    transport: &dyn Transport,
    candidates: &ModelCandidates,
    prompt: &str,
    image: Option<&ImagePayload>,
    config: GenerationConfig,
) -> Result<FallbackOutcome> {
    let total = candidates.len();
    let mut last_error = None;

    for (index, model) in candidates.as_slice().iter().enumerate() {
        tracing::info!(model = %model, attempt = index + 1, of = total, "attempting image generation");

        let request = GenerationRequest::new(model.as_str(), prompt)
            .with_optional_image(image.cloned())
            .with_config(config);

        match Attempt::classify(transport.generate_content(&request).await) {
            Attempt::Image(image) => {
                tracing::info!(model = %model, bytes = image.size(), "image generation succeeded");
                return Ok(FallbackOutcome {
                    image,
                    model: model.clone(),
                    attempts: index + 1,
                });
            }
            Attempt::Substitute(e) => {
                tracing::warn!(model = %model, "model unavailable, trying next candidate: {e}");
                last_error = Some(e);
            }
            Attempt::Terminal(e) => {
                if e.is_content_policy() {
                    tracing::warn!(model = %model, "model declined the edit: {e}");
                } else {
                    tracing::error!(model = %model, "image generation failed: {e}");
                }
                return Err(e);
            }
        }
    }

    Err(last_error.unwrap_or(UbahLansError::AllModelsFailed))
}
