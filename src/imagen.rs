//! Imagen text-to-image prediction, used for top-down plan views.

use crate::error::{Result, UbahLansError};
use crate::transport::Transport;
use crate::types::ImagePayload;
use serde::{Deserialize, Serialize};

/// Imagen model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImagenModel {
    /// Imagen 4.
    #[default]
    Imagen4,
    /// Imagen 3.
    Imagen3,
}

impl ImagenModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imagen4 => "imagen-4.0-generate-001",
            Self::Imagen3 => "imagen-3.0-generate-001",
        }
    }

    /// Returns the model tried when this one fails.
    pub fn fallback(&self) -> Option<Self> {
        match self {
            Self::Imagen4 => Some(Self::Imagen3),
            Self::Imagen3 => None,
        }
    }
}

/// Body of `models/{model}:predict`.
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Clone, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: &'static str,
    safety_filter_level: &'static str,
    person_generation: &'static str,
}

impl PredictRequest {
    /// Builds a single-sample 16:9 request with people excluded.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: prompt.into(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "16:9",
                safety_filter_level: "block_some",
                person_generation: "dont_allow",
            },
        }
    }
}

/// Body returned by `:predict`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    image: Option<NestedImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NestedImage {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
}

impl PredictResponse {
    /// Extracts the first predicted image.
    pub fn into_image(self) -> Result<ImagePayload> {
        let prediction = self.predictions.into_iter().next().ok_or_else(|| {
            UbahLansError::InvalidResponse(
                "No predictions in Imagen response - API may not be enabled for your account"
                    .into(),
            )
        })?;
        let mime = prediction.mime_type.as_deref().unwrap_or("image/png");
        let b64 = prediction
            .bytes_base64_encoded
            .as_deref()
            .or_else(|| {
                prediction
                    .image
                    .as_ref()
                    .and_then(|i| i.bytes_base64_encoded.as_deref())
            })
            .filter(|d| !d.is_empty())
            .ok_or_else(|| {
                UbahLansError::InvalidResponse(
                    "No image data in Imagen response - unexpected format".into(),
                )
            })?;
        ImagePayload::from_base64(mime, b64)
    }
}

/// Generates an image with Imagen, moving to the next model when the
/// provider rejects the call. Returns the model that produced the image.
pub async fn predict_image(
    transport: &dyn Transport,
    model: ImagenModel,
    prompt: &str,
) -> Result<(ImagenModel, ImagePayload)> {
    let request = PredictRequest::new(prompt);
    let mut current = model;
    loop {
        match transport.predict(current.as_str(), &request).await {
            Ok(response) => return Ok((current, response.into_image()?)),
            Err(e @ UbahLansError::Api { .. }) => match current.fallback() {
                Some(next) => {
                    tracing::warn!(
                        model = current.as_str(),
                        next = next.as_str(),
                        "Imagen call failed, trying next model: {e}"
                    );
                    current = next;
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}
