//! Picks default image and text models from the provider's model list.

use serde::{Deserialize, Serialize};

/// Image models preferred in this order when available.
pub const PREFERRED_IMAGE_MODELS: [&str; 3] = [
    "gemini-3-pro-image-preview",
    "imagen-3.0-generate-001",
    "gemini-2.0-flash-preview-image-generation",
];

/// Name fragments preferred for the text model, in order.
const PREFERRED_TEXT_FRAGMENTS: [&str; 3] = ["2.0-flash-exp", "2.0", "1.5"];

/// One entry of `GET /models`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Resource name, e.g. `models/gemini-2.0-flash-exp`.
    pub name: String,
    /// Methods the model supports, e.g. `generateContent`.
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }

    fn is_image_model(&self) -> bool {
        self.name.contains("image") || self.name.contains("imagen")
    }

    fn short_name(&self) -> String {
        self.name.replacen("models/", "", 1)
    }
}

/// Body of `GET /models`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelList {
    /// Available models.
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

/// Models picked for this deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSelection {
    /// Image-editing model, without the `models/` prefix.
    pub image_model: Option<String>,
    /// Text model, without the `models/` prefix.
    pub text_model: Option<String>,
    /// Number of models the provider listed.
    pub total_models: usize,
}

/// Selects image and text models from a model list.
///
/// The image model is the first available entry of
/// [`PREFERRED_IMAGE_MODELS`], else any `generateContent` model whose name
/// mentions `image`/`imagen` and not `vision`. The text model is the first
/// non-image `generateContent` model matching `2.0-flash-exp`, `2.0`,
/// `1.5`, else the first such model.
pub fn select_models(models: &[ModelInfo]) -> ModelSelection {
    let image_model = PREFERRED_IMAGE_MODELS
        .iter()
        .find_map(|preferred| models.iter().find(|m| m.name.contains(preferred)))
        .or_else(|| {
            models.iter().find(|m| {
                m.supports_generate_content() && m.is_image_model() && !m.name.contains("vision")
            })
        });

    let text_models: Vec<&ModelInfo> = models
        .iter()
        .filter(|m| m.supports_generate_content() && !m.is_image_model())
        .collect();
    let text_model = PREFERRED_TEXT_FRAGMENTS
        .iter()
        .find_map(|fragment| text_models.iter().find(|m| m.name.contains(fragment)))
        .or_else(|| text_models.first())
        .copied();

    ModelSelection {
        image_model: image_model.map(ModelInfo::short_name),
        text_model: text_model.map(ModelInfo::short_name),
        total_models: models.len(),
    }
}
