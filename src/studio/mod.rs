//! Landscape design workflows built on the transport and the fallback loop.

pub mod prompts;

pub use prompts::Language;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::extract::extract_text;
use crate::fallback::{generate_image, FallbackOutcome, ModelCandidates};
use crate::imagen::{predict_image, ImagenModel};
use crate::transport::{HttpTransport, Transport};
use crate::types::{GenerationConfig, GenerationRequest, ImagePayload};

/// An image produced by a model, or the description that stands in for it.
#[derive(Debug, Clone)]
pub enum Rendering {
    /// The model produced an image.
    Rendered {
        /// Generated image.
        image: ImagePayload,
        /// Model that produced it.
        model: String,
    },
    /// Image generation failed; a text description replaces it.
    Described {
        /// Description from the vision model.
        description: String,
        /// Why the image could not be produced.
        cause: String,
    },
}

impl Rendering {
    /// Returns the image, if one was produced.
    pub fn image(&self) -> Option<&ImagePayload> {
        match self {
            Self::Rendered { image, .. } => Some(image),
            Self::Described { .. } => None,
        }
    }

    /// Returns true if this is the degraded, text-only result.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Described { .. })
    }
}

impl From<FallbackOutcome> for Rendering {
    fn from(outcome: FallbackOutcome) -> Self {
        Self::Rendered {
            image: outcome.image,
            model: outcome.model,
        }
    }
}

/// Which extras to produce alongside a transformation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesignOptions {
    /// Plant inventory language, if an inventory is wanted.
    pub inventory: Option<Language>,
    /// Whether to produce a top-down plan view.
    pub plan_view: bool,
}

/// Everything produced for one design request.
#[derive(Debug, Clone)]
pub struct Design {
    /// The transformed photo.
    pub transformation: Rendering,
    /// Plant inventory, if requested.
    pub inventory: Option<String>,
    /// Top-down plan view, if requested.
    pub plan_view: Option<Rendering>,
}

/// Runs landscape workflows against one transport.
pub struct Studio {
    transport: Box<dyn Transport>,
    config: ClientConfig,
}

impl Studio {
    /// Creates a studio talking HTTP per `config`.
    pub fn new(config: ClientConfig) -> Self {
        let transport = HttpTransport::new(&config);
        Self::with_transport(config, transport)
    }

    /// Creates a studio over a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            config,
        }
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the transport in use.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn image_candidates(&self) -> ModelCandidates {
        ModelCandidates::new(self.config.image_candidates())
    }

    /// Asks the text model a question, optionally about an image.
    async fn ask(
        &self,
        prompt: &str,
        image: Option<&ImagePayload>,
        config: GenerationConfig,
    ) -> Result<String> {
        let request = GenerationRequest::new(self.config.text_model.as_str(), prompt)
            .with_optional_image(image.cloned())
            .with_config(config);
        let response = self.transport.generate_content(&request).await?;
        extract_text(&response)
    }

    /// Applies a described landscape design to a photo.
    ///
    /// If no image model succeeds, the text model describes the design
    /// instead and the result is [`Rendering::Described`].
    pub async fn transform(&self, photo: &ImagePayload, description: &str) -> Result<Rendering> {
        let prompt = prompts::transformation(description);
        let attempt = generate_image(
            self.transport(),
            &self.image_candidates(),
            &prompt,
            Some(photo),
            GenerationConfig::IMAGE_EDIT,
        )
        .await;

        match attempt {
            Ok(outcome) => Ok(outcome.into()),
            Err(e) => {
                tracing::warn!("image edit failed, falling back to a description: {e}");
                let text = self
                    .ask(
                        &prompts::transformation_description(description),
                        Some(photo),
                        GenerationConfig::VISION,
                    )
                    .await?;
                Ok(Rendering::Described {
                    description: text,
                    cause: e.to_string(),
                })
            }
        }
    }

    /// Turns a photo into an illustrated infographic with plant labels.
    pub async fn infographic(
        &self,
        photo: &ImagePayload,
        language: Language,
    ) -> Result<FallbackOutcome> {
        tracing::info!(%language, "generating infographic");
        generate_image(
            self.transport(),
            &self.image_candidates(),
            &prompts::infographic(language),
            Some(photo),
            GenerationConfig::IMAGE_EDIT,
        )
        .await
    }

    /// Produces a top-down plan view of the transformed property.
    ///
    /// Falls back to a described plan view when analysis or Imagen fails.
    pub async fn plan_view(&self, photo: &ImagePayload, description: &str) -> Result<Rendering> {
        match self.render_plan_view(photo, description).await {
            Ok(rendering) => Ok(rendering),
            Err(e) => {
                tracing::warn!("plan view failed, falling back to a description: {e}");
                let text = self
                    .ask(
                        &prompts::top_down_description(description),
                        Some(photo),
                        GenerationConfig::VISION,
                    )
                    .await?;
                Ok(Rendering::Described {
                    description: format!("Top-down view: {text}"),
                    cause: e.to_string(),
                })
            }
        }
    }

    async fn render_plan_view(&self, photo: &ImagePayload, description: &str) -> Result<Rendering> {
        let layout = self
            .ask(prompts::LAYOUT_ANALYSIS, Some(photo), GenerationConfig::VISION)
            .await?;
        tracing::debug!(chars = layout.len(), "layout analysis complete");

        let (model, image) = predict_image(
            self.transport(),
            ImagenModel::default(),
            &prompts::top_down(description, &layout),
        )
        .await?;
        Ok(Rendering::Rendered {
            image,
            model: model.as_str().to_string(),
        })
    }

    /// Lists the plants in a design.
    ///
    /// With a transformed image the numbered markers are read from it;
    /// otherwise the list is derived from the description alone.
    pub async fn inventory(
        &self,
        description: &str,
        transformed: Option<&ImagePayload>,
        language: Language,
    ) -> Result<String> {
        match transformed {
            Some(image) => {
                self.ask(
                    &prompts::inventory_from_image(language),
                    Some(image),
                    GenerationConfig::VISION,
                )
                .await
            }
            None => {
                self.ask(
                    &prompts::inventory_from_description(description, language),
                    None,
                    GenerationConfig::TEXT,
                )
                .await
            }
        }
    }

    /// Suggests one landscape idea for a photo.
    pub async fn suggest(&self, photo: &ImagePayload) -> Result<String> {
        self.ask(prompts::SUGGESTION, Some(photo), GenerationConfig::VISION)
            .await
    }

    /// Runs a full design: transformation, then the requested extras.
    pub async fn design(
        &self,
        photo: &ImagePayload,
        description: &str,
        options: DesignOptions,
    ) -> Result<Design> {
        let transformation = self.transform(photo, description).await?;

        let inventory = match options.inventory {
            Some(language) => Some(
                self.inventory(description, transformation.image(), language)
                    .await?,
            ),
            None => None,
        };

        let plan_view = if options.plan_view {
            Some(self.plan_view(photo, description).await?)
        } else {
            None
        };

        Ok(Design {
            transformation,
            inventory,
            plan_view,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UbahLansError;
    use crate::fallback::tests::{api_error, image_response, text_response, ScriptedTransport};
    use std::sync::Arc;

    fn config() -> ClientConfig {
        ClientConfig::builder()
            .image_model("img-a")
            .fallback_image_models(["img-b"])
            .text_model("txt")
            .build()
            .unwrap()
    }

    fn photo() -> ImagePayload {
        ImagePayload::new("image/jpeg", vec![7, 7, 7])
    }

    #[tokio::test]
    async fn test_transform_renders_with_fallback_model() {
        let transport = ScriptedTransport::new(vec![
            api_error(503, "overloaded"),
            image_response("AQID"),
        ]);
        let studio = Studio::with_transport(config(), transport);

        let rendering = studio.transform(&photo(), "Add a koi pond").await.unwrap();
        match rendering {
            Rendering::Rendered { image, model } => {
                assert_eq!(model, "img-b");
                assert_eq!(image.data, vec![1, 2, 3]);
            }
            other => panic!("unexpected rendering: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transform_degrades_to_description() {
        let transport = ScriptedTransport::new(vec![
            api_error(400, "Invalid argument"),
            text_response("A lush garden with a koi pond."),
        ]);
        let studio = Studio::with_transport(config(), transport);

        let rendering = studio.transform(&photo(), "Add a koi pond").await.unwrap();
        assert!(rendering.is_degraded());
        match rendering {
            Rendering::Described { description, cause } => {
                assert_eq!(description, "A lush garden with a koi pond.");
                assert!(cause.contains("Invalid argument"));
            }
            other => panic!("unexpected rendering: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transform_degraded_uses_text_model() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            api_error(400, "bad"),
            text_response("desc"),
        ]));
        let studio = Studio::with_transport(config(), transport.clone());
        studio.transform(&photo(), "x").await.unwrap();

        assert_eq!(transport.models(), vec!["img-a", "txt"]);
        let requests = transport.requests.lock().unwrap();
        assert!(requests[1].prompt.starts_with("Describe a landscape transformation: x"));
        assert_eq!(requests[1].generation_config, Some(GenerationConfig::VISION));
        assert_eq!(requests[1].image.as_ref().unwrap().data, vec![7, 7, 7]);
    }

    #[tokio::test]
    async fn test_infographic_surfaces_errors() {
        let transport = ScriptedTransport::new(vec![api_error(401, "API key not valid")]);
        let studio = Studio::with_transport(config(), transport);

        let err = studio.infographic(&photo(), Language::Both).await.unwrap_err();
        assert!(matches!(err, UbahLansError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_inventory_without_image_is_text_only() {
        let transport = ScriptedTransport::new(vec![text_response("1. **Palm**: tall")]);
        let studio = Studio::with_transport(config(), transport);

        let list = studio
            .inventory("tropical garden", None, Language::English)
            .await
            .unwrap();
        assert_eq!(list, "1. **Palm**: tall");
    }

    #[tokio::test]
    async fn test_plan_view_degrades_when_imagen_unavailable() {
        // Layout analysis, then Imagen (rejected by the scripted transport),
        // then the fallback description.
        let transport = ScriptedTransport::new(vec![
            text_response("House in the middle"),
            text_response("A square lawn"),
        ]);
        let studio = Studio::with_transport(config(), transport);

        let rendering = studio.plan_view(&photo(), "zen garden").await.unwrap();
        match rendering {
            Rendering::Described { description, cause } => {
                assert_eq!(description, "Top-down view: A square lawn");
                assert!(cause.contains("Imagen disabled"));
            }
            other => panic!("unexpected rendering: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_design_runs_inventory_on_transformed_image() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            image_response("AQID"),
            text_response("1. **Hibiscus**: red flowers"),
        ]));
        let studio = Studio::with_transport(config(), transport.clone());

        let design = studio
            .design(
                &photo(),
                "tropical",
                DesignOptions {
                    inventory: Some(Language::English),
                    plan_view: false,
                },
            )
            .await
            .unwrap();
        assert!(!design.transformation.is_degraded());
        assert_eq!(design.inventory.as_deref(), Some("1. **Hibiscus**: red flowers"));
        assert!(design.plan_view.is_none());

        assert_eq!(transport.models(), vec!["img-a", "txt"]);
        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[1].image.as_ref().unwrap().data, vec![1, 2, 3]);
    }
}
