//! Client configuration, built once at startup and passed down explicitly.

use crate::error::{Result, UbahLansError};
use crate::models::ModelSelection;

/// Default provider API base.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default proxy endpoint (Netlify dev server layout).
pub const DEFAULT_PROXY_URL: &str = "http://localhost:8888/.netlify/functions/gemini-proxy";
/// Default image-editing model.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";
/// Default text and vision model.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash-exp";
/// Image models tried after the configured one.
pub const FALLBACK_IMAGE_MODELS: &[&str] = &["gemini-3-pro-image-preview"];

/// Environment variable names holding the provider credential, in lookup order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "gemini-api-key"];

/// Reads the provider credential from the environment.
pub fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .filter(|key| !key.trim().is_empty())
}

/// How requests reach the provider.
#[derive(Clone, PartialEq, Eq)]
pub enum TransportMode {
    /// Call the provider directly with a locally held credential.
    Direct {
        /// Provider credential, sent as `x-goog-api-key`.
        api_key: String,
        /// Provider API base.
        api_base: String,
    },
    /// Call the proxy, which injects its own credential.
    Proxy {
        /// Proxy `generateContent` endpoint.
        url: String,
        /// Proxy list-models endpoint, if deployed.
        list_models_url: Option<String>,
    },
}

impl std::fmt::Debug for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct { api_base, .. } => f
                .debug_struct("Direct")
                .field("api_key", &"<redacted>")
                .field("api_base", api_base)
                .finish(),
            Self::Proxy {
                url,
                list_models_url,
            } => f
                .debug_struct("Proxy")
                .field("url", url)
                .field("list_models_url", list_models_url)
                .finish(),
        }
    }
}

impl TransportMode {
    /// Returns a short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Proxy { .. } => "proxy",
        }
    }
}

/// Everything the transport and the studio need to know.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Transport mode.
    pub mode: TransportMode,
    /// Primary image-editing model.
    pub image_model: String,
    /// Text and vision model.
    pub text_model: String,
    /// Image models tried after `image_model`.
    pub fallback_image_models: Vec<String>,
}

impl ClientConfig {
    /// Creates a new `ClientConfigBuilder`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Builds a config from environment variables.
    ///
    /// A credential selects direct mode, otherwise `UBAHLANS_PROXY_URL`
    /// (or the default proxy URL) selects proxy mode.
    pub fn from_env() -> Result<Self> {
        let mut builder = ClientConfigBuilder::new();
        if let Some(key) = api_key_from_env() {
            builder = builder.api_key(key);
        }
        if let Ok(url) = std::env::var("UBAHLANS_PROXY_URL") {
            builder = builder.proxy_url(url);
        }
        if let Ok(url) = std::env::var("UBAHLANS_LIST_MODELS_URL") {
            builder = builder.list_models_url(url);
        }
        if let Ok(base) = std::env::var("UBAHLANS_API_BASE") {
            builder = builder.api_base(base);
        }
        if let Ok(model) = std::env::var("UBAHLANS_IMAGE_MODEL") {
            builder = builder.image_model(model);
        }
        if let Ok(model) = std::env::var("UBAHLANS_TEXT_MODEL") {
            builder = builder.text_model(model);
        }
        builder.build()
    }

    /// Returns a copy using the models picked by model discovery.
    pub fn with_selection(&self, selection: &ModelSelection) -> Self {
        let mut config = self.clone();
        if let Some(ref model) = selection.image_model {
            config.image_model = model.clone();
        }
        if let Some(ref model) = selection.text_model {
            config.text_model = model.clone();
        }
        config
    }

    /// Image models to try, primary first.
    pub fn image_candidates(&self) -> Vec<String> {
        std::iter::once(self.image_model.clone())
            .chain(self.fallback_image_models.iter().cloned())
            .collect()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    api_key: Option<String>,
    api_base: Option<String>,
    proxy_url: Option<String>,
    list_models_url: Option<String>,
    image_model: Option<String>,
    text_model: Option<String>,
    fallback_image_models: Option<Vec<String>>,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the provider credential, selecting direct mode.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the provider API base.
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Sets the proxy endpoint used when no credential is held.
    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }

    /// Sets the proxy's list-models endpoint.
    pub fn list_models_url(mut self, url: impl Into<String>) -> Self {
        self.list_models_url = Some(url.into());
        self
    }

    /// Sets the primary image-editing model.
    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    /// Sets the text and vision model.
    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = Some(model.into());
        self
    }

    /// Replaces the fallback image models.
    pub fn fallback_image_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_image_models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    /// Builds the config.
    pub fn build(self) -> Result<ClientConfig> {
        let mode = match self.api_key.filter(|k| !k.trim().is_empty()) {
            Some(api_key) => TransportMode::Direct {
                api_key,
                api_base: trim_base(self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)),
            },
            None => {
                let url = self.proxy_url.unwrap_or_else(|| DEFAULT_PROXY_URL.to_string());
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(UbahLansError::Config(format!(
                        "proxy URL must be http(s): {url}"
                    )));
                }
                TransportMode::Proxy {
                    url,
                    list_models_url: self.list_models_url,
                }
            }
        };

        let image_model = self
            .image_model
            .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());
        if image_model.trim().is_empty() {
            return Err(UbahLansError::Config("image model must not be empty".into()));
        }

        Ok(ClientConfig {
            mode,
            image_model,
            text_model: self
                .text_model
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            fallback_image_models: self.fallback_image_models.unwrap_or_else(|| {
                FALLBACK_IMAGE_MODELS.iter().map(|m| m.to_string()).collect()
            }),
        })
    }
}

pub(crate) fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_with_key_is_direct() {
        let config = ClientConfig::builder()
            .api_key("test-key")
            .api_base("https://example.test/v1beta/")
            .build()
            .unwrap();
        match config.mode {
            TransportMode::Direct { api_key, api_base } => {
                assert_eq!(api_key, "test-key");
                assert_eq!(api_base, "https://example.test/v1beta");
            }
            other => panic!("expected direct mode, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_without_key_is_proxy() {
        let config = ClientConfig::builder().build().unwrap();
        assert_eq!(config.mode.label(), "proxy");
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.text_model, DEFAULT_TEXT_MODEL);
    }

    #[test]
    fn test_blank_key_falls_back_to_proxy() {
        let config = ClientConfig::builder().api_key("  ").build().unwrap();
        assert_eq!(config.mode.label(), "proxy");
    }

    #[test]
    fn test_rejects_non_http_proxy() {
        let err = ClientConfig::builder().proxy_url("ftp://nope").build().unwrap_err();
        assert!(matches!(err, UbahLansError::Config(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ClientConfig::builder().api_key("super-secret").build().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_image_candidates_primary_first() {
        let config = ClientConfig::builder()
            .image_model("a")
            .fallback_image_models(["b", "a"])
            .build()
            .unwrap();
        assert_eq!(config.image_candidates(), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_with_selection_does_not_mutate_original() {
        let config = ClientConfig::builder().build().unwrap();
        let selection = ModelSelection {
            image_model: Some("gemini-3-pro-image-preview".into()),
            text_model: None,
            total_models: 3,
        };
        let updated = config.with_selection(&selection);
        assert_eq!(updated.image_model, "gemini-3-pro-image-preview");
        assert_eq!(updated.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
    }
}
