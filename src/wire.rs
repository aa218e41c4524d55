//! JSON shapes exchanged with the provider's `generateContent` endpoint and
//! with the proxy.

use crate::types::{GenerationConfig, GenerationRequest};
use serde::{Deserialize, Serialize};

/// Request body for `models/{model}:generateContent`.
///
/// `C` is the `generationConfig` payload. The client sends a typed
/// [`GenerationConfig`]; the proxy forwards whatever JSON the caller sent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest<C = GenerationConfig> {
    /// Always exactly one entry.
    pub contents: Vec<Content>,
    /// Sampling parameters, omitted when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<C>,
}

/// One conversational turn.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    /// Prompt text first, then at most one image.
    pub parts: Vec<RequestPart>,
}

/// A request part: the prompt text, or an inline image.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    /// Prompt text.
    Text {
        /// The prompt.
        text: String,
    },
    /// Inline image.
    InlineData {
        /// Encoded image.
        inline_data: InlineBlob,
    },
}

/// Base64 image with its MIME type.
#[derive(Debug, Clone, Serialize)]
pub struct InlineBlob {
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Base64 body.
    pub data: String,
}

impl<C> GenerateContentRequest<C> {
    /// Builds the single-content body: prompt text first, then the image.
    pub fn new(prompt: &str, image: Option<(&str, &str)>, generation_config: Option<C>) -> Self {
        let mut parts = vec![RequestPart::Text {
            text: prompt.to_string(),
        }];
        if let Some((mime_type, data)) = image {
            parts.push(RequestPart::InlineData {
                inline_data: InlineBlob {
                    mime_type: mime_type.to_string(),
                    data: data.to_string(),
                },
            });
        }
        Self {
            contents: vec![Content { parts }],
            generation_config,
        }
    }
}

impl GenerateContentRequest<GenerationConfig> {
    /// Builds the provider body for a [`GenerationRequest`].
    pub fn from_generation_request(req: &GenerationRequest) -> Self {
        let encoded = req
            .image
            .as_ref()
            .map(|image| (image.mime_type.as_str(), image.to_base64()));
        Self::new(
            &req.prompt,
            encoded.as_ref().map(|(mime, data)| (*mime, data.as_str())),
            req.generation_config,
        )
    }
}

/// Body accepted by the proxy endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    /// Requested model.
    #[serde(default)]
    pub model: Option<String>,
    /// Prompt text.
    #[serde(default)]
    pub prompt: Option<String>,
    /// `data:<mime>;base64,<data>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    /// Sampling parameters, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<serde_json::Value>,
}

impl ProxyRequest {
    /// Builds the proxy body for a [`GenerationRequest`].
    pub fn from_generation_request(req: &GenerationRequest) -> crate::Result<Self> {
        let generation_config = req
            .generation_config
            .map(serde_json::to_value)
            .transpose()?;
        Ok(Self {
            model: Some(req.model.clone()),
            prompt: Some(req.prompt.clone()),
            image_data: req.image.as_ref().map(|image| image.to_data_url()),
            generation_config,
        })
    }
}

/// Response body of `generateContent`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Only the first candidate is read.
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    /// Prompt-level block information.
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// One generated answer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated parts.
    #[serde(default)]
    pub content: Option<ResponseContent>,
    /// Why generation stopped, e.g. `STOP`, `SAFETY`.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Feedback on the prompt itself.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Set when the prompt was blocked.
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Content of a candidate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseContent {
    /// Text and inline-data parts, in order.
    #[serde(default)]
    pub parts: Option<Vec<ResponsePart>>,
}

/// A response part. The provider spells inline data either `inlineData` or
/// `inline_data`; both are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePart {
    /// Text, if this is a text part.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "inlineData")]
    inline_data_camel: Option<ResponseBlob>,
    #[serde(default, rename = "inline_data")]
    inline_data_snake: Option<ResponseBlob>,
}

impl ResponsePart {
    /// Returns the inline blob under whichever name carries data.
    pub fn inline_data(&self) -> Option<&ResponseBlob> {
        self.inline_data_camel
            .as_ref()
            .filter(|blob| blob.has_data())
            .or_else(|| self.inline_data_snake.as_ref().filter(|blob| blob.has_data()))
    }
}

/// Inline data in a response part.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseBlob {
    #[serde(default, rename = "mimeType")]
    mime_type_camel: Option<String>,
    #[serde(default, rename = "mime_type")]
    mime_type_snake: Option<String>,
    /// Base64 body.
    #[serde(default)]
    pub data: Option<String>,
}

impl ResponseBlob {
    /// Returns the MIME type, defaulting to `image/png`.
    pub fn mime_type(&self) -> &str {
        self.mime_type_camel
            .as_deref()
            .or(self.mime_type_snake.as_deref())
            .filter(|m| !m.is_empty())
            .unwrap_or("image/png")
    }

    fn has_data(&self) -> bool {
        self.data.as_deref().is_some_and(|d| !d.is_empty())
    }
}
