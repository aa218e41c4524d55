//! One call contract for the provider, whether reached directly or through
//! the proxy.

use crate::config::{ClientConfig, TransportMode};
use crate::error::{Result, UbahLansError};
use crate::extract::error_message;
use crate::imagen::{PredictRequest, PredictResponse};
use crate::models::{select_models, ModelList, ModelSelection};
use crate::types::GenerationRequest;
use crate::wire::{GenerateContentRequest, GenerateContentResponse, ProxyRequest};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Issues provider calls.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Calls `generateContent` for one model.
    async fn generate_content(&self, request: &GenerationRequest)
        -> Result<GenerateContentResponse>;

    /// Lists available models and picks defaults.
    async fn discover_models(&self) -> Result<ModelSelection>;

    /// Calls an Imagen `:predict` endpoint.
    async fn predict(&self, model: &str, _request: &PredictRequest) -> Result<PredictResponse> {
        Err(predict_unsupported(model))
    }
}

/// Error for Imagen calls on a transport that cannot reach `:predict`.
pub(crate) fn predict_unsupported(model: &str) -> UbahLansError {
    UbahLansError::Config(format!(
        "{model}: Imagen prediction requires direct API access"
    ))
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerateContentResponse> {
        (**self).generate_content(request).await
    }

    async fn discover_models(&self) -> Result<ModelSelection> {
        (**self).discover_models().await
    }

    async fn predict(&self, model: &str, request: &PredictRequest) -> Result<PredictResponse> {
        (**self).predict(model, request).await
    }
}

/// [`Transport`] over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    mode: TransportMode,
}

impl HttpTransport {
    /// Creates a transport for the configured mode.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config.mode.clone())
    }

    /// Creates a transport with a caller-supplied client.
    pub fn with_client(client: reqwest::Client, mode: TransportMode) -> Self {
        Self { client, mode }
    }

    /// Returns the transport mode.
    pub fn mode(&self) -> &TransportMode {
        &self.mode
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let body: serde_json::Value =
                serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
            let status_text = status.canonical_reason().unwrap_or("API request failed");
            return Err(UbahLansError::Api {
                status: status.as_u16(),
                message: error_message(&body, status_text),
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerateContentResponse> {
        tracing::debug!(
            mode = self.mode.label(),
            model = %request.model,
            has_image = request.is_edit(),
            "sending generateContent request"
        );

        let response = match &self.mode {
            TransportMode::Direct { api_key, api_base } => {
                let url = format!("{api_base}/models/{}:generateContent", request.model);
                let body = GenerateContentRequest::from_generation_request(request);
                self.client
                    .post(&url)
                    .header("x-goog-api-key", api_key)
                    .json(&body)
                    .send()
                    .await?
            }
            TransportMode::Proxy { url, .. } => {
                let body = ProxyRequest::from_generation_request(request)?;
                self.client.post(url).json(&body).send().await?
            }
        };

        Self::read_json(response).await
    }

    async fn discover_models(&self) -> Result<ModelSelection> {
        match &self.mode {
            TransportMode::Direct { api_key, api_base } => {
                let response = self
                    .client
                    .get(format!("{api_base}/models"))
                    .header("x-goog-api-key", api_key)
                    .send()
                    .await?;
                let list: ModelList = Self::read_json(response).await?;
                Ok(select_models(&list.models))
            }
            TransportMode::Proxy {
                list_models_url: Some(url),
                ..
            } => {
                let response = self.client.get(url).send().await?;
                Self::read_json(response).await
            }
            TransportMode::Proxy {
                list_models_url: None,
                ..
            } => Err(UbahLansError::Config(
                "no list-models endpoint configured for proxy mode".into(),
            )),
        }
    }

    async fn predict(&self, model: &str, request: &PredictRequest) -> Result<PredictResponse> {
        let TransportMode::Direct { api_key, api_base } = &self.mode else {
            return Err(predict_unsupported(model));
        };

        tracing::debug!(model, "sending Imagen predict request");
        let response = self
            .client
            .post(format!("{api_base}/models/{model}:predict"))
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationConfig, ImagePayload};
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Seen {
        calls: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
    }

    async fn fake_generate(
        State(seen): State<Seen>,
        Path(model_action): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let key = headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        seen.calls
            .lock()
            .unwrap()
            .push((model_action.clone(), key, body));

        if model_action.starts_with("busy-model") {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": {"code": 503, "message": "The model is overloaded."}})),
            );
        }
        (
            StatusCode::OK,
            Json(json!({"candidates": [{"content": {"parts": [{"text": "ok"}]}}]})),
        )
    }

    async fn spawn_provider() -> (String, Seen) {
        let seen = Seen::default();
        let app = Router::new()
            .route("/v1beta/models/:model_action", post(fake_generate))
            .route(
                "/v1beta/models",
                get(|| async {
                    Json(json!({"models": [
                        {"name": "models/gemini-2.5-flash-image", "supportedGenerationMethods": ["generateContent"]},
                        {"name": "models/gemini-2.0-flash-exp", "supportedGenerationMethods": ["generateContent"]}
                    ]}))
                }),
            )
            .route(
                "/v1beta/plain",
                post(|| async { (StatusCode::BAD_GATEWAY, "upstream exploded") }),
            )
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1beta"), seen)
    }

    fn direct(base: &str) -> HttpTransport {
        HttpTransport::with_client(
            reqwest::Client::new(),
            TransportMode::Direct {
                api_key: "test-key".into(),
                api_base: base.into(),
            },
        )
    }

    #[tokio::test]
    async fn test_direct_request_shape() {
        let (base, seen) = spawn_provider().await;
        let transport = direct(&base);
        let request = GenerationRequest::new("gemini-x", "Edit this")
            .with_image(ImagePayload::new("image/png", vec![1, 2, 3]))
            .with_config(GenerationConfig::IMAGE_EDIT);

        let response = transport.generate_content(&request).await.unwrap();
        assert!(response.candidates.is_some());

        let calls = seen.calls.lock().unwrap();
        let (path, key, body) = &calls[0];
        assert_eq!(path, "gemini-x:generateContent");
        assert_eq!(key.as_deref(), Some("test-key"));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Edit this");
        assert_eq!(body["contents"][0]["parts"][1]["inline_data"]["data"], "AQID");
        assert_eq!(body["generationConfig"]["temperature"], 0.4);
    }

    #[tokio::test]
    async fn test_non_success_maps_to_api_error() {
        let (base, _) = spawn_provider().await;
        let err = direct(&base)
            .generate_content(&GenerationRequest::new("busy-model", "hi"))
            .await
            .unwrap_err();
        match err {
            UbahLansError::Api { status, ref message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "The model is overloaded.");
            }
            ref other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_substitutable());
    }

    #[tokio::test]
    async fn test_non_json_error_uses_status_text() {
        let (base, _) = spawn_provider().await;
        let transport = direct(&base);
        let response = transport
            .client
            .post(format!("{base}/plain"))
            .send()
            .await
            .unwrap();
        let err = HttpTransport::read_json::<Value>(response).await.unwrap_err();
        match err {
            UbahLansError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_direct_discover_models() {
        let (base, _) = spawn_provider().await;
        let selection = direct(&base).discover_models().await.unwrap();
        assert_eq!(selection.image_model.as_deref(), Some("gemini-2.5-flash-image"));
        assert_eq!(selection.text_model.as_deref(), Some("gemini-2.0-flash-exp"));
        assert_eq!(selection.total_models, 2);
    }

    #[tokio::test]
    async fn test_proxy_mode_without_list_endpoint() {
        let transport = HttpTransport::with_client(
            reqwest::Client::new(),
            TransportMode::Proxy {
                url: "http://127.0.0.1:9/proxy".into(),
                list_models_url: None,
            },
        );
        let err = transport.discover_models().await.unwrap_err();
        assert!(matches!(err, UbahLansError::Config(_)));

        let err = transport
            .predict("imagen-4.0-generate-001", &PredictRequest::new("plan"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            predict_unsupported("imagen-4.0-generate-001").to_string()
        );
    }

    #[tokio::test]
    async fn test_default_predict_matches_http_proxy_mode() {
        struct TextOnly;

        #[async_trait]
        impl Transport for TextOnly {
            async fn generate_content(
                &self,
                _: &GenerationRequest,
            ) -> Result<GenerateContentResponse> {
                Ok(GenerateContentResponse::default())
            }

            async fn discover_models(&self) -> Result<ModelSelection> {
                Ok(ModelSelection::default())
            }
        }

        let err = TextOnly
            .predict("imagen-3.0-generate-001", &PredictRequest::new("plan"))
            .await
            .unwrap_err();
        assert!(matches!(err, UbahLansError::Config(_)));
        assert_eq!(
            err.to_string(),
            "configuration error: imagen-3.0-generate-001: Imagen prediction requires direct API access"
        );
    }
}
