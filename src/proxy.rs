//! Credential-holding proxy in front of the provider.
//!
//! One router serves both historical deployment layouts; [`DeploymentTarget`]
//! carries the differences. The provider's status and JSON body are passed
//! back unchanged so clients classify errors the same way as in direct mode.

use crate::config::{api_key_from_env, trim_base, DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL};
use crate::models::{select_models, ModelList};
use crate::types::split_data_url;
use crate::wire::{GenerateContentRequest, ProxyRequest};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Default path of the generation endpoint.
pub const GENERATE_PATH: &str = "/.netlify/functions/gemini-proxy";
/// Default path of the list-models endpoint.
pub const LIST_MODELS_PATH: &str = "/.netlify/functions/list-models";
/// Response header naming the model the request was forwarded to.
pub const EFFECTIVE_MODEL_HEADER: &str = "x-effective-model";

/// Models accepted as-is for requests that carry an image.
pub const IMAGE_CAPABLE_MODELS: &[&str] = &[
    "gemini-2.0-flash-preview-image-generation",
    "gemini-2.0-flash-exp-image-generation",
    "gemini-2.5-flash-image",
    "gemini-2.5-flash-image-preview",
    "gemini-3-pro-image-preview",
];

/// Where the proxy is deployed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum DeploymentTarget {
    /// Serverless function layout.
    #[default]
    Netlify,
    /// Edge function layout.
    Supabase,
}

impl DeploymentTarget {
    /// Request headers allowed by CORS.
    pub fn allowed_headers(&self) -> Vec<HeaderName> {
        match self {
            Self::Netlify => vec![header::CONTENT_TYPE],
            Self::Supabase => vec![
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                HeaderName::from_static("apikey"),
            ],
        }
    }

    /// `generationConfig` used when the caller sends none.
    pub fn default_generation_config(&self) -> Option<Value> {
        match self {
            Self::Netlify => Some(json!({
                "temperature": 0.8,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": 8192,
            })),
            Self::Supabase => None,
        }
    }

    /// Hint returned alongside a missing-credential error.
    pub fn missing_key_hint(&self) -> &'static str {
        match self {
            Self::Netlify => "Please set GEMINI_API_KEY environment variable in Netlify",
            Self::Supabase => "Please set GEMINI_API_KEY in Supabase secrets",
        }
    }
}

impl FromStr for DeploymentTarget {
    type Err = crate::UbahLansError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "netlify" => Ok(Self::Netlify),
            "supabase" => Ok(Self::Supabase),
            other => Err(crate::UbahLansError::Config(format!(
                "unknown deployment target: {other}"
            ))),
        }
    }
}

/// Proxy server settings.
#[derive(Clone)]
pub struct ProxyConfig {
    /// Provider credential. Requests fail with 500 when absent.
    pub api_key: Option<String>,
    /// Provider API base.
    pub api_base: String,
    /// Deployment layout.
    pub target: DeploymentTarget,
    /// Models that may receive an image unchanged.
    pub image_models: Vec<String>,
    /// Model used in place of one not in `image_models`.
    pub substitute_model: String,
    /// Whether image requests to other models are redirected.
    pub substitute: bool,
    /// Generation endpoint path.
    pub generate_path: String,
    /// List-models endpoint path.
    pub list_models_path: String,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("has_key", &self.api_key.is_some())
            .field("api_base", &self.api_base)
            .field("target", &self.target)
            .field("image_models", &self.image_models)
            .field("substitute_model", &self.substitute_model)
            .field("substitute", &self.substitute)
            .field("generate_path", &self.generate_path)
            .field("list_models_path", &self.list_models_path)
            .finish()
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            target: DeploymentTarget::default(),
            image_models: IMAGE_CAPABLE_MODELS.iter().map(|m| m.to_string()).collect(),
            substitute_model: DEFAULT_IMAGE_MODEL.to_string(),
            substitute: true,
            generate_path: GENERATE_PATH.to_string(),
            list_models_path: LIST_MODELS_PATH.to_string(),
        }
    }
}

impl ProxyConfig {
    /// Reads the credential and overrides from the environment.
    ///
    /// `UBAHLANS_API_BASE`, `UBAHLANS_DEPLOYMENT` (`netlify`|`supabase`) and
    /// `UBAHLANS_PROXY_SUBSTITUTE` (`false` disables substitution) are honored.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Self {
            api_key: api_key_from_env(),
            ..Self::default()
        };
        if let Ok(base) = std::env::var("UBAHLANS_API_BASE") {
            config.api_base = trim_base(&base);
        }
        if let Ok(target) = std::env::var("UBAHLANS_DEPLOYMENT") {
            config.target = target.parse()?;
        }
        if let Ok(flag) = std::env::var("UBAHLANS_PROXY_SUBSTITUTE") {
            config.substitute = !matches!(flag.trim(), "0" | "false" | "no" | "off");
        }
        Ok(config)
    }

    /// Returns the model a request is actually forwarded to.
    pub fn effective_model<'a>(&'a self, requested: &'a str, has_image: bool) -> &'a str {
        if has_image && self.substitute && !self.image_models.iter().any(|m| m == requested) {
            &self.substitute_model
        } else {
            requested
        }
    }
}

#[derive(Clone)]
struct ProxyState {
    config: Arc<ProxyConfig>,
    client: reqwest::Client,
}

/// Builds the proxy router.
pub fn router(config: ProxyConfig) -> Router {
    router_with_client(config, reqwest::Client::new())
}

/// Builds the proxy router with a caller-supplied HTTP client.
pub fn router_with_client(config: ProxyConfig, client: reqwest::Client) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(config.target.allowed_headers());

    let generate_path = config.generate_path.clone();
    let list_models_path = config.list_models_path.clone();
    let state = ProxyState {
        config: Arc::new(config),
        client,
    };

    Router::new()
        .route(
            &generate_path,
            post(generate).options(preflight).fallback(method_not_allowed),
        )
        .route(
            &list_models_path,
            get(list_models).options(preflight).fallback(method_not_allowed),
        )
        .layer(cors)
        .with_state(state)
}

/// Serves the proxy until the listener fails.
pub async fn serve(addr: SocketAddr, config: ProxyConfig) -> crate::Result<()> {
    tracing::info!(
        %addr,
        target = ?config.target,
        has_key = config.api_key.is_some(),
        substitute = config.substitute,
        "starting proxy"
    );
    if config.api_key.is_none() {
        tracing::warn!("no API key configured; requests will fail with 500");
    }
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(config)).await?;
    Ok(())
}

fn error_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn missing_key(config: &ProxyConfig) -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({
            "error": "API key not configured",
            "hint": config.target.missing_key_hint(),
        }),
    )
}

fn upstream_failure(error: &dyn std::fmt::Display, details: String) -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": error.to_string(), "details": details }),
    )
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        json!({ "error": "Method not allowed" }),
    )
}

async fn generate(State(state): State<ProxyState>, body: Bytes) -> Response {
    let config = &state.config;

    let request = serde_json::from_slice::<ProxyRequest>(&body).ok();
    let Some((model, prompt, image_data, generation_config)) = request.and_then(|r| {
        let model = r.model.filter(|m| !m.is_empty())?;
        let prompt = r.prompt.filter(|p| !p.is_empty())?;
        Some((model, prompt, r.image_data, r.generation_config))
    }) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Missing required fields: model, prompt" }),
        );
    };

    let Some(api_key) = config.api_key.as_deref() else {
        tracing::error!("request rejected: no API key configured");
        return missing_key(config);
    };

    let has_image = image_data.as_deref().is_some_and(|d| !d.is_empty());
    let image = image_data.as_deref().and_then(split_data_url);
    if has_image && image.is_none() {
        tracing::warn!("imageData is not a base64 data URL; forwarding text only");
    }

    let effective = config.effective_model(&model, has_image);
    if effective != model {
        tracing::warn!(requested = %model, effective, "substituting image-capable model");
    }

    let generation_config = generation_config
        .filter(|c| !c.is_null())
        .or_else(|| config.target.default_generation_config());
    let upstream_body = GenerateContentRequest::new(&prompt, image, generation_config);

    tracing::info!(model = effective, has_image = image.is_some(), "forwarding generateContent");
    let url = format!("{}/models/{effective}:generateContent", config.api_base);
    let upstream = match state
        .client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&upstream_body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("upstream request failed: {e}");
            return upstream_failure(&e, format!("{e:?}"));
        }
    };

    let status = upstream.status();
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("failed to read upstream body: {e}");
            return upstream_failure(&e, format!("{e:?}"));
        }
    };
    if let Err(e) = serde_json::from_slice::<Value>(&bytes) {
        tracing::error!(%status, "upstream returned non-JSON body");
        return upstream_failure(&e, String::from_utf8_lossy(&bytes).into_owned());
    }
    tracing::info!(%status, model = effective, "upstream responded");

    let mut response = (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        bytes,
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(effective) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(EFFECTIVE_MODEL_HEADER), value);
    }
    response
}

async fn list_models(State(state): State<ProxyState>) -> Response {
    let config = &state.config;
    let Some(api_key) = config.api_key.as_deref() else {
        return missing_key(config);
    };

    tracing::info!("fetching available models");
    let upstream = match state
        .client
        .get(format!("{}/models", config.api_base))
        .header("x-goog-api-key", api_key)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return upstream_failure(&e, format!("{e:?}")),
    };

    let status = upstream.status();
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return upstream_failure(&e, format!("{e:?}")),
    };

    if !status.is_success() {
        let details = serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        tracing::error!(%status, "failed to fetch models");
        return error_response(
            status,
            json!({
                "error": "Failed to fetch models from Gemini API",
                "details": details,
            }),
        );
    }

    match serde_json::from_slice::<ModelList>(&bytes) {
        Ok(list) => {
            let selection = select_models(&list.models);
            tracing::info!(
                total = selection.total_models,
                image_model = ?selection.image_model,
                text_model = ?selection.text_model,
                "selected models"
            );
            Json(selection).into_response()
        }
        Err(e) => upstream_failure(&e, String::from_utf8_lossy(&bytes).into_owned()),
    }
}
