#![warn(missing_docs)]
//! UbahLans - landscape transformation via Gemini image editing.
//!
//! A photo and a design description go in; an edited photo comes out.
//! Image calls walk an ordered list of candidate models, moving on only
//! when a model is overloaded or missing. Requests reach the provider
//! directly (credential held locally) or through the bundled proxy.
//!
//! # Quick Start
//!
//! ```no_run
//! use ubahlans::{ClientConfig, ImagePayload, Rendering, Studio};
//!
//! #[tokio::main]
//! async fn main() -> ubahlans::Result<()> {
//!     let studio = Studio::new(ClientConfig::from_env()?);
//!     let photo = ImagePayload::read("yard.jpg")?;
//!     match studio.transform(&photo, "Tropical garden with a koi pond").await? {
//!         Rendering::Rendered { image, model } => {
//!             image.save("yard-tropical.png")?;
//!             println!("edited with {model}");
//!         }
//!         Rendering::Described { description, .. } => println!("{description}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `proxy`: axum proxy server holding the provider credential
//! - `cli`: `ubahlans` command-line interface (implies `proxy`)

mod error;

pub mod config;
pub mod extract;
pub mod fallback;
pub mod imagen;
pub mod models;
pub mod studio;
pub mod transport;
pub mod types;
pub mod wire;

#[cfg(feature = "proxy")]
pub mod proxy;

pub use error::{Result, UbahLansError};

pub use config::{ClientConfig, ClientConfigBuilder, TransportMode};
pub use fallback::{generate_image, FallbackOutcome, ModelCandidates};
pub use imagen::ImagenModel;
pub use models::ModelSelection;
pub use studio::{Design, DesignOptions, Language, Rendering, Studio};
pub use transport::{HttpTransport, Transport};
pub use types::{GenerationConfig, GenerationRequest, ImageFormat, ImagePayload};

#[cfg(feature = "proxy")]
pub use proxy::{DeploymentTarget, ProxyConfig};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::ClientConfig;
    pub use crate::error::{Result, UbahLansError};
    pub use crate::studio::{Language, Rendering, Studio};
    pub use crate::transport::Transport;
    pub use crate::types::{GenerationConfig, GenerationRequest, ImagePayload};
}
