//! Core types shared by the transport, the extractor and the studio.

use crate::error::{Result, UbahLansError};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Maps a MIME type back to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Splits a `data:<mime>;base64,<data>` URL into its MIME type and base64 body.
///
/// Both halves must be non-empty. The base64 body is returned undecoded.
pub fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    // Greedy on the MIME side: the last ";base64," wins.
    let idx = rest.rfind(";base64,")?;
    let mime = &rest[..idx];
    let data = &rest[idx + ";base64,".len()..];
    if mime.is_empty() || data.is_empty() {
        return None;
    }
    Some((mime, data))
}

/// Binary image bytes tagged with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "image payload should be saved or processed"]
pub struct ImagePayload {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Raw image bytes.
    pub data: Vec<u8>,
}

impl ImagePayload {
    /// Creates a payload from raw bytes.
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Decodes a base64 body with the given MIME type.
    pub fn from_base64(mime_type: impl Into<String>, b64: &str) -> Result<Self> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| UbahLansError::Decode(e.to_string()))?;
        Ok(Self::new(mime_type, data))
    }

    /// Reads a photo from disk.
    ///
    /// The MIME type comes from the magic bytes, then the extension.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let format = ImageFormat::from_magic_bytes(&data)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(ImageFormat::from_extension)
            })
            .ok_or_else(|| {
                UbahLansError::InvalidRequest(format!(
                    "unsupported image format: {}",
                    path.display()
                ))
            })?;
        Ok(Self::new(format.mime_type(), data))
    }

    /// Returns the known format for this MIME type, if any.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime_type(&self.mime_type)
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns `path` with the extension matching this image's format.
    ///
    /// Paths that already carry an extension, and unknown formats, are
    /// returned unchanged.
    pub fn output_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match self.format() {
            Some(format) if path.extension().is_none() => path.with_extension(format.extension()),
            _ => path.to_path_buf(),
        }
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// Sampling parameters sent as `generationConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f64,
    /// Top-K sampling cutoff.
    pub top_k: u32,
    /// Nucleus sampling cutoff.
    pub top_p: f64,
    /// Output token limit.
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    /// Preset for image editing calls.
    pub const IMAGE_EDIT: Self = Self {
        temperature: 0.4,
        top_k: 32,
        top_p: 1.0,
        max_output_tokens: 4096,
    };

    /// Preset for multimodal (photo + question) calls.
    pub const VISION: Self = Self {
        temperature: 0.8,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 8192,
    };

    /// Preset for text-only calls.
    pub const TEXT: Self = Self {
        temperature: 0.7,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 8192,
    };
}

/// One generation call: immutable once built, constructed fresh per call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Model identifier.
    pub model: String,
    /// Text prompt.
    pub prompt: String,
    /// Optional input image.
    pub image: Option<ImagePayload>,
    /// Optional sampling parameters.
    pub generation_config: Option<GenerationConfig>,
}

impl GenerationRequest {
    /// Creates a text-only request.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            image: None,
            generation_config: None,
        }
    }

    /// Attaches an input image.
    pub fn with_image(mut self, image: ImagePayload) -> Self {
        self.image = Some(image);
        self
    }

    /// Attaches an input image if one is given.
    pub fn with_optional_image(mut self, image: Option<ImagePayload>) -> Self {
        self.image = image;
        self
    }

    /// Sets the sampling parameters.
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    /// Returns true if this request carries an image to edit.
    pub fn is_edit(&self) -> bool {
        self.image.is_some()
    }
}
