//! Layer payload ingestion - file paths, data URIs, sprite directory trees
//!
//! A layer's `image` field is either a path (resolved against the manifest's
//! directory) or a `data:image/...;base64,` URI. Directory ingestion scans a
//! conventional sprite tree: one subdirectory per category, PNG files
//! inside, `base-0` layers visible by default.

use crate::models::{Category, LayerDef};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;
use std::path::Path;
use thiserror::Error;

/// Error type for payload decoding and directory scanning.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The payload path could not be opened or decoded
    #[error("cannot read image '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: image::ImageError,
    },
    /// The data URI is structurally malformed
    #[error("invalid data URI: {0}")]
    DataUri(String),
    /// The data URI carries a non-image media type
    #[error("unsupported media type '{0}', expected image/*")]
    UnsupportedMime(String),
    /// The data URI body is not valid base64
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    /// An in-memory payload could not be decoded as an image
    #[error("cannot decode image payload: {0}")]
    Decode(#[from] image::ImageError),
    /// The directory glob pattern was invalid
    #[error("glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// A warning generated during directory ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct IngestWarning {
    pub message: String,
}

impl IngestWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of scanning a sprite directory tree.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLoad {
    pub categories: Vec<Category>,
    pub layers: Vec<LayerDef>,
    pub warnings: Vec<IngestWarning>,
}

/// Decode a layer payload into an RGBA image buffer.
///
/// `payload` is a `data:` URI or a file path; relative paths are resolved
/// against `base_dir`. Each call is one-shot and independent: a failure here
/// never disturbs layers that were already ingested.
pub fn decode_payload(payload: &str, base_dir: &Path) -> Result<RgbaImage, IngestError> {
    if payload.starts_with("data:") {
        return decode_data_uri(payload);
    }

    let path = base_dir.join(payload);
    let image = image::open(&path).map_err(|source| IngestError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(image.to_rgba8())
}

/// Decode a `data:image/...;base64,` URI into an RGBA image buffer.
fn decode_data_uri(uri: &str) -> Result<RgbaImage, IngestError> {
    let body = uri.strip_prefix("data:").unwrap_or(uri);
    let (header, data) = body
        .split_once(',')
        .ok_or_else(|| IngestError::DataUri("missing ',' separator".to_string()))?;

    let mime = header.split(';').next().unwrap_or("");
    if !mime.starts_with("image/") {
        return Err(IngestError::UnsupportedMime(mime.to_string()));
    }
    if !header.ends_with(";base64") {
        return Err(IngestError::DataUri(format!(
            "unsupported encoding in '{}', expected base64",
            header
        )));
    }

    let bytes = STANDARD.decode(data.trim())?;
    let image = image::load_from_memory(&bytes)?;
    Ok(image.to_rgba8())
}

/// Default category flags for the conventional character tree: the base
/// skin can never be deselected, and accessory categories may come up empty
/// when randomizing.
pub fn default_category(name: &str) -> Category {
    Category {
        name: name.to_string(),
        can_disable: name != "skin",
        randomizer_nullable: matches!(
            name,
            "hairs" | "facial-hairs" | "hand-gear" | "head-gear"
        ),
    }
}

/// Scan a sprite directory tree into categories and layer definitions.
///
/// Every `*.png` under `root` becomes a layer: the first path component is
/// its category, the extension-less relative path its name, and layers named
/// after the `base-0` convention start visible. Files directly under `root`
/// have no category and are skipped with a warning. Categories are
/// registered in first-encounter order with [`default_category`] flags.
pub fn load_directory(root: &Path) -> Result<DirectoryLoad, IngestError> {
    let pattern = root.join("**").join("*.png");
    let mut load = DirectoryLoad::default();

    let mut paths: Vec<_> = glob::glob(&pattern.to_string_lossy())?
        .filter_map(Result::ok)
        .collect();
    paths.sort();

    for path in paths {
        let rel = path.strip_prefix(root).unwrap_or(&path);

        let category = match rel.components().next() {
            Some(first) if rel.components().count() >= 2 => {
                first.as_os_str().to_string_lossy().into_owned()
            }
            _ => {
                load.warnings.push(IngestWarning::new(format!(
                    "'{}' is not under a category directory, skipped",
                    rel.display()
                )));
                continue;
            }
        };

        if !load.categories.iter().any(|c| c.name == category) {
            load.categories.push(default_category(&category));
        }

        let name = rel.with_extension("").to_string_lossy().into_owned();
        load.layers.push(LayerDef {
            name: name.clone(),
            category,
            image: rel.to_string_lossy().into_owned(),
            show: name.contains("base-0"),
        });
    }

    Ok(load)
}
