//! Data models for stack manifests (categories, layers)

use serde::{Deserialize, Serialize};

/// A named group of mutually-related layers (e.g. "eyes").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub name: String,
    /// Whether "none" is a valid selection for this category.
    #[serde(default = "default_true")]
    pub can_disable: bool,
    /// Whether the randomizer may leave this category with no visible layer.
    #[serde(default)]
    pub randomizer_nullable: bool,
}

fn default_true() -> bool {
    true
}

/// A layer definition as it appears in a manifest.
///
/// `image` is the payload reference: a file path (resolved against the
/// manifest's directory) or a `data:image/...;base64,` URI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayerDef {
    pub name: String,
    pub category: String,
    pub image: String,
    #[serde(default)]
    pub show: bool,
}

/// A manifest object - Category or Layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StackObject {
    Category(Category),
    Layer(LayerDef),
}

/// A warning message from parsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Warning {
    pub message: String,
    pub line: usize,
}
