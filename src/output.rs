//! PNG output, zoom scaling, and file path generation

use image::imageops::FilterType;
use image::RgbaImage;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fallback stem used when the composite has no name.
pub const DEFAULT_NAME: &str = "sample";

/// Error type for output operations
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Save an RGBA image to a PNG file, creating parent directories as needed.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    image.save(path)?;
    Ok(())
}

/// Scale image by integer factor using nearest-neighbor interpolation.
///
/// This preserves crisp pixel edges for pixel art.
pub fn scale_image(image: RgbaImage, factor: u8) -> RgbaImage {
    if factor <= 1 {
        return image;
    }
    let (w, h) = image.dimensions();
    image::imageops::resize(
        &image,
        w * factor as u32,
        h * factor as u32,
        FilterType::Nearest,
    )
}

/// Generate the output path for an exported artifact.
///
/// | Scenario | Output |
/// |----------|--------|
/// | No `-o` | `{name}.{ext}` in the working directory |
/// | `-o file.png` | `file.png` |
/// | `-o dir/` | `dir/{name}.{ext}` |
///
/// An empty `name` falls back to `sample`.
pub fn artifact_output_path(name: &str, extension: &str, output_arg: Option<&Path>) -> PathBuf {
    let stem = if name.is_empty() { DEFAULT_NAME } else { name };

    match output_arg {
        Some(output) => {
            let is_dir = output.as_os_str().to_string_lossy().ends_with('/') || output.is_dir();
            if is_dir {
                output.join(format!("{}.{}", stem, extension))
            } else {
                output.to_path_buf()
            }
        }
        None => PathBuf::from(format!("{}.{}", stem, extension)),
    }
}
