//! Composite assembly - stacking visible layers onto one surface
//!
//! Layers decode in parallel, but decode completion order never influences
//! the picture: results land in a buffer keyed by registry index and the
//! blit pass replays that buffer in registry order, which is the stacking
//! order (later entries paint over earlier ones).

use crate::ingest::{decode_payload, IngestError};
use crate::registry::SpriteLayer;
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use std::path::Path;
use thiserror::Error;

/// Error type for composite assembly.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// Nothing to draw: every layer is hidden or the registry is empty
    #[error("no visible layers to composite")]
    NoVisibleLayers,
    /// A layer payload could not be decoded; the export fails with the
    /// layer's name instead of stalling
    #[error("layer '{layer}': {source}")]
    LayerDecode {
        layer: String,
        #[source]
        source: IngestError,
    },
}

/// Composite the visible layers, in stacking order, onto a fresh surface.
///
/// The surface is sized to the detected composite dimensions (the first
/// layer's size); every layer draws at origin (0,0) with no scaling,
/// alpha-blended over what is already there. Pixels outside the surface are
/// clipped.
pub fn compose(visible: &[SpriteLayer], base_dir: &Path) -> Result<RgbaImage, ComposeError> {
    if visible.is_empty() {
        return Err(ComposeError::NoVisibleLayers);
    }

    // Decode fan-out; the collected Vec is the completion buffer keyed by
    // registry index, so unordered completion cannot reorder the blits.
    let decoded: Vec<Result<RgbaImage, IngestError>> = visible
        .par_iter()
        .map(|layer| decode_payload(&layer.image, base_dir))
        .collect();

    let mut images = Vec::with_capacity(decoded.len());
    for (layer, result) in visible.iter().zip(decoded) {
        match result {
            Ok(image) => images.push(image),
            Err(source) => {
                return Err(ComposeError::LayerDecode {
                    layer: layer.name.clone(),
                    source,
                })
            }
        }
    }

    let (width, height) = images[0].dimensions();
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));

    for image in &images {
        blit(&mut canvas, image);
    }

    Ok(canvas)
}

/// Blit a layer onto the canvas at origin (0,0).
/// Uses alpha blending for transparent pixels; overflow is clipped.
fn blit(canvas: &mut RgbaImage, layer: &RgbaImage) {
    let canvas_width = canvas.width();
    let canvas_height = canvas.height();

    for (y, row) in layer.rows().enumerate() {
        let y = y as u32;
        if y >= canvas_height {
            break;
        }

        for (x, pixel) in row.enumerate() {
            let x = x as u32;
            if x >= canvas_width {
                break;
            }

            let src = pixel;
            if src[3] == 0 {
                // Fully transparent, skip
                continue;
            } else if src[3] == 255 {
                // Fully opaque, overwrite
                canvas.put_pixel(x, y, *src);
            } else {
                let dst = canvas.get_pixel(x, y);
                let blended = alpha_blend(src, dst);
                canvas.put_pixel(x, y, blended);
            }
        }
    }
}

/// Alpha blend source over destination
fn alpha_blend(src: &Rgba<u8>, dst: &Rgba<u8>) -> Rgba<u8> {
    let src_a = src[3] as f32 / 255.0;
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let s_f = s as f32 / 255.0;
        let d_f = d as f32 / 255.0;
        let out = (s_f * src_a + d_f * dst_a * (1.0 - src_a)) / out_a;
        (out * 255.0).round() as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}
