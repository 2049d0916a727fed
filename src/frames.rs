//! Frame-order generation for tile-grid animation playback
//!
//! A sprite sheet is animated by moving its viewport one tile at a time,
//! expressed as background-position offsets: the offset for the tile in grid
//! row `r`, column `c` is `(-r, -c)`. The traversal order decides whether
//! rows or columns form the outer loop.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Traversal order of the animation frame grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalOrder {
    /// Outer loop over rows, inner loop over columns.
    RowMajor,
    /// Outer loop over columns, inner loop over rows.
    ColumnMajor,
}

/// A background-position offset for one animation frame.
///
/// Negated grid indices: `dx = -row`, `dy = -column`. Offsets move the
/// sheet's viewport, they are not coordinates in image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOffset {
    pub dx: i64,
    pub dy: i64,
}

impl FrameOffset {
    /// Pixel origin of this frame's tile within the sprite sheet.
    pub fn tile_origin(&self, tile_width: u32, tile_height: u32) -> (u32, u32) {
        let column = (-self.dy) as u32;
        let row = (-self.dx) as u32;
        (column * tile_width, row * tile_height)
    }
}

/// Generate the deterministic frame-offset sequence for a grid.
///
/// Output length is `columns * rows`; empty if either extent is 0. Pure
/// function of its inputs.
///
/// # Examples
///
/// ```
/// use spritestack::frames::{frame_offsets, FrameOffset, TraversalOrder};
///
/// let seq = frame_offsets(2, 2, TraversalOrder::RowMajor);
/// assert_eq!(seq.len(), 4);
/// assert_eq!(seq[0], FrameOffset { dx: 0, dy: 0 });
/// assert_eq!(seq[1], FrameOffset { dx: 0, dy: -1 });
/// ```
pub fn frame_offsets(columns: u32, rows: u32, order: TraversalOrder) -> Vec<FrameOffset> {
    let mut offsets = Vec::with_capacity((columns as usize) * (rows as usize));

    match order {
        TraversalOrder::RowMajor => {
            for rc in 0..rows {
                for cr in 0..columns {
                    offsets.push(FrameOffset {
                        dx: -(rc as i64),
                        dy: -(cr as i64),
                    });
                }
            }
        }
        TraversalOrder::ColumnMajor => {
            for rc in 0..columns {
                for cr in 0..rows {
                    offsets.push(FrameOffset {
                        dx: -(cr as i64),
                        dy: -(rc as i64),
                    });
                }
            }
        }
    }

    offsets
}
