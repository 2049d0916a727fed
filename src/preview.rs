//! Animation preview - tile slicing, GIF encoding, terminal playback
//!
//! The composite sheet is cut into tiles along the frame-order sequence;
//! the cycle is either encoded as an animated GIF or played live in the
//! terminal as ANSI half-block frames at the clock's rate.

use crate::clock::AnimationClock;
use crate::frames::{frame_offsets, TraversalOrder};
use crate::grid::TileGrid;
use crate::output::OutputError;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Frame, Rgba, RgbaImage};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Transparent color used for padding partial edge tiles
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// ANSI escape sequence to reset all formatting
pub const ANSI_RESET: &str = "\x1b[0m";

/// Cut the sprite sheet into animation frames along the frame-order
/// sequence.
///
/// Produces one `tile_width x tile_height` image per grid cell, in
/// traversal order. Cells that overhang the sheet (partial trailing tiles)
/// are padded with transparency.
pub fn slice_frames(sheet: &RgbaImage, grid: &TileGrid, order: TraversalOrder) -> Vec<RgbaImage> {
    let tile_width = grid.tile_width();
    let tile_height = grid.tile_height();

    frame_offsets(grid.columns(), grid.rows(), order)
        .iter()
        .map(|offset| {
            let (origin_x, origin_y) = offset.tile_origin(tile_width, tile_height);
            let mut tile = RgbaImage::from_pixel(tile_width, tile_height, TRANSPARENT);

            for y in 0..tile_height {
                for x in 0..tile_width {
                    let sheet_x = origin_x + x;
                    let sheet_y = origin_y + y;
                    if sheet_x < sheet.width() && sheet_y < sheet.height() {
                        tile.put_pixel(x, y, *sheet.get_pixel(sheet_x, sheet_y));
                    }
                }
            }

            tile
        })
        .collect()
}

/// Encode one animation cycle as an infinitely repeating GIF.
///
/// `frame_delay_ms` is the clock interval (`1000 / fps`); GIF stores delays
/// in centiseconds, so the delay is clamped to at least 10 ms.
pub fn render_gif(
    frames: &[RgbaImage],
    frame_delay_ms: u32,
    path: &Path,
) -> Result<(), OutputError> {
    if frames.is_empty() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let mut encoder = GifEncoder::new(writer);
    encoder.set_repeat(Repeat::Infinite)?;

    let delay_cs = (frame_delay_ms / 10).max(1);

    for rgba_image in frames {
        let delay = image::Delay::from_numer_denom_ms(delay_cs * 10, 1);
        let frame = Frame::from_parts(rgba_image.clone(), 0, 0, delay);
        encoder.encode_frame(frame)?;
    }

    Ok(())
}

/// Convert an RGBA color to an ANSI 24-bit foreground escape sequence.
/// Transparent pixels render as dark gray.
fn color_to_ansi_fg(rgba: Rgba<u8>) -> String {
    if rgba[3] == 0 {
        "\x1b[38;5;236m".to_string()
    } else {
        format!("\x1b[38;2;{};{};{}m", rgba[0], rgba[1], rgba[2])
    }
}

/// Convert an RGBA color to an ANSI 24-bit background escape sequence.
/// Transparent pixels render as dark gray.
fn color_to_ansi_bg(rgba: Rgba<u8>) -> String {
    if rgba[3] == 0 {
        "\x1b[48;5;236m".to_string()
    } else {
        format!("\x1b[48;2;{};{};{}m", rgba[0], rgba[1], rgba[2])
    }
}

/// Render one frame as ANSI half-block rows.
///
/// Each text row covers two pixel rows: the upper half block glyph takes
/// the top pixel as foreground and the bottom pixel as background.
pub fn render_ansi_frame(frame: &RgbaImage) -> String {
    let mut output = String::new();

    for y in (0..frame.height()).step_by(2) {
        for x in 0..frame.width() {
            let top = *frame.get_pixel(x, y);
            let bottom = if y + 1 < frame.height() {
                *frame.get_pixel(x, y + 1)
            } else {
                TRANSPARENT
            };
            output.push_str(&color_to_ansi_fg(top));
            output.push_str(&color_to_ansi_bg(bottom));
            output.push('\u{2580}');
        }
        output.push_str(ANSI_RESET);
        output.push('\n');
    }

    output
}

/// Play the frame cycle in the terminal at the clock's rate.
///
/// Redraws in place, sleeping the clock interval between frames. Runs
/// `cycles` full cycles, or indefinitely when `None` (until the process is
/// interrupted). Each tick carries the clock's current generation, so a
/// rate change always supersedes the running schedule.
pub fn play_in_terminal<W: Write>(
    frames: &[RgbaImage],
    clock: &mut AnimationClock,
    cycles: Option<u32>,
    out: &mut W,
) -> io::Result<()> {
    if frames.is_empty() {
        return Ok(());
    }

    clock.set_sequence_len(frames.len());
    let text_rows = frames[0].height().div_ceil(2);
    let mut completed = 0u32;
    let mut first = true;

    loop {
        let generation = clock.generation();
        let frame = &frames[clock.frame()];

        if !first {
            // Move the cursor back up and redraw over the previous frame
            write!(out, "\x1b[{}A", text_rows)?;
        }
        out.write_all(render_ansi_frame(frame).as_bytes())?;
        out.flush()?;
        first = false;

        std::thread::sleep(clock.interval());
        clock.tick(generation);

        if clock.frame() == 0 {
            completed += 1;
            if let Some(limit) = cycles {
                if completed >= limit {
                    break;
                }
            }
        }
    }

    Ok(())
}
