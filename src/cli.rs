//! Command-line interface implementation

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::clock::AnimationClock;
use crate::compositor::compose;
use crate::frames::TraversalOrder;
use crate::grid::TileGrid;
use crate::ingest::{default_category, load_directory};
use crate::models::{LayerDef, StackObject};
use crate::output::{artifact_output_path, save_png, scale_image};
use crate::parser::parse_stream;
use crate::preview::{play_in_terminal, render_gif, slice_frames};
use crate::registry::LayerRegistry;

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// Spritestack - composite categorized sprite layers and preview animations
#[derive(Parser)]
#[command(name = "sstk")]
#[command(about = "Spritestack - layered character sprite compositing and animation preview")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Composite the visible layers and export a PNG
    Compose {
        /// Input manifest (JSON5/JSONL stream of categories and layers)
        #[arg(required_unless_present = "dir", conflicts_with = "dir")]
        manifest: Option<PathBuf>,

        /// Load layers from a sprite directory tree instead of a manifest
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output file or directory (default: {name}.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Name of the exported composite
        #[arg(long, default_value = "sample")]
        name: String,

        /// Select one layer per category: CATEGORY=LAYER (repeatable)
        #[arg(long = "select", value_name = "CATEGORY=LAYER")]
        select: Vec<String>,

        /// Clear a category's selection (repeatable)
        #[arg(long = "none", value_name = "CATEGORY")]
        none: Vec<String>,

        /// Randomize the selection before exporting
        #[arg(long)]
        randomize: bool,

        /// Seed for --randomize (entropy when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Scale output by integer factor (1-16, default: 1)
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=16))]
        scale: u8,

        /// Strict mode: treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Slice the composite into a tile grid and export an animation preview
    Preview {
        /// Input manifest (JSON5/JSONL stream of categories and layers)
        #[arg(required_unless_present = "dir", conflicts_with = "dir")]
        manifest: Option<PathBuf>,

        /// Load layers from a sprite directory tree instead of a manifest
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output file or directory (default: {name}.gif)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Name of the exported preview
        #[arg(long, default_value = "sample")]
        name: String,

        /// Frames per second (minimum 1)
        #[arg(long, default_value = "4", value_parser = clap::value_parser!(u32).range(1..))]
        fps: u32,

        /// Tile width in pixels
        #[arg(long, default_value = "16", value_parser = clap::value_parser!(u32).range(1..))]
        tile_width: u32,

        /// Tile height in pixels
        #[arg(long, default_value = "16", value_parser = clap::value_parser!(u32).range(1..))]
        tile_height: u32,

        /// Tile columns; recomputes tile width from the sheet width
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        columns: Option<u32>,

        /// Tile rows; recomputes tile height from the sheet height
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        rows: Option<u32>,

        /// Frame traversal order
        #[arg(long, value_enum, default_value = "row-major")]
        order: TraversalOrder,

        /// Select one layer per category: CATEGORY=LAYER (repeatable)
        #[arg(long = "select", value_name = "CATEGORY=LAYER")]
        select: Vec<String>,

        /// Clear a category's selection (repeatable)
        #[arg(long = "none", value_name = "CATEGORY")]
        none: Vec<String>,

        /// Randomize the selection before previewing
        #[arg(long)]
        randomize: bool,

        /// Seed for --randomize (entropy when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Scale frames by integer factor (1-16, default: 1)
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=16))]
        scale: u8,

        /// Play in the terminal instead of writing a GIF
        #[arg(long)]
        term: bool,

        /// Full cycles to play with --term (loops until interrupted when omitted)
        #[arg(long)]
        cycles: Option<u32>,

        /// Strict mode: treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// List categories and layers with their visibility
    List {
        /// Input manifest (JSON5/JSONL stream of categories and layers)
        #[arg(required_unless_present = "dir", conflicts_with = "dir")]
        manifest: Option<PathBuf>,

        /// Load layers from a sprite directory tree instead of a manifest
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compose {
            manifest,
            dir,
            output,
            name,
            select,
            none,
            randomize,
            seed,
            scale,
            strict,
        } => run_compose(
            manifest.as_deref(),
            dir.as_deref(),
            output.as_deref(),
            &name,
            &select,
            &none,
            randomize,
            seed,
            scale,
            strict,
        ),
        Commands::Preview {
            manifest,
            dir,
            output,
            name,
            fps,
            tile_width,
            tile_height,
            columns,
            rows,
            order,
            select,
            none,
            randomize,
            seed,
            scale,
            term,
            cycles,
            strict,
        } => run_preview(
            manifest.as_deref(),
            dir.as_deref(),
            output.as_deref(),
            &name,
            fps,
            tile_width,
            tile_height,
            columns,
            rows,
            order,
            &select,
            &none,
            randomize,
            seed,
            scale,
            term,
            cycles,
            strict,
        ),
        Commands::List { manifest, dir } => run_list(manifest.as_deref(), dir.as_deref()),
    }
}

/// A loaded layer stack plus the directory its payload paths resolve against.
struct LoadedStack {
    registry: LayerRegistry,
    base_dir: PathBuf,
    warnings: Vec<String>,
}

/// Load a registry from a manifest file or a sprite directory tree.
fn load_stack(manifest: Option<&Path>, dir: Option<&Path>) -> Result<LoadedStack, (String, u8)> {
    let mut registry = LayerRegistry::new();
    let mut warnings = Vec::new();

    let (defs, base_dir) = if let Some(root) = dir {
        let load = load_directory(root)
            .map_err(|e| (format!("Cannot scan '{}': {}", root.display(), e), EXIT_ERROR))?;
        for warning in &load.warnings {
            warnings.push(warning.message.clone());
        }
        for category in load.categories {
            registry.register_category(category);
        }
        (load.layers, root.to_path_buf())
    } else {
        let path = manifest.expect("clap requires manifest or --dir");
        let file = File::open(path).map_err(|e| {
            (
                format!("Cannot open input file '{}': {}", path.display(), e),
                EXIT_INVALID_ARGS,
            )
        })?;

        let parse_result = parse_stream(BufReader::new(file));
        for warning in &parse_result.warnings {
            warnings.push(format!("line {}: {}", warning.line, warning.message));
        }

        let mut defs: Vec<LayerDef> = Vec::new();
        for obj in parse_result.objects {
            match obj {
                StackObject::Category(category) => registry.register_category(category),
                StackObject::Layer(layer) => defs.push(layer),
            }
        }

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        (defs, base_dir)
    };

    // Duplicate names break row identity downstream: keep the latest
    let mut deduped: Vec<LayerDef> = Vec::new();
    for def in defs {
        if let Some(existing) = deduped.iter_mut().find(|d| d.name == def.name) {
            warnings.push(format!("Duplicate layer name '{}', using latest", def.name));
            *existing = def;
        } else {
            deduped.push(def);
        }
    }

    for def in deduped {
        if registry.category(&def.category).is_none() {
            warnings.push(format!(
                "Category '{}' not declared, registering with defaults",
                def.category
            ));
            registry.register_category(default_category(&def.category));
        }
        registry.add_layer(def);
    }
    registry.sort_by_rank();

    Ok(LoadedStack {
        registry,
        base_dir,
        warnings,
    })
}

/// Apply --randomize / --none / --select to the registry, explicit flags
/// overriding the randomizer.
fn apply_selection(
    registry: &mut LayerRegistry,
    select: &[String],
    none: &[String],
    randomize: bool,
    seed: Option<u64>,
) -> Result<(), (String, u8)> {
    if randomize {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        registry.randomize(&mut rng);
    }

    for category in none {
        match registry.category(category) {
            Some(c) if !c.can_disable => {
                return Err((
                    format!("Category '{}' cannot be cleared", category),
                    EXIT_ERROR,
                ));
            }
            Some(_) => {
                registry.set_visible(None, category);
            }
            None => {
                return Err((format!("Unknown category '{}'", category), EXIT_ERROR));
            }
        }
    }

    for pair in select {
        let (category, layer) = pair.split_once('=').ok_or_else(|| {
            (
                format!("Invalid --select '{}', expected CATEGORY=LAYER", pair),
                EXIT_INVALID_ARGS,
            )
        })?;
        if registry.category(category).is_none() {
            return Err((format!("Unknown category '{}'", category), EXIT_ERROR));
        }
        if !registry.set_visible(Some(layer), category) {
            return Err((
                format!("No layer named '{}' in category '{}'", layer, category),
                EXIT_ERROR,
            ));
        }
    }

    Ok(())
}

/// Print collected warnings as errors and fail, or as warnings and continue.
fn flush_warnings(warnings: &[String], strict: bool) -> Option<ExitCode> {
    if strict && !warnings.is_empty() {
        for warning in warnings {
            eprintln!("Error: {}", warning);
        }
        return Some(ExitCode::from(EXIT_ERROR));
    }
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
    None
}

/// Execute the compose command
fn run_compose(
    manifest: Option<&Path>,
    dir: Option<&Path>,
    output: Option<&Path>,
    name: &str,
    select: &[String],
    none: &[String],
    randomize: bool,
    seed: Option<u64>,
    scale: u8,
    strict: bool,
) -> ExitCode {
    let mut stack = match load_stack(manifest, dir) {
        Ok(stack) => stack,
        Err((message, code)) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(code);
        }
    };

    if let Err((message, code)) =
        apply_selection(&mut stack.registry, select, none, randomize, seed)
    {
        eprintln!("Error: {}", message);
        return ExitCode::from(code);
    }

    if let Some(code) = flush_warnings(&stack.warnings, strict) {
        return code;
    }

    let visible = stack.registry.visible_snapshot();
    let image = match compose(&visible, &stack.base_dir) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let image = scale_image(image, scale);

    let output_path = artifact_output_path(name, "png", output);
    if let Err(e) = save_png(&image, &output_path) {
        eprintln!("Error: Failed to save '{}': {}", output_path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    println!("Saved: {}", output_path.display());
    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the preview command
fn run_preview(
    manifest: Option<&Path>,
    dir: Option<&Path>,
    output: Option<&Path>,
    name: &str,
    fps: u32,
    tile_width: u32,
    tile_height: u32,
    columns: Option<u32>,
    rows: Option<u32>,
    order: TraversalOrder,
    select: &[String],
    none: &[String],
    randomize: bool,
    seed: Option<u64>,
    scale: u8,
    term: bool,
    cycles: Option<u32>,
    strict: bool,
) -> ExitCode {
    let mut stack = match load_stack(manifest, dir) {
        Ok(stack) => stack,
        Err((message, code)) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(code);
        }
    };

    if let Err((message, code)) =
        apply_selection(&mut stack.registry, select, none, randomize, seed)
    {
        eprintln!("Error: {}", message);
        return ExitCode::from(code);
    }

    if let Some(code) = flush_warnings(&stack.warnings, strict) {
        return code;
    }

    let visible = stack.registry.visible_snapshot();
    let sheet = match compose(&visible, &stack.base_dir) {
        Ok(sheet) => sheet,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let (sheet_width, sheet_height) = sheet.dimensions();
    let mut grid = TileGrid::new(sheet_width, sheet_height, tile_width, tile_height);
    if let Some(columns) = columns {
        grid.set_columns(columns);
    }
    if let Some(rows) = rows {
        grid.set_rows(rows);
    }

    let mut frames = slice_frames(&sheet, &grid, order);
    if frames.is_empty() {
        eprintln!("Error: Empty frame grid ({}x{} sheet)", sheet_width, sheet_height);
        return ExitCode::from(EXIT_ERROR);
    }
    if scale > 1 {
        frames = frames.into_iter().map(|f| scale_image(f, scale)).collect();
    }

    let mut clock = AnimationClock::new(fps, frames.len());

    if term {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        if let Err(e) = play_in_terminal(&frames, &mut clock, cycles, &mut handle) {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    let delay_ms = clock.interval().as_millis() as u32;
    let output_path = artifact_output_path(name, "gif", output);
    if let Err(e) = render_gif(&frames, delay_ms, &output_path) {
        eprintln!("Error: Failed to save '{}': {}", output_path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    println!("Saved: {}", output_path.display());
    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the list command
fn run_list(manifest: Option<&Path>, dir: Option<&Path>) -> ExitCode {
    let stack = match load_stack(manifest, dir) {
        Ok(stack) => stack,
        Err((message, code)) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(code);
        }
    };

    for category in stack.registry.categories() {
        let mut flags = Vec::new();
        if !category.can_disable {
            flags.push("required");
        }
        if category.randomizer_nullable {
            flags.push("nullable");
        }
        if flags.is_empty() {
            println!("{}:", category.name);
        } else {
            println!("{} ({}):", category.name, flags.join(", "));
        }

        for layer in stack
            .registry
            .layers()
            .iter()
            .filter(|l| l.category == category.name)
        {
            let marker = if layer.show { "*" } else { " " };
            println!("  [{}] {}", marker, layer.name);
        }
    }

    for warning in &stack.warnings {
        eprintln!("Warning: {}", warning);
    }

    ExitCode::from(EXIT_SUCCESS)
}
