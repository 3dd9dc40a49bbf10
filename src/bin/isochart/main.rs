//! isochart CLI - UV atlas tooling over procedural meshes.
//!
//! Usage: isochart <COMMAND> [OPTIONS]
//!
//! Run `isochart --help` for available commands. Set `RUST_LOG=debug` to see
//! per-stage logging from the library.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;

use isochart::algo::{adjacency, atlas, normals, validate};
use isochart::mesh::shapes::{self, Shape};
use isochart::{AtlasFlags, AtlasOptions, CancelToken, NormalFlags, Progress, ProgressStatus, ValidateFlags};

#[derive(Parser)]
#[command(name = "isochart")]
#[command(author, version, about = "UV atlas generation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Weld vertices and build face adjacency
    Adjacency {
        #[command(flatten)]
        input: ShapeArgs,
    },

    /// Run mesh validation checks
    Validate {
        #[command(flatten)]
        input: ShapeArgs,

        /// Run every check
        #[arg(short, long)]
        all: bool,

        /// Report degenerate triangles
        #[arg(long)]
        degenerate: bool,

        /// Report misuse of the unused-triangle sentinel
        #[arg(long)]
        unused: bool,

        /// Also report backfacing neighbours
        #[arg(long)]
        backfacing: bool,

        /// Also report bowtie vertices
        #[arg(long)]
        bowties: bool,

        /// Also report asymmetric adjacency
        #[arg(long)]
        asymmetric: bool,
    },

    /// Compute per-vertex normals
    Normals {
        #[command(flatten)]
        input: ShapeArgs,

        /// Corner weighting
        #[arg(short, long, value_enum, default_value = "angle")]
        weight: NormalWeight,

        /// Treat triangles as clockwise
        #[arg(long)]
        clockwise: bool,
    },

    /// Generate a UV atlas
    Atlas {
        #[command(flatten)]
        input: ShapeArgs,

        /// Maximum number of charts (0 = unlimited)
        #[arg(long, default_value = "0")]
        max_charts: usize,

        /// Maximum normalized stretch (0.0 to 1.0)
        #[arg(long, default_value = "0.16667")]
        max_stretch: f32,

        /// Texture width in texels
        #[arg(long, default_value = "512")]
        width: u32,

        /// Texture height in texels
        #[arg(long, default_value = "512")]
        height: u32,

        /// Gutter between charts in texels
        #[arg(short, long, default_value = "2.0")]
        gutter: f32,

        /// Use quality geodesics for chart splitting
        #[arg(long)]
        quality: bool,

        /// Forced merges must respect the stretch limit
        #[arg(long)]
        limit_merge_stretch: bool,

        /// Every face must respect the stretch limit
        #[arg(long)]
        limit_face_stretch: bool,

        /// Reject bowtie vertices
        #[arg(long)]
        strict: bool,

        /// Cancel the build after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(Args)]
struct ShapeArgs {
    /// Procedural mesh to operate on
    #[arg(short, long, value_enum, default_value = "cube")]
    shape: ShapeKind,

    /// Tessellation of the grid, cylinder and sphere
    #[arg(short, long, default_value = "16")]
    resolution: usize,

    /// Welding distance for adjacency
    #[arg(short, long, default_value = "0.0")]
    epsilon: f32,

    /// Print machine-readable JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ShapeKind {
    /// 24-vertex cube with split corners
    Cube,
    /// Flat 2:1 grid
    Grid,
    /// Open cylinder
    Cylinder,
    /// UV sphere
    Sphere,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum NormalWeight {
    /// Weight by corner angle
    Angle,
    /// Weight by triangle area
    Area,
    /// Equal weights
    Equal,
}

impl ShapeArgs {
    fn build(&self) -> Shape {
        let n = self.resolution.max(3);
        match self.shape {
            ShapeKind::Cube => shapes::cube(),
            ShapeKind::Grid => shapes::grid(2 * n, n, 2.0, 1.0),
            ShapeKind::Cylinder => shapes::cylinder(n, n / 2, 1.0, 2.0),
            ShapeKind::Sphere => shapes::uv_sphere(n, n / 2, 1.0),
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Adjacency { input } => cmd_adjacency(&input)?,

        Commands::Validate {
            input,
            all,
            degenerate,
            unused,
            backfacing,
            bowties,
            asymmetric,
        } => {
            let mut flags = ValidateFlags::DEFAULT;
            flags.set(ValidateFlags::DEGENERATE, all || degenerate);
            flags.set(ValidateFlags::UNUSED, all || unused);
            flags.set(ValidateFlags::BACKFACING, all || backfacing);
            flags.set(ValidateFlags::BOWTIES, all || bowties);
            flags.set(ValidateFlags::ASYMMETRIC_ADJ, all || asymmetric);
            cmd_validate(&input, flags)?;
        }

        Commands::Normals {
            input,
            weight,
            clockwise,
        } => {
            let mut flags = match weight {
                NormalWeight::Angle => NormalFlags::DEFAULT,
                NormalWeight::Area => NormalFlags::WEIGHT_BY_AREA,
                NormalWeight::Equal => NormalFlags::WEIGHT_EQUAL,
            };
            flags.set(NormalFlags::WIND_CW, clockwise);
            cmd_normals(&input, flags)?;
        }

        Commands::Atlas {
            input,
            max_charts,
            max_stretch,
            width,
            height,
            gutter,
            quality,
            limit_merge_stretch,
            limit_face_stretch,
            strict,
            timeout_ms,
            sequential,
        } => {
            let mut flags = AtlasFlags::DEFAULT;
            flags.set(AtlasFlags::GEODESIC_QUALITY, quality);
            flags.set(AtlasFlags::LIMIT_MERGE_STRETCH, limit_merge_stretch);
            flags.set(AtlasFlags::LIMIT_FACE_STRETCH, limit_face_stretch);
            flags.set(AtlasFlags::STRICT_MANIFOLD, strict);

            let mut options = AtlasOptions::default()
                .with_max_chart_count(max_charts)
                .with_max_stretch(max_stretch)
                .with_size(width, height)
                .with_gutter(gutter)
                .with_callback_frequency(0.01)
                .with_flags(flags);
            if sequential {
                options = options.sequential();
            }
            cmd_atlas(&input, &options, timeout_ms.map(Duration::from_millis))?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress(label: &'static str) -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0)); // Track highest percent seen (monotonic)

    Progress::new(move |fraction| {
        let raw_percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as usize;

        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        let percent = previous.max(raw_percent);
        if percent == previous && percent != 100 {
            return ProgressStatus::Continue;
        }

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {}", bar, space, percent, label);
        let _ = std::io::stderr().flush();

        if percent == 100 && previous != 100 {
            eprintln!();
        }
        ProgressStatus::Continue
    })
}

fn welded(input: &ShapeArgs, shape: &Shape) -> Result<adjacency::AdjacencyResult, Box<dyn std::error::Error>> {
    Ok(adjacency::build_adjacency(&shape.mesh(), input.epsilon)?)
}

fn cmd_adjacency(input: &ShapeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let shape = input.build();
    let start = Instant::now();
    let result = welded(input, &shape)?;
    let elapsed = start.elapsed();

    if input.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let mut reps = result.point_reps.clone();
    reps.sort_unstable();
    reps.dedup();
    let boundary = result.adjacency.iter().filter(|&&a| a == isochart::UNUSED32).count();

    println!("Mesh: {} vertices, {} faces", shape.positions.len(), shape.num_faces());
    println!("Welded positions: {}", reps.len());
    println!("Boundary edges: {}", boundary);
    println!("Non-manifold edges: {}", result.non_manifold_edges);
    println!("Built in {:.2?}", elapsed);
    Ok(())
}

fn cmd_validate(input: &ShapeArgs, flags: ValidateFlags) -> Result<(), Box<dyn std::error::Error>> {
    let shape = input.build();
    let adjacency = welded(input, &shape)?;
    let report = validate::validate_mesh(&shape.mesh(), Some(&adjacency.adjacency), flags)?;

    if input.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.passed() {
        println!("Mesh passed all checks ({:?})", flags);
    } else {
        for message in report.messages() {
            println!("{}", message);
        }
        println!("{} problems found", report.diagnostics.len());
    }
    Ok(())
}

fn cmd_normals(input: &ShapeArgs, flags: NormalFlags) -> Result<(), Box<dyn std::error::Error>> {
    let shape = input.build();
    let normals = normals::compute_normals(&shape.mesh(), flags)?;

    if input.json {
        let rows: Vec<[f32; 3]> = normals.iter().map(|n| [n.x, n.y, n.z]).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for (v, n) in normals.iter().enumerate() {
        println!("{:5}: ({:+.4}, {:+.4}, {:+.4})", v, n.x, n.y, n.z);
    }
    Ok(())
}

fn cmd_atlas(
    input: &ShapeArgs,
    options: &AtlasOptions,
    timeout: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    let shape = input.build();
    let adjacency = welded(input, &shape)?;

    let mode = if options.parallel { "parallel" } else { "sequential" };
    if !input.json {
        println!(
            "Building atlas for {} faces ({}x{}, max stretch {}, {})...",
            shape.num_faces(),
            options.width,
            options.height,
            options.max_stretch,
            mode
        );
    }

    let mut progress = if input.json {
        Progress::none()
    } else {
        create_progress("atlas")
    };
    if let Some(timeout) = timeout {
        let token = CancelToken::new();
        let timer = token.clone();
        std::thread::spawn(move || {
            std::thread::sleep(timeout);
            timer.cancel();
        });
        progress = progress.with_cancel_token(token);
    }

    let start = Instant::now();
    let result = atlas::build_atlas_with_progress(&shape.mesh(), &adjacency.adjacency, options, &progress)?;
    let elapsed = start.elapsed();

    if input.json {
        let vertices: Vec<_> = result
            .vertices
            .iter()
            .map(|v| json!({ "position": [v.position.x, v.position.y, v.position.z], "uv": [v.uv.x, v.uv.y] }))
            .collect();
        let doc = json!({
            "chart_count": result.chart_count,
            "stretch": result.stretch,
            "chart_stretch": result.chart_stretch,
            "chart_rects": result.chart_rects,
            "width": result.width,
            "height": result.height,
            "vertices": vertices,
            "indices": result.indices,
            "face_partitioning": result.face_partitioning,
            "vertex_remap": result.vertex_remap,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Charts: {}", result.chart_count);
    println!("Stretch: {:.5}", result.stretch);
    println!(
        "Vertices: {} -> {} ({} seam duplicates)",
        shape.positions.len(),
        result.vertices.len(),
        result.vertices.len().saturating_sub(shape.positions.len())
    );
    for (id, (rect, stretch)) in result.chart_rects.iter().zip(&result.chart_stretch).enumerate() {
        println!(
            "  chart {:3}: {:7.1} x {:7.1} at ({:6.1}, {:6.1}){} stretch {:.5}",
            id,
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            if rect.rotated { " rotated" } else { "" },
            stretch
        );
    }
    println!("Built in {:.2?}", elapsed);
    Ok(())
}
