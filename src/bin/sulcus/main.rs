//! Sulcus CLI - color cortical surfaces from per-vertex data.
//!
//! Usage: sulcus <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `sulcus --help` for available commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sulcus::algo::Progress;
use sulcus::color::{to_rgba8, Colormap, Rgba};
use sulcus::io::{ply, text};
use sulcus::overlay::{legacy_activation_colors, map_scalars, OverlayOptions};
use sulcus::surface::{CurvatureShading, Hemisphere, Surface, SurfaceOptions, Units};

#[derive(Parser)]
#[command(name = "sulcus")]
#[command(author, version, about = "Cortical surface overlay CLI", long_about = None)]
struct Cli {
    /// Log progress (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display surface information
    Info {
        /// Input PLY surface
        input: PathBuf,

        /// Per-vertex curvature file
        #[arg(long)]
        curvature: Option<PathBuf>,
    },

    /// Color a surface from per-vertex data
    #[command(allow_negative_numbers = true)]
    Overlay {
        /// Input PLY surface
        input: PathBuf,

        /// Output PLY file with per-vertex colors
        output: PathBuf,

        /// Per-vertex values (text, one or more per line)
        #[arg(long)]
        values: PathBuf,

        /// Vertex indices the values are defined on
        #[arg(long)]
        vertices: Option<PathBuf>,

        /// Hemisphere (lh or rh)
        #[arg(long, default_value = "lh")]
        hemi: Hemisphere,

        /// Coordinate units (mm or m)
        #[arg(long, default_value = "mm")]
        units: Units,

        /// Align the medial wall at this offset
        #[arg(long)]
        offset: Option<f64>,

        /// Colormap name, optionally with an _r suffix, or "auto"
        #[arg(short, long, default_value = "auto")]
        colormap: Colormap,

        /// Low colormap limit
        #[arg(long)]
        fmin: Option<f64>,

        /// Middle colormap limit
        #[arg(long)]
        fmid: Option<f64>,

        /// High colormap limit
        #[arg(long)]
        fmax: Option<f64>,

        /// Display deviations around this value
        #[arg(long)]
        center: Option<f64>,

        /// Overall opacity (0.0 to 1.0)
        #[arg(short, long, default_value = "1.0")]
        alpha: f64,

        /// Number of smoothing steps [default: until every vertex has a value]
        #[arg(short, long)]
        steps: Option<usize>,

        /// Hide vertices below this value
        #[arg(long)]
        threshold: Option<f64>,

        /// Fade opacity between fmin and fmid
        #[arg(long)]
        transparent: bool,

        /// Blend the overlay over curvature shading from this file
        #[arg(long)]
        curvature: Option<PathBuf>,

        /// Use the simple hot activation overlay instead of a lookup table
        #[arg(long, conflicts_with_all = ["fmin", "fmid", "fmax", "center"])]
        legacy: bool,

        /// Print this many colorbar ticks
        #[arg(long)]
        colorbar: Option<usize>,

        /// Evaluate on the rayon pool
        #[arg(long)]
        parallel: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input, curvature } => {
            cmd_info(&input, curvature.as_deref())?;
        }

        Commands::Overlay {
            input,
            output,
            values,
            vertices,
            hemi,
            units,
            offset,
            colormap,
            fmin,
            fmid,
            fmax,
            center,
            alpha,
            steps,
            threshold,
            transparent,
            curvature,
            legacy,
            colorbar,
            parallel,
        } => {
            let mut surface_options = SurfaceOptions::default().with_units(units);
            if let Some(offset) = offset {
                surface_options = surface_options.with_offset(offset);
            }

            let mut options = OverlayOptions::default()
                .with_colormap(colormap)
                .with_alpha(alpha)
                .with_transparent(transparent)
                .with_parallel(parallel);
            options.fmin = fmin;
            options.fmid = fmid;
            options.fmax = fmax;
            options.center = center;
            options.threshold = threshold;
            if let Some(steps) = steps {
                options = options.with_smoothing_steps(steps);
            }

            let request = OverlayRequest {
                input: &input,
                output: &output,
                values: &values,
                vertices: vertices.as_deref(),
                curvature: curvature.as_deref(),
                hemi,
                surface_options,
                options,
                legacy,
                colorbar,
            };
            cmd_overlay(&request)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0)); // Track highest percent seen (monotonic)

    Progress::new(move |current, total, message| {
        // Unknown total: smoothing until covered.
        if total == 0 {
            eprint!("\r{} (step {})", message, current);
            let _ = std::io::stderr().flush();
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= previous && raw_percent != 100 {
            return;
        }
        let percent = raw_percent.max(previous);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {}", bar, space, percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn load_surface(
    input: &Path,
    hemi: Hemisphere,
    options: &SurfaceOptions,
) -> Result<Surface, Box<dyn std::error::Error>> {
    let mesh = ply::load_geometry(input)?;
    Ok(Surface::new(hemi, mesh, options)?)
}

fn cmd_info(input: &Path, curvature: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut surf = load_surface(input, Hemisphere::Left, &SurfaceOptions::default())?;
    let mesh = surf.mesh();
    let adj = surf.adjacency();

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());
    println!("Edges: {}", adj.num_edges());

    let degrees = (0..adj.num_vertices()).map(|v| adj.degree(v));
    let (min_deg, max_deg) = degrees.fold((usize::MAX, 0), |(lo, hi), d| (lo.min(d), hi.max(d)));
    println!("Vertex degree range: [{}, {}]", min_deg, max_deg);

    let isolated = mesh.vertex_face_counts().iter().filter(|&&c| c == 0).count();
    if isolated > 0 {
        println!("Isolated vertices: {}", isolated);
    }

    if let Some((min, max)) = mesh.bounding_box() {
        println!("Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z);
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    let lengths: Vec<f64> = surf.normals().iter().map(|n| n.norm()).collect();
    let avg = lengths.iter().sum::<f64>() / lengths.len().max(1) as f64;
    println!("Average normal length: {:.6}", avg);

    if let Some(path) = curvature {
        let curv = text::load_values(path)?;
        let shading = surf.set_curvature(&curv)?;
        let sulcal = shading.binary().iter().filter(|&&b| b == 1).count();
        println!("\nCurvature:");
        println!("  Sulcal vertices: {} ({:.1}%)", sulcal,
            100.0 * sulcal as f64 / curv.len().max(1) as f64);
    }

    Ok(())
}

struct OverlayRequest<'a> {
    input: &'a Path,
    output: &'a Path,
    values: &'a Path,
    vertices: Option<&'a Path>,
    curvature: Option<&'a Path>,
    hemi: Hemisphere,
    surface_options: SurfaceOptions,
    options: OverlayOptions,
    legacy: bool,
    colorbar: Option<usize>,
}

fn cmd_overlay(req: &OverlayRequest<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let mut surf = load_surface(req.input, req.hemi, &req.surface_options)?;
    println!("Loaded: {} vertices, {} faces", surf.num_vertices(), surf.mesh().num_faces());

    let values = text::load_values(req.values)?;
    let vertices = req.vertices.map(text::load_indices).transpose()?;
    println!("Data: {} values", values.len());

    let start = Instant::now();

    // Warm the cache so the build shows progress; mapping then reuses it.
    let operator = match &vertices {
        Some(idx) => {
            println!("Smoothing onto {} vertices ({})...", surf.num_vertices(),
                match req.options.smoothing_steps {
                    Some(n) => format!("{} steps", n),
                    None => "until covered".to_string(),
                });
            let progress = create_progress();
            let op = surf.smoothing_operator_with_progress(idx, req.options.smoothing_steps, &progress)?;
            if req.options.smoothing_steps.is_none() {
                eprintln!();
            }
            Some(op)
        }
        None => None,
    };

    let mut colors: Vec<Rgba> = if req.legacy {
        let full = match &operator {
            Some(op) => op.apply(&values)?,
            None => values.clone(),
        };
        if full.len() != surf.num_vertices() {
            return Err(format!("expected {} values, got {}", surf.num_vertices(), full.len()).into());
        }
        legacy_activation_colors(&full)
    } else {
        let overlay = map_scalars(&surf, &values, vertices.as_deref(), &req.options)?;
        let (fmin, fmid, fmax) = overlay.limits();
        let (k, b) = overlay.scale();
        println!("Limits: fmin={:.4}, fmid={:.4}, fmax={:.4} (k={:.6}, b={:.6})", fmin, fmid, fmax, k, b);
        println!("Colormap: {:?}", overlay.lut().params().colormap);

        if let Some(n) = req.colorbar {
            println!("Colorbar:");
            for (value, color) in overlay.lut().colorbar(n) {
                let [r, g, b, a] = to_rgba8(color);
                println!("  {:>12.4}  #{:02x}{:02x}{:02x}{:02x}", value, r, g, b, a);
            }
        }
        overlay.colors().to_vec()
    };

    if let Some(path) = req.curvature {
        let curv = text::load_values(path)?;
        let shading = surf.set_curvature(&curv)?;
        blend_over_cortex(&mut colors, shading);
    }
    let elapsed = start.elapsed();

    let rgba8: Vec<[u8; 4]> = colors.iter().map(|&c| to_rgba8(c)).collect();
    ply::save_colored(surf.mesh(), &rgba8, req.output)?;
    println!("Saved: {} ({:.2?})", req.output.display(), elapsed);

    Ok(())
}

/// Composite overlay colors over the grey cortex, producing opaque colors.
fn blend_over_cortex(colors: &mut [Rgba], shading: &CurvatureShading) {
    for (c, grey) in colors.iter_mut().zip(shading.grey()) {
        let a = c[3];
        for (ch, g) in c.iter_mut().zip(grey) {
            *ch = a * *ch + (1.0 - a) * g;
        }
        c[3] = 1.0;
    }
}
