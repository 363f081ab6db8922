//! Birdseye - homography diagnostics
//!
//! Loads a rig description, prints the matrices each camera would hand to
//! the warp shader, animates yaw to check center stability, and renders CPU
//! previews of the rectified view.

use anyhow::{bail, Context, Result};
use birdseye::config::RigConfig;
use birdseye::transform::{checkerboard, warp_rgba};
use birdseye::{Homography, HomographyEngine, ShaderUniforms};
use clap::{Parser, Subcommand};
use nalgebra::Matrix3;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Birdseye - planar homography diagnostics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "rig.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print K, R, t, B, H, M and the uniform block
    Matrix {
        /// Camera name (default: all cameras)
        #[arg(long)]
        camera: Option<String>,

        /// Print the uniform blocks as JSON only
        #[arg(long)]
        json: bool,
    },

    /// Animate yaw over a full turn and report where the UV center lands
    Sweep {
        /// Camera name (default: first camera)
        #[arg(long)]
        camera: Option<String>,

        /// Yaw increment in degrees
        #[arg(long, default_value_t = 5.0)]
        step: f64,
    },

    /// Warp an image (or a checkerboard) on the CPU and write a PNG
    Render {
        /// Camera name (default: first camera)
        #[arg(long)]
        camera: Option<String>,

        /// Source image; a checkerboard of the camera's size when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output PNG path
        #[arg(short, long, default_value = "birdseye.png")]
        output: PathBuf,

        /// Output width (default: camera width)
        #[arg(long)]
        width: Option<u32>,

        /// Output height (default: camera height)
        #[arg(long)]
        height: Option<u32>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Birdseye v{}", env!("CARGO_PKG_VERSION"));

    let config = RigConfig::load_or_create(&args.config)?;

    match args.command {
        Command::Matrix { camera, json } => print_matrices(&config, camera.as_deref(), json),
        Command::Sweep { camera, step } => sweep_yaw(&config, camera.as_deref(), step),
        Command::Render {
            camera,
            input,
            output,
            width,
            height,
        } => render(&config, camera.as_deref(), input, &output, width, height),
    }
}

fn print_matrices(config: &RigConfig, camera: Option<&str>, json: bool) -> Result<()> {
    if camera.is_some() {
        config.camera(camera)?;
    }

    let rig = config.to_rig()?;
    let mut blocks = serde_json::Map::new();

    for result in rig.compute_all() {
        if camera.is_some_and(|name| name != result.name) {
            continue;
        }
        let homography = result
            .homography
            .with_context(|| format!("Failed to compute camera '{}'", result.name))?;
        let uniforms = ShaderUniforms::new(
            &homography,
            config.uniforms.layout,
            config.uniforms.clamp_uv,
        );

        if json {
            blocks.insert(result.name.clone(), uniforms.to_json());
            continue;
        }

        let engine = rig
            .get(&result.name)
            .with_context(|| format!("Camera '{}' vanished from rig", result.name))?;
        print_report(&result.name, engine, &homography, &uniforms)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
    }

    Ok(())
}

fn print_report(
    name: &str,
    engine: &HomographyEngine,
    homography: &Homography,
    uniforms: &ShaderUniforms,
) -> Result<()> {
    let pose = engine.pose();
    let plane = engine.plane();
    let (roll, pitch, yaw) = pose.angles_deg();
    let p = pose.position();

    println!("=== Camera '{}' ===", name);
    println!("Position: ({:.1}, {:.1}, {:.1}) mm", p.x, p.y, p.z);
    println!("Orientation: roll={}°, pitch={}°, yaw={}°", roll, pitch, yaw);
    let axis = pose.optical_axis();
    println!("Optical axis: ({:.4}, {:.4}, {:.4})", axis.x, axis.y, axis.z);
    println!(
        "Distance camera→plane: {:.1} mm",
        plane.signed_distance(&pose.position())
    );

    print_matrix("K", &engine.intrinsics().camera_matrix());
    print_matrix("R", &pose.rotation());
    let t = pose.translation();
    println!("t = [{:.4}, {:.4}, {:.4}]", t.x, t.y, t.z);
    print_matrix("B", &plane.basis()?);
    print_matrix("H", &homography.h);
    print_matrix("M", &homography.m);
    println!("Status: {:?}", homography.status);

    if !homography.is_ok() {
        warn!("Camera '{}' has a singular projection", name);
    }

    for (u, v) in [(0.5, 0.5), (0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
        let mapped = homography.map_point(u, v);
        if mapped.valid {
            println!("  ({:.2}, {:.2}) -> ({:.4}, {:.4})", u, v, mapped.u, mapped.v);
        } else {
            println!("  ({:.2}, {:.2}) -> singular", u, v);
        }
    }

    println!("Uniforms ({:?}):", uniforms.layout);
    for (name, value) in uniforms.named() {
        println!("  {} = {:.6}", name, value);
    }
    println!();
    Ok(())
}

fn print_matrix(label: &str, m: &Matrix3<f64>) {
    println!("{}:", label);
    for row in m.row_iter() {
        println!("  [{:>14.6} {:>14.6} {:>14.6}]", row[0], row[1], row[2]);
    }
}

/// Smallest yaw increment the sweep accepts, in degrees
const MIN_YAW_STEP: f64 = 0.01;

/// Yaw angles in `[0, 360)` spaced `step` degrees apart
fn yaw_samples(step: f64) -> Result<Vec<f64>> {
    if !(MIN_YAW_STEP..=360.0).contains(&step) {
        bail!(
            "Yaw step must be in [{}, 360] degrees, got {}",
            MIN_YAW_STEP,
            step
        );
    }
    let count = (360.0 / step).ceil() as usize;
    Ok((0..count)
        .map(|i| i as f64 * step)
        .filter(|yaw| *yaw < 360.0)
        .collect())
}

fn sweep_yaw(config: &RigConfig, camera: Option<&str>, step: f64) -> Result<()> {
    let yaws = yaw_samples(step)?;
    let camera = config.camera(camera)?;
    let engine = camera.to_engine()?;
    let (roll, pitch, _) = engine.pose().angles_deg();
    info!("Sweeping yaw for camera '{}' in {}° steps", camera.name, step);

    for yaw in yaws {
        let pose = engine.pose().with_angles(roll, pitch, yaw)?;
        let homography = engine.with_pose(pose).compute()?;
        let center = homography.map_point(0.5, 0.5);
        let m = homography.m;

        if center.valid {
            println!(
                "yaw={:6.1}° | center maps to ({:.4}, {:.4}) | M[0,:]=[{:.4}, {:.4}, {:.4}]",
                yaw,
                center.u,
                center.v,
                m[(0, 0)],
                m[(0, 1)],
                m[(0, 2)]
            );
        } else {
            println!("yaw={:6.1}° | center is singular", yaw);
        }
    }

    Ok(())
}

fn render(
    config: &RigConfig,
    camera: Option<&str>,
    input: Option<PathBuf>,
    output: &Path,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<()> {
    let camera = config.camera(camera)?;
    let engine = camera.to_engine()?;
    let intrinsics = engine.intrinsics();

    let src = match input {
        Some(path) => image::open(&path)
            .with_context(|| format!("Failed to open input image {:?}", path))?
            .to_rgba8(),
        None => checkerboard(intrinsics.width(), intrinsics.height(), 40),
    };
    if src.width() != intrinsics.width() || src.height() != intrinsics.height() {
        warn!(
            "Input is {}x{} but camera '{}' is {}x{}; sampling by UV",
            src.width(),
            src.height(),
            camera.name,
            intrinsics.width(),
            intrinsics.height()
        );
    }

    let homography = engine.compute()?;
    if !homography.is_ok() {
        warn!("Camera '{}' has a singular projection", camera.name);
    }

    let out_width = width.unwrap_or(intrinsics.width());
    let out_height = height.unwrap_or(intrinsics.height());
    let warped = warp_rgba(
        &src,
        &homography,
        out_width,
        out_height,
        engine.window().y_up(),
        config.uniforms.clamp_uv,
    );

    warped
        .save(output)
        .with_context(|| format!("Failed to write {:?}", output))?;
    info!("Wrote {}x{} preview to {:?}", out_width, out_height, output);
    Ok(())
}
