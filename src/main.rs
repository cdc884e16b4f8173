use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use lensmap::compositor::DisplacementComposite;
use lensmap::encode;
use lensmap::fragment::Uv;
use lensmap::generator::DisplacementGenerator;
use lensmap::manifest::load_and_validate_manifest;
use lensmap::schema::Manifest;

#[derive(Debug, Parser)]
#[command(name = "lensmap")]
#[command(about = "Displacement-map compiler for refraction filters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compile the displacement map and write it as a PNG.
    Build {
        manifest: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        /// Also write the SVG filter document that consumes the map.
        #[arg(long = "filter")]
        filter: Option<PathBuf>,
        /// Pointer position as normalized "X,Y" coordinates.
        #[arg(long = "pointer")]
        pointer: Option<String>,
    },
    /// Validate a manifest and print a summary.
    Check { manifest: PathBuf },
    /// Apply the compiled map to an input image (refraction preview).
    Warp {
        manifest: PathBuf,
        input: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            manifest,
            output,
            filter,
            pointer,
        } => run_build(&manifest, &output, filter.as_deref(), pointer.as_deref()),
        Commands::Check { manifest } => run_check(&manifest),
        Commands::Warp {
            manifest,
            input,
            output,
        } => run_warp(&manifest, &input, &output),
    }
}

fn run_check(manifest_path: &Path) -> Result<()> {
    let manifest = load_and_validate_manifest(manifest_path)?;
    let generator = build_generator(&manifest)?;

    println!(
        "OK: {} ({}x{} surface -> {}x{} raster, scale {}, aberration {}, blur {})",
        manifest_path.display(),
        manifest.surface.width,
        manifest.surface.height,
        generator.raster_width(),
        generator.raster_height(),
        manifest.filter.scale,
        manifest.filter.aberration,
        manifest.filter.blur
    );
    Ok(())
}

fn run_build(
    manifest_path: &Path,
    output_path: &Path,
    filter_path: Option<&Path>,
    pointer: Option<&str>,
) -> Result<()> {
    let manifest = load_and_validate_manifest(manifest_path)?;
    let pointer = pointer.map(parse_pointer).transpose()?;

    let mut generator = build_generator(&manifest)?;
    generator.update(pointer);
    eprintln!(
        "compiled {}x{} displacement raster (normalization scale {:.3})",
        generator.raster_width(),
        generator.raster_height(),
        generator.normalization_scale()
    );

    let png = encode::rgba_to_png(
        generator.pixels(),
        generator.raster_width(),
        generator.raster_height(),
    )?;
    fs::write(output_path, &png)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    if let Some(filter_path) = filter_path {
        let document = manifest
            .filter
            .to_chain()
            .svg_document(&encode::png_data_url(&png));
        fs::write(filter_path, document)
            .with_context(|| format!("failed to write {}", filter_path.display()))?;
        eprintln!("wrote filter document {}", filter_path.display());
    }

    println!("Wrote {}", output_path.display());
    Ok(())
}

fn run_warp(manifest_path: &Path, input_path: &Path, output_path: &Path) -> Result<()> {
    let manifest = load_and_validate_manifest(manifest_path)?;

    let input = image::open(input_path)
        .with_context(|| format!("failed to read input image {}", input_path.display()))?
        .to_rgba8();
    let (width, height) = input.dimensions();

    let mut generator = build_generator(&manifest)?;
    generator.update(None);

    let composite = DisplacementComposite {
        scale: manifest.filter.scale,
        aberration: manifest.filter.aberration,
    };
    let warped = composite
        .apply(
            input.as_raw(),
            width as usize,
            height as usize,
            generator.pixels(),
            generator.raster_width() as usize,
            generator.raster_height() as usize,
        )
        .context("failed to apply displacement map")?;

    let image = image::RgbaImage::from_raw(width, height, warped)
        .ok_or_else(|| anyhow!("warped buffer does not match input dimensions"))?;
    image
        .save_with_format(output_path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    println!("Wrote {}", output_path.display());
    Ok(())
}

fn build_generator(
    manifest: &Manifest,
) -> Result<DisplacementGenerator<lensmap::fragment::LiquidGlass>> {
    DisplacementGenerator::new(
        manifest.surface.width,
        manifest.surface.height,
        manifest.lens.to_fragment(),
    )
    .context("failed to construct generator")
}

/// Parse a normalized "X,Y" pointer argument.
fn parse_pointer(raw: &str) -> Result<Uv> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("pointer must be 'X,Y', got '{raw}'"))?;
    let x: f32 = x
        .trim()
        .parse()
        .with_context(|| format!("invalid pointer x in '{raw}'"))?;
    let y: f32 = y
        .trim()
        .parse()
        .with_context(|| format!("invalid pointer y in '{raw}'"))?;
    if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
        bail!("pointer coordinates must be normalized to [0, 1], got '{raw}'");
    }
    Ok(Uv::new(x, y))
}
