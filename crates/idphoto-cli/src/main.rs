mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use idphoto_core::{
    layout_for_standard, lookup_sheet, lookup_standard, registry, render_sheet, replace_background,
    solve_alignment, validate_compliance, FaceBox, HexColor, Mask, PhotoError, Resampling, SheetSize,
    SheetStyle, Standard,
};
use idphoto_models::{PhotoEngine, PrepareOptions};
use image::RgbImage;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "idphoto", about = "Passport and ID photo compliance, alignment and print sheets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List photo standards and sheet sizes
    Standards {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Check a face box against a standard
    Check {
        #[arg(short, long)]
        standard: String,
        /// Source image size, e.g. 640x800
        #[arg(long, value_parser = parse_dims)]
        image: (u32, u32),
        /// Face box as XMIN,YMIN,XMAX,YMAX
        #[arg(long, value_parser = parse_face)]
        face: [f64; 4],
        #[arg(long, default_value_t = 1.0)]
        score: f64,
    },
    /// Solve the transform that aligns a face box to a standard
    Align {
        #[arg(short, long)]
        standard: String,
        #[arg(long, value_parser = parse_dims)]
        image: (u32, u32),
        #[arg(long, value_parser = parse_face)]
        face: [f64; 4],
        #[arg(long, default_value_t = 1.0)]
        score: f64,
        /// Canvas size in pixels; defaults to the standard's size at --dpi
        #[arg(long, value_parser = parse_dims)]
        canvas: Option<(u32, u32)>,
        #[arg(long, default_value_t = 300)]
        dpi: u32,
    },
    /// Compute a sheet layout
    Layout {
        #[arg(short, long)]
        standard: String,
        #[arg(long)]
        sheet: String,
        /// Margin in millimeters
        #[arg(long)]
        margin: Option<f64>,
        /// Gap between photos in millimeters
        #[arg(long)]
        gap: Option<f64>,
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },
    /// Tile an already prepared photo onto a print sheet
    Sheet {
        #[arg(long)]
        photo: PathBuf,
        #[arg(short, long)]
        standard: String,
        #[arg(long)]
        sheet: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        no_guides: bool,
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },
    /// Replace an image's background using a grayscale mask
    Composite {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        mask: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Use this standard's background color
        #[arg(short, long, conflicts_with = "color")]
        standard: Option<String>,
        /// Background color as #RRGGBB
        #[arg(long)]
        color: Option<String>,
        /// Nearest-neighbour mask upscaling
        #[arg(long)]
        nearest: bool,
    },
    /// Run the full pipeline with the ONNX models
    Process {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        standard: String,
        #[arg(long)]
        sheet: String,
        #[arg(long)]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Standards { json } => list_standards(json)?,
        Commands::Check { standard, image, face, score } => {
            let standard = lookup_standard(&standard)?;
            let face = face_box(face, score, image)?;
            let report = validate_compliance(&face, image.0, image.1, standard)?;
            print_json(&report)?;
        }
        Commands::Align { standard, image, face, score, canvas, dpi } => {
            let standard = lookup_standard(&standard)?;
            let face = face_box(face, score, image)?;
            let canvas = match canvas {
                Some(c) => c,
                None => standard.canvas_px(dpi)?,
            };
            let transform = solve_alignment(&face, image, canvas, standard)?;
            print_json(&serde_json::json!({
                "standard": standard.id,
                "canvas": { "width": canvas.0, "height": canvas.1 },
                "transform": transform,
            }))?;
        }
        Commands::Layout { standard, sheet, margin, gap, scale } => {
            let standard = lookup_standard(&standard)?;
            let sheet = lookup_sheet(&sheet)?;
            let layout = layout_for_standard(standard, sheet, &config.layout_options(margin, gap, scale))?;
            print_json(&serde_json::json!({
                "layout": layout,
                "cells": layout.cells(),
                "cut_guides": layout.cut_guides(),
            }))?;
        }
        Commands::Sheet { photo, standard, sheet, output, no_guides, scale } => {
            let standard = lookup_standard(&standard)?;
            let sheet = lookup_sheet(&sheet)?;
            let photo = load_rgb(&photo)?;
            let layout = layout_for_standard(standard, sheet, &config.layout_options(None, None, scale))?;
            let style = SheetStyle { draw_guides: config.draw_guides && !no_guides, ..Default::default() };
            let rendered = render_sheet(&photo, &layout, &style)?;
            save(&rendered, &output)?;
            println!("{} photos ({}x{}) → {}", layout.total_photos, layout.columns, layout.rows, output.display());
        }
        Commands::Composite { image, mask, output, standard, color, nearest } => {
            let background = match (standard, color) {
                (Some(id), _) => lookup_standard(&id)?.background,
                (None, Some(hex)) => hex.parse::<HexColor>()?,
                (None, None) => HexColor::WHITE,
            };
            let source = load_rgb(&image)?;
            let mask_image = image::open(&mask)
                .with_context(|| format!("failed to open mask {}", mask.display()))?
                .to_luma8();
            let mask = Mask::from_luma(&mask_image)?;
            let mode = if nearest { Resampling::Nearest } else { config.resampling };
            let composited = replace_background(&source, &mask, background.to_rgb(), mode)?;
            save(&composited, &output)?;
            println!("background {background} → {}", output.display());
        }
        Commands::Process { input, standard, sheet, output_dir } => {
            let standard = lookup_standard(&standard)?;
            let sheet = lookup_sheet(&sheet)?;
            process(&config, &input, standard, sheet, &output_dir).await?;
        }
    }

    Ok(())
}

async fn process(
    config: &Config,
    input: &Path,
    standard: &Standard,
    sheet: &SheetSize,
    output_dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let source = load_rgb(input)?;
    let engine = PhotoEngine::from_model_dir(&config.model_dir, config.intra_threads);
    let options = PrepareOptions { dpi: sheet.dpi, resampling: config.resampling };
    let prepared = engine
        .prepare(source, standard, &options)
        .await
        .map_err(PhotoError::from)
        .context("photo preparation failed")?;

    let style = SheetStyle { draw_guides: config.draw_guides, ..Default::default() };
    let export = config.layout_options(None, None, 1.0);
    let composed = engine
        .compose_sheet(&prepared.photo, standard, sheet, &export, &style)
        .map_err(PhotoError::from)?;
    let preview = engine
        .compose_sheet(&prepared.photo, standard, sheet, &export.with_scale(config.preview_scale), &style)
        .map_err(PhotoError::from)?;

    save(&prepared.photo, &output_dir.join("photo.png"))?;
    save(&composed.sheet, &output_dir.join("sheet.png"))?;
    save(&preview.sheet, &output_dir.join("sheet-preview.png"))?;

    print_json(&serde_json::json!({
        "standard": standard.id,
        "sheet": sheet.id,
        "face": prepared.face,
        "source_compliance": prepared.report,
        "transform": prepared.transform,
        "layout": composed.layout,
    }))?;
    Ok(())
}

fn list_standards(json: bool) -> Result<()> {
    let registry = registry();
    if json {
        return print_json(&serde_json::json!({
            "standards": registry.standards(),
            "sheets": registry.sheets(),
        }));
    }

    println!("{:<10} {:<32} {:>11} {:>10} {:>9}  BACKGROUND", "ID", "NAME", "SIZE (mm)", "HEAD (%)", "EYES (%)");
    for s in registry.standards() {
        println!(
            "{:<10} {:<32} {:>11} {:>10} {:>9}  {}",
            s.id,
            s.name,
            format!("{}x{}", s.width_mm, s.height_mm),
            format!("{}-{}", s.head_height_min, s.head_height_max),
            s.eye_line_from_bottom,
            s.background
        );
    }
    println!();
    println!("{:<10} {:<32} {:>15} {:>5}", "SHEET", "NAME", "SIZE (mm)", "DPI");
    for s in registry.sheets() {
        println!(
            "{:<10} {:<32} {:>15} {:>5}",
            s.id,
            s.name,
            format!("{}x{}", s.width_mm, s.height_mm),
            s.dpi
        );
    }
    Ok(())
}

fn face_box(corners: [f64; 4], score: f64, image: (u32, u32)) -> Result<FaceBox> {
    let [xmin, ymin, xmax, ymax] = corners;
    Ok(FaceBox::new(xmin, ymin, xmax, ymax, score)?.clamped(image.0, image.1)?)
}

fn load_rgb(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    tracing::info!(path = %path.display(), width = img.width(), height = img.height(), "image loaded");
    Ok(img.to_rgb8())
}

fn save(image: &RgbImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "image written");
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_dims(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width in {s:?}"))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height in {s:?}"))?;
    if w == 0 || h == 0 {
        return Err(format!("dimensions must be positive, got {s:?}"));
    }
    Ok((w, h))
}

fn parse_face(s: &str) -> Result<[f64; 4], String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| format!("invalid number in face box {s:?}"))?;
    <[f64; 4]>::try_from(values).map_err(|_| format!("face box needs 4 values XMIN,YMIN,XMAX,YMAX, got {s:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dims() {
        assert_eq!(parse_dims("640x800"), Ok((640, 800)));
        assert_eq!(parse_dims("413X531"), Ok((413, 531)));
        assert!(parse_dims("640").is_err());
        assert!(parse_dims("0x10").is_err());
        assert!(parse_dims("ax10").is_err());
    }

    #[test]
    fn test_parse_face() {
        assert_eq!(parse_face("10,20.5,30,40"), Ok([10.0, 20.5, 30.0, 40.0]));
        assert!(parse_face("1,2,3").is_err());
        assert!(parse_face("1,2,3,x").is_err());
    }

    #[test]
    fn test_face_box_is_clamped() {
        let face = face_box([-10.0, 5.0, 700.0, 50.0], 0.9, (640, 480)).unwrap();
        assert_eq!((face.xmin, face.xmax), (0.0, 640.0));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "idphoto", "check", "--standard", "us", "--image", "600x600", "--face", "200,150,400,400",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Check { image: (600, 600), .. }));

        let cli = Cli::try_parse_from(["idphoto", "layout", "-s", "uk", "--sheet", "a4", "--scale", "0.5"]).unwrap();
        assert!(matches!(cli.command, Commands::Layout { scale, .. } if scale == 0.5));

        assert!(Cli::try_parse_from([
            "idphoto", "composite", "--image", "a.png", "--mask", "m.png", "-o", "o.png", "-s", "us", "--color", "#fff",
        ])
        .is_err());
    }
}
