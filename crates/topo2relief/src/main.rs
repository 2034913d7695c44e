use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use image::imageops::FilterType;
use image::RgbImage;
use log::{debug, info};
use std::path::{Path, PathBuf};

use relief::colormap::{ColorRamp, RampOptions};
use relief::config::PlanetConfig;
use relief::mesh::ReliefMesh;
use relief::nearest::Metric;
use relief::pipeline::{
    reconstruct_cylindrical, reconstruct_hemispheres, HemisphereOptions, PipelineObserver,
};
use relief::raster::{median_blur3, GrayRaster, Raster, RgbRaster};
use relief::resample::HeightSample;
use relief::sphere::SphereMesh;

/// How to interpret the source topographic raster.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceKind {
    /// Decide from the image: grayscale -> cylindrical, color -> hemispheres.
    Auto,
    /// RGB sheet with two orthographic hemisphere photographs and a legend.
    Hemispheres,
    /// Equirectangular grayscale raster; intensity encodes elevation.
    Cylindrical,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceKind::Auto => "auto",
            SourceKind::Hemispheres => "hemispheres",
            SourceKind::Cylindrical => "cylindrical",
        };

        f.write_str(s)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "topo2relief", version)]
struct Args {
    /// Planet configuration file (flat `key = value` pairs).
    #[arg(long)]
    config: String,

    /// Directory holding the source rasters the config names.
    #[arg(long, default_value = "images")]
    image_dir: String,

    /// Directory receiving the .rmsh mesh artifact.
    #[arg(long, default_value = "meshes")]
    output_dir: String,

    #[arg(long, value_enum, default_value_t = SourceKind::Auto)]
    source: SourceKind,

    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Distance metric for ramp matching (l1|l2|mse|mae).
    #[arg(long, default_value = "l2")]
    metric: String,

    /// Per-channel HSV metric weights.
    #[arg(long, default_value = "4,1,2")]
    weights: String,

    /// Legend strip region in full-resolution pixels: "x,y,w,h".
    #[arg(long, default_value = "654,2296,2682,97")]
    legend_rect: String,

    /// West hemisphere photograph region: "x,y,w,h".
    #[arg(long, default_value = "13,151,1962,1960")]
    west_rect: String,

    /// East hemisphere photograph region: "x,y,w,h".
    #[arg(long, default_value = "2027,151,1962,1960")]
    east_rect: String,

    /// Legend segment width in pixels.
    #[arg(long, default_value_t = 9)]
    segment_width: usize,

    /// All-channels-above threshold marking a legend divider tick.
    #[arg(long, default_value_t = 245)]
    divider_threshold: u8,

    /// Excision window width around a divider tick.
    #[arg(long, default_value_t = 5)]
    divider_window: usize,

    /// Interpolated colors inserted per ramp control-point gap.
    #[arg(long, default_value_t = 10)]
    densify: usize,
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

impl Rect {
    /// Divide all extents by the same factor the image was resized by,
    /// rounding to the nearest pixel so fractional factors keep the crops
    /// aligned with the resized content.
    fn scaled_down(self, factor: f64) -> Rect {
        let f = factor.max(1.0);
        let s = |v: u32| (v as f64 / f).round() as u32;
        Rect {
            x: s(self.x),
            y: s(self.y),
            w: s(self.w),
            h: s(self.h),
        }
    }
}

fn parse_rect(arg: &str) -> Result<Rect> {
    let parts: Vec<u32> = arg
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("rect {:?} is not four integers", arg))?;

    anyhow::ensure!(parts.len() == 4, "rect {:?} must be \"x,y,w,h\"", arg);
    Ok(Rect {
        x: parts[0],
        y: parts[1],
        w: parts[2],
        h: parts[3],
    })
}

fn parse_weights(arg: &str) -> Result<[f64; 3]> {
    let parts: Vec<f64> = arg
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("weights {:?} are not three numbers", arg))?;

    anyhow::ensure!(parts.len() == 3, "weights {:?} must have three entries", arg);
    Ok([parts[0], parts[1], parts[2]])
}

/// Row-major copy out of an `image` buffer into the pipeline's raster type.
fn rgb_raster(img: &RgbImage) -> Result<RgbRaster> {
    let pixels = img.pixels().map(|p| p.0).collect();
    Raster::new(img.width() as usize, img.height() as usize, pixels)
        .context("building RGB raster")
}

fn gray_raster(img: &image::GrayImage) -> Result<GrayRaster> {
    let pixels = img.pixels().map(|p| p.0[0]).collect();
    Raster::new(img.width() as usize, img.height() as usize, pixels)
        .context("building grayscale raster")
}

/// One row of pixels across the vertical middle of the legend region.
fn legend_strip(img: &RgbImage, rect: Rect) -> Vec<[u8; 3]> {
    let y = (rect.y + rect.h / 2).min(img.height().saturating_sub(1));
    let x_end = (rect.x + rect.w).min(img.width());

    (rect.x..x_end).map(|x| img.get_pixel(x, y).0).collect()
}

/// Logs intermediate pipeline results; the headless stand-in for the old
/// inline diagnostic plots.
struct LogObserver;

impl PipelineObserver for LogObserver {
    fn ramp_extracted(&mut self, ramp: &ColorRamp) {
        debug!("ramp: {} entries in {:?} space", ramp.len(), ramp.space);
    }

    fn samples_ready(&mut self, samples: &[HeightSample]) {
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for s in samples {
            lo = lo.min(s.elevation);
            hi = hi.max(s.elevation);
        }
        debug!("samples: {} points, elevation [{:.1}, {:.1}]", samples.len(), lo, hi);
    }

    fn mesh_resampled(&mut self, mesh: &SphereMesh) {
        debug!("mesh: {} vertices, {} triangles", mesh.vertex_count(), mesh.triangles.len());
    }
}

fn detect_source(img: &image::DynamicImage) -> SourceKind {
    use image::ColorType::*;
    match img.color() {
        L8 | L16 | La8 | La16 => SourceKind::Cylindrical,
        _ => SourceKind::Hemispheres,
    }
}

fn run_hemispheres(
    args: &Args,
    cfg: &PlanetConfig,
    img: &image::DynamicImage,
) -> Result<SphereMesh> {
    let full = img.to_rgb8();

    // Legend comes from the full-resolution sheet; the hemisphere crops are
    // classified at downsampled resolution to bound the sample count.
    let strip = legend_strip(&full, parse_rect(&args.legend_rect)?);
    anyhow::ensure!(!strip.is_empty(), "legend rect lies outside the image");

    let sf = cfg.downsample.max(1.0);
    let (w, h) = (
        ((full.width() as f64 / sf) as u32).max(1),
        ((full.height() as f64 / sf) as u32).max(1),
    );
    debug!("downsampling {}x{} -> {}x{}", full.width(), full.height(), w, h);
    let small = image::imageops::resize(&full, w, h, FilterType::Triangle);
    drop(full);

    // A light median pass knocks out scan speckle before classification.
    let small = median_blur3(&rgb_raster(&small)?);
    let west_r = parse_rect(&args.west_rect)?.scaled_down(sf);
    let east_r = parse_rect(&args.east_rect)?.scaled_down(sf);

    let west = small.box_region(
        west_r.x as usize,
        west_r.y as usize,
        west_r.w as usize,
        west_r.h as usize,
    );
    let east = small.box_region(
        east_r.x as usize,
        east_r.y as usize,
        east_r.w as usize,
        east_r.h as usize,
    );
    drop(small);

    let opts = HemisphereOptions {
        ramp: RampOptions {
            segment_width: args.segment_width,
            divider_threshold: args.divider_threshold,
            divider_window: args.divider_window,
        },
        densify: args.densify,
        metric: args
            .metric
            .parse::<Metric>()
            .context("selecting ramp metric")?,
        weights: parse_weights(&args.weights)?,
        ..HemisphereOptions::default()
    };

    Ok(reconstruct_hemispheres(
        cfg,
        &strip,
        &west,
        &east,
        &opts,
        &mut LogObserver,
    )?)
}

fn run_cylindrical(cfg: &PlanetConfig, img: &image::DynamicImage) -> Result<SphereMesh> {
    let full = img.to_luma8();

    let sf = cfg.downsample.max(1.0);
    let (w, h) = (
        ((full.width() as f64 / sf) as u32).max(1),
        ((full.height() as f64 / sf) as u32).max(1),
    );
    debug!("downsampling {}x{} -> {}x{}", full.width(), full.height(), w, h);
    let small = image::imageops::resize(&full, w, h, FilterType::Triangle);
    drop(full);

    let gray = gray_raster(&small)?;
    Ok(reconstruct_cylindrical(cfg, &gray, &mut LogObserver)?)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let cfg = PlanetConfig::from_file(&args.config)
        .with_context(|| format!("reading planet config {}", args.config))?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir))?;
    let out_path: PathBuf = Path::new(&args.output_dir).join(&cfg.mesh);

    if out_path.exists() && !args.overwrite {
        debug!("skipping existing artifact: {}", out_path.display());
        return Ok(());
    }

    let topo_path = Path::new(&args.image_dir).join(&cfg.topo);
    info!("processing {} -> {}", topo_path.display(), out_path.display());

    let img = image::open(&topo_path)
        .with_context(|| format!("opening topographic image {}", topo_path.display()))?;

    let kind = match args.source {
        SourceKind::Auto => {
            let guess = detect_source(&img);
            info!("source kind (auto-detected): {guess}");
            guess
        }
        forced => {
            info!("source kind (forced): {forced}");
            forced
        }
    };

    let mesh = match kind {
        SourceKind::Hemispheres => run_hemispheres(&args, &cfg, &img)?,
        SourceKind::Cylindrical => run_cylindrical(&cfg, &img)?,
        SourceKind::Auto => unreachable!(),
    };

    relief::mesh::write_file(&out_path, &ReliefMesh::from(&mesh))
        .with_context(|| format!("writing {}", out_path.display()))?;

    info!(
        "OK {} -> {} ({} vertices, radius {:.1})",
        topo_path.display(),
        out_path.display(),
        mesh.vertex_count(),
        mesh.radius
    );

    Ok(())
}
