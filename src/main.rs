use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::{DynamicImage, GenericImageView};
use log::info;
use passfit::{config, detections, report};
use passfit_vision::{DetectorSession, Pipeline, StaticDetector};

#[derive(Parser)]
#[command(name = "passfit")]
#[command(
    version,
    about = "Check identity photos against geometric standards and crop them to size"
)]
struct Cli {
    /// Config file (defaults to the per-user config path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a photo and print the compliance report
    Check {
        image: PathBuf,
        /// Detection sidecar (defaults to <image>.faces.json)
        #[arg(short, long)]
        faces: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a photo and write the normalized square crop
    Crop {
        image: PathBuf,
        /// Detection sidecar (defaults to <image>.faces.json)
        #[arg(short, long)]
        faces: Option<PathBuf>,
        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
        /// Crop even if some checks fail
        #[arg(long)]
        force: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective config, or create/edit the config file
    Config {
        /// Write the default config if none exists
        #[arg(long)]
        init: bool,
        /// Open the config file in $EDITOR
        #[arg(long)]
        edit: bool,
    },
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let cfg = config::load_config(config_path)?;

    match cli.command {
        Commands::Check { image, faces, json } => check(&cfg, &image, faces, json),
        Commands::Crop {
            image,
            faces,
            output,
            force,
            json,
        } => crop(&cfg, &image, faces, &output, force, json),
        Commands::Config { init, edit } => open_config(&cfg, config_path, init, edit),
    }
}

fn open_pipeline(
    cfg: &config::Config,
    image_path: &Path,
    faces: Option<PathBuf>,
) -> Result<(DynamicImage, Pipeline<StaticDetector>)> {
    let img = image::open(image_path)
        .with_context(|| format!("Failed to open image {}", image_path.display()))?;
    let (width, height) = img.dimensions();

    let faces_path = faces.unwrap_or_else(|| detections::sidecar_path(image_path));
    let faces = detections::load_detections(&faces_path, width, height)
        .context("Failed to load face detections")?;
    info!("Loaded {} detection(s) from {}", faces.len(), faces_path.display());

    let session =
        DetectorSession::open(StaticDetector::new(faces)).with_filter(cfg.detection_filter());
    let pipeline = Pipeline::new(session, cfg.standard)
        .context("Failed to initialize photo pipeline")?;
    Ok((img, pipeline))
}

fn check(cfg: &config::Config, image: &Path, faces: Option<PathBuf>, json: bool) -> Result<()> {
    let (img, mut pipeline) = open_pipeline(cfg, image, faces)?;
    let result = pipeline.evaluate(&img)?;
    pipeline.session.close();

    if json {
        let report = report::Report {
            image,
            standard: &cfg.standard,
            result: &result,
            output: None,
        };
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report::render_text(image, &result));
    }

    if !result.passed {
        anyhow::bail!("Photo does not meet the standard");
    }
    Ok(())
}

fn crop(
    cfg: &config::Config,
    image: &Path,
    faces: Option<PathBuf>,
    output: &Path,
    force: bool,
    json: bool,
) -> Result<()> {
    let (img, mut pipeline) = open_pipeline(cfg, image, faces)?;
    let outcome = if force {
        pipeline.process_forced(&img)?
    } else {
        pipeline.process(&img)?
    };
    pipeline.session.close();

    if let Some(normalized) = &outcome.normalized {
        normalized
            .save(output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }

    if json {
        let report = report::Report {
            image,
            standard: &cfg.standard,
            result: &outcome.result,
            output: outcome.normalized.as_ref().map(|_| output),
        };
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report::render_text(image, &outcome.result));
    }

    let Some(normalized) = outcome.normalized else {
        anyhow::bail!("Photo does not meet the standard, no crop written (use --force to override)");
    };

    info!(
        "✓ Wrote {}x{} photo ({:.1}in at {} dpi) to {}",
        normalized.width(),
        normalized.height(),
        cfg.standard.print_inches(),
        cfg.standard.dpi,
        output.display()
    );
    Ok(())
}

fn open_config(cfg: &config::Config, path: Option<&Path>, init: bool, edit: bool) -> Result<()> {
    let config_path = path.unwrap_or(config::CONFIG_PATH.as_path());

    if init {
        if config_path.exists() {
            info!("Config already exists at {}", config_path.display());
        } else {
            config::save_config(&config::Config::default(), Some(config_path))?;
            info!("✓ Wrote default config to {}", config_path.display());
        }
    }

    if !edit {
        print!("{}", toml::to_string_pretty(cfg)?);
        return Ok(());
    }

    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    info!("Opening config file: {}", config_path.display());

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
