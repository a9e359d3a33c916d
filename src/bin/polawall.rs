use std::{
    fs::File,
    io::{BufRead as _, BufReader},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use polawall::{
    CaptionFont, Compositor, DirImageSource, ExportFormat, ExportOptions, ExportStyle, Photo,
    QualityTier, Viewport, WallConfig, WallView,
};

#[derive(Parser, Debug)]
#[command(name = "polawall", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a wall session and print the final card layout as JSON.
    Replay(ReplayArgs),
    /// Compose a photo list into one PNG/JPEG image.
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Initial photo list (JSON array).
    #[arg(long)]
    initial: PathBuf,

    /// Live events, one JSON object per line.
    #[arg(long)]
    events: Option<PathBuf>,

    /// Viewport size, e.g. `1920x1080`.
    #[arg(long, default_value = "1920x1080")]
    viewport: Viewport,

    /// Seed for placement jitter and rotation.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Wall configuration JSON (partial files fall back to defaults).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Photo list (JSON array), exported in list order.
    #[arg(long)]
    photos: PathBuf,

    /// Directory image references are resolved against.
    #[arg(long)]
    images: PathBuf,

    /// standard (2x), high (3x) or ultra (4x).
    #[arg(long, default_value = "standard")]
    quality: QualityTier,

    /// png or jpeg.
    #[arg(long, default_value = "png")]
    format: ExportFormat,

    /// Caption font (TTF/OTF). Defaults to the system sans-serif face.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Export style JSON (partial files fall back to defaults).
    #[arg(long)]
    style: Option<PathBuf>,

    /// Output directory.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Replay(args) => cmd_replay(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn read_photos(path: &Path) -> anyhow::Result<Vec<Photo>> {
    let f = File::open(path).with_context(|| format!("open photo list '{}'", path.display()))?;
    let photos = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse photo list '{}'", path.display()))?;
    Ok(photos)
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let cfg = match &args.config {
        Some(path) => WallConfig::from_json_file(path)?,
        None => WallConfig::default(),
    };
    let mut view = WallView::seeded(cfg, args.viewport, args.seed)?;
    view.load_initial(read_photos(&args.initial)?);

    if let Some(events) = &args.events {
        let f = File::open(events)
            .with_context(|| format!("open events '{}'", events.display()))?;
        for line in BufReader::new(f).split(b'\n') {
            let mut line = line.with_context(|| format!("read events '{}'", events.display()))?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            view.live_event_bytes(&line);
        }
        let stats = view.live_stats();
        eprintln!(
            "events: {} added, {} duplicate, {} dropped, {} evicted, \
             {} removed, {} ignored, {} malformed",
            stats.added,
            stats.duplicates,
            stats.dropped,
            stats.evicted,
            stats.removed,
            stats.ignored_removals,
            stats.malformed
        );
    }

    let out = serde_json::json!({
        "scale": view.wall().scale(),
        "rows": view.wall().grid().rows,
        "cols": view.wall().grid().cols,
        "cards": view.cards(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let photos = read_photos(&args.photos)?;
    let style = match &args.style {
        Some(path) => ExportStyle::from_json_file(path)?,
        None => ExportStyle::default(),
    };
    let mut compositor = Compositor::new(style)?;
    if let Some(font) = &args.font {
        compositor = compositor.with_font(CaptionFont::from_file(font)?);
    }

    let source = DirImageSource::new(&args.images);
    let opts = ExportOptions::new(args.quality, args.format);
    let artifact = compositor.export(&photos, &source, opts, chrono::Utc::now())?;
    let path = artifact.write_to_dir(&args.out_dir)?;

    eprintln!(
        "wrote {} ({}x{}, {} missing images)",
        path.display(),
        artifact.width,
        artifact.height,
        artifact.missing_images
    );
    Ok(())
}
