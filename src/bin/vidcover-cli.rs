use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use vidcover::{
    FfmpegLogLevel, FfmpegProbe, ImageEncoding, MediaLocator, ProcessingOptions, ProgressCallback,
    ProgressInfo, SourceFile, StripOptions, StripWorker, VideoStore, format_duration,
    parse_timecode,
};

const CLI_AFTER_HELP: &str = "Examples:\n  vidcover process clips/ --out covers --progress\n  vidcover process a.mp4 b.mkv --json\n  vidcover cover a.mp4 --at 00:00:12 --out a-cover.png\n  vidcover strip a.mp4 --frames 10 --out strip\n  vidcover completions zsh > _vidcover";

#[derive(Debug, Parser)]
#[command(
    name = "vidcover",
    version,
    about = "Derive durations and cover thumbnails for batches of videos",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Let FFmpeg print informational output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar while processing.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Probe videos for duration and a default cover.
    #[command(
        about = "Probe videos and generate covers",
        after_help = "Examples:\n  vidcover process clips/ --out covers\n  vidcover process a.mp4 b.mp4 --concurrency 4 --offset 0.5 --json"
    )]
    Process {
        /// Video files or directories containing them.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory to write covers into.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Output results as machine-readable JSON.
        #[arg(long)]
        json: bool,
        /// Videos probed at once.
        #[arg(long, default_value_t = vidcover::DEFAULT_CONCURRENCY)]
        concurrency: usize,
        /// Where the default cover is taken (seconds or HH:MM:SS).
        #[arg(long)]
        offset: Option<String>,
        /// Cover format: png | jpeg.
        #[arg(long, default_value = "png")]
        format: String,
    },

    /// Capture a chosen frame as the cover of one video.
    #[command(
        about = "Pick a cover frame",
        after_help = "Examples:\n  vidcover cover a.mp4 --at 12 --out cover.png\n  vidcover cover a.mp4 --at 00:01:05.5 --out cover.jpg --format jpeg"
    )]
    Cover {
        input: PathBuf,
        /// Frame position (seconds or HH:MM:SS), clamped to the duration.
        #[arg(long)]
        at: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "png")]
        format: String,
    },

    /// Extract evenly spaced preview frames.
    #[command(about = "Extract a filmstrip")]
    Strip {
        input: PathBuf,
        #[arg(long, default_value_t = 10)]
        frames: u32,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 160)]
        width: u32,
        #[arg(long, default_value_t = 90)]
        height: u32,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_image_encoding(value: &str) -> Option<ImageEncoding> {
    match value.to_ascii_lowercase().as_str() {
        "png" => Some(ImageEncoding::Png),
        "jpeg" | "jpg" => Some(ImageEncoding::Jpeg),
        _ => None,
    }
}

fn warn(message: String) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            warn(format!("overwriting {}", path.display()));
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

/// Expand directories one level deep; files are kept as given.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| path.is_file())
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn file_stem(source: &SourceFile) -> String {
    source
        .path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.name.clone())
}

/// One cover path per source, in order. Sources sharing a stem keep their
/// own extension in the name, and any remaining clash gets a numeric suffix.
fn cover_paths(out: &Path, sources: &[&SourceFile], encoding: ImageEncoding) -> Vec<PathBuf> {
    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for source in sources {
        *stem_counts.entry(file_stem(source)).or_default() += 1;
    }

    let mut taken = HashSet::new();
    sources
        .iter()
        .map(|source| {
            let stem = file_stem(source);
            let base = match source.path.extension() {
                Some(extension) if stem_counts[&stem] > 1 => {
                    format!("{stem}.{}", extension.to_string_lossy())
                }
                _ => stem,
            };

            let mut name = base.clone();
            let mut suffix = 1;
            while !taken.insert(name.clone()) {
                suffix += 1;
                name = format!("{base}-{suffix}");
            }
            out.join(format!("{name}.{}", encoding.extension()))
        })
        .collect()
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let level = match &global.log_level {
        Some(level) => level.parse::<FfmpegLogLevel>()?,
        None if global.verbose => FfmpegLogLevel::Info,
        None => FfmpegLogLevel::Error,
    };
    vidcover::set_ffmpeg_log_level(level);
    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg} ({eta})")
        {
            bar.set_style(style);
        }
        Self { bar }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_length(info.total);
        self.bar.set_position(info.current);
        self.bar.set_message("videos processed");
        if info.current >= info.total {
            self.bar.finish();
        }
    }
}

async fn process(
    global: &GlobalOptions,
    inputs: Vec<PathBuf>,
    out: Option<PathBuf>,
    json: bool,
    options: ProcessingOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let encoding = options.encoding();
    let store = VideoStore::new(FfmpegProbe::new()?, options)?;

    for path in collect_inputs(&inputs)? {
        let file = match SourceFile::from_path(&path) {
            Ok(file) => file,
            Err(error) => {
                warn(format!("skipping {}: {error}", path.display()));
                continue;
            }
        };
        if let Err(error) = store.ingest(file) {
            warn(error.to_string());
        }
    }

    if store.is_empty() {
        return Err("no video files to process".into());
    }

    store.reconcile().await;
    let records = store.records();

    let sources: Vec<&SourceFile> = records.iter().map(|record| record.source()).collect();
    let paths = out
        .as_ref()
        .map(|out| cover_paths(out, &sources, encoding))
        .unwrap_or_default();

    if let Some(out) = &out {
        fs::create_dir_all(out)?;
        // Refuse before anything is written.
        for (record, path) in records.iter().zip(&paths) {
            if record.cover().is_some() {
                ensure_writable_path(path, global.overwrite)?;
            }
        }
        for (record, path) in records.iter().zip(&paths) {
            let Some(cover) = record.cover() else {
                warn(format!("no cover generated for {}", record.source().name));
                continue;
            };
            fs::write(path, cover.as_bytes())?;
        }
    }

    if json {
        let payload = json!({
            "total_duration_seconds": store.total_duration_seconds(),
            "total_duration": format_duration(store.total_duration_seconds()),
            "videos": records.iter().enumerate().map(|(index, record)| json!({
                "id": record.id().to_string(),
                "name": record.source().name,
                "media_type": record.source().media_type,
                "duration_seconds": record.duration_seconds(),
                "duration": format_duration(record.duration_seconds()),
                "cover_bytes": record.cover().map(|cover| cover.len()),
                "cover": paths
                    .get(index)
                    .filter(|_| record.cover().is_some())
                    .map(|path| path.display().to_string()),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for record in records.iter() {
            let cover = match record.cover() {
                Some(cover) => format!("{} bytes", cover.len()),
                None => "none".dimmed().to_string(),
            };
            println!(
                "{}  {}  cover: {}",
                format_duration(record.duration_seconds()),
                record.source().name,
                cover,
            );
        }
        println!(
            "{} {} in {} videos",
            "Total duration:".bold(),
            format_duration(store.total_duration_seconds()),
            records.len()
        );
    }

    Ok(())
}

async fn cover(
    global: &GlobalOptions,
    input: PathBuf,
    at: String,
    out: PathBuf,
    options: ProcessingOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let at = parse_timecode(&at)?;
    ensure_writable_path(&out, global.overwrite)?;

    let store = VideoStore::new(FfmpegProbe::new()?, options)?;
    let id = store.ingest(SourceFile::from_path(&input)?)?;
    store.reconcile().await;

    match store.capture_cover(id, at).await {
        Ok(image) => {
            fs::write(&out, image.as_bytes())?;
            eprintln!(
                "{} {}",
                "cover updated:".green().bold(),
                out.display()
            );
            Ok(())
        }
        Err(error) => {
            eprintln!("{}", "failed to capture cover, try another frame".red());
            Err(error.into())
        }
    }
}

async fn strip(
    global: &GlobalOptions,
    input: PathBuf,
    options: StripOptions,
    out: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    if out.exists() && !global.overwrite {
        return Err(format!(
            "output directory already exists: {} (use --overwrite)",
            out.display()
        )
        .into());
    }
    fs::create_dir_all(&out)?;

    let worker = StripWorker::spawn(Arc::new(FfmpegProbe::new()?));
    let frames = worker
        .request(MediaLocator::new(input.to_string_lossy()), options)
        .await?;

    for (index, frame) in frames.iter().enumerate() {
        frame.save(out.join(format!("strip_{index:03}.png")))?;
    }
    eprintln!("wrote {} frames to {}", frames.len(), out.display());
    Ok(())
}

fn base_options(
    global: &GlobalOptions,
    format: &str,
) -> Result<ProcessingOptions, Box<dyn std::error::Error>> {
    let encoding =
        parse_image_encoding(format).ok_or(format!("unsupported --format: {format}"))?;
    let mut options = ProcessingOptions::new().with_encoding(encoding);
    if global.progress {
        options = options.with_progress(Arc::new(TerminalProgress::new()));
    }
    Ok(options)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Commands::Process {
            inputs,
            out,
            json,
            concurrency,
            offset,
            format,
        } => {
            if concurrency == 0 {
                return Err("--concurrency must be greater than 0".into());
            }
            let mut options = base_options(&cli.global, &format)?.with_concurrency(concurrency);
            if let Some(offset) = offset {
                options = options.with_cover_offset(parse_timecode(&offset)?);
            }
            runtime.block_on(process(&cli.global, inputs, out, json, options))?;
        }
        Commands::Cover {
            input,
            at,
            out,
            format,
        } => {
            let options = base_options(&cli.global, &format)?;
            runtime.block_on(cover(&cli.global, input, at, out, options))?;
        }
        Commands::Strip {
            input,
            frames,
            out,
            width,
            height,
        } => {
            if frames == 0 {
                return Err("--frames must be greater than 0".into());
            }
            let options = StripOptions::new(frames).with_size(width, height);
            runtime.block_on(strip(&cli.global, input, options, out))?;
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "vidcover", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
