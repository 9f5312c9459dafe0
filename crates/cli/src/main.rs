use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use face_extract_core::detection::infrastructure::analyzer_factory::create_analyzer;
use face_extract_core::matching::domain::reference_set::ReferenceSet;
use face_extract_core::pipeline::extract_faces_use_case::{
    ExtractFacesUseCase, FootageSource, ProgressFn,
};
use face_extract_core::pipeline::extraction_config::{ExtractionConfig, InputMode};
use face_extract_core::pipeline::run_statistics::describe_faces;
use face_extract_core::pipeline::save_faces_use_case::SaveFacesUseCase;
use face_extract_core::shared::constants::{
    DEFAULT_DETECTION_CONFIDENCE, DEFAULT_PREFIX, DEFAULT_SUBFOLDER, IMAGE_EXTENSIONS,
};
use face_extract_core::shared::device::Device;
use face_extract_core::video::domain::video_reader::VideoReader;
use face_extract_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use face_extract_core::video::infrastructure::image_file_reader::{load_images, ImageFileReader};
use face_extract_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Extract faces matching reference photos from images or a video.
#[derive(Parser)]
#[command(name = "face-extract")]
struct Cli {
    /// Reference images of the person to extract.
    #[arg(long, num_args = 1.., required = true)]
    reference: Vec<PathBuf>,

    /// Input images or directories of images (images mode).
    #[arg(long, num_args = 1.., conflicts_with = "video")]
    images: Option<Vec<PathBuf>>,

    /// Input video file (video_file mode).
    #[arg(long)]
    video: Option<PathBuf>,

    /// Minimum cosine similarity to a reference (0.0-1.0).
    #[arg(long)]
    threshold: Option<f64>,

    /// Minimum face width and height in pixels (32-512).
    #[arg(long)]
    min_face_size: Option<u32>,

    /// Crop padding as a fraction of the face size (0.0-1.0).
    #[arg(long)]
    padding: Option<f64>,

    /// Process every Nth frame (1-30).
    #[arg(long)]
    sample_every: Option<usize>,

    /// Stop after this many processed frames (0 = no limit).
    #[arg(long)]
    max_frames: Option<usize>,

    /// Inference device: cpu or gpu.
    #[arg(long)]
    device: Option<Device>,

    /// JSON file with extraction settings; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output base directory.
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Subfolder of the output directory for this run.
    #[arg(long, default_value = DEFAULT_SUBFOLDER)]
    subfolder: String,

    /// File name prefix for saved faces and masks.
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Print face count and average size after saving.
    #[arg(long)]
    stats: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let mut analyzer = create_analyzer(
        config.device,
        DEFAULT_DETECTION_CONFIDENCE,
        None,
        Some(download_progress),
    )?;

    let reference_images = load_images(&cli.reference)?;
    let references = ReferenceSet::build(&reference_images, analyzer.as_mut())?;
    log::info!(
        "Using {} reference face(s) from {} image(s)",
        references.len(),
        reference_images.len()
    );

    let source = build_source(&cli, config.input_mode)?;
    let progress: ProgressFn = Box::new(|current, total| {
        eprint!("\rScanning frame {current}/{total}");
        true
    });

    let mut use_case = ExtractFacesUseCase::new(analyzer, references, config, Some(progress));
    let output = use_case.execute(source)?;
    eprintln!();
    println!("{}", output.summary);

    let save = SaveFacesUseCase::new(Box::new(ImageFileWriter::new()));
    let report = save.execute(
        &output.faces,
        &output.masks,
        &cli.output,
        &cli.subfolder,
        &cli.prefix,
    )?;
    println!("{report}");

    if cli.stats {
        println!("{}", describe_faces(&output.summary, &output.faces));
    }
    Ok(())
}

/// Config file (or defaults) with any command-line overrides applied.
fn build_config(cli: &Cli) -> Result<ExtractionConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ExtractionConfig::load(path)?,
        None => ExtractionConfig::default(),
    };

    if let Some(threshold) = cli.threshold {
        config.similarity_threshold = threshold;
    }
    if let Some(size) = cli.min_face_size {
        config.min_face_size = size;
    }
    if let Some(padding) = cli.padding {
        config.padding = padding;
    }
    if let Some(stride) = cli.sample_every {
        config.sample_every_n_frames = stride;
    }
    if let Some(max_frames) = cli.max_frames {
        config.max_frames = max_frames;
    }
    if let Some(device) = cli.device {
        config.device = device;
    }
    if cli.video.is_some() {
        config.input_mode = InputMode::VideoFile;
    } else if cli.images.is_some() {
        config.input_mode = InputMode::Images;
    }

    config.validate()?;
    Ok(config)
}

fn build_source(
    cli: &Cli,
    mode: InputMode,
) -> Result<FootageSource, Box<dyn std::error::Error>> {
    match mode {
        InputMode::Images => {
            let paths = expand_image_paths(cli.images.as_deref().unwrap_or_default())?;
            Ok(FootageSource::Images(load_images(&paths)?))
        }
        InputMode::VideoFile => {
            let path = cli
                .video
                .clone()
                .ok_or("--video is required in video_file mode")?;
            Ok(FootageSource::Video {
                reader: open_reader(&path),
                path,
            })
        }
    }
}

/// Replaces each directory with the image files directly inside it, sorted
/// by name.
fn expand_image_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut expanded = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_image(p))
                .collect();
            entries.sort();
            expanded.extend(entries);
        } else {
            expanded.push(path.clone());
        }
    }
    Ok(expanded)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn open_reader(input: &Path) -> Box<dyn VideoReader> {
    if is_image(input) {
        Box::new(ImageFileReader::new())
    } else {
        Box::new(FfmpegReader::new())
    }
}

fn download_progress(model: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {model}... {pct}%");
    } else {
        eprint!("\rDownloading {model}... {downloaded} bytes");
    }
}
