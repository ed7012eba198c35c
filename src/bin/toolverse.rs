//! CLI binary for toolverse.
//!
//! Each subcommand is one tool form: its flags are the form fields and its
//! output (stdout or a file) is the rendered result.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use toolverse::generation::audio::PcmWriter;
use toolverse::{
    AspectRatio, CompressionLevel, ConversionRequest, ConversionResult, Converter, Delivered, DisplayStrategy,
    Genre, Language, NotesStore, Platform, Playback, ProgressCallback, Session, Sink, SpeechClip,
    StepProgressCallback, StoryBrief, SummaryDetail, Tone, ToolId, Tools, ToolverseConfig, ToolverseError,
    UploadedFile, Voice,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while the source is opened, then a bar over pages or pictures.
struct CliProgressCallback {
    bar: ProgressBar,
    unit: &'static str,
}

impl CliProgressCallback {
    fn new(unit: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening file…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar, unit })
    }
}

impl StepProgressCallback for CliProgressCallback {
    fn on_start(&self, total_steps: usize) {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {}  ⏱ {{elapsed_precise}}",
            self.unit
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_steps as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Compressing");
    }

    fn on_step_start(&self, step: usize, _total_steps: usize) {
        self.bar.set_message(format!("{} {step}", self.unit));
    }

    fn on_step_complete(&self, _step: usize, _total_steps: usize, _bytes: usize) {
        self.bar.inc(1);
    }

    fn on_complete(&self, total_steps: usize, output_bytes: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} {} processed  {}",
            green("✔"),
            bold(&total_steps.to_string()),
            self.unit,
            dim(&format!("{output_bytes} bytes"))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise a PDF as bullet points
  toolverse summarize report.pdf --detail bullets

  # Extract a PDF to Markdown / CSV
  toolverse pdf-to-word report.pdf -o report.md
  toolverse pdf-to-excel invoice.pdf

  # Word / Excel → PDF: preview first, then finalise from a snapshot
  toolverse word-to-pdf cv.docx
  toolverse word-to-pdf cv.docx --snapshot cv-preview.png -o cv.pdf

  # Local conversions (no API key needed)
  toolverse image-to-pdf scan.jpg
  toolverse pdf-to-image slides.pdf --page 3 --scale 2
  toolverse compress deck.pptx --level medium
  toolverse compress-image photo.png --level low

  # Writing tools
  toolverse resume --data @me.txt --job @job.txt --cover-letter
  toolverse captions --image beach.jpg --platform linkedin --tone professional
  toolverse story --topic space --character Luna --genre sci-fi --read-aloud --voice puck
  toolverse homework --image problem.jpg
  toolverse budget "Income 3000, rent 1200, food 400"
  toolverse image "a lighthouse at dusk" --aspect-ratio 16:9

  # Notes
  toolverse notes add "Call the bank"
  toolverse notes list
  toolverse notes delete 1

COMPRESSION LEVELS:
  Level    JPEG quality  Raster scale
  ───────  ────────────  ────────────
  high     0.8           2.0
  medium   0.6           1.5
  low      0.3           1.0

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY            Gemini API key (API_KEY is also accepted)
  TOOLVERSE_ENDPOINT        Override the Gemini REST endpoint
  TOOLVERSE_TEXT_MODEL      Model for summaries, extraction and writing tools
  TOOLVERSE_REASONING_MODEL Model for the homework solver
  TOOLVERSE_IMAGE_MODEL     Model for image generation
  TOOLVERSE_SPEECH_MODEL    Model for read-aloud
  TOOLVERSE_NOTES           Path of the notes store
  TOOLVERSE_RASTER_SCALE    Default magnification for pdf-to-image
  PDFIUM_LIB_PATH           Directory containing libpdfium

Text flags accept @path to read the value from a file.
"#;

/// Document conversion, compression and AI writing tools.
#[derive(Parser, Debug)]
#[command(
    name = "toolverse",
    version,
    about = "Document conversion, compression and AI writing tools",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Write the result to this file instead of stdout / the suggested name.
    #[arg(short, long, global = true, env = "TOOLVERSE_OUTPUT")]
    output: Option<PathBuf>,

    /// Gemini API key.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini REST endpoint.
    #[arg(long, global = true, env = "TOOLVERSE_ENDPOINT")]
    endpoint: Option<String>,

    #[arg(long, global = true, env = "TOOLVERSE_TEXT_MODEL")]
    text_model: Option<String>,

    #[arg(long, global = true, env = "TOOLVERSE_REASONING_MODEL")]
    reasoning_model: Option<String>,

    #[arg(long, global = true, env = "TOOLVERSE_IMAGE_MODEL")]
    image_model: Option<String>,

    #[arg(long, global = true, env = "TOOLVERSE_SPEECH_MODEL")]
    speech_model: Option<String>,

    /// Directory containing libpdfium.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Print a JSON description of the result instead of the result itself.
    #[arg(long, global = true, env = "TOOLVERSE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "TOOLVERSE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "TOOLVERSE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "TOOLVERSE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarise a PDF.
    Summarize {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "short")]
        detail: DetailArg,
    },
    /// Extract a PDF to Markdown.
    PdfToWord { file: PathBuf },
    /// Extract tables from a PDF to CSV.
    PdfToExcel { file: PathBuf },
    /// Preview a .docx as HTML, or finalise it to PDF from a snapshot.
    WordToPdf(PreviewArgs),
    /// Preview the first sheet of a .xlsx as HTML, or finalise it to PDF.
    ExcelToPdf(PreviewArgs),
    /// Put an image on an A4-wide PDF page.
    ImageToPdf { file: PathBuf },
    /// Render one PDF page to PNG.
    PdfToImage {
        file: PathBuf,
        /// 1-indexed page number.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        /// Magnification (0.25–8.0). Default 2.0.
        #[arg(long, env = "TOOLVERSE_RASTER_SCALE")]
        scale: Option<f32>,
    },
    /// Compress a PDF, an Office document or an image.
    Compress {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "medium")]
        level: LevelArg,
    },
    /// Re-encode an image as JPEG.
    CompressImage {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "medium")]
        level: LevelArg,
    },
    /// Write a resume (and optionally a cover letter).
    Resume {
        /// Your details: experience, education, skills.
        #[arg(long)]
        data: String,
        /// Target job description.
        #[arg(long)]
        job: Option<String>,
        /// Write a cover letter instead of a resume.
        #[arg(long)]
        cover_letter: bool,
    },
    /// Five social media captions.
    Captions {
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long, default_value_t = Platform::default())]
        platform: Platform,
        #[arg(long, default_value_t = Tone::default())]
        tone: Tone,
    },
    /// A children's story, optionally read aloud.
    Story {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        character: String,
        #[arg(long, default_value = "5")]
        age: String,
        #[arg(long, default_value_t = Genre::default())]
        genre: Genre,
        #[arg(long)]
        moral: Option<String>,
        #[arg(long, default_value_t = Language::default())]
        language: Language,
        /// Also synthesise speech for the story.
        #[arg(long)]
        read_aloud: bool,
        #[command(flatten)]
        speech: SpeechArgs,
    },
    /// Read text aloud.
    Speak {
        text: String,
        #[command(flatten)]
        speech: SpeechArgs,
    },
    /// Step-by-step homework help.
    Homework {
        #[arg(long, default_value = "")]
        question: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// A monthly budget plan from your income and expenses.
    Budget { data: String },
    /// Generate an image.
    Image {
        prompt: String,
        #[arg(long, default_value_t = AspectRatio::default())]
        aspect_ratio: AspectRatio,
    },
    /// Personal notes.
    Notes {
        #[arg(long, env = "TOOLVERSE_NOTES", default_value = "toolverse-notes.json")]
        store: PathBuf,
        #[command(subcommand)]
        action: NotesAction,
    },
}

#[derive(Args, Debug)]
struct PreviewArgs {
    file: PathBuf,
    /// Image of the rendered preview; produces the final PDF.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SpeechArgs {
    #[arg(long, default_value_t = Voice::default())]
    voice: Voice,
    /// Stream raw s16le 24 kHz PCM to stdout (e.g. `| aplay -f S16_LE -r 24000`)
    /// instead of writing a WAV file. Ctrl-C stops playback.
    #[arg(long)]
    play: bool,
}

#[derive(Subcommand, Debug)]
enum NotesAction {
    List,
    Add { text: String },
    /// Delete by 1-indexed position as shown by `list`.
    Delete { number: usize },
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum DetailArg {
    Bullets,
    Short,
    Detailed,
}

impl From<DetailArg> for SummaryDetail {
    fn from(v: DetailArg) -> Self {
        match v {
            DetailArg::Bullets => SummaryDetail::Bullets,
            DetailArg::Short => SummaryDetail::Short,
            DetailArg::Detailed => SummaryDetail::Detailed,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LevelArg {
    Low,
    Medium,
    High,
}

impl From<LevelArg> for CompressionLevel {
    fn from(v: LevelArg) -> Self {
        match v {
            LevelArg::Low => CompressionLevel::Low,
            LevelArg::Medium => CompressionLevel::Medium,
            LevelArg::High => CompressionLevel::High,
        }
    }
}

impl Command {
    fn tool(&self) -> ToolId {
        match self {
            Command::Summarize { .. }
            | Command::PdfToWord { .. }
            | Command::PdfToExcel { .. }
            | Command::WordToPdf(_)
            | Command::ExcelToPdf(_)
            | Command::ImageToPdf { .. }
            | Command::PdfToImage { .. }
            | Command::Compress { .. }
            | Command::CompressImage { .. } => ToolId::PdfTools,
            Command::Resume { .. } => ToolId::ResumeMaker,
            Command::Captions { .. } => ToolId::CaptionGenerator,
            Command::Story { .. } | Command::Speak { .. } => ToolId::KidsStoryMaker,
            Command::Homework { .. } => ToolId::HomeworkSolver,
            Command::Budget { .. } => ToolId::BudgetPlanner,
            Command::Image { .. } => ToolId::ImageGenerator,
            Command::Notes { .. } => ToolId::Notes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Run the tool ─────────────────────────────────────────────────────
    let tool = cli.command.tool();
    let mut session = Session::new();
    session.select(tool);
    let ticket = session.begin(tool)?;
    let start = Instant::now();
    let outcome = run(&cli, &config).await;

    match session.settle(ticket, outcome) {
        Some(Ok(())) => {
            if !cli.quiet && !cli.json {
                eprintln!("{}", dim(&format!("{} · {}ms", tool, start.elapsed().as_millis())));
            }
            Ok(())
        }
        Some(Err(err)) => {
            if let Some(e) = err.downcast_ref::<ToolverseError>() {
                eprintln!("{} {}", red("✘"), e.user_message());
            }
            Err(err)
        }
        None => bail!("{tool} result was discarded"),
    }
}

/// Map CLI args to `ToolverseConfig`.
fn build_config(cli: &Cli) -> Result<ToolverseConfig> {
    let mut builder = ToolverseConfig::builder();
    if let Some(key) = cli.api_key.clone().or_else(|| std::env::var("API_KEY").ok()) {
        builder = builder.api_key(key);
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(ref m) = cli.text_model {
        builder = builder.text_model(m);
    }
    if let Some(ref m) = cli.reasoning_model {
        builder = builder.reasoning_model(m);
    }
    if let Some(ref m) = cli.image_model {
        builder = builder.image_model(m);
    }
    if let Some(ref m) = cli.speech_model {
        builder = builder.speech_model(m);
    }
    if let Command::PdfToImage { scale: Some(scale), .. } = cli.command {
        builder = builder.raster_scale(scale);
    }
    if let Some(ref p) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(p);
    }
    builder.build().context("Invalid configuration")
}

async fn run(cli: &Cli, config: &ToolverseConfig) -> Result<()> {
    let sink = Sink::new(cli.output.clone());
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;

    match &cli.command {
        Command::Summarize { file, detail } => {
            let file = read(file).await?;
            let req = ConversionRequest::Summarize {
                file,
                detail: detail.clone().into(),
            };
            convert(cli, config, &sink, req, None).await
        }
        Command::PdfToWord { file } => {
            let req = ConversionRequest::PdfToWord { file: read(file).await? };
            convert(cli, config, &sink, req, None).await
        }
        Command::PdfToExcel { file } => {
            let req = ConversionRequest::PdfToExcel { file: read(file).await? };
            convert(cli, config, &sink, req, None).await
        }
        Command::WordToPdf(args) => {
            let req = ConversionRequest::WordToPdf { file: read(&args.file).await? };
            preview_or_finalize(cli, config, &sink, req, args.snapshot.as_deref()).await
        }
        Command::ExcelToPdf(args) => {
            let req = ConversionRequest::ExcelToPdf { file: read(&args.file).await? };
            preview_or_finalize(cli, config, &sink, req, args.snapshot.as_deref()).await
        }
        Command::ImageToPdf { file } => {
            let req = ConversionRequest::ImageToPdf { file: read(file).await? };
            convert(cli, config, &sink, req, None).await
        }
        Command::PdfToImage { file, page, scale } => {
            let req = ConversionRequest::PdfToImage {
                file: read(file).await?,
                page: *page as usize,
                scale: scale.unwrap_or(config.raster_scale),
            };
            convert(cli, config, &sink, req, None).await
        }
        Command::Compress { file, level } => {
            let file = read(file).await?;
            let unit = if file.kind() == toolverse::pipeline::detect::FileKind::Pdf {
                "pages"
            } else {
                "pictures"
            };
            let progress: Option<ProgressCallback> = show_progress.then(|| CliProgressCallback::new(unit) as ProgressCallback);
            let req = ConversionRequest::CompressFile {
                file,
                level: level.clone().into(),
            };
            convert(cli, config, &sink, req, progress).await
        }
        Command::CompressImage { file, level } => {
            let req = ConversionRequest::CompressImage {
                file: read(file).await?,
                level: level.clone().into(),
            };
            convert(cli, config, &sink, req, None).await
        }
        Command::Resume {
            data,
            job,
            cover_letter,
        } => {
            let tools = Tools::from_config(config)?;
            let data = text_arg(data).await?;
            let job = match job {
                Some(j) => Some(text_arg(j).await?),
                None => None,
            };
            let (text, name) = if *cover_letter {
                (tools.cover_letter(&data, job.as_deref()).await?, "cover-letter.md")
            } else {
                (tools.resume(&data, job.as_deref()).await?, "resume.md")
            };
            rich_text(cli, &sink, &text, name).await
        }
        Command::Captions {
            description,
            image,
            platform,
            tone,
        } => {
            let tools = Tools::from_config(config)?;
            let image = read_optional(image.as_deref()).await?;
            let description = text_arg(description).await?;
            let text = tools.captions(&description, image.as_ref(), *platform, *tone).await?;
            rich_text(cli, &sink, &text, "captions.md").await
        }
        Command::Story {
            topic,
            character,
            age,
            genre,
            moral,
            language,
            read_aloud,
            speech,
        } => {
            let tools = Tools::from_config(config)?;
            let brief = StoryBrief {
                topic: topic.clone(),
                character: character.clone(),
                age: age.clone(),
                genre: *genre,
                moral: moral.clone(),
                language: *language,
            };
            let story = tools.story(&brief).await?;
            if *read_aloud {
                if !speech.play {
                    rich_text(cli, &Sink::default(), &story, "story.md").await?;
                }
                let clip = tools.read_aloud(&story, speech.voice).await?;
                deliver_speech(cli, &sink, clip, speech.play, "story.wav").await
            } else {
                rich_text(cli, &sink, &story, "story.md").await
            }
        }
        Command::Speak { text, speech } => {
            let tools = Tools::from_config(config)?;
            let text = text_arg(text).await?;
            let clip = tools.read_aloud(&text, speech.voice).await?;
            deliver_speech(cli, &sink, clip, speech.play, "speech.wav").await
        }
        Command::Homework { question, image } => {
            let tools = Tools::from_config(config)?;
            let image = read_optional(image.as_deref()).await?;
            let question = text_arg(question).await?;
            let text = tools.homework(&question, image.as_ref()).await?;
            rich_text(cli, &sink, &text, "solution.md").await
        }
        Command::Budget { data } => {
            let tools = Tools::from_config(config)?;
            let plan = tools.budget(&text_arg(data).await?).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&plan).context("Failed to serialise plan")?);
                return Ok(());
            }
            let mut report = plan.analysis.clone();
            let total = plan.total();
            report.push_str("\n| Category | Amount | Share |\n| --- | ---: | ---: |\n");
            for c in &plan.categories {
                let share = if total > 0.0 { c.value / total * 100.0 } else { 0.0 };
                report.push_str(&format!("| {} | {:.2} | {:.1}% |\n", c.name, c.value, share));
            }
            report.push_str(&format!("| **Total** | **{total:.2}** | |\n"));
            rich_text(cli, &sink, &report, "budget.md").await
        }
        Command::Image { prompt, aspect_ratio } => {
            let tools = Tools::from_config(config)?;
            let image = tools.generate_image(&text_arg(prompt).await?, *aspect_ratio).await?;
            let strategy = DisplayStrategy::for_image(&image, "generated");
            let DisplayStrategy::Download { file_name, .. } = &strategy else {
                bail!("unexpected display strategy for an image");
            };
            let path = sink.bytes(file_name, &image.bytes).await?;
            report_saved(cli, &strategy, &path)
        }
        Command::Notes { store, action } => notes(cli, store, action).await,
    }
}

// ── Conversions ──────────────────────────────────────────────────────────

fn converter(config: &ToolverseConfig, progress: Option<ProgressCallback>) -> Converter {
    let converter = Converter::new(config.clone());
    match progress {
        Some(cb) => converter.with_progress(cb),
        None => converter,
    }
}

async fn convert(
    cli: &Cli,
    config: &ToolverseConfig,
    sink: &Sink,
    request: ConversionRequest,
    progress: Option<ProgressCallback>,
) -> Result<()> {
    let label = request.label();
    let result = converter(config, progress)
        .convert(request)
        .await
        .with_context(|| format!("{label} failed"))?;
    deliver(cli, sink, &result).await
}

async fn preview_or_finalize(
    cli: &Cli,
    config: &ToolverseConfig,
    sink: &Sink,
    request: ConversionRequest,
    snapshot: Option<&Path>,
) -> Result<()> {
    let converter = converter(config, None);
    let result = converter.convert(request).await.context("Preview failed")?;
    let Some(snapshot) = snapshot else {
        deliver(cli, sink, &result).await?;
        if !cli.quiet && !cli.json {
            eprintln!(
                "{} Open the preview, save a screenshot and rerun with {} to produce {}",
                cyan("◆"),
                bold("--snapshot <image>"),
                result.suggested_name()
            );
        }
        return Ok(());
    };
    let ConversionResult::PreviewableMarkup { preview, .. } = &result else {
        bail!("expected a preview");
    };
    let snapshot = read(snapshot).await?;
    let pdf = converter
        .finalize_preview(preview, &snapshot)
        .await
        .context("Finalising the preview failed")?;
    deliver(cli, sink, &pdf).await
}

async fn deliver(cli: &Cli, sink: &Sink, result: &ConversionResult) -> Result<()> {
    let strategy = DisplayStrategy::for_result(result);
    if cli.json && matches!(strategy, DisplayStrategy::RichText) {
        println!("{}", serde_json::to_string_pretty(result).context("Failed to serialise result")?);
        return Ok(());
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match sink.conversion(result, &mut handle).await? {
        Delivered::Printed => Ok(()),
        Delivered::Saved(path) => {
            if cli.json {
                let mut v = serde_json::to_value(result).context("Failed to serialise result")?;
                v["path"] = serde_json::Value::String(path.display().to_string());
                v["bytes"] = serde_json::Value::from(result.payload().len());
                println!("{}", serde_json::to_string_pretty(&v).context("Failed to serialise result")?);
                return Ok(());
            }
            report_saved(cli, &strategy, &path)
        }
    }
}

fn report_saved(cli: &Cli, strategy: &DisplayStrategy, path: &Path) -> Result<()> {
    if !cli.quiet {
        let kind = match strategy {
            DisplayStrategy::Download { media_type, .. } => media_type.as_str(),
            DisplayStrategy::EmbeddedPreview => "preview",
            DisplayStrategy::RichText => "text",
            DisplayStrategy::Audio => "audio",
        };
        eprintln!("{} {}  {}", green("✔"), bold(&path.display().to_string()), dim(kind));
    }
    Ok(())
}

// ── Text and speech ──────────────────────────────────────────────────────

async fn rich_text(cli: &Cli, sink: &Sink, text: &str, suggested_name: &str) -> Result<()> {
    let result = ConversionResult::PlainText {
        text: text.to_string(),
        suggested_name: suggested_name.to_string(),
    };
    deliver(cli, sink, &result).await
}

async fn deliver_speech(cli: &Cli, sink: &Sink, clip: SpeechClip, play: bool, suggested_name: &str) -> Result<()> {
    let strategy = DisplayStrategy::for_speech(&clip);
    if !play {
        let path = sink.speech(&clip, suggested_name).await?;
        return report_saved(cli, &strategy, &path);
    }

    let buffer = clip.decode();
    if !cli.quiet {
        eprintln!(
            "{} Playing {:.1}s  {}",
            cyan("▶"),
            buffer.duration().as_secs_f32(),
            dim("(Ctrl-C to stop)")
        );
    }
    let playback = Playback::start(buffer, PcmWriter(io::stdout()), true);
    let stop = playback.stopper();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.store(true, Ordering::SeqCst);
        }
    });
    let outcome = playback.wait().await?;
    watcher.abort();
    if !cli.quiet {
        let mark = if outcome.stopped { cyan("■") } else { green("✔") };
        eprintln!("{} {} frames played", mark, outcome.frames_played);
    }
    Ok(())
}

// ── Notes ────────────────────────────────────────────────────────────────

async fn notes(cli: &Cli, path: &Path, action: &NotesAction) -> Result<()> {
    let mut store = NotesStore::open(path).await?;
    match action {
        NotesAction::List => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(store.notes()).context("Failed to serialise notes")?);
            } else if store.notes().is_empty() {
                eprintln!("{}", dim("No notes yet."));
            } else {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                for (i, note) in store.notes().iter().enumerate() {
                    writeln!(handle, "{:>3}. {}", i + 1, note).context("Failed to write to stdout")?;
                }
            }
        }
        NotesAction::Add { text } => {
            if store.add(text).await? {
                if !cli.quiet {
                    eprintln!("{} Note #{} saved", green("✔"), store.notes().len());
                }
            } else if !cli.quiet {
                eprintln!("{}", dim("Empty note ignored."));
            }
        }
        NotesAction::Delete { number } => match number.checked_sub(1) {
            Some(index) => match store.delete(index).await? {
                Some(removed) if !cli.quiet => eprintln!("{} Deleted: {}", green("✔"), removed),
                Some(_) => {}
                None => bail!("No note #{number} (there are {})", store.notes().len()),
            },
            None => bail!("Notes are numbered from 1"),
        },
    }
    Ok(())
}

// ── Input helpers ────────────────────────────────────────────────────────

async fn read(path: &Path) -> Result<UploadedFile> {
    Ok(UploadedFile::read(path).await?)
}

async fn read_optional(path: Option<&Path>) -> Result<Option<UploadedFile>> {
    match path {
        Some(p) => Ok(Some(read(p).await?)),
        None => Ok(None),
    }
}

/// `@path` reads the value from a file.
async fn text_arg(value: &str) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {path:?}")),
        None => Ok(value.to_string()),
    }
}
