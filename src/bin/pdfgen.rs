//! CLI binary for edgequake-pdfgen.
//!
//! A thin shim over the library crate: flags become a `GeneratorConfig` and
//! a `Session`, images are ingested, and the finished PDF is saved to disk.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfgen::pipeline::request::validate_document;
use edgequake_pdfgen::{
    download::save_pdf, Formatting, GenerationOutcome, GenerationProgressCallback,
    GeneratorConfig, HeadingLevel, IngestReport, Margins, Orientation, PageSize, ProgressCallback,
    RejectReason, RenderOptions, RequestMethod, Session,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner for the whole run, with a log
/// line per image and a summary line once the service has answered.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading images…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_image_accepted(&self, name: &str, order_index: usize) {
        self.bar.println(format!(
            "  {} #{:<2} {}",
            green("✓"),
            order_index + 1,
            name
        ));
    }

    fn on_image_rejected(&self, name: &str, reason: &RejectReason) {
        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            name,
            red(&reason.to_string())
        ));
    }

    fn on_submit_start(&self, text_chars: usize, image_count: usize) {
        self.bar.set_prefix("Rendering");
        self.bar.set_message(format!(
            "{text_chars} chars, {image_count} image{}",
            if image_count == 1 { "" } else { "s" }
        ));
    }

    fn on_indirection(&self, url: &str) {
        self.bar.set_prefix("Downloading");
        self.bar.set_message(url.to_string());
    }

    fn on_outcome(&self, outcome: &GenerationOutcome) {
        self.bar.finish_and_clear();
        match outcome {
            GenerationOutcome::Success { pdf_bytes } => eprintln!(
                "{} PDF received  {}",
                green("✔"),
                dim(&edgequake_pdfgen::asset::format_file_size(pdf_bytes.len() as u64))
            ),
            GenerationOutcome::Failure(f) => eprintln!("{} {}", red("✘"), red(&f.kind.to_string())),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Text only, saved as ./document.pdf
  pdfgen --endpoint https://n8n.example.com/webhook/pdf --text "Hello from the command line!"

  # Text from a file, two images, a title
  pdfgen --text-file notes.md --image cover.png --image chart.jpg --title "Q3 Report" -o out/

  # Landscape Letter with 10 mm margins and a bold H1 heading
  pdfgen --text-file notes.md --page-size letter --orientation landscape \
         --margin 10 --bold --heading h1

  # Validate everything without contacting the service
  pdfgen --text-file notes.md --image a.png --check

  # Machine-readable result
  pdfgen --text-file notes.md --json > result.json

ENVIRONMENT VARIABLES:
  PDFGEN_ENDPOINT_URL     Rendering service endpoint (required unless --endpoint)
  PDFGEN_TOKEN            Bearer token sent with every request
  PDFGEN_METHOD           post (default) or get
  PDFGEN_MAX_IMAGES       Maximum images per document (default 10)
  PDFGEN_MAX_IMAGE_BYTES  Maximum size of one image (default 10485760)
  PDFGEN_MAX_TEXT_CHARS   Maximum body length (default 10000)
  RUST_LOG                Override log filter (e.g. edgequake_pdfgen=debug)

LIMITS:
  Body text must be 20–10,000 characters. Images must be PNG, JPEG or WebP,
  at most 10 MB each, at most 10 per document. Margins are 0–50 mm.
"#;

/// Generate a PDF from text and images via a remote rendering service.
#[derive(Parser, Debug)]
#[command(
    name = "pdfgen",
    version,
    about = "Generate PDFs from text and images via a remote rendering service",
    long_about = "Assemble a document from free text and an ordered list of images, submit it \
to a rendering service (for example an n8n webhook) and save the returned PDF.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
#[command(group(clap::ArgGroup::new("body").required(true).args(["text", "text_file"])))]
struct Cli {
    /// Body text.
    #[arg(long)]
    text: Option<String>,

    /// Read the body text from this file.
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// Image to include (repeat for several; order is kept).
    #[arg(short, long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    /// Document title; also names the saved file.
    #[arg(short, long)]
    title: Option<String>,

    /// Paper size.
    #[arg(long, value_enum)]
    page_size: Option<PageSizeArg>,

    /// Page orientation.
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Margin in millimetres applied to all sides.
    #[arg(long, value_name = "MM")]
    margin: Option<f32>,

    /// Bold body text.
    #[arg(long)]
    bold: bool,

    /// Italic body text.
    #[arg(long)]
    italic: bool,

    /// Heading level for the body text.
    #[arg(long, value_enum, default_value = "none")]
    heading: HeadingArg,

    /// Rendering service endpoint.
    #[arg(long, env = "PDFGEN_ENDPOINT_URL")]
    endpoint: Option<String>,

    /// Bearer token for the rendering service.
    #[arg(long, env = "PDFGEN_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// HTTP method used to submit the document.
    #[arg(long, env = "PDFGEN_METHOD", value_enum, default_value = "post")]
    method: MethodArg,

    /// Maximum images per document.
    #[arg(long, env = "PDFGEN_MAX_IMAGES")]
    max_images: Option<usize>,

    /// Maximum size of one image in bytes.
    #[arg(long, env = "PDFGEN_MAX_IMAGE_BYTES")]
    max_image_bytes: Option<u64>,

    /// Maximum body length in characters.
    #[arg(long, env = "PDFGEN_MAX_TEXT_CHARS")]
    max_text_chars: Option<usize>,

    /// Directory to save the PDF into.
    #[arg(short, long, env = "PDFGEN_OUTPUT_DIR", default_value = ".")]
    output: PathBuf,

    /// Print a JSON report on stdout.
    #[arg(long)]
    json: bool,

    /// Validate text, images and options without submitting.
    #[arg(long)]
    check: bool,

    /// Disable progress output.
    #[arg(long, env = "PDFGEN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFGEN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFGEN_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    A4,
    Letter,
    Legal,
}

impl From<PageSizeArg> for PageSize {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::Letter => PageSize::Letter,
            PageSizeArg::Legal => PageSize::Legal,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<OrientationArg> for Orientation {
    fn from(v: OrientationArg) -> Self {
        match v {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum HeadingArg {
    None,
    H1,
    H2,
    H3,
}

impl From<HeadingArg> for HeadingLevel {
    fn from(v: HeadingArg) -> Self {
        match v {
            HeadingArg::None => HeadingLevel::None,
            HeadingArg::H1 => HeadingLevel::H1,
            HeadingArg::H2 => HeadingLevel::H2,
            HeadingArg::H3 => HeadingLevel::H3,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MethodArg {
    Post,
    Get,
}

impl From<MethodArg> for RequestMethod {
    fn from(v: MethodArg) -> Self {
        match v {
            MethodArg::Post => RequestMethod::Post,
            MethodArg::Get => RequestMethod::Get,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives the user-facing feedback; keep library INFO logs
    // out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = if show_progress && !cli.check {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let config = build_config(&cli, progress.clone().map(|cb| cb as ProgressCallback))?;

    // ── Assemble the document ────────────────────────────────────────────
    let text = match (&cli.text, &cli.text_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read text from {:?}", path))?,
        (None, None) => anyhow::bail!("Provide --text or --text-file"),
    };

    let mut session = Session::new(config);
    session.set_text(text);
    if let Some(ref title) = cli.title {
        session.set_title(title.clone());
    }
    if let Some(options) = render_options(&cli) {
        session
            .set_options(options)
            .context("Invalid layout options")?;
    }
    session.set_formatting(Formatting {
        bold: cli.bold,
        italic: cli.italic,
        heading: cli.heading.into(),
    });

    let report = session
        .ingest_paths(&cli.images)
        .await
        .context("Failed to read images")?;
    if progress.is_none() && !cli.quiet && !cli.json {
        print_ingest_report(&report);
    }

    // ── Check-only mode ──────────────────────────────────────────────────
    if cli.check {
        let document = session.document();
        let verdict = validate_document(document, &session.generator().config().limits);
        if cli.json {
            let json = serde_json::json!({
                "ok": verdict.is_ok(),
                "error": verdict.as_ref().err().map(|e| e.to_string()),
                "text_chars": document.text_chars(),
                "images": report,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        } else if let Err(ref e) = verdict {
            eprintln!("{} {}", red("✘"), e);
        } else if !cli.quiet {
            eprintln!(
                "{} Ready to submit: {} chars, {} images",
                green("✔"),
                document.text_chars(),
                document.image_count()
            );
        }
        return verdict.map_err(Into::into);
    }

    // ── Submit ───────────────────────────────────────────────────────────
    if !session.is_submittable() {
        if let Some(ref cb) = progress {
            cb.finish();
        }
        session
            .document()
            .validate_text()
            .context("Document is not ready")?;
    }

    let outcome = session.generate().await;
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let outcome = outcome.context("Generation request rejected")?;

    match outcome {
        GenerationOutcome::Success { pdf_bytes } => {
            let path = save_pdf(&pdf_bytes, session.document().title(), &cli.output)
                .context("Failed to save PDF")?;
            if cli.json {
                let json = serde_json::json!({
                    "ok": true,
                    "path": path,
                    "bytes": pdf_bytes.len(),
                    "images": report,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else if !cli.quiet {
                eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
            }
            Ok(())
        }
        GenerationOutcome::Failure(failure) => {
            if cli.json {
                let json = serde_json::json!({
                    "ok": false,
                    "failure": failure,
                    "images": report,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            Err(failure).context("Generation failed")
        }
    }
}

/// Map CLI args to `GeneratorConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GeneratorConfig> {
    let mut builder = GeneratorConfig::builder().method(cli.method.into());

    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(ref token) = cli.token {
        builder = builder.auth_token(token.clone());
    }
    if let Some(n) = cli.max_images {
        builder = builder.max_images(n);
    }
    if let Some(n) = cli.max_image_bytes {
        builder = builder.max_image_bytes(n);
    }
    if let Some(n) = cli.max_text_chars {
        builder = builder.max_text_chars(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Layout options, only when at least one layout flag was given.
fn render_options(cli: &Cli) -> Option<RenderOptions> {
    if cli.page_size.is_none() && cli.orientation.is_none() && cli.margin.is_none() {
        return None;
    }
    let defaults = RenderOptions::default();
    Some(RenderOptions {
        page_size: cli.page_size.map_or(defaults.page_size, Into::into),
        orientation: cli.orientation.map_or(defaults.orientation, Into::into),
        margins: cli.margin.map_or(defaults.margins, Margins::uniform),
    })
}

fn print_ingest_report(report: &IngestReport) {
    if report.accepted.is_empty() && !report.has_rejections() {
        return;
    }
    eprintln!(
        "{} {} image(s) added",
        cyan("◆"),
        bold(&report.accepted_count().to_string())
    );
    for rejection in &report.rejected {
        eprintln!(
            "  {} {}  {}",
            red("✗"),
            rejection.name,
            dim(&rejection.reason.to_string())
        );
    }
}
