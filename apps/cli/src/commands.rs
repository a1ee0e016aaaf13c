//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use dossier_chunking::{ChunkConfig, TextSplitter};
use dossier_core::{
    ExtractionPolicy, Extractor, IngestSummary, JsonMetadataStore, MetadataStore,
    ProgressReporter, SubjectRegistry, ingest_requests,
};
use dossier_shared::{
    AppConfig, Subject, SubjectExtractionRequest, init_config, load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Dossier — turn scattered sources about people into retrieval-ready chunks.
#[derive(Parser)]
#[command(
    name = "dossier",
    version,
    about = "Extract, normalize and chunk reference and web material about subjects.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.dossier/dossier.toml).
    #[arg(long, global = true, env = "DOSSIER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract and chunk every subject in the metadata file.
    Extract {
        /// Extraction metadata JSON (defaults to <data_dir>/extraction_metadata.json).
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Chunk output path (defaults to <data_dir>/chunks.jsonl).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Look up reference articles by name and abort on any failure.
        #[arg(long)]
        strict: bool,
    },

    /// List registered subjects.
    Subjects,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "dossier=info",
        1 => "dossier=debug",
        _ => "dossier=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so chunk summaries on stdout stay clean.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Extract {
            metadata,
            out,
            strict,
        } => cmd_extract(cli.config.as_deref(), metadata, out, strict).await,
        Command::Subjects => cmd_subjects(cli.config.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_extract(
    config_path: Option<&Path>,
    metadata: Option<PathBuf>,
    out: Option<PathBuf>,
    strict: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let data_dir = config.data_path();

    let store = JsonMetadataStore::with_paths(
        metadata.unwrap_or_else(|| data_dir.join(dossier_core::REQUESTS_FILE)),
        out.unwrap_or_else(|| data_dir.join(dossier_core::CHUNKS_FILE)),
    );

    let splitter = TextSplitter::new(ChunkConfig::try_from(&config.chunking)?);
    let reporter = Arc::new(CliProgress::new());
    let mut extractor = Extractor::from_config(&config)?.with_progress(reporter.clone());
    if strict {
        extractor = extractor.with_policy(ExtractionPolicy::strict());
    }

    let requests = if store.has_requests() {
        store.load_requests()?
    } else {
        warn!(
            path = %store.requests_path().display(),
            "no extraction metadata, using configured subject URLs"
        );
        requests_from_registry(extractor.registry())
    };

    if requests.is_empty() {
        return Err(eyre!(
            "nothing to extract: no requests in {} and no [[subjects]] configured",
            store.requests_path().display()
        ));
    }

    info!(
        requests = requests.len(),
        policy = ?extractor.policy(),
        "starting extraction"
    );

    let result = ingest_requests(&extractor, &splitter, &store, requests).await;
    if result.is_err() {
        reporter.abandon();
    }
    let summary = result?;

    println!();
    println!("  Extraction complete");
    println!("  Subjects:  {}", summary.subjects);
    println!("  Documents: {}", summary.documents);
    println!("  Chunks:    {}", summary.chunks);
    println!("  Skipped:   {}", summary.skipped);
    println!("  Output:    {}", store.chunks_path().display());
    println!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

/// One request per registered subject, from its configured URLs.
fn requests_from_registry(registry: &SubjectRegistry) -> Vec<SubjectExtractionRequest> {
    registry.iter().map(SubjectExtractionRequest::for_subject).collect()
}

fn cmd_subjects(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let registry = SubjectRegistry::from_config(&config)?;

    if registry.is_empty() {
        println!("No subjects configured. Add [[subjects]] entries to the config file.");
        return Ok(());
    }

    for subject in registry.iter() {
        println!("{:<20} {}", subject.id, subject.name);
        if let Some(title) = &subject.reference_title {
            println!("{:<20}   reference: {title}", "");
        }
        for url in &subject.urls {
            println!("{:<20}   {url}", "");
        }
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.abandon_with_message("extraction failed");
    }
}

impl ProgressReporter for CliProgress {
    fn subject_started(&self, subject: &Subject, index: usize, total: usize) {
        self.spinner
            .set_message(format!("Extracting [{index}/{total}] {}", subject.name));
    }

    fn subject_finished(&self, subject: &Subject, documents: usize) {
        self.spinner
            .println(format!("  {}: {documents} documents", subject.name));
    }

    fn source_failed(&self, subject: &Subject, url: &str, error: &str) {
        self.spinner
            .println(format!("  skipped {url} ({}): {error}", subject.id));
    }

    fn done(&self, _summary: &IngestSummary) {
        self.spinner.finish_and_clear();
    }
}
