//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use kexplain_core::{
    ExplainReport, Explainer, KubectlSource, ProgressReporter, load_resource_names, write_forest,
    write_report,
};
use kexplain_shared::{AppConfig, ExplainConfig, FailurePolicy, init_config, load_config};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// kexplain — turn `kubectl explain` into a machine-readable schema tree.
#[derive(Parser)]
#[command(
    name = "kexplain",
    version,
    about = "Explain Kubernetes resources recursively and write the schema tree as JSON.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log every enriched field (same as -v).
    #[arg(long, env = "VERBOSE_MODE", global = true, hide = true, value_parser = BoolishValueParser::new())]
    pub verbose_mode: Option<bool>,

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
    /// Explain every listed resource and write the JSON forest.
    Run(RunArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `kexplain run`; each overrides the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// File with one resource name per line.
    #[arg(long, env = "RESOURCE_NAMES_FILE_LOCATION")]
    pub resources: Option<PathBuf>,

    /// Where to write the JSON forest.
    #[arg(short, long, env = "OUTPUT_FILE_LOCATION")]
    pub output: Option<PathBuf>,

    /// Maximum simultaneous kubectl queries.
    #[arg(long)]
    pub concurrency: Option<u32>,

    /// Per-query timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Run queries concurrently (false: one at a time).
    #[arg(long, env = "PARALLEL_MODE", value_parser = BoolishValueParser::new())]
    pub parallel: Option<bool>,

    /// Fail a whole resource when any of its field queries fails.
    #[arg(long)]
    pub strict: bool,

    /// kubectl context to pin every query to.
    #[arg(long)]
    pub context: Option<String>,

    /// kubectl binary to run.
    #[arg(long)]
    pub kubectl: Option<String>,

    /// Also write a JSON report of failures and warnings.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    /// Layer flag values over the loaded config.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.resources {
            config.defaults.resource_names_file = path.to_string_lossy().into_owned();
        }
        if let Some(path) = &self.output {
            config.defaults.output_file = path.to_string_lossy().into_owned();
        }
        if let Some(n) = self.concurrency {
            config.explain.max_concurrent_queries = n;
        }
        if let Some(secs) = self.timeout {
            config.explain.query_timeout_secs = secs;
        }
        if let Some(parallel) = self.parallel {
            config.explain.parallel = parallel;
        }
        if self.strict {
            config.explain.failure_policy = FailurePolicy::Abort;
        }
        if self.context.is_some() {
            config.explain.context = self.context.clone();
        }
        if let Some(kubectl) = &self.kubectl {
            config.explain.kubectl_path = kubectl.clone();
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show the configuration `run` would use: file, then env vars and flags.
    Show(RunArgs),
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match (cli.verbose, cli.verbose_mode) {
        (0, Some(true)) | (1, _) => 1,
        (n, _) => n,
    };
    let filter = match level {
        0 => "kexplain=info",
        1 => "kexplain=debug",
        _ => "kexplain=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let show_progress = matches!(cli.log_format, LogFormat::Text);
    match cli.command {
        Command::Run(args) => cmd_run(&args, show_progress).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show(overrides) => cmd_config_show(&overrides),
        },
    }
}

async fn cmd_run(args: &RunArgs, show_progress: bool) -> Result<()> {
    let mut config = load_config()?;
    args.apply(&mut config);

    let explain_config = ExplainConfig::from(&config);
    explain_config.validate()?;

    let output = PathBuf::from(&config.defaults.output_file);
    if output.extension().is_none_or(|ext| ext != "json") {
        info!(
            output = %output.display(),
            "output path has no .json suffix; the content is JSON regardless"
        );
    }

    let resource_names = load_resource_names(Path::new(&config.defaults.resource_names_file))?;

    let source = KubectlSource::new(&config.explain.kubectl_path)
        .with_context(config.explain.context.clone());
    let progress = Arc::new(CliProgress::new(show_progress));
    let explainer = Explainer::new(Arc::new(source), &explain_config, progress.clone())?;

    info!(
        resources = resource_names.len(),
        concurrency = explain_config.max_concurrent_queries,
        timeout_secs = explain_config.query_timeout.as_secs(),
        policy = ?explain_config.failure_policy,
        "starting explain run"
    );

    let report = explainer.explain(&resource_names).await?;
    progress.finish();

    write_forest(&output, &report.resources)?;
    if let Some(path) = &args.report {
        write_report(path, &report)?;
    }

    print_summary(&report, &output);
    Ok(())
}

fn print_summary(report: &ExplainReport, output: &Path) {
    println!();
    println!("  Explanation finished{}", if report.is_clean() { "!" } else { " with problems." });
    println!("  Resources: {}", report.resources.len());
    println!("  Fields:    {}", report.field_count());
    println!("  Output:    {}", output.display());
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());

    if !report.failures.is_empty() {
        println!();
        println!("  Failed resources ({}):", report.failures.len());
        for failure in &report.failures {
            println!("    {}: {}", failure.resource, failure.message);
        }
    }
    if !report.warnings.is_empty() {
        println!();
        println!("  Fields without description ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("    {}: {}", warning.full_name, warning.message);
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar that grows as resources are parsed.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn resource_started(&self, _name: &str, field_count: usize) {
        self.bar.inc_length(field_count as u64);
    }

    fn field_enriched(&self, full_name: &str) {
        self.bar.inc(1);
        self.bar.set_message(full_name.to_string());
    }

    fn resource_finished(&self, name: &str, ok: bool) {
        if !ok {
            self.bar.println(format!("  failed: {name}"));
        }
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created config file at {}", path.display());
    Ok(())
}

fn cmd_config_show(overrides: &RunArgs) -> Result<()> {
    let mut config = load_config()?;
    overrides.apply(&mut config);
    let content = toml::to_string_pretty(&config).map_err(|e| eyre!("failed to render config: {e}"))?;
    println!("{content}");
    Ok(())
}
