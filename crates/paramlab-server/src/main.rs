//! Paramlab Server - HTTP proxy and terminal front-end
//!
//! `paramlab-server start` runs the proxy. The remaining commands drive a
//! running proxy from the terminal: generate a sweep, browse history,
//! delete and export experiments.

use anyhow::{bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use paramlab_core::{
    builder::{GenerationRequestBuilder, RunCount},
    editor::{Field, Parameter},
    history::{DeleteOutcome, ExperimentHistory, ListState, DEFAULT_LIMIT, DEFAULT_PAGE},
    metrics::format_score,
    types::ExportFormat,
    view::{format_timestamp, truncate_preview, PREVIEW_LENGTH},
    workbench::Workbench,
};
use paramlab_server::{
    config::ServerConfig,
    server::{run_server, ParamlabServer},
    ProxyClient,
};

const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:3000";

/// Command line arguments
#[derive(Parser)]
#[command(
    name = "paramlab-server",
    about = "Paramlab experiment proxy",
    long_about = "Relays parameter sweep experiments between the workbench and the generation backend, and drives a running proxy from the terminal."
)]
struct Args {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server bind address, overrides the configuration
    #[arg(short, long)]
    bind: Option<String>,

    /// Backend base URL, overrides the configuration and BACKEND_URL
    #[arg(long, value_name = "URL")]
    backend_url: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Single-line log output
    #[arg(long)]
    compact_logs: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(ClapArgs)]
struct ProxyArgs {
    /// Base URL of a running proxy
    #[arg(long, default_value = DEFAULT_PROXY_URL)]
    api: String,
}

#[derive(ClapArgs)]
struct GenerateArgs {
    #[command(flatten)]
    proxy: ProxyArgs,

    /// Prompt to sweep
    prompt: String,

    /// Experiment name
    #[arg(short, long)]
    name: Option<String>,

    /// Experiment description
    #[arg(short, long)]
    description: Option<String>,

    /// Number of runs: 3, 5, 10, 15 or 20
    #[arg(short, long, default_value_t = 5)]
    runs: u32,

    /// Temperature range as min:max:step
    #[arg(long, value_name = "MIN:MAX:STEP")]
    temperature: Option<String>,

    /// Top P range as min:max:step
    #[arg(long, value_name = "MIN:MAX:STEP")]
    top_p: Option<String>,

    /// Max tokens range as min:max:step
    #[arg(long, value_name = "MIN:MAX:STEP")]
    max_tokens: Option<String>,

    /// Show full response text instead of previews
    #[arg(long)]
    full: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Start,
    /// Generate a default configuration file
    Config {
        /// Output file path
        #[arg(short, long, default_value = "paramlab-server.toml")]
        output: PathBuf,
        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show server information
    Info,
    /// Run a parameter sweep through a running proxy
    Generate(GenerateArgs),
    /// List stored experiments
    History {
        #[command(flatten)]
        proxy: ProxyArgs,
        #[arg(long, default_value_t = DEFAULT_PAGE)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,
    },
    /// Delete a stored experiment
    Delete {
        #[command(flatten)]
        proxy: ProxyArgs,
        /// Experiment id
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Export an experiment to a file named experiment_<id>.<ext>
    Export {
        #[command(flatten)]
        proxy: ProxyArgs,
        /// Experiment id
        id: String,
        /// json, csv or pdf
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,
        /// Directory to write into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    match args.command {
        Some(Commands::Start) | None => start_server(args.config, args.bind, args.backend_url).await,
        Some(Commands::Config { output, force }) => generate_config(output, force),
        Some(Commands::Validate { config }) => validate_config(config),
        Some(Commands::Info) => {
            show_info();
            Ok(())
        }
        Some(Commands::Generate(generate)) => run_generate(generate).await,
        Some(Commands::History { proxy, page, limit }) => show_history(&proxy.api, page, limit).await,
        Some(Commands::Delete { proxy, id, yes }) => delete_experiment(&proxy.api, &id, yes).await,
        Some(Commands::Export {
            proxy,
            id,
            format,
            output,
        }) => export_experiment(&proxy.api, &id, format, output).await,
    }
}

/// Initialize logging based on command line arguments
fn init_logging(args: &Args) -> anyhow::Result<()> {
    let log_level = args
        .log_level
        .parse::<Level>()
        .map_err(|_| anyhow::anyhow!("Invalid log level: {}", args.log_level))?;

    let env_filter = EnvFilter::from_default_env()
        .add_directive(format!("paramlab_server={}", log_level).parse()?)
        .add_directive(format!("paramlab_core={}", log_level).parse()?)
        .add_directive(format!("tower_http={}", log_level).parse()?);

    if args.compact_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().compact())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().pretty())
            .with(env_filter)
            .init();
    }

    Ok(())
}

/// Start the server
async fn start_server(
    config_path: Option<PathBuf>,
    bind: Option<String>,
    backend_url: Option<String>,
) -> anyhow::Result<()> {
    info!("Starting Paramlab Server v{}", paramlab_server::VERSION);

    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {:?}", path);
            ServerConfig::from_file(&path).with_context(|| format!("Failed to load config {:?}", path))?
        }
        None => {
            info!("Using default configuration");
            ServerConfig::from_env().context("Failed to read configuration from the environment")?
        }
    };

    if let Some(bind) = bind {
        config.bind = bind.parse().with_context(|| format!("Invalid bind address: {}", bind))?;
    }
    let config = config.with_backend_override(backend_url);

    let server = ParamlabServer::new(config)?;

    info!("Server configuration:");
    info!("  Bind address: {}", server.config().bind);
    info!("  Backend: {}", server.config().backend.url);
    info!("  Upstream retries: {}", server.config().backend.retry.max_retries);
    info!("  CORS enabled: {}", server.config().cors.enabled);

    run_server(server).await?;
    Ok(())
}

/// Generate a default configuration file
fn generate_config(output: PathBuf, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        error!("Configuration file already exists: {:?}", output);
        error!("Use --force to overwrite");
        bail!("Configuration file already exists");
    }

    ServerConfig::default()
        .to_file(&output)
        .map_err(|e| anyhow::anyhow!("Failed to write config: {}", e))?;

    info!("Generated default configuration file: {:?}", output);
    Ok(())
}

/// Validate a configuration file
fn validate_config(config_path: PathBuf) -> anyhow::Result<()> {
    info!("Validating configuration file: {:?}", config_path);

    let config = ServerConfig::from_file(&config_path).map_err(|e| {
        error!("Configuration validation failed: {}", e);
        anyhow::anyhow!("Invalid configuration: {}", e)
    })?;
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        bail!("Invalid configuration: {}", e);
    }

    info!("Configuration is valid");
    info!("  Bind address: {}", config.bind);
    info!("  Backend: {}", config.backend.url);
    info!("  Timeout: {:?}", config.backend.timeout());
    Ok(())
}

/// Show server information
fn show_info() {
    println!("Paramlab Server v{}", paramlab_server::VERSION);
    println!("Proxy between the experiment workbench and the generation backend");
    println!();
    println!("Routes:");
    println!("  GET    /api/health");
    println!("  GET    /api/experiments?page=1&limit=10");
    println!("  DELETE /api/experiments?id=<id>");
    println!("  DELETE /api/experiments/<id>");
    println!("  POST   /api/generate");
    println!("  POST   /api/export");
    println!();
    println!("Configuration:");
    println!("  • Default bind address: 127.0.0.1:3000");
    println!("  • Default backend: {}", paramlab_server::config::DEFAULT_BACKEND_URL);
    println!("  • BACKEND_URL overrides the backend from file or PARAMLAB_* variables");
    println!();
    println!("Usage:");
    println!("  paramlab-server                          # Start with default config");
    println!("  paramlab-server -c config.toml           # Start with custom config");
    println!("  paramlab-server config                   # Generate default config");
    println!("  paramlab-server generate \"prompt\" -r 10  # Run a sweep");
    println!("  paramlab-server history                  # List experiments");
}

/// Parse `min:max:step`
fn parse_range(raw: &str) -> anyhow::Result<[f64; 3]> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [min, max, step] = parts.as_slice() else {
        bail!("Expected MIN:MAX:STEP, got '{}'", raw);
    };
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .with_context(|| format!("Invalid number '{}' in range '{}'", s, raw))
    };
    Ok([parse(*min)?, parse(*max)?, parse(*step)?])
}

async fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let api = ProxyClient::new(&args.proxy.api)?;
    let mut workbench = Workbench::new();

    let edits = [
        (Parameter::Temperature, &args.temperature),
        (Parameter::TopP, &args.top_p),
        (Parameter::MaxTokens, &args.max_tokens),
    ];
    for (param, raw) in edits {
        if let Some(raw) = raw {
            let [min, max, step] = parse_range(raw)?;
            let editor = workbench.editor_mut();
            editor.update(param, Field::Min, min);
            editor.update(param, Field::Max, max);
            editor.update(param, Field::Step, step);
        }
    }

    let mut form = GenerationRequestBuilder::new()
        .prompt(args.prompt)
        .runs(RunCount::try_from(args.runs)?);
    if let Some(name) = args.name {
        form = form.experiment_name(name);
    }
    if let Some(description) = args.description {
        form = form.experiment_description(description);
    }

    let request = workbench.prepare(&form)?;
    println!(
        "Generating {} responses over {} parameter combinations...",
        request.number_of_runs,
        request.parameter_range.grid_size()
    );
    workbench.generate(&api, request).await?;

    let Some(experiment) = workbench.current_experiment().cloned() else {
        bail!("Generation finished without an experiment");
    };
    println!();
    println!("Experiment {} ({})", experiment.display_name(), experiment.id);
    if let Some(summary) = workbench.summary() {
        println!("  Best score:    {}", score_text(summary.best));
        println!("  Average score: {}", score_text(summary.average));
        println!("  Responses:     {}/{}", summary.response_count, summary.total_runs);
    }

    println!();
    println!(
        "{:<12} {:>10} {:>13} {:>12} {:>10} {:>8}",
        "", "Coherence", "Completeness", "Readability", "Relevance", "Overall"
    );
    for row in workbench.chart_rows() {
        println!(
            "{:<12} {:>10.2} {:>13.2} {:>12.2} {:>10.2} {:>8.2}",
            row.name, row.coherence, row.completeness, row.readability, row.relevance, row.overall
        );
    }

    for response in &experiment.responses {
        if args.full {
            workbench.toggle_response(&response.id);
        }
        let p = &response.parameters;
        println!();
        println!(
            "[{}] temperature {} top_p {} max_tokens {} overall {}",
            response.id,
            p.temperature,
            p.top_p,
            p.max_tokens,
            format_score(response.metrics.overall_score)
        );
        if let Some(text) = workbench.response_text(&response.id) {
            println!("{}", text);
        }
    }
    Ok(())
}

fn score_text(score: Option<f64>) -> String {
    score.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "n/a".to_string())
}

async fn show_history(api_url: &str, page: u32, limit: u32) -> anyhow::Result<()> {
    let api = ProxyClient::new(api_url)?;
    let mut history = ExperimentHistory::new(page, limit);

    match history.refresh(&api).await {
        ListState::Error(message) => bail!("{}", message),
        ListState::Empty => {
            println!("No experiments yet. Generate one to get started.");
            return Ok(());
        }
        ListState::Loading | ListState::Loaded => {}
    }

    for experiment in history.experiments() {
        let summary = experiment.summary();
        println!("{}  {}", experiment.id, experiment.display_name());
        println!(
            "    created {}  runs {}  best {}  average {}",
            format_timestamp(&experiment.created_at),
            summary.total_runs,
            score_text(summary.best),
            score_text(summary.average)
        );
        println!("    prompt: {}", truncate_preview(&experiment.prompt, PREVIEW_LENGTH));
    }
    Ok(())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

async fn delete_experiment(api_url: &str, id: &str, yes: bool) -> anyhow::Result<()> {
    let api = ProxyClient::new(api_url)?;
    let mut history = ExperimentHistory::default();
    let confirmed = yes || confirm("Are you sure you want to delete this experiment?")?;

    match history.delete(&api, id, confirmed).await? {
        DeleteOutcome::Cancelled => println!("Cancelled"),
        DeleteOutcome::Deleted => println!("Deleted {}", id),
    }
    Ok(())
}

async fn export_experiment(api_url: &str, id: &str, format: ExportFormat, output: PathBuf) -> anyhow::Result<()> {
    let api = ProxyClient::new(api_url)?;
    let mut history = ExperimentHistory::default();

    let file = history.export(&api, id, format).await?;
    let path = output.join(&file.filename);
    std::fs::write(&path, &file.bytes).with_context(|| format!("Failed to write {:?}", path))?;

    info!(content_type = %file.content_type, bytes = file.bytes.len(), "export written");
    println!("Wrote {}", path.display());
    Ok(())
}
