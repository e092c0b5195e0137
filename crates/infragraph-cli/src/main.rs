#![forbid(unsafe_code)]

mod output;

use anyhow::Context;
use clap::Parser;
use infragraph_core::config::{CONFIG_FILE, load_config};
use infragraph_core::generate::ResourceList;
use infragraph_core::{ErrorCode, GenerateOptions, generate};
use output::{CliError, OutputMode};
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "infragraph: collapse infrastructure dependency graphs into connectivity graphs",
    long_about = None,
    after_help = "EXAMPLES:\n    # Read resources from a file, print the graph as JSON\n    infragraph resources.json\n\n    # Read from stdin, print a summary\n    cat resources.json | infragraph --format text\n\n    # Keep the description map next to the graph\n    infragraph resources.json --description-file description.json"
)]
struct Cli {
    /// JSON resource list; `-` or nothing reads stdin.
    input: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputMode::Json)]
    format: OutputMode,

    /// Config file with `[generate]` options and `[[providers]]` catalogs.
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Write the `{"resource": ...}` description map to this file.
    #[arg(long)]
    description_file: Option<PathBuf>,

    /// Treat every resource as a node; no contraction.
    #[arg(long)]
    raw: bool,

    /// Keep unconnected nodes and hanging pass-through nodes.
    #[arg(long)]
    no_clean: bool,

    /// Leave pass-through resources as nodes.
    #[arg(long)]
    no_connections: bool,

    /// Do not add synthetic external nodes.
    #[arg(long)]
    no_external_nodes: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Layer command-line switches over the config file options.
    fn options(&self, base: GenerateOptions) -> GenerateOptions {
        GenerateOptions {
            raw: base.raw || self.raw,
            clean: base.clean && !self.no_clean,
            connections: base.connections && !self.no_connections,
            external_nodes: base.external_nodes && !self.no_external_nodes,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("INFRAGRAPH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "infragraph_core=debug,infragraph=debug,info"
        } else {
            "warn"
        })
    });

    let format = env::var("INFRAGRAPH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn read_input(input: Option<&Path>) -> anyhow::Result<String> {
    match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn write_description(path: &Path, description: &serde_json::Value) -> anyhow::Result<()> {
    let mut body = serde_json::to_string_pretty(description)?;
    body.push('\n');
    fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(&cli.config)
        .map_err(|err| CliError::new(ErrorCode::ConfigParseError, format!("{err:#}")))?;
    let options = cli.options(config.generate);
    debug!(?options, providers = config.providers.len(), "config loaded");

    let content = read_input(cli.input.as_deref())
        .map_err(|err| CliError::new(ErrorCode::InputParseError, format!("{err:#}")))?;
    let resources = serde_json::from_str::<ResourceList>(&content)
        .map_err(|err| {
            CliError::new(
                ErrorCode::InputParseError,
                format!("{}: {err}", ErrorCode::InputParseError.message()),
            )
        })?
        .into_resources();

    let registry = config.registry();
    let generated =
        generate(&resources, options, &registry).map_err(|err| CliError::from(&err))?;

    if let Some(path) = &cli.description_file {
        write_description(path, &generated.description)
            .map_err(|err| CliError::new(ErrorCode::InternalUnexpected, format!("{err:#}")))?;
        info!(path = %path.display(), "description written");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    output::render_generated(&mut out, cli.format, &generated)
        .map_err(|err| CliError::new(ErrorCode::InternalUnexpected, format!("{err:#}")))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    if let Err(err) = run(&cli) {
        output::render_error(cli.format, &err)?;
        std::process::exit(1);
    }
    Ok(())
}
