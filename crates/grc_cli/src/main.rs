//! grctool CLI
//!
//! Runs compliance tools through the validation and dispatch pipeline and
//! prints one JSON envelope on stdout. Diagnostics go to stderr.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod args;
mod logging;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use grc_config::{load_config, LoadedConfig};
use grc_tool::{
    register_builtin_tools, Dispatcher, Envelope, JsonOutputWriter, OutputWriter,
    ToolRegistryBuilder,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::args::{parse_tool_args, ToolArgs};

#[derive(Parser)]
#[command(name = "grctool")]
#[command(about = "grctool - compliance evidence tooling", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ./.grctool.yaml or ./grctool.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory; overrides config and GRCTOOL_DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run or inspect tools
    Tool {
        #[command(subcommand)]
        command: ToolCommand,
    },
}

#[derive(Subcommand)]
enum ToolCommand {
    /// List registered tools
    List {
        /// Compact single-line output
        #[arg(long)]
        quiet: bool,
    },
    /// Show registry statistics
    Stats {
        /// Compact single-line output
        #[arg(long)]
        quiet: bool,
    },
    /// Run a tool: grctool tool <name> [--task-ref REF] [--<param> VALUE]...
    #[command(external_subcommand)]
    Run(Vec<String>),
}

enum Request {
    List,
    Stats,
    Run(ToolArgs),
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let Commands::Tool { command } = cli.command;
    let (request, quiet, config_path, data_dir, verbose) = match command {
        ToolCommand::List { quiet } => (Request::List, quiet, cli.config, cli.data_dir, cli.verbose),
        ToolCommand::Stats { quiet } => (Request::Stats, quiet, cli.config, cli.data_dir, cli.verbose),
        ToolCommand::Run(raw) => {
            let args = parse_tool_args(&raw).wrap_err("invalid tool arguments")?;
            (
                Request::Run(args.clone()),
                args.quiet,
                args.config.or(cli.config),
                args.data_dir.or(cli.data_dir),
                cli.verbose.saturating_add(args.verbose),
            )
        }
    };

    let loaded = load_settings(config_path, data_dir)?;
    logging::init(&loaded.config.logging, verbose)?;
    match &loaded.source {
        Some(path) => tracing::debug!(config = %path.display(), data_dir = %loaded.data_dir().display(), "configuration loaded"),
        None => tracing::debug!(data_dir = %loaded.data_dir().display(), "using default configuration"),
    }

    let dispatcher = build_dispatcher(&loaded)?;
    let envelope: Envelope = match request {
        Request::List => dispatcher.list_tools(),
        Request::Stats => dispatcher.registry_stats(),
        Request::Run(args) => dispatcher.invoke(args.invocation()),
    };

    JsonOutputWriter::stdout()
        .write_output(&envelope, quiet)
        .wrap_err("failed to write output")?;
    Ok(())
}

fn load_settings(config: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<LoadedConfig> {
    let loaded = load_config(config.as_deref()).wrap_err("failed to load configuration")?;
    match data_dir {
        Some(dir) => {
            let cwd = std::env::current_dir().wrap_err("failed to read current directory")?;
            Ok(loaded.with_data_dir(&dir, &cwd))
        }
        None => Ok(loaded),
    }
}

fn build_dispatcher(loaded: &LoadedConfig) -> Result<Dispatcher> {
    let mut builder = ToolRegistryBuilder::new();
    register_builtin_tools(&mut builder).wrap_err("failed to register built-in tools")?;
    let registry = Arc::new(builder.build());
    tracing::debug!(tools = registry.count(), "registry ready");
    Ok(Dispatcher::new(registry, loaded.data_dir()))
}
