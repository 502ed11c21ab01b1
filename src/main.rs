//! moa - terminal front end for Mixture-of-Agents prompting

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use moa_console::backend::{HttpBackend, MoaBackend};
use moa_console::catalog::{ModelGroups, ModelId};
use moa_console::config::Config;
use moa_console::controller::Controller;
use moa_console::orchestrator::{CycleState, FAILURE_NOTICE, RenderCycle};
use moa_console::render::{SafeMarkup, UnicodeTypesetter};
use moa_console::task::{InlineRunner, ThreadRunner};
use moa_console::tui::{self, App, markup};
use moa_console::view::SharedView;
use tracing::{info, warn};

/// Send one prompt to many models and read their answers side by side
#[derive(Parser)]
#[command(name = "moa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the Mixture-of-Agents service (overrides the config file)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log verbosity: 0 off, 1 warn, 2 info, 3 debug (overrides DEBUG)
    #[arg(long, global = true)]
    log_level: Option<u8>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal UI (the default)
    Tui,
    /// List the models the service offers, grouped by provider
    Models,
    /// Run one prompt and print every answer
    Ask {
        /// Prompt to send
        prompt: String,

        /// Model to include, as "<provider> <model>"; repeatable
        #[arg(long = "model")]
        models: Vec<String>,

        /// Include every available model
        #[arg(long)]
        all: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Write the effective configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Markup as rendered
    Html,
    /// Tags stripped
    Text,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Let --help and --version exit normally
            if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                e.exit();
            }
            eprintln!("error: {}\n", e.kind());
            Cli::command().print_help()?;
            std::process::exit(1);
        }
    };

    init_logging(cli.log_level);

    let mut config = load_config(cli.config.as_deref());
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    info!(server = %config.server_url, "Starting moa");

    match cli.command {
        None | Some(Commands::Tui) => cmd_tui(&config),
        Some(Commands::Models) => cmd_models(&config),
        Some(Commands::Ask {
            prompt,
            models,
            all,
            format,
        }) => cmd_ask(&config, &prompt, &models, all, format),
        Some(Commands::Init { force }) => {
            let path = cli.config.unwrap_or_else(Config::default_path);
            cmd_init(&config, &path, force)
        }
    }
}

// Log to the temp dir - tail with: tail -f /tmp/moa-console.log
// DEBUG=0-3 (or --log-level) controls verbosity (0=off, 1=warn, 2=info, 3=debug)
fn init_logging(flag: Option<u8>) {
    let debug_level = flag
        .or_else(|| {
            std::env::var("DEBUG")
                .ok()
                .and_then(|v| v.parse::<u8>().ok())
        })
        .unwrap_or(0);

    if debug_level == 0 {
        return;
    }

    let level = match debug_level {
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    let log_path = moa_console::paths::log_path();
    if let Err(e) = std::fs::write(&log_path, "") {
        eprintln!("Warning: Failed to clear log file: {e}");
    }
    let dir = log_path
        .parent()
        .map_or_else(std::env::temp_dir, std::path::Path::to_path_buf);
    let file_appender = tracing_appender::rolling::never(dir, moa_console::paths::LOG_FILE);
    tracing_subscriber::fmt()
        .with_writer(file_appender)
        .with_max_level(level)
        .with_ansi(false)
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Config {
    let loaded = path.map_or_else(Config::load, Config::load_from);
    loaded.unwrap_or_else(|e| {
        warn!("Falling back to default config: {e:#}");
        eprintln!("Warning: {e:#}; using default configuration");
        Config::default()
    })
}

fn backend(config: &Config) -> Arc<dyn MoaBackend> {
    Arc::new(HttpBackend::new(
        &config.server_url,
        config.catalog_timeout(),
        config.request_timeout(),
    ))
}

fn cmd_init(config: &Config, path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file {} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    config.save_to(path)?;
    info!(path = %path.display(), "Wrote config file");
    println!("Wrote {}", path.display());
    Ok(())
}

fn cmd_tui(config: &Config) -> Result<()> {
    let view = SharedView::new();
    let mut controller = Controller::new(
        backend(config),
        Arc::new(UnicodeTypesetter),
        Arc::new(ThreadRunner),
        view.handles(),
    );
    controller.start();
    tui::run(App::new(controller, view), config.poll_interval_ms)
}

fn cmd_models(config: &Config) -> Result<()> {
    let identifiers = backend(config)
        .fetch_catalog()
        .with_context(|| format!("Failed to fetch models from {}", config.server_url))?;
    let groups = ModelGroups::from_identifiers(identifiers);
    if groups.is_empty() {
        println!("No models available.");
        return Ok(());
    }
    for group in groups.groups() {
        println!("{}", group.provider);
        for model in &group.models {
            println!("  {model}");
        }
    }
    Ok(())
}

fn cmd_ask(config: &Config, prompt: &str, models: &[String], all: bool, format: Format) -> Result<()> {
    let view = SharedView::new();
    let mut controller = Controller::new(
        backend(config),
        Arc::new(UnicodeTypesetter),
        Arc::new(InlineRunner),
        view.handles(),
    );
    controller.start();
    controller.process_pending();

    if controller.selection().groups().is_empty() {
        bail!("No models available from {}", config.server_url);
    }
    if all {
        controller.set_all(true);
    }
    for raw in models {
        let id = ModelId::parse(raw).with_context(|| {
            format!("Invalid model {raw:?}; expected \"<provider> <model>\"")
        })?;
        if !controller.selection().groups().ids().any(|known| known == id) {
            bail!("Unknown model {id}; run `moa models` to list them");
        }
        if !controller.is_selected(&id) {
            controller.toggle(&id);
        }
    }

    controller.generate(prompt)?;
    controller.process_pending();
    if controller.cycle().map(RenderCycle::state) != Some(CycleState::Completed) {
        bail!(FAILURE_NOTICE);
    }

    let show = |markup: &SafeMarkup| match format {
        Format::Html => markup.to_string(),
        Format::Text => markup::to_plain(markup.as_str()),
    };
    for slot in controller.tabs().slots() {
        println!("== {} ==", slot.id);
        println!("{}\n", show(&slot.markup));
    }
    println!("== Aggregate ==");
    println!("{}", show(controller.aggregate().markup()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["moa"]);
        assert!(cli.command.is_none());
        assert!(cli.server.is_none());
    }

    #[test]
    fn test_cli_ask_command() -> Result<(), Box<dyn std::error::Error>> {
        let cli = Cli::parse_from([
            "moa",
            "--server",
            "http://localhost:9000",
            "ask",
            "2+2",
            "--model",
            "OpenAI gpt-4",
            "--model",
            "Anthropic claude-3",
            "--format",
            "html",
        ]);
        assert_eq!(cli.server.as_deref(), Some("http://localhost:9000"));
        match cli.command {
            Some(Commands::Ask {
                prompt,
                models,
                all,
                format,
            }) => {
                assert_eq!(prompt, "2+2");
                assert_eq!(models, vec!["OpenAI gpt-4", "Anthropic claude-3"]);
                assert!(!all);
                assert_eq!(format, Format::Html);
            }
            _ => return Err("Expected Ask command".into()),
        }
        Ok(())
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["moa", "models", "--log-level", "3"]);
        assert!(matches!(cli.command, Some(Commands::Models)));
        assert_eq!(cli.log_level, Some(3));
    }

    #[test]
    fn test_cli_init_command() {
        let cli = Cli::parse_from(["moa", "init", "--force"]);
        assert!(matches!(cli.command, Some(Commands::Init { force: true })));

        let cli = Cli::parse_from(["moa", "init"]);
        assert!(matches!(cli.command, Some(Commands::Init { force: false })));
    }

    #[test]
    fn test_load_config_falls_back_on_missing_file() {
        let config = load_config(Some(std::path::Path::new("/nonexistent/moa/config.json")));
        assert_eq!(config, Config::default());
    }
}
