use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storefront_plugins::backdrop::{TimerQueue, BACKDROP_OPEN_CLASS, NO_SCROLL_CLASS};
use storefront_plugins::behaviors::BehaviorCatalog;
use storefront_plugins::dom::Document;
use storefront_plugins::{PluginManager, RuntimeConfig};

#[derive(Parser)]
#[command(name = "storefront-plugins")]
#[command(about = "Attach behavior plugins to a storefront document", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register configured plugins, execute them, and report instances
    Run {
        /// Document tree as JSON
        #[arg(short, long)]
        document: PathBuf,
        /// Plugin config (defaults to the platform config directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Report format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Open and close the modal backdrop on a document, reporting each step
    Backdrop {
        /// Document tree as JSON
        #[arg(short, long)]
        document: PathBuf,
        /// Plugin config (defaults to the platform config directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List available behavior kinds
    Behaviors,
    /// Show version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<RuntimeConfig> {
    let path = match path {
        Some(path) => path,
        None => match RuntimeConfig::default_path().filter(|p| p.exists()) {
            Some(path) => path,
            None => {
                info!("No plugin config found, nothing to register");
                return Ok(RuntimeConfig::default());
            }
        },
    };
    RuntimeConfig::load(&path).with_context(|| format!("loading config {}", path.display()))
}

fn run(document: PathBuf, config: Option<PathBuf>, format: Format) -> anyhow::Result<()> {
    let doc = Document::load(&document)
        .with_context(|| format!("loading document {}", document.display()))?;
    let config = load_config(config)?;
    let catalog = BehaviorCatalog::builtin();

    let mut manager = PluginManager::new(doc.clone());
    config
        .apply(&mut manager, &catalog)
        .context("registering plugins")?;
    let instances = manager.execute_plugins().context("executing plugins")?;
    info!(
        plugins = manager.get_plugins().len(),
        instances, "Activation complete"
    );

    let attached: Vec<_> = doc
        .elements()
        .into_iter()
        .filter(|el| el.has_plugin_instances())
        .map(|el| {
            let names = manager.get_plugin_instances(&el).names();
            (el, names)
        })
        .filter(|(_, names)| !names.is_empty())
        .collect();

    match format {
        Format::Text => {
            for (el, names) in &attached {
                println!("{}: {}", el, names.join(", "));
            }
        }
        Format::Json => {
            let report: Vec<_> = attached
                .iter()
                .map(|(el, names)| json!({ "element": el.to_string(), "plugins": names }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn run_backdrop(document: PathBuf, config: Option<PathBuf>) -> anyhow::Result<()> {
    let doc = Document::load(&document)
        .with_context(|| format!("loading document {}", document.display()))?;
    let config = load_config(config)?;
    let timers = TimerQueue::new();
    let backdrop = config.backdrop(doc.clone(), timers.clone());

    let report = |step: &str| {
        let open = backdrop
            .backdrops()
            .iter()
            .any(|el| el.has_class(BACKDROP_OPEN_CLASS));
        println!(
            "{:>5}ms {:<8} backdrops={} open={} no-scroll={}",
            timers.now(),
            step,
            backdrop.backdrops().len(),
            open,
            doc.root().has_class(NO_SCROLL_CLASS)
        );
    };

    backdrop.open(None);
    report("open");
    timers.advance(1);
    report("shown");
    backdrop.close(None);
    report("close");
    timers.advance(config.backdrop.remove_delay_ms);
    report("removed");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match cli.command {
        Some(Commands::Run {
            document,
            config,
            format,
        }) => run(document, config, format)?,
        Some(Commands::Backdrop { document, config }) => run_backdrop(document, config)?,
        Some(Commands::Behaviors) => {
            for kind in BehaviorCatalog::builtin().kinds() {
                println!("{}", kind);
            }
        }
        Some(Commands::Version) | None => {
            println!("storefront-plugins {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
