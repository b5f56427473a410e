use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dmrelay")]
#[command(about = "Instagram DM webhook relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json (existing files are kept).
    Init {
        /// Config file path (default: DMRELAY_CONFIG_PATH or ~/.dmrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the webhook gateway (GET/POST /webhook). Credentials come from the environment or config.
    Gateway {
        /// Config file path (default: DMRELAY_CONFIG_PATH or ~/.dmrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from PORT, then config, then 5000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Resolve one message locally and print the reply that would be sent.
    Resolve {
        /// Config file path (default: DMRELAY_CONFIG_PATH or ~/.dmrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Message text as a user would send it.
        text: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env: {}", e);
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("dmrelay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Resolve { config, text }) => {
            if let Err(e) = run_resolve(config, text).await {
                log::error!("resolve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(relay::config::default_config_path);
    let dir = relay::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (config, path) = relay::config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    let mut config = relay::config::apply_env_overrides(config);
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{}",
        config.gateway.bind,
        config.gateway.port
    );
    relay::gateway::run_gateway(config).await
}

async fn run_resolve(config_path: Option<PathBuf>, text: String) -> anyhow::Result<()> {
    let (config, _) = relay::config::load_config(config_path)?;
    let config = relay::config::apply_env_overrides(config);
    let completion = Arc::new(relay::llm::CompletionClient::from_config(&config));
    let resolver = relay::resolver::ResponseResolver::new(
        Arc::new(relay::catalog::ProductCatalog::builtin()),
        completion,
    );
    println!("{}", resolver.resolve(&text).await);
    Ok(())
}
