use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use quip_runtime::ConnectionSupervisor;
use quip_scripts::ScriptRegistry;
use quip_transport::irc::IrcTransport;

/// quip — an IRC bot with pluggable scripts
#[derive(Parser)]
#[command(name = "quip", version, about, long_about = None)]
struct Cli {
    /// Path to quip.toml config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write a starter quip.toml at the config path and exit
    #[arg(long)]
    init: bool,
}

fn cmd_init(config_path: &std::path::Path) -> quip_core::Result<()> {
    if config_path.exists() {
        println!("{} already exists", config_path.display());
        return Ok(());
    }
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let starter = r##"# quip configuration

[connect]
server = "irc.libera.chat"
port = 6667
channels = ["#quip"]
nickname = "quip"
realname = "quip"
# reconnect = true
# reconnect_interval = 30
# reconnect_attempts = 5
# ping_interval = 60
# ping_limit = 3

[scripts]
# Scripts without an explicit enable_<name> key follow this default.
enable_default = true
# enable_weather = false
# markov_path = "markov.txt"
# markov_respond = "quip"
# remind_tasklimit = 5
# replace_maxlines = 5
# weather_key = "your-api-key"

[logging]
# level = "info"
"##;
    std::fs::write(config_path, starter)?;
    println!("Created config file in {}", config_path.display());
    Ok(())
}

async fn run(cli: Cli) -> quip_core::Result<()> {
    let config_path = quip_config::resolve_path(cli.config.as_deref());
    if cli.init {
        return cmd_init(&config_path);
    }
    let config = quip_config::load(Some(&config_path))?;

    // Resolve log level: --verbose > --quiet > --log-level > config default
    let log_level = if cli.verbose {
        "debug".to_string()
    } else if cli.quiet {
        "error".to_string()
    } else {
        cli.log_level.unwrap_or_else(|| config.logging.level.clone())
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let registry = ScriptRegistry::load(&config.scripts);
    info!(scripts = ?registry.names(), "scripts loaded");

    let transport = IrcTransport::new(
        &config.connect.server,
        config.connect.port,
        &config.connect.nickname,
        &config.connect.realname,
    );
    let supervisor = ConnectionSupervisor::new(transport, registry, config, Some(config_path));
    supervisor.run().await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
