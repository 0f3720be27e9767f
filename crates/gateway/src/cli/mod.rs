pub mod ask;
pub mod config;

use clap::{Parser, Subcommand, ValueEnum};

use pr_domain::config::Config;
use pr_domain::intent::ChatMode;

/// Prysm: a conversational stock-analysis assistant.
#[derive(Debug, Parser)]
#[command(name = "prysm", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Send a single message and print the streamed answer.
    Ask {
        /// The message to send.
        message: String,
        /// Continue an existing session.
        #[arg(long)]
        session: Option<String>,
        /// Pin the conversation to this symbol.
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, value_enum, default_value_t = ModeArg::Entity)]
        mode: ModeArg,
        /// Free-text investor profile added to the framing.
        #[arg(long)]
        profile: Option<String>,
        /// Print a JSON object instead of streaming text.
        #[arg(long)]
        json: bool,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Overall,
    Entity,
}

impl From<ModeArg> for ChatMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Overall => ChatMode::Overall,
            ModeArg::Entity => ChatMode::Entity,
        }
    }
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `PRYSM_CONFIG` (or
/// `config.toml` by default). A missing file yields the defaults. Returns
/// the parsed [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("PRYSM_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(path: &str) -> anyhow::Result<Config> {
    if !std::path::Path::new(path).exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))
}
