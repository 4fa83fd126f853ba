//! Command-line interface parsing and startup
//!
//! Keys and configuration are resolved before the terminal is touched, so a
//! missing credential is reported on a normal screen.

use std::error::Error;
use std::path::PathBuf;
use std::sync::LazyLock;

use clap::Parser;
use tracing::info;

use crate::core::config::{ApiKeys, Config, KeysError};
use crate::provider::{resolve_endpoints, MultiProviderBackend};
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::init_logging;

const GIT_DESCRIBE: &str = match option_env!("VERGEN_GIT_DESCRIBE") {
    Some(describe) => describe,
    None => "unknown",
};
const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

static LONG_VERSION: LazyLock<String> =
    LazyLock::new(|| format!("{} ({})", env!("CARGO_PKG_VERSION"), GIT_DESCRIBE));

#[derive(Parser, Debug)]
#[command(name = "multichat")]
#[command(version, long_version = LONG_VERSION.as_str())]
#[command(about = "A terminal chat that asks several models at once")]
#[command(
    long_about = "Multichat is a full-screen terminal chat interface. Every message you send \
is answered by each configured provider, and you keep the reply you like best.\n\n\
Keys:\n\
  Put ANTHROPIC_API_KEY=\"...\", OPENAI_API_KEY=\"...\" and/or MISTRAL_API_KEY=\"...\"\n\
  lines in keys.conf (current directory or config directory), or pass --keys.\n\
  Environment variables with the same names fill in missing keys.\n\n\
Controls:\n\
  Enter             Submit the input\n\
  PageUp/PageDown   Scroll the conversation\n\
  Ctrl+C            Quit the application\n\n\
When replies are shown, type a reply's number to keep it. Anything else asks\n\
for new replies, and non-empty text is sent as a new message first."
)]
pub struct Args {
    /// Read API keys from this file instead of searching for keys.conf
    #[arg(short = 'k', long, value_name = "PATH")]
    pub keys: Option<PathBuf>,

    /// Write diagnostic logs to this file
    #[arg(short = 'l', long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Redraw interval in milliseconds (overrides config.toml)
    #[arg(long, value_name = "MS")]
    pub tick_ms: Option<u64>,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log.as_deref())?;

    let keys = match ApiKeys::discover(args.keys.as_deref()) {
        Ok(keys) => keys,
        Err(e) => {
            if let KeysError::NoCredentials { searched } = &e {
                tracing::error!(searched = searched.len(), "no credentials");
            }
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let config = Config::load()?;
    let endpoints = resolve_endpoints(&keys, &config);
    if endpoints.is_empty() {
        eprintln!("❌ Every provider with a key is disabled in config.toml");
        std::process::exit(1);
    }
    let tick = config.tick_interval(args.tick_ms);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_sha = GIT_SHA,
        providers = ?endpoints.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
        "starting"
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let backend = MultiProviderBackend::new(reqwest::Client::new(), endpoints);
        run_chat(backend, tick).await
    })
}
