mod ask;
mod config;
mod error;
mod store;

#[cfg(feature = "chat")]
mod chat;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use parley_client::ApiClient;
use parley_core::{ChatSession, SessionStore};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, load_config, load_credentials};
use crate::error::ToolError;
use crate::store::{FileSessionStore, default_log_path, default_session_dir};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Chat with a hosted knowledge-base assistant", long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory the session snapshot is kept in
    #[arg(long, global = true)]
    session_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[cfg(feature = "chat")]
    /// Open the full-page chat thread
    Chat {
        /// Continue this thread instead of the saved one
        #[arg(long)]
        thread: Option<String>,

        /// Model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Start a new thread
        #[arg(long)]
        new: bool,
    },

    /// Ask one question and stream the answer to stdout
    Ask {
        text: String,

        /// Continue this thread instead of the saved one
        #[arg(long)]
        thread: Option<String>,

        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    let session_dir = cli
        .session_dir
        .or_else(|| config.session_dir.clone())
        .unwrap_or_else(default_session_dir);

    match cli.command {
        #[cfg(feature = "chat")]
        Command::Chat { thread, model, new } => {
            init_file_logging(&default_log_path())?;
            if let Some(model) = model {
                config.widget.generation.model = model;
            }
            let session = open_session(&config, &session_dir, thread)?;
            chat::run(session, new).await?;
        }
        Command::Ask {
            text,
            thread,
            model,
        } => {
            init_stderr_logging();
            if let Some(model) = model {
                config.widget.generation.model = model;
            }
            let session = open_session(&config, &session_dir, thread)?;
            ask::run(&session, &text).await?;
        }
    }

    Ok(())
}

fn open_session(
    config: &Config,
    session_dir: &Path,
    thread: Option<String>,
) -> Result<ChatSession<ApiClient>, ToolError> {
    let credentials = load_credentials(config)?;
    let client = match &config.base_url {
        Some(url) => ApiClient::with_base_url(&credentials.key, &credentials.secret, url.as_str()),
        None => ApiClient::new(&credentials.key, &credentials.secret),
    };
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::open(session_dir)?);

    let mut builder = ChatSession::builder(client, config.widget.clone()).store(store);
    if let Some(thread) = thread {
        builder = builder.thread_id(thread);
    }
    Ok(builder.build())
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn init_file_logging(path: &Path) -> Result<(), ToolError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter("parley=info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
    report_init(installed, &path.display().to_string());
    Ok(())
}

fn init_stderr_logging() -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter("parley=warn"))
        .with_writer(std::io::stderr)
        .try_init();
    report_init(installed, "stderr")
}

/// Says so on stderr when the subscriber could not be installed.
fn report_init(result: Result<(), impl std::fmt::Display>, sink: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Logging to {} is disabled: {}", sink, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_subscriber_is_reported() {
        init_stderr_logging();
        assert!(!init_stderr_logging());
    }

    #[test]
    fn init_outcome_is_passed_through() {
        assert!(report_init(Ok::<(), String>(()), "stderr"));
        assert!(!report_init(Err("already set"), "stderr"));
    }
}
