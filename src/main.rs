use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use chatstream::cli::Commands;
use chatstream::connector::tui;
use chatstream::{ConsolePresenter, Container, ContainerConfig, FadeIn};

#[derive(Parser)]
#[command(name = "chatstream")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory for the log file written by the interactive chat
    #[arg(short, long, global = true, default_value = "~/.chatstream")]
    data_dir: String,

    /// Inference server URL (defaults to $OLLAMA_HOST, then http://localhost:11434)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Model to chat with (defaults to $OLLAMA_MODEL, then llama3.1)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Answer with a scripted reply instead of calling a server
    #[arg(long, global = true)]
    mock: bool,

    /// Fade-in duration of each revealed chunk, in milliseconds
    #[arg(long, global = true, default_value_t = FadeIn::DEFAULT_MILLIS)]
    fade_ms: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or_default();

    let log_file = match command {
        Commands::Chat => {
            let data_dir = expand_tilde(&cli.data_dir);
            std::fs::create_dir_all(&data_dir)?;
            Some(PathBuf::from(data_dir).join("chatstream.log"))
        }
        Commands::Ask { .. } => None,
    };
    init_logging(cli.verbose, log_file.as_deref())?;

    let container = Container::new(ContainerConfig {
        base_url: cli.host,
        model: cli.model,
        mock: cli.mock,
        fade_ms: cli.fade_ms,
    });
    info!(
        "Chatting with {} on {}",
        container.model(),
        container.backend()
    );

    match command {
        Commands::Chat => tui::run(&container).await,
        Commands::Ask { prompt } => ask(&container, &prompt.join(" ")).await,
    }
}

/// Stream one answer to stdout. Ctrl+C cancels the stream.
async fn ask(container: &Container, prompt: &str) -> Result<()> {
    let mut session = container.session(Arc::new(ConsolePresenter::stdout()));
    let pending = session.submit(prompt).await?;

    let handle = pending.handle().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let outcome = session.drive(pending).await;
    interrupt.abort();

    if outcome?.is_none() {
        eprintln!("Cancelled.");
    }
    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn defaults_to_chat() {
        let cli = Cli::try_parse_from(["chatstream"]).unwrap();
        assert_eq!(cli.command.unwrap_or_default(), Commands::Chat);
        assert_eq!(cli.fade_ms, FadeIn::DEFAULT_MILLIS);
    }

    #[test]
    fn ask_joins_prompt_words() {
        let cli = Cli::try_parse_from(["chatstream", "--mock", "ask", "why", "is", "the", "sky", "blue"])
            .unwrap();
        assert!(cli.mock);
        match cli.command {
            Some(Commands::Ask { prompt }) => assert_eq!(prompt.join(" "), "why is the sky blue"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn ask_requires_a_prompt() {
        assert!(Cli::try_parse_from(["chatstream", "ask"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["chatstream", "ask", "hi", "--model", "mistral"]).unwrap();
        assert_eq!(cli.model.as_deref(), Some("mistral"));
    }

    #[test]
    fn expands_home() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(expand_tilde("~/.chatstream"), "/home/tester/.chatstream");
        assert_eq!(expand_tilde("/tmp/x"), "/tmp/x");
    }
}
