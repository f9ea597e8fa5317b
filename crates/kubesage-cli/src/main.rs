//! Interactive Kubernetes diagnostics in the terminal.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable. Extra
//! deny-list entries come from `KUBESAGE_BLOCKED_COMMANDS`, log filtering
//! from `RUST_LOG`.
//!
//! # Examples
//!
//! ```sh
//! # Interactive session, history kept across runs
//! kubesage --history-file ~/.kubesage/history.json
//!
//! # One question, every batch confirmed first
//! kubesage --safe-mode --prompt "why is the web deployment not ready?"
//! ```

mod cli;
mod terminal;

use std::path::Path;

use clap::Parser;
use kubesage::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cli::Cli;
use terminal::{ProgressPrinter, StdinConfirmer, prompt_line};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.to_config();

    let api_key = match std::env::var("OPENROUTER_KEY") {
        Ok(key) => key,
        Err(_) => {
            eprintln!("Error: OPENROUTER_KEY environment variable is not set");
            std::process::exit(1);
        }
    };
    let client = match OpenRouterClient::new(api_key) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to create API client: {e}");
            std::process::exit(1);
        }
    };
    let provider = OpenRouterProvider::new(client, config.model.clone())
        .with_temperature(config.temperature)
        .with_retry(config.api_retry.clone());

    let mut session = match &cli.history_file {
        Some(path) => match Session::load(path) {
            Ok(Some(session)) => {
                info!("resumed {} turn(s) from {}", session.turn, path.display());
                session
            }
            Ok(None) => Session::new(),
            Err(e) => {
                warn!("ignoring history file: {e}");
                Session::new()
            }
        },
        None => Session::new(),
    };

    // First Ctrl-C interrupts the running turn, a second one quits.
    let interrupt = Interrupt::new();
    {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if interrupt.is_triggered() {
                    std::process::exit(130);
                }
                interrupt.trigger();
                eprintln!("\nInterrupting after the current step (Ctrl-C again to quit)");
            }
        });
    }

    if let Some(question) = &cli.prompt {
        let history = cli.history_file.as_deref();
        if !run_turn(&mut session, &provider, &config, history, &interrupt, question).await {
            std::process::exit(1);
        }
        return;
    }

    eprintln!(
        "kubesage: ask about your cluster, `{} <command>` runs a command, `exit` quits.",
        config.exec.shell_prefix
    );
    while let Some(line) = prompt_line("kubesage> ") {
        match line.as_str() {
            "" => continue,
            "exit" | "quit" => break,
            input => {
                let history = cli.history_file.as_deref();
                run_turn(&mut session, &provider, &config, history, &interrupt, input).await;
            }
        }
    }
}

/// Process one line of input and print the answer. Returns `false` when
/// the turn failed.
async fn run_turn(
    session: &mut Session,
    provider: &dyn LlmProvider,
    config: &AssistantConfig,
    history_file: Option<&Path>,
    interrupt: &Interrupt,
    input: &str,
) -> bool {
    interrupt.reset();
    let result = session
        .process_turn(
            provider,
            config,
            input,
            Some(&StdinConfirmer),
            &ProgressPrinter,
            interrupt,
        )
        .await;
    match result {
        Ok(outcome) => {
            if outcome.degraded {
                eprintln!("(answered without cluster data)");
            }
            println!("{}\n", outcome.answer);
            if let Some(path) = history_file
                && let Err(e) = session.save(path)
            {
                warn!("could not save history: {e}");
            }
            true
        }
        Err(PipelineError::Cancelled) => {
            eprintln!("Interrupted.");
            true
        }
        Err(e) => {
            eprintln!("Error: {e}");
            false
        }
    }
}
