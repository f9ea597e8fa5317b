//! Command-line flags and their mapping onto [`AssistantConfig`].

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use kubesage::DEFAULT_MODEL;
use kubesage::config::{AssistantConfig, DEFAULT_RETRIES};
use kubesage::context::{DEFAULT_TOKEN_LIMIT, TokenBudget};
use kubesage::exec::{DEFAULT_SHELL_PREFIX, ExecMode};

/// Ask questions about your Kubernetes cluster.
///
/// kubesage has a model suggest read-only kubectl commands, runs them,
/// redacts secrets from the output and answers from what it found. Lines
/// starting with the shell prefix (default `$`) run as-is.
#[derive(Parser, Debug)]
#[command(name = "kubesage", version)]
pub struct Cli {
    /// Ask one question and exit.
    #[arg(long)]
    pub prompt: Option<String>,

    /// Model to use for suggestions and answers.
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Confirm every batch of commands before it runs (runs them one at a time).
    #[arg(long)]
    pub safe_mode: bool,

    /// Per-command timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Suggestion attempts per question.
    #[arg(long, default_value_t = DEFAULT_RETRIES)]
    pub retries: u32,

    /// Model context window in tokens.
    #[arg(long, default_value_t = DEFAULT_TOKEN_LIMIT)]
    pub token_limit: usize,

    /// Prefix for operator shell commands.
    #[arg(long, default_value = DEFAULT_SHELL_PREFIX)]
    pub shell_prefix: String,

    /// Run commands one at a time even outside safe mode.
    #[arg(long)]
    pub sequential: bool,

    /// Load the conversation from this file and save it after every turn.
    #[arg(long)]
    pub history_file: Option<PathBuf>,

    /// Sampling temperature.
    #[arg(long, default_value_t = 0.2)]
    pub temperature: f32,

    /// More log output (-v info, -vv debug, -vvv trace). `RUST_LOG` wins.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn to_config(&self) -> AssistantConfig {
        let mut config = AssistantConfig::default()
            .with_model(self.model.clone())
            .with_temperature(self.temperature)
            .with_retries(self.retries)
            .with_budget(TokenBudget::new(self.token_limit))
            .with_safe_mode(self.safe_mode)
            .with_timeout(Duration::from_secs(self.timeout));
        config.exec.shell_prefix = self.shell_prefix.clone();
        if self.sequential {
            config.exec.mode = ExecMode::Sequential;
        }
        config
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> String {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        format!("warn,kubesage={level},kubesage_cli={level}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["kubesage"]).unwrap();
        let config = cli.to_config();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.retries, 3);
        assert_eq!(config.budget.limit, 8192);
        assert_eq!(config.exec.timeout, Duration::from_secs(30));
        assert_eq!(config.exec.mode, ExecMode::Auto);
        assert!(!config.exec.safe_mode);
        assert_eq!(cli.log_filter(), "warn,kubesage=warn,kubesage_cli=warn");
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "kubesage",
            "--safe-mode",
            "--timeout",
            "5",
            "--retries",
            "1",
            "--token-limit",
            "4096",
            "--shell-prefix",
            "!",
            "--sequential",
            "--history-file",
            "/tmp/h.json",
            "-vv",
        ])
        .unwrap();
        let config = cli.to_config();
        assert!(config.exec.safe_mode);
        assert_eq!(config.exec.timeout, Duration::from_secs(5));
        assert_eq!(config.retries, 1);
        assert_eq!(config.budget.limit, 4096);
        assert_eq!(config.exec.shell_prefix, "!");
        assert_eq!(config.exec.mode, ExecMode::Sequential);
        assert_eq!(cli.history_file, Some(PathBuf::from("/tmp/h.json")));
        assert!(cli.log_filter().contains("kubesage=debug"));
    }
}
