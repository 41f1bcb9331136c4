//! Command-line definition

use clap::{Args, Parser, Subcommand, ValueEnum};
use guardrails_console_core::ScanConfiguration;
use std::path::PathBuf;

/// Terminal console for the AI Guardrails gateway.
#[derive(Debug, Parser)]
#[command(name = "guardrails", version, about)]
pub struct Cli {
    /// TOML configuration file. `GUARDRAILS_*` variables override it.
    #[arg(long, global = true, env = "GUARDRAILS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// How results are printed on stdout.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account and store its API key.
    Register(AccountArgs),
    /// Log in and store the returned API key.
    Login(AccountArgs),
    /// Forget the stored API key.
    Logout,
    /// Scan a prompt through the gateway.
    Scan(ScanArgs),
    /// Show one page of the audit log.
    Audit {
        /// Zero-based page index.
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Show aggregate statistics.
    Stats,
    /// Delete every audit entry.
    Clear,
    /// Follow statistics and the newest audit entries until interrupted.
    Watch,
}

#[derive(Debug, Args)]
pub struct AccountArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long, env = "GUARDRAILS_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Prompt text to scan.
    pub prompt: String,

    /// Skip prompt injection detection.
    #[arg(long)]
    pub no_injection: bool,

    /// Skip toxicity detection.
    #[arg(long)]
    pub no_toxicity: bool,

    /// Skip PII redaction.
    #[arg(long)]
    pub no_pii: bool,

    /// Comma separated topics to block, e.g. `politics,cooking`.
    #[arg(long, value_name = "TOPICS")]
    pub block_topics: Option<String>,
}

impl ScanArgs {
    pub fn configuration(&self) -> ScanConfiguration {
        let config = ScanConfiguration::default()
            .with_injection(!self.no_injection)
            .with_toxicity(!self.no_toxicity)
            .with_pii_redaction(!self.no_pii);
        match &self.block_topics {
            Some(csv) => config.with_topics_csv(csv),
            None => config,
        }
    }
}
