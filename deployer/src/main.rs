//! Miner Deploy - Entry Point
//!
//! Provisions a local or remote host and runs the solo miner container.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use secrecy::SecretString;
use tracing::{debug, warn};

use miner_deploy::app::options::DeployOptions;
use miner_deploy::app::run::{run, TargetRequest};
use miner_deploy::errors::DeployError;
use miner_deploy::logs::{init_logging, LogLevel, LogOptions};
use miner_deploy::models::result::DeploymentResult;
use miner_deploy::models::target::{AuthMode, DeployMode};
use miner_deploy::prompt::{InputCollector, Prefill, ENV_SSH_PASSWORD};
use miner_deploy::settings::load_settings;
use miner_deploy::utils::version_info;

/// Deploy the BTC solo miner container locally or to a remote Linux host
#[derive(Parser, Debug)]
#[command(name = "miner-deploy", disable_version_flag = true)]
struct Cli {
    /// Deploy on this machine or on a remote host
    #[arg(long, value_enum)]
    mode: Option<DeployMode>,

    /// Remote host name or address
    #[arg(long)]
    host: Option<String>,

    /// Remote login user
    #[arg(long)]
    user: Option<String>,

    /// Remote ssh port
    #[arg(long)]
    port: Option<u16>,

    /// Remote authentication (the password is read from MINER_DEPLOY_SSH_PASSWORD or prompted)
    #[arg(long, value_enum)]
    auth: Option<AuthMode>,

    /// Bitcoin address receiving block rewards
    #[arg(long, env = "BTC_ADDRESS")]
    address: Option<String>,

    /// Telegram bot token for notifications
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_token: Option<String>,

    /// Telegram user id receiving notifications
    #[arg(long, env = "TELEGRAM_USER_ID")]
    telegram_user_id: Option<String>,

    /// Ask the miner for quiet output (local deployments only)
    #[arg(long)]
    quiet: bool,

    /// Source repository cloned onto remote hosts
    #[arg(long)]
    repo_url: Option<String>,

    /// Settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Log as JSON
    #[arg(long)]
    json_logs: bool,

    /// Never prompt; missing required values are errors
    #[arg(long)]
    non_interactive: bool,

    /// Print version information and exit
    #[arg(long)]
    version: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to print version: {}", e),
        }
        return ExitCode::SUCCESS;
    }

    match deploy(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn deploy(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(cli.settings.as_deref())
        .await
        .context("loading settings")?;

    let log_options = LogOptions {
        log_level: cli.log_level.unwrap_or(settings.log_level),
        json_format: cli.json_logs,
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }
    debug!("Settings: {:?}", settings);

    println!("{}", "BTC Solo Miner Deployment".bold());
    println!("=========================");
    println!();

    let mut options = DeployOptions::from(&settings);
    if let Some(port) = cli.port {
        options.ssh.port = port;
    }

    let interactive = !cli.non_interactive && std::io::stdin().is_terminal();
    if !cli.non_interactive && !interactive {
        warn!("stdin is not a terminal, prompts are disabled");
    }

    let prefill = Prefill {
        mode: cli.mode,
        host: cli.host,
        user: cli.user,
        port: options.ssh.port,
        auth: cli.auth,
        password: std::env::var(ENV_SSH_PASSWORD).ok().map(SecretString::from),
        btc_address: cli.address,
        repo_url: cli
            .repo_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| options.source.repo_url.clone()),
        telegram_token: cli.telegram_token,
        telegram_user_id: cli.telegram_user_id,
        quiet: cli.quiet,
    };
    let input = InputCollector::new(prefill, interactive)
        .collect()
        .context("collecting deployment input")?;
    options.source.repo_url = input.repo_url;

    let destination = match &input.target {
        TargetRequest::Local => "this machine".to_string(),
        TargetRequest::Remote(request) => format!("{}@{}", request.user, request.host),
    };
    println!("Deploying to {}...", destination);
    println!();

    let result = run(input.target, input.config, &options).await;
    print_report(&result, &destination);

    match result.error {
        Some(e) => Err(anyhow::Error::new(e).context(format!("{} stage failed", result.stage))),
        None => Ok(()),
    }
}

fn print_report(result: &DeploymentResult, destination: &str) {
    if !result.is_success() {
        return;
    }

    if let Some(snapshot) = &result.snapshot {
        if !snapshot.status.is_empty() {
            println!("{}", "Status".bold());
            println!("{}", snapshot.status);
            println!();
        }
        if !snapshot.recent_logs.is_empty() {
            println!("{}", "Recent logs".bold());
            for line in &snapshot.recent_logs {
                println!("  {}", line);
            }
            println!();
        }
    }

    let elapsed = result.finished_at - result.started_at;
    println!(
        "{} Miner is running on {} (took {}s)",
        "[SUCCESS]".green().bold(),
        destination,
        elapsed.num_seconds()
    );
    for follow_up in &result.follow_up {
        println!("  {:<10} {}", format!("{}:", follow_up.purpose), follow_up.command);
    }
}

/// Stderr tag for a failure, taken from the deployment error inside it
fn error_label(error: &anyhow::Error) -> &'static str {
    error
        .downcast_ref::<DeployError>()
        .map(DeployError::label)
        .unwrap_or("ERROR")
}

fn print_error(error: &anyhow::Error) {
    eprintln!();
    eprintln!("{} {}: {:#}", "[ERROR]".red().bold(), error_label(error), error);

    let logs = error
        .downcast_ref::<DeployError>()
        .map(DeployError::captured_logs)
        .unwrap_or_default();
    if !logs.is_empty() {
        eprintln!("Last container log lines:");
        for line in logs {
            eprintln!("  {}", line);
        }
    }
}
