use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use riskflow_core::{RiskRuleSet, WeightConfig};
use riskflow_runtime::{
    AnalysisGateway, ConfigGateway, GatewayConfig, HttpGateway, WizardController,
};

mod render;
mod wizard;

#[derive(Parser, Debug)]
#[command(name = "riskflow", version, about = "Risk questionnaire client")]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,

    #[arg(
        long,
        global = true,
        help = "Analysis service URL (default: $RISKFLOW_API_BASE_URL or http://localhost:8000)"
    )]
    base_url: Option<String>,

    #[arg(
        long,
        global = true,
        value_parser = humantime::parse_duration,
        help = "Per-request timeout, e.g. 60s (default: $RISKFLOW_TIMEOUT or 60s)"
    )]
    timeout: Option<Duration>,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Walk through the four analysis steps interactively
    Wizard,
    /// Run a static scan of a profile
    Scan { text: String },
    /// Score a counterpart response on its own
    Dynamic { response: String },
    /// Run the full analysis of a profile and a response
    Analyze { input: String, response: String },
    /// Check the analysis service is up
    Health,
    /// Read or replace the service configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    Rules {
        #[command(subcommand)]
        command: EditCommands,
    },
    Weights {
        #[command(subcommand)]
        command: EditCommands,
    },
    Knowledge {
        #[command(subcommand)]
        command: KnowledgeCommands,
    },
}

#[derive(Subcommand, Debug)]
enum EditCommands {
    Get,
    Set { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum KnowledgeCommands {
    List,
    Upload { file: PathBuf },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn gateway_config(cli: &Cli) -> Result<GatewayConfig> {
    let mut config = GatewayConfig::from_env().context("invalid RISKFLOW_* environment")?;
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url.clone());
    }
    if let Some(timeout) = cli.timeout {
        config = config.with_timeout(timeout);
    }
    Ok(config)
}

/// Print `data` as JSON or through `text`.
fn print_out<T: Serialize>(json: bool, data: &T, text: impl Fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(data)?);
    } else {
        print!("{}", text(data));
    }
    Ok(())
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("{} has no usable file name", path.display()))
}

async fn run_config(gateway: &HttpGateway, json: bool, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Rules { command } => {
            let rules = match command {
                EditCommands::Get => gateway.get_risk_rules().await?,
                EditCommands::Set { file } => {
                    let rules = RiskRuleSet::from_file(&file)
                        .with_context(|| format!("failed to load rules from {}", file.display()))?;
                    gateway.update_risk_rules(&rules).await?
                }
            };
            print_out(json, &rules, render::render_rules)
        }
        ConfigCommands::Weights { command } => {
            let config = match command {
                EditCommands::Get => gateway.get_weight_config().await?,
                EditCommands::Set { file } => {
                    let config = WeightConfig::from_file(&file).with_context(|| {
                        format!("failed to load weight config from {}", file.display())
                    })?;
                    gateway.update_weight_config(&config).await?
                }
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", serde_yaml::to_string(&config)?);
            }
            Ok(())
        }
        ConfigCommands::Knowledge { command } => match command {
            KnowledgeCommands::List => {
                let base = gateway.get_knowledge_base().await?;
                print_out(json, &base, render::render_knowledge)
            }
            KnowledgeCommands::Upload { file } => {
                let name = file_name(&file)?;
                let content = std::fs::read(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?;
                let uploaded = gateway.upload_knowledge(&name, content).await?;
                print_out(json, &uploaded, render::render_knowledge_file)
            }
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = gateway_config(&cli)?;
    tracing::debug!(api_root = %config.api_root(), timeout = ?config.timeout, "Using analysis service");
    let gateway = HttpGateway::new(config).context("failed to create HTTP client")?;

    match cli.command {
        Commands::Wizard => {
            let controller = WizardController::new(Arc::new(gateway));
            let stdin = std::io::stdin();
            wizard::run(&controller, stdin.lock(), std::io::stdout()).await?;
        }
        Commands::Scan { text } => {
            let result = gateway.static_scan(&text).await?;
            print_out(cli.json, &result, render::render_result)?;
        }
        Commands::Dynamic { response } => {
            let session = gateway.dynamic_analysis(&response).await?;
            print_out(cli.json, &session, render::render_dynamic)?;
        }
        Commands::Analyze { input, response } => {
            let result = gateway.full_analysis(&input, &response).await?;
            print_out(cli.json, &result, render::render_result)?;
        }
        Commands::Health => {
            let status = gateway.health_check().await?;
            print_out(cli.json, &status, |s| {
                format!(
                    "{} ({})\n",
                    s.status,
                    s.service.as_deref().unwrap_or("analysis service")
                )
            })?;
        }
        Commands::Config { command } => run_config(&gateway, cli.json, command).await?,
    }

    Ok(())
}
