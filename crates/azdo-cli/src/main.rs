//! azdo - Azure DevOps work item tools for AI assistants.

use anyhow::Context;
use azdo_core::config::{env_token, Config, ENV_PAT, ENV_TOKEN};
use azdo_core::AzureDevOpsConfig;
use azdo_formatting::{format_description, split_task_descriptions};
use azdo_mcp::{McpServer, ToolHandler};
use azdo_storage::{stored_token, CredentialStore, KeychainStore, AZURE_DEVOPS_TOKEN_KEY};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "azdo")]
#[command(author, version, about = "Azure DevOps work item tools for AI assistants", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdin/stdout
    Serve,

    /// Show or change the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Manage the personal access token in the OS keychain
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Convert a description to the HTML sent to Azure DevOps
    Format {
        /// Description text; `\n` is treated as a line break
        text: String,
    },

    /// Split combined task descriptions, one per output line
    Split {
        /// Descriptions separated by `|||` (or commas)
        text: String,

        /// Number of tasks
        #[arg(short, long)]
        count: usize,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Set a value, e.g. `azure_devops.project Fabrikam`
    Set { key: String, value: String },

    /// Print the config file location
    Path,
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Store a personal access token
    Set { value: String },

    /// Remove the stored token
    Delete,

    /// Show where the token comes from
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Must run before anything reads the environment
    let dotenv = dotenvy::dotenv();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries JSON-RPC when serving
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    match cli.command {
        Some(Commands::Serve) => serve().await?,
        Some(Commands::Config { command }) => run_config(command)?,
        Some(Commands::Token { command }) => run_token(command)?,
        Some(Commands::Format { text }) => println!("{}", format_description(&text)),
        Some(Commands::Split { text, count }) => {
            for description in split_task_descriptions(&text, count) {
                println!("{}", description);
            }
        }
        None => {
            println!("azdo - Azure DevOps work item tools for AI assistants");
            println!("Run with --help for usage information");
        }
    }

    Ok(())
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// File, then environment, then keychain.
fn resolve_config() -> anyhow::Result<AzureDevOpsConfig> {
    let file = Config::load().context("Failed to load config file")?;
    let stored = match env_token(env_var) {
        Some(_) => None,
        None => stored_token(&KeychainStore::new()),
    };

    Ok(AzureDevOpsConfig::resolve(&file, env_var, stored)?)
}

async fn serve() -> anyhow::Result<()> {
    let config = resolve_config()?;
    tracing::info!(
        organization = %config.organization,
        project = %config.project,
        "Using Azure DevOps project"
    );

    let handler = ToolHandler::azure_devops(config)?;
    McpServer::new(handler).run().await?;
    Ok(())
}

fn run_config(command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let path = Config::config_path()?;
            let file = Config::load()?;
            println!("Config file: {}", path.display());

            for key in ["organization", "project", "base_url"] {
                let full_key = format!("azure_devops.{}", key);
                let value = file.get(&full_key)?;
                println!("{}: {}", key, value.as_deref().unwrap_or("(not set)"));
            }

            match resolve_config() {
                Ok(config) => println!(
                    "Effective project: {}/{}/{}",
                    config.base_url, config.organization, config.project
                ),
                Err(e) => println!("Not ready: {}", e),
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut file = Config::load()?;
            file.set(&key, &value)?;
            file.save()?;
            println!("Set {} = {}", key, value);
        }
        ConfigCommands::Path => {
            println!("{}", Config::config_path()?.display());
        }
    }
    Ok(())
}

fn run_token(command: TokenCommands) -> anyhow::Result<()> {
    let store = KeychainStore::new();

    match command {
        TokenCommands::Set { value } => {
            let value = value.trim();
            if value.is_empty() {
                anyhow::bail!("Token must not be empty");
            }
            store.store(AZURE_DEVOPS_TOKEN_KEY, value)?;
            println!("Token stored in keychain");
        }
        TokenCommands::Delete => {
            store.delete(AZURE_DEVOPS_TOKEN_KEY)?;
            println!("Token removed from keychain");
        }
        TokenCommands::Status => {
            if env_token(env_var).is_some() {
                println!("Token: set ({} or {})", ENV_TOKEN, ENV_PAT);
            } else if store.exists(AZURE_DEVOPS_TOKEN_KEY) {
                println!("Token: set (keychain)");
            } else {
                println!("Token: not set");
            }
        }
    }
    Ok(())
}
