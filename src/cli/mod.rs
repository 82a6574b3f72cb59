pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use client::ApiClient;

#[derive(Parser)]
#[command(name = "hix")]
#[command(about = "hix - command-line client for the hix-admin API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, env = "HIX_SERVER", default_value = "http://localhost:9999", help = "API base URL")]
    pub server: String,

    #[arg(long, global = true, env = "HIX_TOKEN", hide_env_values = true, help = "Bearer token")]
    pub token: Option<String>,

    #[arg(long, global = true, env = "HIX_TENANT", help = "Tenant id sent in the tenant header")]
    pub tenant: Option<i32>,

    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Gateway route administration")]
    Route {
        #[command(subcommand)]
        cmd: commands::route::RouteCommands,
    },

    #[command(about = "Menu administration")]
    Menu {
        #[command(subcommand)]
        cmd: commands::menu::MenuCommands,
    },

    #[command(about = "Server reachability and information")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json && !cli.text {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = ApiClient::new(&cli.server, cli.token.clone(), cli.tenant)?;

    match cli.command {
        Commands::Route { cmd } => commands::route::handle(cmd, &client, output_format).await,
        Commands::Menu { cmd } => commands::menu::handle(cmd, &client, output_format).await,
        Commands::Server { cmd } => commands::server::handle(cmd, &client, output_format).await,
    }
}
