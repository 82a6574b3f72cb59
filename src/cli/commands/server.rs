use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::utils::{output_json, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Check server health from the /health endpoint")]
    Ping,

    #[command(about = "Show server information from the API root endpoint")]
    Info,
}

pub async fn handle(cmd: ServerCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Ping => {
            let started = std::time::Instant::now();
            let data = client.get("/health").await?;
            let elapsed_ms = started.elapsed().as_millis();

            let status = data.get("status").and_then(Value::as_str).unwrap_or("unknown");
            let version = data.pointer("/routes/version").cloned().unwrap_or(Value::Null);
            output_success(
                &output_format,
                &format!(
                    "{} is {} ({} ms, route version {})",
                    client.base_url(),
                    status,
                    elapsed_ms,
                    version
                ),
                Some(json!({ "health": data, "elapsed_ms": elapsed_ms })),
            )
        }
        ServerCommands::Info => {
            let data = client.get("/").await?;
            match output_format {
                OutputFormat::Json => output_json(&data),
                OutputFormat::Text => {
                    let name = data.get("name").and_then(Value::as_str).unwrap_or("?");
                    let version = data.get("version").and_then(Value::as_str).unwrap_or("?");
                    println!("{} {} at {}", name, version, client.base_url());
                    Ok(())
                }
            }
        }
    }
}
