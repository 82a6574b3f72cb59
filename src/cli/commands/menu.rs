use clap::Subcommand;
use serde_json::Value;

use crate::cli::client::ApiClient;
use crate::cli::utils::{output_empty_collection, output_json, render_menu_tree};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum MenuCommands {
    #[command(about = "Show the full menu tree of the tenant")]
    Tree,

    #[command(about = "Show one menu")]
    Show {
        #[arg(help = "Menu id")]
        id: i32,
    },
}

pub async fn handle(cmd: MenuCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        MenuCommands::Tree => {
            let data = client.get("/menu/tree").await?;
            if data.as_array().map(|a| a.is_empty()).unwrap_or(true) {
                return output_empty_collection(&output_format, "menus", "No menus defined");
            }
            match output_format {
                OutputFormat::Json => output_json(&data),
                OutputFormat::Text => {
                    for line in render_menu_tree(&data) {
                        println!("{}", line);
                    }
                    Ok(())
                }
            }
        }
        MenuCommands::Show { id } => {
            let data = client.get(&format!("/menu/{}", id)).await?;
            match output_format {
                OutputFormat::Json => output_json(&data),
                OutputFormat::Text => {
                    for key in ["menuId", "name", "parentId", "path", "permission", "icon", "sort", "type"] {
                        match data.get(key) {
                            Some(Value::Null) | None => {}
                            Some(Value::String(s)) => println!("{:<12} {}", key, s),
                            Some(other) => println!("{:<12} {}", key, other),
                        }
                    }
                    Ok(())
                }
            }
        }
    }
}
