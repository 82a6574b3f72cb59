use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::utils::{output_empty_collection, output_json, output_success};
use crate::cli::OutputFormat;
use crate::gateway::{validate_all, RouteDefinition};

#[derive(Subcommand)]
pub enum RouteCommands {
    #[command(about = "List gateway routes")]
    List,

    #[command(about = "Replace all gateway routes with the contents of a YAML or JSON file")]
    Apply {
        #[arg(help = "Route file (.yaml, .yml or .json)")]
        file: PathBuf,
    },

    #[command(about = "Show which route a request would be dispatched to")]
    Match {
        #[arg(help = "Request path")]
        path: String,
        #[arg(long, default_value = "GET", help = "Request method")]
        method: String,
        #[arg(long, help = "Request host")]
        host: Option<String>,
    },
}

pub async fn handle(cmd: RouteCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        RouteCommands::List => {
            let data = client.get("/route").await?;
            let routes = data.as_array().cloned().unwrap_or_default();
            if routes.is_empty() {
                return output_empty_collection(&output_format, "routes", "No routes configured");
            }
            match output_format {
                OutputFormat::Json => output_json(&data),
                OutputFormat::Text => {
                    for route in &routes {
                        println!("{}", describe_route(route));
                    }
                    Ok(())
                }
            }
        }
        RouteCommands::Apply { file } => {
            let definitions = load_route_file(&file)?;
            // Fail fast before the server sees an invalid set
            validate_all(&definitions)?;

            let refreshed = client.put("/route", &definitions).await?;
            let version = refreshed.get("version").cloned().unwrap_or(Value::Null);
            output_success(
                &output_format,
                &format!("Applied {} routes from {} (version {})", definitions.len(), file.display(), version),
                Some(json!({ "refreshed": refreshed })),
            )
        }
        RouteCommands::Match { path, method, host } => {
            let mut query = vec![("path", path), ("method", method)];
            if let Some(host) = host {
                query.push(("host", host));
            }
            let data = client.get_with_query("/route/match", &query).await?;
            match output_format {
                OutputFormat::Json => output_json(&data),
                OutputFormat::Text => {
                    let route_id = data.get("routeId").and_then(Value::as_str).unwrap_or("?");
                    let uri = data.get("uri").and_then(Value::as_str).unwrap_or("?");
                    let forwarded = data.get("path").and_then(Value::as_str).unwrap_or("");
                    println!("{} -> {}{}", route_id, uri.trim_end_matches('/'), forwarded);
                    Ok(())
                }
            }
        }
    }
}

/// Parse a route file, choosing YAML or JSON by extension
pub fn load_route_file(path: &Path) -> anyhow::Result<Vec<RouteDefinition>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        serde_json::from_str(&content).with_context(|| format!("invalid route JSON in {}", path.display()))
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("invalid route YAML in {}", path.display()))
    }
}

fn describe_route(route: &Value) -> String {
    let id = route.get("routeId").and_then(Value::as_str).unwrap_or("?");
    let uri = route.get("uri").and_then(Value::as_str).unwrap_or("?");
    let order = route.get("order").and_then(Value::as_i64).unwrap_or_default();
    let predicates: Vec<String> = route
        .get("predicates")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|p| p.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    format!("{:<24} order={:<4} {:<32} [{}]", id, order, uri, predicates.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_yaml_route_files_with_shortcuts() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "- id: hix-upms\n  uri: lb://hix-upms\n  order: 1\n  predicates:\n    - Path=/admin/**\n  filters:\n    - StripPrefix=1"
        )
        .unwrap();

        let routes = load_route_file(file.path()).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].route_id, "hix-upms");
        assert_eq!(routes[0].predicates[0].name, "Path");
        assert_eq!(routes[0].filters[0].name, "StripPrefix");
    }

    #[test]
    fn loads_json_route_files() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"routeId": "auth", "uri": "http://auth:3000", "predicates": ["/auth/**"]}}]"#).unwrap();

        let routes = load_route_file(file.path()).unwrap();
        assert_eq!(routes[0].route_id, "auth");
        assert_eq!(routes[0].predicates[0].name, "Path");
    }

    #[test]
    fn describes_routes_for_text_output() {
        let line = describe_route(&json!({
            "routeId": "auth", "uri": "http://auth", "order": 2,
            "predicates": [{"name": "Path", "args": {}}, {"name": "Method", "args": {}}]
        }));
        assert!(line.starts_with("auth"));
        assert!(line.contains("order=2"));
        assert!(line.ends_with("[Path, Method]"));
    }
}
