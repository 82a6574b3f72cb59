use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data_value) = data {
                response["data"] = data_value;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: [] }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Print raw API data as pretty JSON
pub fn output_json(data: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Render a `MenuTree` JSON forest as indented lines
pub fn render_menu_tree(nodes: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    render_level(nodes, 0, &mut lines);
    lines
}

fn render_level(nodes: &Value, depth: usize, lines: &mut Vec<String>) {
    let Some(nodes) = nodes.as_array() else {
        return;
    };
    for node in nodes {
        let id = node.get("id").and_then(Value::as_i64).unwrap_or_default();
        let name = node.get("name").and_then(Value::as_str).unwrap_or("?");
        let kind = match node.get("type").and_then(Value::as_str) {
            Some("1") => " [button]",
            _ => "",
        };
        let path = node
            .get("path")
            .and_then(Value::as_str)
            .map(|p| format!("  {}", p))
            .unwrap_or_default();
        lines.push(format!("{}{} {}{}{}", "  ".repeat(depth), id, name, kind, path));
        if let Some(children) = node.get("children") {
            render_level(children, depth + 1, lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_tree() {
        let tree = json!([
            {"id": 1, "name": "System", "type": "0", "path": "/admin", "children": [
                {"id": 2, "name": "Delete", "type": "1", "children": []}
            ]},
            {"id": 5, "name": "Logs", "type": "0", "children": []}
        ]);
        assert_eq!(
            render_menu_tree(&tree),
            vec!["1 System  /admin".to_string(), "  2 Delete [button]".to_string(), "5 Logs".to_string()]
        );
    }
}
