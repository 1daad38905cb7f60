use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data) = data {
                response["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a response payload: pretty JSON, or a line per item in text mode
pub fn output_value(output_format: OutputFormat, value: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => {
            for line in text_lines(value) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn text_lines(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) if items.iter().all(Value::is_string) => {
            items.iter().filter_map(Value::as_str).map(str::to_string).collect()
        }
        Value::Object(map) if map.contains_key("Items") => {
            let mut lines = Vec::new();
            if let Some(items) = map.get("Items").and_then(Value::as_array) {
                lines.extend(items.iter().map(Value::to_string));
            }
            lines.push(format!(
                "-- page {} of {} ({} total)",
                map.get("CurrentPage").unwrap_or(&Value::Null),
                map.get("TotalPages").unwrap_or(&Value::Null),
                map.get("TotalItems").unwrap_or(&Value::Null),
            ));
            lines
        }
        Value::Null => Vec::new(),
        other => serde_json::to_string_pretty(other).map(|s| vec![s]).unwrap_or_default(),
    }
}
