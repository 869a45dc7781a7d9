//! Output formatting for CLI

use kino_telemetry::EnrichedEvent;
use serde::Serialize;
use serde_json::Value;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// Format structured data: pretty JSON, or one `path = value` line per leaf
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(data),
        OutputFormat::Text => {
            let mut lines = Vec::new();
            flatten("", &serde_json::to_value(data)?, &mut lines);
            Ok(lines.join("\n"))
        }
    }
}

/// Format one delivered event: a JSON line, or a compact text row
pub fn format_event(event: &EnrichedEvent, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(event),
        OutputFormat::Text => {
            let mut payload = serde_json::to_value(&event.event)?;
            if let Value::Object(fields) = &mut payload {
                fields.remove("event");
            }
            Ok(format!(
                "{:>4}  {}  {:<22} {}",
                event.sequence,
                event.timestamp.format("%H:%M:%S%.3f"),
                event.name(),
                payload
            ))
        }
    }
}

fn flatten(prefix: &str, value: &Value, lines: &mut Vec<String>) {
    match value {
        Value::Object(fields) => {
            for (key, value) in fields {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, value, lines);
            }
        }
        other => lines.push(format!("{prefix} = {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Text);
    }

    #[test]
    fn test_text_output_flattens() {
        let data = json!({ "dispatch": { "capacity": 1024 }, "protocol": "hls" });
        let text = format_output(&data, OutputFormat::Text).unwrap();
        assert_eq!(text, "dispatch.capacity = 1024\nprotocol = \"hls\"");
    }
}
