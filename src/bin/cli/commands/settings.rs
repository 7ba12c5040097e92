use anyhow::{Context, Result};
use serde_json::Value;

use parley_lib::settings::{redact, REDACTED};

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run_show(app: &App, reveal: bool, format: &OutputFormat, use_color: bool) -> Result<()> {
    let mut doc = app.settings.load().context("Failed to load settings")?;
    if !reveal {
        redact(&mut doc);
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Plain => {
            println!(
                "{}",
                paint(&app.settings.file_path().display().to_string(), Color::GRAY, use_color)
            );
            let mut rows = Vec::new();
            flatten("", &doc, &mut rows);
            let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            for (key, value) in rows {
                println!("{:<width$}  {}", key, value, width = width);
            }
        }
    }
    Ok(())
}

pub fn run_get(app: &App, path: &str, format: &OutputFormat) -> Result<()> {
    let value = app
        .settings
        .get(path)
        .with_context(|| format!("Failed to read setting '{}'", path))?
        .with_context(|| format!("Setting '{}' is not set", path))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Plain => println!("{}", display_value(&value)),
    }
    Ok(())
}

pub fn run_set(
    app: &App,
    path: &str,
    raw: &str,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let sensitive = app.settings.is_sensitive(path);
    let value = parse_set_value(raw, sensitive);
    app.settings
        .set(path, value.clone())
        .with_context(|| format!("Failed to set '{}'", path))?;

    match format {
        OutputFormat::Json => {
            let report = set_report(path, value, sensitive);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Plain => {
            let note = if sensitive { " (encrypted)" } else { "" };
            println!("{} {}{}", paint("Set", Color::GREEN, use_color), path, note);
        }
    }
    Ok(())
}

/// Command-line text to a JSON value. Secrets are always taken verbatim so a
/// digit-only key stays a string.
fn parse_set_value(raw: &str, sensitive: bool) -> Value {
    if sensitive {
        return Value::String(raw.to_string());
    }
    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn set_report(path: &str, value: Value, sensitive: bool) -> Value {
    let shown = if sensitive {
        Value::String(REDACTED.to_string())
    } else {
        value
    };
    serde_json::json!({
        "path": path,
        "value": shown,
        "encrypted": sensitive,
    })
}

/// Dot-path rows for every leaf of a document
fn flatten(prefix: &str, value: &Value, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, child, rows);
            }
        }
        _ => rows.push((prefix.to_string(), display_value(value))),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
