//! Structured output: JSON/YAML printing with optional JMESPath filtering

use anyhow::{Context, Result};
use jpx_core::Runtime;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Global JMESPath runtime with extended functions
static JMESPATH_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get or initialize the JMESPath runtime with extended functions
pub fn get_jmespath_runtime() -> &'static Runtime {
    JMESPATH_RUNTIME.get_or_init(|| Runtime::builder().with_all_extensions().build())
}

/// Quote bare words inside backtick literals.
///
/// Users write filters like ``[?state==`new`]``; `jpx-core` only accepts JSON
/// between backticks, so `new` becomes `"new"`. Literals that already parse as
/// JSON (ids, booleans, quoted strings) pass through.
fn normalize_backtick_literals(query: &str) -> String {
    static LITERAL: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = LITERAL
        .get_or_init(|| Regex::new(r"`([^`\\]*(?:\\.[^`\\]*)*)`").ok())
        .as_ref()
    else {
        return query.to_string();
    };

    re.replace_all(query, |caps: &regex::Captures| {
        let literal = caps[1].trim();
        if serde_json::from_str::<Value>(literal).is_ok() {
            return caps[0].to_string();
        }
        let quoted = literal.replace('\\', "\\\\").replace('"', "\\\"");
        format!("`\"{}\"`", quoted)
    })
    .into_owned()
}

/// Compile a JMESPath expression against the extended runtime
pub fn compile_jmespath(
    query: &str,
) -> Result<jpx_core::Expression<'static>, jpx_core::JmespathError> {
    get_jmespath_runtime().compile(&normalize_backtick_literals(query))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

impl From<crate::cli::OutputFormat> for OutputFormat {
    fn from(format: crate::cli::OutputFormat) -> Self {
        match format {
            crate::cli::OutputFormat::Yaml => OutputFormat::Yaml,
            crate::cli::OutputFormat::Table => OutputFormat::Table,
            crate::cli::OutputFormat::Json | crate::cli::OutputFormat::Auto => OutputFormat::Json,
        }
    }
}

/// Apply a JMESPath query to already-serialized data
pub fn apply_query(value: Value, query: Option<&str>) -> Result<Value> {
    match query {
        Some(query_str) => {
            let expr = compile_jmespath(query_str)
                .with_context(|| format!("Invalid JMESPath expression: {}", query_str))?;
            Ok(expr.search(&value).context("JMESPath query failed")?)
        }
        None => Ok(value),
    }
}

pub fn print_output<T: Serialize>(
    data: T,
    format: OutputFormat,
    query: Option<&str>,
) -> Result<()> {
    let json_value = apply_query(serde_json::to_value(data)?, query)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_value)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&json_value)?);
        }
        OutputFormat::Table => {
            println!("{}", render_value_table(&json_value));
        }
    }

    Ok(())
}

/// Render arbitrary JSON as a table: arrays of objects get one column per key
/// of the first element, objects become KEY/VALUE rows
pub fn render_value_table(value: &Value) -> String {
    let mut builder = Builder::default();
    match value {
        Value::Array(arr) if !arr.is_empty() => {
            if let Value::Object(first) = &arr[0] {
                let headers: Vec<String> = first.keys().cloned().collect();
                builder.push_record(headers.iter().map(|h| h.to_uppercase()));
                for item in arr {
                    if let Value::Object(obj) = item {
                        builder.push_record(
                            headers
                                .iter()
                                .map(|h| format_value(obj.get(h).unwrap_or(&Value::Null))),
                        );
                    }
                }
            } else {
                builder.push_record(["VALUE"]);
                for item in arr {
                    builder.push_record([format_value(item)]);
                }
            }
        }
        Value::Object(obj) => {
            builder.push_record(["KEY", "VALUE"]);
            for (key, val) in obj {
                builder.push_record([key.clone(), format_value(val)]);
            }
        }
        _ => return format_value(value),
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_filters_before_printing() {
        let data = serde_json::json!([
            {"name": "CS1", "state": "new"},
            {"name": "CS2", "state": "promoted"}
        ]);
        let filtered = apply_query(data, Some("[?state==`new`].name")).unwrap();
        assert_eq!(filtered, serde_json::json!(["CS1"]));
    }

    #[test]
    fn test_invalid_query_is_reported() {
        let err = apply_query(serde_json::json!({}), Some("[?")).unwrap_err();
        assert!(err.to_string().contains("Invalid JMESPath expression"));
    }

    #[test]
    fn test_value_table_from_objects() {
        let rendered = render_value_table(&serde_json::json!([
            {"id": 50, "name": "CS1", "views": [1, 2]}
        ]));
        assert!(rendered.contains("NAME"));
        assert!(rendered.contains("CS1"));
        assert!(rendered.contains("[2 items]"));
    }

    #[test]
    fn test_bare_words_are_quoted() {
        assert_eq!(
            normalize_backtick_literals("[?state==`new` && action_type==`deletion`]"),
            r#"[?state==`"new"` && action_type==`"deletion"`]"#
        );
    }

    #[test]
    fn test_json_literals_pass_through() {
        for query in [
            "[?id==`50`]",
            r#"[?name==`"CS1"`]"#,
            "[?library==`false`]",
            "[?description==`null`]",
        ] {
            assert_eq!(normalize_backtick_literals(query), query);
        }
    }

    #[test]
    fn test_query_by_numeric_id() {
        let data = serde_json::json!([
            {"id": 50, "name": "CS1"},
            {"id": 51, "name": "Cleanup"}
        ]);
        let picked = apply_query(data, Some("[?id==`51`].name | [0]")).unwrap();
        assert_eq!(picked, serde_json::json!("Cleanup"));
    }

    #[test]
    fn test_single_quoted_literal() {
        let data = serde_json::json!([{"action_type": "deletion"}, {"action_type": "promotion"}]);
        let kept = apply_query(data, Some("[?action_type=='promotion'] | length(@)")).unwrap();
        assert_eq!(kept, serde_json::json!(1));
    }
}
