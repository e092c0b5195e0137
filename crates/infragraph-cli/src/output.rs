//! Output layer: JSON for machines, a plain-text summary for people.
//!
//! Results go to stdout, errors and logs to stderr.

use clap::ValueEnum;
use infragraph_core::{ErrorCode, GenerateError, Generated, NodeId};
use serde::Serialize;
use serde_json::json;
use std::io::{self, Write};

/// Output formats supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// `{"raw", "graph", "report"}` as pretty JSON.
    #[default]
    Json,
    /// Counts followed by one line per edge.
    Text,
}

/// A structured error with a stable code and an optional suggestion.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub error_code: String,
}

impl CliError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: code.code().to_string(),
        }
    }
}

impl From<&GenerateError> for CliError {
    fn from(err: &GenerateError) -> Self {
        let code = err.code();
        Self::new(code, format!("{}: {err}", code.message()))
    }
}

/// Render a pipeline result to `w`.
pub fn render_generated(
    w: &mut dyn Write,
    mode: OutputMode,
    generated: &Generated,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let value = json!({
                "raw": generated.raw,
                "graph": generated.graph,
                "report": generated.report,
            });
            serde_json::to_writer_pretty(&mut *w, &value)?;
            writeln!(w)?;
        }
        OutputMode::Text => render_text(w, generated)?,
    }
    Ok(())
}

fn render_text(w: &mut dyn Write, generated: &Generated) -> io::Result<()> {
    let graph = &generated.graph;
    writeln!(w, "{:<12} {}", "nodes:", graph.node_count())?;
    writeln!(w, "{:<12} {}", "edges:", graph.edge_count())?;
    writeln!(w, "{:<12} {}", "components:", graph.component_count())?;
    if generated.raw {
        writeln!(w, "{:<12} yes", "raw:")?;
    }

    for edge in graph.edges() {
        let name = |id: &NodeId| {
            graph
                .node(id)
                .map_or_else(|_| id.to_string(), |n| n.canonical.clone())
        };
        write!(w, "{} -> {}", name(&edge.source), name(&edge.target))?;
        if !edge.canonicals.is_empty() {
            write!(w, " [{}]", edge.canonicals.join(", "))?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, &json!({ "error": error }))?;
            writeln!(out)?;
        }
        OutputMode::Text => {
            writeln!(out, "error[{}]: {}", error.error_code, error.message)?;
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use infragraph_core::provider::Registry;
    use infragraph_core::{GenerateOptions, GraphError, Resource, generate};

    fn sample() -> Generated {
        let resources = vec![
            Resource::new("x_thing.a").depends_on(["x_thing.b"]),
            Resource::new("x_thing.b"),
        ];
        generate(&resources, GenerateOptions::default(), &Registry::new()).unwrap()
    }

    #[test]
    fn json_has_graph_and_report() {
        let mut buf = Vec::new();
        render_generated(&mut buf, OutputMode::Json, &sample()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["raw"], true);
        assert_eq!(value["graph"]["nodes"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["report"]["populated"], 2);
    }

    #[test]
    fn text_lists_edges_by_canonical() {
        let mut buf = Vec::new();
        render_generated(&mut buf, OutputMode::Text, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("nodes:       2"));
        assert!(text.contains("components:  1"));
        assert!(text.contains("x_thing.a -> x_thing.b"));
    }

    #[test]
    fn cli_error_carries_code_and_hint() {
        let err = GenerateError::from(GraphError::NodeNotFound("x".into()));
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code, "E2001");
        assert!(cli.message.starts_with("Node not found"));

        let cli = CliError::new(ErrorCode::InputParseError, "bad input");
        assert!(cli.suggestion.is_some());
    }
}
