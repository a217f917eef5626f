//! Snapshot export for external renderers (JSON and Graphviz DOT).

use std::fmt::Write as _;
use std::path::Path;

use super::GraphSnapshot;
use crate::entity::EntityType;
use crate::{Result, WikitreeError};

/// Output format, picked from the file extension by [`ExportFormat::from_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Dot,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Ok(ExportFormat::Json),
            Some("dot") | Some("gv") => Ok(ExportFormat::Dot),
            _ => Err(WikitreeError::InvalidInput(format!(
                "unsupported export format for {} (use .json or .dot)",
                path.display()
            ))),
        }
    }
}

pub fn to_json(snapshot: &GraphSnapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Directed DOT graph; persons are ellipses, everything else boxes.
pub fn to_dot(snapshot: &GraphSnapshot) -> String {
    let mut out = String::from("digraph wikitree {\n");
    for node in &snapshot.nodes {
        let shape = if node.entity_type == EntityType::Person {
            "ellipse"
        } else {
            "box"
        };
        let tooltip = node.label.as_deref().unwrap_or("");
        let _ = writeln!(
            out,
            "  \"{}\" [shape={}, tooltip=\"{}\"];",
            escape(&node.id),
            shape,
            escape(tooltip)
        );
    }
    for edge in &snapshot.edges {
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\";",
            escape(&edge.source_id),
            escape(&edge.target_id)
        );
    }
    out.push_str("}\n");
    out
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Write `snapshot` to `path` in the format its extension names.
pub fn write_snapshot(snapshot: &GraphSnapshot, path: &Path) -> Result<()> {
    let rendered = match ExportFormat::from_path(path)? {
        ExportFormat::Json => to_json(snapshot)?,
        ExportFormat::Dot => to_dot(snapshot),
    };
    std::fs::write(path, rendered)?;
    Ok(())
}
