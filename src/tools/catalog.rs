//! Render the tool registry as a compact text catalog for the prompt.

use super::{RegistryEntry, ToolRegistry, ToolSpec};

/// One line per registry entry, numbered from 1 in listing order.
///
/// Malformed entries become an explicit placeholder line instead of
/// aborting the whole catalog.
pub fn describe_tools(registry: &ToolRegistry) -> Vec<String> {
    registry
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            RegistryEntry::Valid(spec) => describe_tool(i + 1, spec),
            RegistryEntry::Malformed { .. } => {
                format!("{}. error processing tool {}", i + 1, i + 1)
            }
        })
        .collect()
}

/// The full catalog string injected into the prompt.
pub fn render_catalog(registry: &ToolRegistry) -> String {
    describe_tools(registry).join("\n")
}

fn describe_tool(number: usize, spec: &ToolSpec) -> String {
    let params = if spec.parameters.is_empty() {
        "no parameters".to_string()
    } else {
        spec.parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.declared_type))
            .collect::<Vec<_>>()
            .join(", ")
    };

    // Docstring descriptions span lines; the catalog keeps one line per tool.
    let description = spec.description.split_whitespace().collect::<Vec<_>>().join(" ");

    format!("{}. {}({}) - {}", number, spec.name, params, description)
}
