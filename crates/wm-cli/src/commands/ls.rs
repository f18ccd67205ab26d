//! List command implementation

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use wm_core::{Materialization, Project};
use wm_exec::{compile_project, CompileOptions, CompiledProject};

use crate::cli::{GlobalArgs, LsArgs, LsOutput};
use crate::commands::common::load_project;

/// Model or source information for display
#[derive(Debug, Serialize)]
struct NodeInfo {
    name: String,
    #[serde(rename = "type")]
    resource_type: &'static str,
    materialized: Option<Materialization>,
    relation: String,
    model_deps: Vec<String>,
    source_deps: Vec<String>,
}

impl NodeInfo {
    fn is_model(&self) -> bool {
        self.resource_type == "model"
    }

    fn depends_on(&self, name: &str) -> bool {
        self.model_deps.iter().chain(&self.source_deps).any(|d| d == name)
    }
}

fn collect_nodes(
    project: &Project,
    compiled: &CompiledProject,
    selector: Option<&str>,
) -> Result<Vec<NodeInfo>> {
    let selection = compiled.select(selector).context("Invalid selector")?;

    let mut nodes: Vec<NodeInfo> = selection
        .iter()
        .filter_map(|name| compiled.model(name))
        .map(|m| NodeInfo {
            name: m.name.to_string(),
            resource_type: "model",
            materialized: Some(m.materialization),
            relation: m.relation.clone(),
            model_deps: m.refs.iter().map(|r| r.to_string()).collect(),
            source_deps: m.sources.clone(),
        })
        .collect();

    // With a selector, only sources the selected models read are listed
    let used_sources: HashSet<&str> = nodes
        .iter()
        .flat_map(|n| n.source_deps.iter().map(String::as_str))
        .collect();
    let show_all_sources = selector.map_or(true, |s| s.trim().is_empty());

    let mut sources = Vec::new();
    for source in &project.sources {
        for table in &source.tables {
            let relation = source.qualified_name(table);
            if show_all_sources || used_sources.contains(relation.as_str()) {
                sources.push(NodeInfo {
                    name: format!("{}.{}", source.name, table.name),
                    resource_type: "source",
                    materialized: None,
                    relation,
                    model_deps: Vec::new(),
                    source_deps: Vec::new(),
                });
            }
        }
    }
    nodes.extend(sources);
    Ok(nodes)
}

/// Execute the ls command
pub async fn execute(args: &LsArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let compiled = compile_project(&project, &CompileOptions::default())
        .context("Failed to compile project")?;
    let nodes = collect_nodes(&project, &compiled, args.select.as_deref())?;

    match args.output {
        LsOutput::Table => print_table(&nodes),
        LsOutput::Json => {
            let json = serde_json::to_string_pretty(&nodes).context("Failed to serialize to JSON")?;
            println!("{}", json);
        }
        LsOutput::Tree => {
            println!("Dependency Tree:");
            println!();
            for line in tree_lines(&nodes) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

fn print_table(nodes: &[NodeInfo]) {
    let name_width = nodes.iter().map(|n| n.name.len()).max().unwrap_or(4).max(4);
    let type_width = 6;
    let mat_width = 12;
    let rel_width = nodes
        .iter()
        .map(|n| n.relation.len())
        .max()
        .unwrap_or(8)
        .max(8);

    println!(
        "{:<name_width$}  {:<type_width$}  {:<mat_width$}  {:<rel_width$}  DEPENDS_ON",
        "NAME", "TYPE", "MATERIALIZED", "RELATION"
    );
    println!(
        "{:-<name_width$}  {:-<type_width$}  {:-<mat_width$}  {:-<rel_width$}  {}",
        "",
        "",
        "",
        "",
        "-".repeat(40)
    );

    for node in nodes {
        let deps: Vec<String> = node
            .model_deps
            .iter()
            .cloned()
            .chain(node.source_deps.iter().map(|d| format!("{} (source)", d)))
            .collect();
        let deps_str = if deps.is_empty() {
            "-".to_string()
        } else {
            deps.join(", ")
        };
        let mat_str = node
            .materialized
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<name_width$}  {:<type_width$}  {:<mat_width$}  {:<rel_width$}  {}",
            node.name, node.resource_type, mat_str, node.relation, deps_str
        );
    }

    let model_count = nodes.iter().filter(|n| n.is_model()).count();
    println!();
    println!("{} models, {} sources", model_count, nodes.len() - model_count);
}

/// Render the dependency tree, sources first, each node followed by the
/// models that read it.
fn tree_lines(nodes: &[NodeInfo]) -> Vec<String> {
    // Sources are keyed by relation in model dependencies
    let key = |n: &NodeInfo| {
        if n.is_model() {
            n.name.clone()
        } else {
            n.relation.clone()
        }
    };
    let listed: HashSet<String> = nodes.iter().map(key).collect();
    let roots: Vec<&NodeInfo> = nodes
        .iter()
        .filter(|n| {
            !n.model_deps
                .iter()
                .chain(&n.source_deps)
                .any(|d| listed.contains(d))
        })
        .collect();

    let mut lines = Vec::new();
    let last = roots.len().saturating_sub(1);
    for (i, root) in roots.iter().enumerate() {
        push_tree_node(root, nodes, &key, "", i == last, &mut lines);
    }
    lines
}

fn push_tree_node(
    node: &NodeInfo,
    nodes: &[NodeInfo],
    key: &dyn Fn(&NodeInfo) -> String,
    prefix: &str,
    is_last: bool,
    lines: &mut Vec<String>,
) {
    let connector = if is_last { "└── " } else { "├── " };
    lines.push(format!("{}{}{}", prefix, connector, node.name));

    let node_key = key(node);
    let dependents: Vec<&NodeInfo> = nodes.iter().filter(|n| n.depends_on(&node_key)).collect();
    let new_prefix = format!("{}{}   ", prefix, if is_last { " " } else { "│" });

    for (i, dependent) in dependents.iter().enumerate() {
        push_tree_node(
            dependent,
            nodes,
            key,
            &new_prefix,
            i + 1 == dependents.len(),
            lines,
        );
    }
}
