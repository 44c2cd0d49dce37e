//! Text and JSON rendering of connection graphs

use super::{Connection, ConnectionGraph, ResourceRef};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

/// Output format for connection graphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per node
    Flat,
    /// Root-to-leaf branches, one per neighbor of the root
    Branches,
    /// Indented under the node each resource was reached from
    #[default]
    Tree,
    /// Flat node list as JSON
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Flat => "flat",
            OutputFormat::Branches => "branches",
            OutputFormat::Tree => "tree",
            OutputFormat::Json => "json",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "flat" => Some(OutputFormat::Flat),
            "branches" => Some(OutputFormat::Branches),
            "tree" => Some(OutputFormat::Tree),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Render a graph in the requested format
pub fn render(graph: &ConnectionGraph, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Flat => Ok(render_flat(graph)),
        OutputFormat::Branches => Ok(render_branches(graph)),
        OutputFormat::Tree => Ok(render_tree(graph)),
        OutputFormat::Json => serde_json::to_string_pretty(&graph.to_output()),
    }
}

/// `[relation]` or `[relation: details]`, empty for the root
fn edge_label(conn: &Connection) -> String {
    match &conn.peer {
        None => String::new(),
        Some(edge) if edge.details.is_empty() => format!(" [{}]", edge.relation),
        Some(edge) => format!(" [{}: {}]", edge.relation, edge.details),
    }
}

fn flat_line(conn: &Connection) -> String {
    let mut line = format!("Level:{} {}/{}", conn.level, conn.kind, conn.name);
    if !conn.namespace.is_empty() {
        let _ = write!(line, " ({})", conn.namespace);
    }
    line.push_str(&edge_label(conn));
    if let Some(edge) = &conn.peer {
        let _ = write!(line, " peer:{}", edge.peer);
    }
    if let (Some(kind), Some(name)) = (&conn.owner_kind, &conn.owner_name) {
        let _ = write!(line, " owner:{}/{}", kind, name);
    }
    line
}

pub fn render_flat(graph: &ConnectionGraph) -> String {
    let mut out = String::new();
    for conn in graph.nodes() {
        out.push_str(&flat_line(conn));
        out.push('\n');
    }
    out
}

/// Nodes grouped under the peer they were discovered from, in discovery order
fn children_by_peer(graph: &ConnectionGraph) -> HashMap<&ResourceRef, Vec<&Connection>> {
    let mut children: HashMap<&ResourceRef, Vec<&Connection>> = HashMap::new();
    for conn in graph.nodes() {
        if let Some(edge) = &conn.peer {
            children.entry(&edge.peer).or_default().push(conn);
        }
    }
    children
}

/// Depth-first order below `parent`, each node paired with its depth
fn descendants<'g>(
    children: &HashMap<&ResourceRef, Vec<&'g Connection>>,
    parent: &'g Connection,
    depth: usize,
    seen: &mut HashSet<ResourceRef>,
    out: &mut Vec<(usize, &'g Connection)>,
) {
    let key = parent.key();
    let Some(kids) = children.get(&key) else {
        return;
    };
    for &child in kids {
        if !seen.insert(child.key()) {
            continue;
        }
        out.push((depth, child));
        descendants(children, child, depth + 1, seen, out);
    }
}

/// The peer tree in depth-first order, root first at depth 0
fn tree_order(graph: &ConnectionGraph) -> Vec<(usize, &Connection)> {
    let Some(root) = graph.nodes().first() else {
        return Vec::new();
    };
    let children = children_by_peer(graph);
    let mut seen = HashSet::from([root.key()]);
    let mut out = vec![(0, root)];
    descendants(&children, root, 1, &mut seen, &mut out);
    out
}

/// One branch per neighbor of the root, holding that neighbor's subtree
pub fn branches(graph: &ConnectionGraph) -> Vec<Vec<&Connection>> {
    let mut branches: Vec<Vec<&Connection>> = Vec::new();
    for (depth, conn) in tree_order(graph).into_iter().skip(1) {
        if depth == 1 || branches.is_empty() {
            branches.push(vec![conn]);
        } else if let Some(branch) = branches.last_mut() {
            branch.push(conn);
        }
    }
    branches
}

pub fn render_branches(graph: &ConnectionGraph) -> String {
    let mut out = String::new();
    let root = graph.root();
    for (i, branch) in branches(graph).iter().enumerate() {
        let _ = writeln!(out, "Branch {}: {}", i + 1, root);
        for conn in branch {
            let _ = writeln!(out, "  {}", flat_line(conn));
        }
    }
    out
}

/// Each node indented under the peer it was discovered from
pub fn render_tree(graph: &ConnectionGraph) -> String {
    let mut out = String::new();
    for (depth, conn) in tree_order(graph) {
        let _ = writeln!(
            out,
            "{}{}/{}{}",
            "  ".repeat(depth),
            conn.kind,
            conn.name,
            edge_label(conn)
        );
    }
    out
}
