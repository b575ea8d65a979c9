/// Workflow compilation and hot-reload registry
///
/// Compilation validates a workflow's graph structure ahead of execution and
/// pins down its START node. The registry keeps compiled workflows in memory
/// behind an ArcSwap so updates from the editor are atomic pointer swaps that
/// never block concurrent executions. Nothing here touches disk: graph
/// persistence belongs to the editor side.

use crate::workflow::types::{BranchKind, Workflow};
use anyhow::Result;
use arc_swap::ArcSwap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Workflow validated and ready for execution
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    /// Base workflow definition
    pub workflow: Workflow,
    /// The unique START node, resolved at compile time
    pub start_node_id: String,
}

/// Basic workflow metadata for listing operations
#[derive(Debug, serde::Serialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    pub nodes: usize,
    pub edges: usize,
    #[serde(rename = "lastModified")]
    pub last_modified: i64,
}

/// Validate a workflow and resolve its execution metadata
///
/// Builds a petgraph digraph to check structure: every edge must reference
/// known node ids and exactly one START node must exist. Cycles are legal
/// (the engine's step budget terminates them), so this never runs a cycle
/// check. Suspicious-but-legal shapes (duplicate branch edges, unreachable
/// nodes, edges into START or out of END) are logged as warnings and kept,
/// preserving the editor's first-declared-wins edge semantics.
pub fn compile_workflow(workflow: Workflow) -> Result<CompiledWorkflow> {
    let start_node_id = validate_graph(&workflow)?;
    Ok(CompiledWorkflow {
        workflow,
        start_node_id,
    })
}

/// Structural validation; returns the id of the unique START node
fn validate_graph(workflow: &Workflow) -> Result<String> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut node_indices: HashMap<&str, NodeIndex> = HashMap::new();

    for node in &workflow.nodes {
        if node_indices.contains_key(node.id.as_str()) {
            return Err(anyhow::anyhow!("Duplicate node id: {}", node.id));
        }
        let index = graph.add_node(node.id.as_str());
        node_indices.insert(node.id.as_str(), index);
    }

    for edge in &workflow.edges {
        let source = node_indices
            .get(edge.source.as_str())
            .ok_or_else(|| anyhow::anyhow!("Edge references unknown node: {}", edge.source))?;
        let target = node_indices
            .get(edge.target.as_str())
            .ok_or_else(|| anyhow::anyhow!("Edge references unknown node: {}", edge.target))?;
        graph.add_edge(*source, *target, ());
    }

    let start_ids: Vec<&str> = workflow
        .nodes
        .iter()
        .filter(|n| n.is_start())
        .map(|n| n.id.as_str())
        .collect();
    let start_node_id = match start_ids.as_slice() {
        [only] => (*only).to_string(),
        [] => return Err(anyhow::anyhow!("Workflow must have exactly one START node")),
        _ => {
            return Err(anyhow::anyhow!(
                "Workflow must have exactly one START node, found {}",
                start_ids.len()
            ))
        }
    };

    warn_duplicate_branch_edges(workflow);
    warn_unreachable_nodes(workflow, &graph, node_indices[start_node_id.as_str()]);
    warn_port_misuse(workflow);

    Ok(start_node_id)
}

/// More than one edge for the same (source, branch) pair: the engine consults
/// the first declared edge and ignores the rest.
fn warn_duplicate_branch_edges(workflow: &Workflow) {
    let mut seen: HashSet<(&str, BranchKind)> = HashSet::new();
    for edge in &workflow.edges {
        if !seen.insert((edge.source.as_str(), edge.branch)) {
            tracing::warn!(
                "Duplicate edge from '{}' (branch {:?}): '{}' will never be taken, first declared wins",
                edge.source,
                edge.branch,
                edge.id
            );
        }
    }
}

fn warn_unreachable_nodes(workflow: &Workflow, graph: &DiGraph<&str, ()>, start: NodeIndex) {
    let mut reachable = HashSet::new();
    let mut bfs = Bfs::new(graph, start);
    while let Some(index) = bfs.next(graph) {
        reachable.insert(graph[index]);
    }

    for node in &workflow.nodes {
        if !reachable.contains(node.id.as_str()) {
            tracing::warn!(
                "Node '{}' ({}) is unreachable from the START node",
                node.id,
                node.type_name()
            );
        }
    }
}

/// START nodes have no input port and END nodes no output port in the editor;
/// hand-written documents can still violate that, so flag it.
fn warn_port_misuse(workflow: &Workflow) {
    let node_by_id: HashMap<&str, _> = workflow.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    for edge in &workflow.edges {
        if node_by_id
            .get(edge.target.as_str())
            .is_some_and(|n| n.is_start())
        {
            tracing::warn!("Edge '{}' targets the START node '{}'", edge.id, edge.target);
        }
        if node_by_id
            .get(edge.source.as_str())
            .is_some_and(|n| n.is_end())
        {
            tracing::warn!("Edge '{}' leaves the END node '{}'", edge.id, edge.source);
        }
    }
}

/// Lock-free in-memory workflow registry
///
/// Uses ArcSwap to provide atomic pointer swapping for the workflow map, so
/// editor updates land instantly without blocking runs already in flight.
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    /// Thread-safe atomic pointer to the workflow map, keyed by workflow id
    workflows: ArcSwap<HashMap<String, CompiledWorkflow>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self {
            workflows: ArcSwap::new(Arc::new(HashMap::new())),
        }
    }

    /// Compile and store a workflow, replacing any previous version
    pub fn upsert(&self, workflow: Workflow) -> Result<()> {
        let id = workflow.id.clone();
        let compiled = compile_workflow(workflow)?;

        let current = self.workflows.load();
        let mut next = (**current).clone();
        next.insert(id.clone(), compiled);
        self.workflows.store(Arc::new(next));

        tracing::info!("Registered workflow: {}", id);
        Ok(())
    }

    /// Get a workflow by ID (lock-free read)
    pub fn get(&self, workflow_id: &str) -> Option<CompiledWorkflow> {
        self.workflows.load().get(workflow_id).cloned()
    }

    pub fn contains(&self, workflow_id: &str) -> bool {
        self.workflows.load().contains_key(workflow_id)
    }

    /// Remove a workflow; returns whether it existed
    pub fn remove(&self, workflow_id: &str) -> bool {
        let current = self.workflows.load();
        if !current.contains_key(workflow_id) {
            return false;
        }

        let mut next = (**current).clone();
        next.remove(workflow_id);
        self.workflows.store(Arc::new(next));

        tracing::info!("Removed workflow from registry: {}", workflow_id);
        true
    }

    /// List summaries of all registered workflows, newest first
    pub fn summaries(&self) -> Vec<WorkflowSummary> {
        let mut summaries: Vec<WorkflowSummary> = self
            .workflows
            .load()
            .values()
            .map(|compiled| WorkflowSummary {
                id: compiled.workflow.id.clone(),
                name: compiled.workflow.name.clone(),
                nodes: compiled.workflow.nodes.len(),
                edges: compiled.workflow.edges.len(),
                last_modified: compiled.workflow.last_modified,
            })
            .collect();
        summaries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::{Edge, IterationMode, Node, NodeKind, Position, StartData};
    use crate::workflow::types::{EndData, ScriptData};

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.to_string(),
            position: Position::default(),
            kind,
        }
    }

    fn edge(id: &str, source: &str, target: &str) -> Edge {
        Edge {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            branch: BranchKind::Default,
            iteration: IterationMode::Default,
        }
    }

    fn workflow(nodes: Vec<Node>, edges: Vec<Edge>) -> Workflow {
        Workflow {
            id: "wf".to_string(),
            name: "Test".to_string(),
            nodes,
            edges,
            last_modified: 0,
        }
    }

    #[test]
    fn compile_resolves_start_node() {
        let wf = workflow(
            vec![
                node("s", NodeKind::Start(StartData::default())),
                node("e", NodeKind::End(EndData::default())),
            ],
            vec![edge("e1", "s", "e")],
        );

        let compiled = compile_workflow(wf).unwrap();
        assert_eq!(compiled.start_node_id, "s");
    }

    #[test]
    fn compile_rejects_missing_start() {
        let wf = workflow(vec![node("e", NodeKind::End(EndData::default()))], vec![]);
        assert!(compile_workflow(wf).is_err());
    }

    #[test]
    fn compile_rejects_duplicate_start() {
        let wf = workflow(
            vec![
                node("a", NodeKind::Start(StartData::default())),
                node("b", NodeKind::Start(StartData::default())),
            ],
            vec![],
        );
        assert!(compile_workflow(wf).is_err());
    }

    #[test]
    fn compile_rejects_dangling_edge() {
        let wf = workflow(
            vec![node("s", NodeKind::Start(StartData::default()))],
            vec![edge("e1", "s", "ghost")],
        );
        let err = compile_workflow(wf).unwrap_err();
        assert!(err.to_string().contains("unknown node"));
    }

    #[test]
    fn compile_allows_cycles() {
        let wf = workflow(
            vec![
                node("s", NodeKind::Start(StartData::default())),
                node("a", NodeKind::Script(ScriptData::default())),
                node("b", NodeKind::Script(ScriptData::default())),
            ],
            vec![
                edge("e1", "s", "a"),
                edge("e2", "a", "b"),
                edge("e3", "b", "a"),
            ],
        );
        assert!(compile_workflow(wf).is_ok());
    }

    #[test]
    fn registry_upsert_get_remove() {
        let registry = WorkflowRegistry::new();
        let wf = workflow(
            vec![
                node("s", NodeKind::Start(StartData::default())),
                node("e", NodeKind::End(EndData::default())),
            ],
            vec![edge("e1", "s", "e")],
        );

        registry.upsert(wf).unwrap();
        assert!(registry.contains("wf"));
        assert_eq!(registry.get("wf").unwrap().start_node_id, "s");
        assert_eq!(registry.summaries().len(), 1);

        assert!(registry.remove("wf"));
        assert!(!registry.remove("wf"));
        assert!(registry.get("wf").is_none());
    }
}
