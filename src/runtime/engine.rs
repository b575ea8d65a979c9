/// Graph walk execution engine
///
/// Owns one run over one workflow snapshot: nodes in a flat map keyed by id,
/// edges in declaration order, and a driver loop that starts at the START
/// node and follows edges until there is no next node, the step budget runs
/// out, or a node fails. Graphs may contain cycles; the step budget is the
/// only thing that terminates a cyclic walk.
///
/// Edge selection is first-declared-wins: whenever more than one edge
/// matches a lookup, the earliest one in the workflow document is taken.
/// An iterated CONDITION node never branches; it aggregates per-item
/// booleans and continues along its default edge (known limitation,
/// preserved from the editor).

use crate::config::EngineConfig;
use crate::runtime::error::{EngineError, RunFailure};
use crate::runtime::executor::{NodeExecutor, NodeOutcome, RunContext};
use crate::runtime::trace::{ExecutionLogEntry, Trace};
use crate::workflow::types::{BranchKind, Edge, IterationMode, Node, NodeKind, Workflow};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// One executable workflow run
///
/// Holds a read-only snapshot of the graph; nothing persists across runs.
pub struct WorkflowEngine {
    /// Arena of nodes, looked up by id
    nodes: HashMap<String, Node>,
    /// Edges in declaration order
    edges: Vec<Edge>,
    /// First START node in declaration order, if any
    start_node_id: Option<String>,
    executor: Arc<NodeExecutor>,
    max_steps: usize,
}

/// Result of one wrapper invocation: where to go next, and with what value
struct NodeStep {
    next: Option<String>,
    output: Value,
}

impl WorkflowEngine {
    pub fn new(workflow: Workflow, executor: Arc<NodeExecutor>, config: &EngineConfig) -> Self {
        let Workflow { nodes, edges, .. } = workflow;
        let start_node_id = nodes.iter().find(|n| n.is_start()).map(|n| n.id.clone());
        let nodes = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();

        Self {
            nodes,
            edges,
            start_node_id,
            executor,
            max_steps: config.max_steps,
        }
    }

    /// Run the workflow to completion and return the ordered trace
    ///
    /// A failing node terminates the run; the error carries everything that
    /// executed up to and including the failure. Step-budget exhaustion is
    /// not an error; the trace collected so far is returned as-is.
    pub async fn execute(&self) -> Result<Vec<ExecutionLogEntry>, RunFailure> {
        let mut trace = Trace::new();
        let run = RunContext::new();

        let Some(start_id) = self.start_node_id.clone() else {
            tracing::error!("❌ Run {} aborted: no START node", run.run_id);
            return Err(RunFailure {
                error: EngineError::MissingStartNode,
                trace: trace.into_entries(),
            });
        };

        tracing::info!("🚀 Starting run {} at node '{}'", run.run_id, start_id);

        let mut current = Some(start_id);
        let mut input = json!({});
        let mut incoming: Option<&Edge> = None;
        let mut steps = 0usize;

        while let Some(node_id) = current {
            if steps >= self.max_steps {
                tracing::warn!(
                    "⏸️ Run {} exhausted its step budget ({} steps)",
                    run.run_id,
                    self.max_steps
                );
                break;
            }

            match self.run_node(&node_id, input, incoming, &run, &mut trace).await {
                Ok(step) => {
                    // The edge into the next node carries its iteration mode
                    incoming = step
                        .next
                        .as_deref()
                        .and_then(|next| self.edge_between(&node_id, next));
                    input = step.output;
                    current = step.next;
                    steps += 1;
                }
                Err(error) => {
                    tracing::error!("❌ Run {} failed at node '{}': {}", run.run_id, node_id, error);
                    return Err(RunFailure {
                        error,
                        trace: trace.into_entries(),
                    });
                }
            }
        }

        tracing::info!(
            "🎉 Run {} completed: {} steps, {} trace entries",
            run.run_id,
            steps,
            trace.len()
        );
        Ok(trace.into_entries())
    }

    /// Iteration wrapper: invoke a node once, or once per array element
    ///
    /// Failures are recorded as an error entry for the node and re-raised,
    /// terminating the run.
    async fn run_node(
        &self,
        node_id: &str,
        input: Value,
        incoming: Option<&Edge>,
        run: &RunContext,
        trace: &mut Trace,
    ) -> Result<NodeStep, EngineError> {
        let Some(node) = self.nodes.get(node_id) else {
            // Compilation rejects dangling edges, so only hand-built graphs
            // reach this; the editor's engine ends the run quietly here.
            tracing::warn!("Unknown node '{}', ending run", node_id);
            return Ok(NodeStep {
                next: None,
                output: Value::Null,
            });
        };

        let iteration = incoming
            .map(|edge| edge.iteration)
            .filter(|mode| mode.is_iterating());

        match (iteration, input) {
            (Some(mode), Value::Array(items)) => {
                self.run_iterated(node, mode, items, run, trace).await
            }
            // No iteration mode, or the input isn't an array despite one
            (_, input) => self.run_single(node, input, run, trace).await,
        }
    }

    async fn run_single(
        &self,
        node: &Node,
        input: Value,
        run: &RunContext,
        trace: &mut Trace,
    ) -> Result<NodeStep, EngineError> {
        let eval = match self.executor.evaluate(node, input, run, trace).await {
            Ok(eval) => eval,
            Err(error) => {
                trace.error(&node.id, json!({ "error": error.to_string() }), error.to_string());
                return Err(error);
            }
        };

        match eval.outcome {
            NodeOutcome::Branch {
                taken,
                original_input,
            } => {
                // Missing matching edge ends the run without error
                let next = self
                    .edge_from(&node.id, BranchKind::for_outcome(taken))
                    .map(|edge| edge.target.clone());
                Ok(NodeStep {
                    next,
                    output: original_input,
                })
            }
            NodeOutcome::Value(output) => {
                // CONDITION and CLIPBOARD already wrote their entries
                if !node.is_condition() && !matches!(node.kind, NodeKind::Clipboard(_)) {
                    trace.success(&node.id, output.clone(), eval.logs);
                }
                let next = self.next_edge(&node.id).map(|edge| edge.target.clone());
                Ok(NodeStep { next, output })
            }
        }
    }

    /// Evaluate the node once per array element, in order, sequentially,
    /// keeping side effects and trace entries deterministic
    async fn run_iterated(
        &self,
        node: &Node,
        mode: IterationMode,
        items: Vec<Value>,
        run: &RunContext,
        trace: &mut Trace,
    ) -> Result<NodeStep, EngineError> {
        let mut results = Vec::with_capacity(items.len());

        for item in &items {
            let eval = match self.executor.evaluate(node, item.clone(), run, trace).await {
                Ok(eval) => eval,
                Err(error) => {
                    trace.error(&node.id, json!({ "error": error.to_string() }), error.to_string());
                    return Err(error);
                }
            };

            let value = match eval.outcome {
                // An iterated condition cannot branch; its boolean joins the
                // per-item results instead
                NodeOutcome::Branch { taken, .. } => json!(taken),
                NodeOutcome::Value(value) => value,
            };

            if !eval.logs.is_empty() {
                trace.success(&node.id, value.clone(), eval.logs);
            }
            results.push(value);
        }

        let count = items.len();
        let output = match mode {
            IterationMode::Map => Value::Array(results),
            // forEach ran for effects only; the original array flows onward
            _ => Value::Array(items),
        };
        trace.success(&node.id, output.clone(), vec![format!("Iterated {} items", count)]);

        let next = if node.is_condition() {
            self.edge_from(&node.id, BranchKind::Default)
        } else {
            self.next_edge(&node.id)
        }
        .map(|edge| edge.target.clone());

        Ok(NodeStep { next, output })
    }

    /// First declared edge matching (source, branch)
    fn edge_from(&self, source: &str, branch: BranchKind) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|edge| edge.source == source && edge.branch == branch)
    }

    /// Next hop for non-branching nodes: the node's first declared outgoing edge
    fn next_edge(&self, source: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.source == source)
    }

    fn edge_between(&self, source: &str, target: &str) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|edge| edge.source == source && edge.target == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::clipboard::MemoryClipboard;
    use crate::runtime::script::LuaScriptEngine;
    use crate::workflow::types::{NodeKind, Position, ScriptData, StartData};

    fn config() -> EngineConfig {
        EngineConfig {
            max_steps: 1000,
            default_delay_ms: 1,
            request_timeout_secs: 5,
            relay_url: None,
        }
    }

    fn engine_for(nodes: Vec<Node>, edges: Vec<Edge>) -> WorkflowEngine {
        let executor = NodeExecutor::new(
            &config(),
            Arc::new(LuaScriptEngine::new()),
            Arc::new(MemoryClipboard::new()),
        )
        .unwrap();
        let workflow = Workflow {
            id: "wf".to_string(),
            name: "Test".to_string(),
            nodes,
            edges,
            last_modified: 0,
        };
        WorkflowEngine::new(workflow, Arc::new(executor), &config())
    }

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

    #[test]
    fn edge_lookups_take_first_declared_match() {
        let engine = engine_for(
            vec![
                node("s", NodeKind::Start(StartData::default())),
                node("a", NodeKind::Script(ScriptData::default())),
                node("b", NodeKind::Script(ScriptData::default())),
            ],
            vec![edge("e1", "s", "a"), edge("e2", "s", "b")],
        );

        assert_eq!(engine.next_edge("s").map(|e| e.id.as_str()), Some("e1"));
        assert_eq!(
            engine
                .edge_from("s", BranchKind::Default)
                .map(|e| e.id.as_str()),
            Some("e1")
        );
        assert_eq!(
            engine.edge_between("s", "b").map(|e| e.id.as_str()),
            Some("e2")
        );
    }

    #[tokio::test]
    async fn unknown_node_ends_run_quietly() {
        let engine = engine_for(
            vec![node("s", NodeKind::Start(StartData::default()))],
            vec![],
        );

        let mut trace = Trace::new();
        let step = engine
            .run_node("ghost", json!({}), None, &RunContext::new(), &mut trace)
            .await
            .unwrap();
        assert!(step.next.is_none());
        assert!(trace.is_empty());
    }
}
