/// Core workflow type definitions
///
/// Defines the fundamental structures for workflows, nodes, and edges. These
/// types round-trip the JSON documents produced by the visual editor:
/// node JSON is `{id, type, position: {x, y}, data: {...}}` and edge JSON is
/// `{id, source, target, type?, iteration?}`.

use serde::{Deserialize, Serialize};

/// A complete workflow definition containing nodes and their connections
///
/// Workflows arrive as JSON from the editor and are compiled before execution.
/// The engine treats a workflow as a read-only snapshot for the duration of
/// one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique workflow identifier (e.g., "wf-enrichment")
    pub id: String,
    /// Human-readable workflow name
    pub name: String,
    /// List of nodes in this workflow
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// List of edges connecting nodes
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Editor-maintained modification timestamp (epoch milliseconds)
    #[serde(default, rename = "lastModified")]
    pub last_modified: i64,
}

/// A single node in the workflow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier within the workflow (e.g., "n1")
    pub id: String,
    /// Canvas position, meaningful only to the editor
    #[serde(default)]
    pub position: Position,
    /// Node type tag plus its type-specific data bag
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn is_start(&self) -> bool {
        matches!(self.kind, NodeKind::Start(_))
    }

    pub fn is_end(&self) -> bool {
        matches!(self.kind, NodeKind::End(_))
    }

    pub fn is_condition(&self) -> bool {
        matches!(self.kind, NodeKind::Condition(_))
    }

    /// Wire-format type tag, used in logs
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Start(_) => "START",
            NodeKind::End(_) => "END",
            NodeKind::Request(_) => "REQUEST",
            NodeKind::Script(_) => "SCRIPT",
            NodeKind::Condition(_) => "CONDITION",
            NodeKind::Delay(_) => "DELAY",
            NodeKind::Clipboard(_) => "CLIPBOARD",
        }
    }
}

/// Canvas coordinates, carried through untouched for the editor's benefit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Node behavior, one variant per node type
///
/// Each variant carries only the fields that type understands, so invalid
/// combinations (a DELAY node with a URL, say) are unrepresentable. The
/// `type`/`data` tagging matches the editor's node JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NodeKind {
    /// Entry point; seeds the run with an optional initial value
    #[serde(rename = "START")]
    Start(StartData),

    /// Terminal marker; passes its input through and has no output port
    #[serde(rename = "END")]
    End(EndData),

    /// Outbound HTTP call, optionally routed through the relay endpoint
    #[serde(rename = "REQUEST")]
    Request(RequestData),

    /// User-supplied Lua chunk run against the incoming value
    #[serde(rename = "SCRIPT")]
    Script(ScriptData),

    /// Boolean Lua expression selecting the true- or false-edge
    #[serde(rename = "CONDITION")]
    Condition(ConditionData),

    /// Suspends the run for a configured duration, then passes input through
    #[serde(rename = "DELAY")]
    Delay(DelayData),

    /// Writes the incoming value to the clipboard sink; failure is non-fatal
    #[serde(rename = "CLIPBOARD")]
    Clipboard(ClipboardData),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartData {
    #[serde(default)]
    pub label: String,
    /// Initial payload as JSON text; non-JSON text is used as a raw string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndData {
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
    /// HTTP method, defaults to GET
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Request headers as JSON text; malformed text degrades to no headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<String>,
    /// Request body text, omitted for GET/HEAD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Route the call through the relay endpoint instead of dialing the URL
    #[serde(default)]
    pub use_proxy: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptData {
    #[serde(default)]
    pub label: String,
    /// Lua chunk; `input` is bound to the incoming value
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionData {
    #[serde(default)]
    pub label: String,
    /// Lua expression; `input` is bound to the incoming value
    #[serde(default)]
    pub condition: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayData {
    #[serde(default)]
    pub label: String,
    /// Suspension in milliseconds; unset falls back to the engine default,
    /// non-positive values skip the wait entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardData {
    #[serde(default)]
    pub label: String,
}

/// Connection between two nodes in the workflow graph
///
/// Edges define data flow direction. The branch tag is only meaningful when
/// the source is a CONDITION node; the iteration mode governs how the edge's
/// target is invoked when the edge is traversed with an array input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge identifier
    pub id: String,
    /// Source node ID
    pub source: String,
    /// Target node ID
    pub target: String,
    /// Which condition outcome this edge serves
    #[serde(default, rename = "type")]
    pub branch: BranchKind,
    /// How the target is invoked when this edge carries an array
    #[serde(default)]
    pub iteration: IterationMode,
}

/// Discriminator selecting which edge to follow after a CONDITION node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    #[default]
    Default,
    True,
    False,
}

impl BranchKind {
    /// The branch kind a condition outcome routes to
    pub fn for_outcome(taken: bool) -> Self {
        if taken {
            BranchKind::True
        } else {
            BranchKind::False
        }
    }
}

/// Per-edge invocation mode for array inputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IterationMode {
    /// Invoke the target once with the full input
    #[default]
    Default,
    /// Invoke once per element, collecting the per-item results
    Map,
    /// Invoke once per element for effects, keeping the original array
    ForEach,
}

impl IterationMode {
    pub fn is_iterating(self) -> bool {
        !matches!(self, IterationMode::Default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_json_round_trips_editor_shape() {
        let doc = json!({
            "id": "n1",
            "type": "START",
            "position": {"x": 40.0, "y": 80.0},
            "data": {"label": "Start", "initValue": "{\"value\":5}"}
        });

        let node: Node = serde_json::from_value(doc.clone()).unwrap();
        assert!(node.is_start());
        match &node.kind {
            NodeKind::Start(data) => {
                assert_eq!(data.label, "Start");
                assert_eq!(data.init_value.as_deref(), Some("{\"value\":5}"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn request_data_defaults_apply() {
        let doc = json!({
            "id": "req",
            "type": "REQUEST",
            "data": {"label": "Fetch", "url": "https://example.com"}
        });

        let node: Node = serde_json::from_value(doc).unwrap();
        match node.kind {
            NodeKind::Request(data) => {
                assert_eq!(data.method, None);
                assert!(!data.use_proxy);
                assert_eq!(node.position, Position::default());
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn edge_branch_and_iteration_tags_parse() {
        let doc = json!({
            "id": "e1",
            "source": "cond",
            "target": "a",
            "type": "true",
            "iteration": "forEach"
        });

        let edge: Edge = serde_json::from_value(doc).unwrap();
        assert_eq!(edge.branch, BranchKind::True);
        assert_eq!(edge.iteration, IterationMode::ForEach);

        let bare: Edge =
            serde_json::from_value(json!({"id": "e2", "source": "a", "target": "b"})).unwrap();
        assert_eq!(bare.branch, BranchKind::Default);
        assert_eq!(bare.iteration, IterationMode::Default);
        assert!(!bare.iteration.is_iterating());
    }

    #[test]
    fn workflow_document_parses() {
        let doc = json!({
            "id": "wf-1",
            "name": "Demo",
            "lastModified": 1700000000000i64,
            "nodes": [
                {"id": "s", "type": "START", "position": {"x": 0.0, "y": 0.0}, "data": {"label": ""}},
                {"id": "e", "type": "END", "position": {"x": 200.0, "y": 0.0}, "data": {"label": ""}}
            ],
            "edges": [
                {"id": "e1", "source": "s", "target": "e"}
            ]
        });

        let workflow: Workflow = serde_json::from_value(doc).unwrap();
        assert_eq!(workflow.nodes.len(), 2);
        assert_eq!(workflow.edges.len(), 1);
        assert_eq!(workflow.last_modified, 1700000000000);
    }
}
