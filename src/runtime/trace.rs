/// Execution trace accumulation
///
/// One run produces one ordered trace: an entry per node invocation (or per
/// failed invocation), consumed by the editor to render per-node status
/// badges and output previews. The trace is the run's sole result; nothing is
/// retained after `execute()` returns. The accumulator is threaded through
/// the driver explicitly rather than living as shared mutable state, which
/// keeps each step independently testable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome status of a single node invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

/// One node invocation's record in the trace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLogEntry {
    /// Node that ran
    pub node_id: String,
    /// Whether the invocation succeeded
    pub status: RunStatus,
    /// The value the node produced (or its input, for pass-through nodes)
    pub output: Value,
    /// Entry creation time, epoch milliseconds
    pub timestamp: i64,
    /// Diagnostic lines: captured script output, condition results, notes
    #[serde(default)]
    pub logs: Vec<String>,
}

/// Append-only, execution-ordered collection of log entries
#[derive(Debug, Default)]
pub struct Trace {
    entries: Vec<ExecutionLogEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful invocation, with optional diagnostic lines
    pub fn success(&mut self, node_id: &str, output: Value, logs: Vec<String>) {
        self.push(node_id, RunStatus::Success, output, logs);
    }

    /// Record a failed invocation with a single diagnostic note
    pub fn error(&mut self, node_id: &str, output: Value, note: impl Into<String>) {
        self.push(node_id, RunStatus::Error, output, vec![note.into()]);
    }

    fn push(&mut self, node_id: &str, status: RunStatus, output: Value, logs: Vec<String>) {
        self.entries.push(ExecutionLogEntry {
            node_id: node_id.to_string(),
            status,
            output,
            timestamp: chrono::Utc::now().timestamp_millis(),
            logs,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ExecutionLogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ExecutionLogEntry> {
        self.entries
    }
}
