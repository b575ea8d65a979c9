//! Run-level error types for the execution engine

use crate::runtime::trace::ExecutionLogEntry;
use thiserror::Error;

/// Errors that terminate a workflow run
///
/// Only SCRIPT, REQUEST and CONDITION failures (plus the missing-START
/// configuration error) ever surface here; CLIPBOARD failures are recoverable
/// and stay inside the trace.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No START node in the graph; nothing ran and the trace is empty
    #[error("No START node found")]
    MissingStartNode,

    /// A SCRIPT node's Lua chunk raised
    #[error("Script error at node '{node_id}': {message}")]
    Script { node_id: String, message: String },

    /// A CONDITION node's expression failed to evaluate
    #[error("Condition error at node '{node_id}': {message}")]
    Condition { node_id: String, message: String },

    /// A REQUEST node received a non-2xx response
    #[error("HTTP {status}: {status_text}")]
    HttpStatus { status: u16, status_text: String },

    /// A REQUEST node failed before a response arrived
    #[error("Request to '{url}' failed: {message}")]
    Transport { url: String, message: String },

    /// A REQUEST node asked for relay routing but none is configured
    #[error("Proxy routing requested but no relay endpoint is configured")]
    RelayUnconfigured,
}

impl EngineError {
    pub fn script(node_id: impl Into<String>, message: impl ToString) -> Self {
        Self::Script {
            node_id: node_id.into(),
            message: message.to_string(),
        }
    }

    pub fn condition(node_id: impl Into<String>, message: impl ToString) -> Self {
        Self::Condition {
            node_id: node_id.into(),
            message: message.to_string(),
        }
    }

    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

/// A terminated run: the error that stopped it plus everything that executed
/// before the stop
///
/// Callers are expected to treat this as "stop, but trust the partial
/// trace": the trace still ends with the failing node's error entry.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    pub error: EngineError,
    pub trace: Vec<ExecutionLogEntry>,
}
