/// Runtime Execution Engine
///
/// This module provides the graph walk execution engine for workflows.
/// It handles:
/// - Per-type node evaluation and its external collaborators
/// - Iteration over array inputs (map / forEach)
/// - Branch resolution after CONDITION nodes
/// - Bounded driving of the walk with an execution trace

// Graph walk driver and iteration wrapper
pub mod engine;

// Individual node evaluation
pub mod executor;

// Run-level error taxonomy
pub mod error;

// Execution trace accumulation
pub mod trace;

// Embedded Lua script evaluation
pub mod script;

// Outbound HTTP transport for REQUEST nodes
pub mod http;

// Clipboard sink collaborator
pub mod clipboard;

// Re-export main types
pub use clipboard::{ClipboardSink, DeniedClipboard, MemoryClipboard};
pub use engine::WorkflowEngine;
pub use error::{EngineError, RunFailure};
pub use executor::{NodeExecutor, NodeOutcome, RunContext};
pub use http::HttpDispatcher;
pub use script::{LuaScriptEngine, ScriptEngine};
pub use trace::{ExecutionLogEntry, RunStatus};
