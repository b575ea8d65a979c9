/// Workflow Management Layer
///
/// This module handles workflow definitions and the in-memory registry:
/// - Type definitions (Workflow, Node, Edge) matching the editor's JSON
/// - Graph validation / compilation ahead of execution
/// - Lock-free hot-reload registry using ArcSwap

// Core workflow type definitions
pub mod types;

// Compilation and hot-reload registry
pub mod registry;

// Re-export commonly used types
pub use registry::{compile_workflow, CompiledWorkflow, WorkflowRegistry};
pub use types::{BranchKind, Edge, IterationMode, Node, NodeKind, Workflow};
