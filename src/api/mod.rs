/// HTTP API layer
///
/// REST endpoints for workflow management and execution. The editor is the
/// only expected consumer: it registers or inlines workflow documents and
/// renders the returned traces.

// Workflow CRUD against the registry
pub mod workflows;

// Execution endpoints (registered + inline)
pub mod executions;
