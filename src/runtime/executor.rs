/// Per-type node evaluation
///
/// The executor resolves what a single node does with a single input value:
/// seeding (START), pass-through (END, DELAY), clipboard writes, script
/// evaluation, outbound HTTP and branch decisions. It knows nothing about
/// edges or iteration; the engine layers those on top. External effects go
/// through the collaborators the host wires in (script engine, HTTP
/// dispatcher, clipboard sink, tokio's timer).

use crate::config::EngineConfig;
use crate::runtime::clipboard::ClipboardSink;
use crate::runtime::error::EngineError;
use crate::runtime::http::{HttpDispatcher, OutboundRequest};
use crate::runtime::script::ScriptEngine;
use crate::runtime::trace::Trace;
use crate::workflow::types::{
    ConditionData, DelayData, Node, NodeKind, RequestData, ScriptData, StartData,
};
use anyhow::Result;
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Identity and timing shared by every node invocation in one run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    /// Run start, epoch milliseconds; START nodes stamp it into their output
    pub started_at_ms: i64,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// What a node invocation produced
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    /// Ordinary value flowing onward
    Value(Value),
    /// A CONDITION decision: the edge taken differs, but the value forwarded
    /// onward is the original input, never the boolean
    Branch { taken: bool, original_input: Value },
}

/// A node invocation's outcome plus captured diagnostics
#[derive(Debug, Clone)]
pub struct NodeEval {
    pub outcome: NodeOutcome,
    /// Diagnostic lines to attach to this invocation's trace entry
    pub logs: Vec<String>,
}

impl NodeEval {
    fn value(value: Value) -> Self {
        Self {
            outcome: NodeOutcome::Value(value),
            logs: Vec::new(),
        }
    }
}

/// Node executor dispatching on node type
pub struct NodeExecutor {
    scripts: Arc<dyn ScriptEngine>,
    http: HttpDispatcher,
    clipboard: Arc<dyn ClipboardSink>,
    default_delay_ms: i64,
}

impl NodeExecutor {
    /// Create a new executor wired to the given collaborators
    pub fn new(
        config: &EngineConfig,
        scripts: Arc<dyn ScriptEngine>,
        clipboard: Arc<dyn ClipboardSink>,
    ) -> Result<Self> {
        let http = HttpDispatcher::new(
            Duration::from_secs(config.request_timeout_secs),
            config.relay_url.clone(),
        )?;
        Ok(Self {
            scripts,
            http,
            clipboard,
            default_delay_ms: config.default_delay_ms,
        })
    }

    /// Evaluate one node against one input value
    ///
    /// CONDITION and CLIPBOARD write their own trace entries here (a branch
    /// record and a copied/denied record respectively); other node types
    /// leave trace writing to the engine. A returned error is fatal to the
    /// run; the only recoverable failure, a clipboard write, never
    /// surfaces as an error.
    pub async fn evaluate(
        &self,
        node: &Node,
        input: Value,
        run: &RunContext,
        trace: &mut Trace,
    ) -> Result<NodeEval, EngineError> {
        tracing::info!("🚀 Executing node: {} (type: {})", node.id, node.type_name());
        tracing::debug!("📥 Input: {}", input);

        let result = match &node.kind {
            NodeKind::Start(data) => Ok(NodeEval::value(self.seed(data, run))),
            NodeKind::End(_) => Ok(NodeEval::value(input)),
            NodeKind::Delay(data) => Ok(self.delay(data, input).await),
            NodeKind::Clipboard(_) => Ok(self.copy_to_clipboard(&node.id, input, trace)),
            NodeKind::Script(data) => self.run_script(&node.id, data, input),
            NodeKind::Condition(data) => self.decide(&node.id, data, input, trace),
            NodeKind::Request(data) => self.request(&node.id, data).await,
        };

        match &result {
            Ok(eval) => tracing::debug!("📤 Node {} done: {:?}", node.id, eval.outcome),
            Err(e) => tracing::error!("❌ Node {} failed: {}", node.id, e),
        }

        result
    }

    /// START: parse the configured init value and merge in the run timestamp
    ///
    /// Malformed JSON degrades to the raw text; a non-object value lands
    /// under a "value" key next to the timestamp.
    fn seed(&self, data: &StartData, run: &RunContext) -> Value {
        let parsed = data
            .init_value
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .map(|text| {
                serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
            });

        match parsed {
            Some(Value::Object(map)) => {
                let mut seeded = Map::new();
                seeded.insert("startTime".to_string(), json!(run.started_at_ms));
                seeded.extend(map);
                Value::Object(seeded)
            }
            Some(other) => json!({ "startTime": run.started_at_ms, "value": other }),
            None => json!({ "startTime": run.started_at_ms }),
        }
    }

    /// DELAY: suspend, then pass the input through unchanged
    async fn delay(&self, data: &DelayData, input: Value) -> NodeEval {
        let ms = data.delay_ms.unwrap_or(self.default_delay_ms);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms as u64)).await;
        }
        NodeEval::value(input)
    }

    /// CLIPBOARD: serialize the input and hand it to the sink
    ///
    /// A failed write is recorded as an error entry and the run continues
    /// with the input passed through unchanged.
    fn copy_to_clipboard(&self, node_id: &str, input: Value, trace: &mut Trace) -> NodeEval {
        let text = match &input {
            Value::Object(_) | Value::Array(_) => {
                serde_json::to_string_pretty(&input).unwrap_or_else(|_| input.to_string())
            }
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        match self.clipboard.write_text(&text) {
            Ok(()) => {
                trace.success(node_id, input.clone(), vec!["Copied to clipboard".to_string()]);
            }
            Err(e) => {
                tracing::warn!("⚠️ Clipboard write failed on node '{}': {}", node_id, e);
                trace.error(node_id, input.clone(), e.to_string());
            }
        }

        NodeEval::value(input)
    }

    /// SCRIPT: run the chunk; a nil result passes the input through
    fn run_script(
        &self,
        node_id: &str,
        data: &ScriptData,
        input: Value,
    ) -> Result<NodeEval, EngineError> {
        let eval = self
            .scripts
            .eval_script(&data.code, &input)
            .map_err(|e| EngineError::script(node_id, e))?;

        let output = eval.value.unwrap_or(input);
        Ok(NodeEval {
            outcome: NodeOutcome::Value(output),
            logs: eval.logs,
        })
    }

    /// CONDITION: evaluate the expression and record the decision
    fn decide(
        &self,
        node_id: &str,
        data: &ConditionData,
        input: Value,
        trace: &mut Trace,
    ) -> Result<NodeEval, EngineError> {
        let taken = self
            .scripts
            .eval_condition(&data.condition, &input)
            .map_err(|e| EngineError::condition(node_id, e))?;

        trace.success(
            node_id,
            json!({ "result": taken }),
            vec![format!("Condition: {}", taken)],
        );

        Ok(NodeEval {
            outcome: NodeOutcome::Branch {
                taken,
                original_input: input,
            },
            logs: Vec::new(),
        })
    }

    /// REQUEST: build and send the call, then parse the response body
    ///
    /// Malformed header JSON degrades to the default header set with a
    /// diagnostic; a non-2xx response is fatal; a response body that isn't
    /// JSON flows onward as raw text.
    async fn request(&self, node_id: &str, data: &RequestData) -> Result<NodeEval, EngineError> {
        let mut logs = Vec::new();

        let method_text = data.method.as_deref().unwrap_or("GET").to_uppercase();
        let method = Method::from_bytes(method_text.as_bytes())
            .map_err(|_| EngineError::transport(&data.url, "invalid HTTP method"))?;

        let mut headers = Map::new();
        headers.insert("Content-Type".to_string(), json!("application/json"));
        if let Some(text) = data.headers.as_deref().filter(|t| !t.trim().is_empty()) {
            match serde_json::from_str::<Map<String, Value>>(text) {
                Ok(user_headers) => headers.extend(user_headers),
                Err(e) => {
                    tracing::warn!("⚠️ Invalid headers JSON on node '{}': {}", node_id, e);
                    logs.push(format!("Invalid headers JSON ignored: {}", e));
                }
            }
        }

        let body = if matches!(method, Method::GET | Method::HEAD) {
            None
        } else {
            data.body.clone()
        };

        let response = self
            .http
            .dispatch(
                OutboundRequest {
                    url: data.url.clone(),
                    method,
                    headers,
                    body,
                },
                data.use_proxy,
            )
            .await?;

        if !response.is_success() {
            return Err(EngineError::HttpStatus {
                status: response.status,
                status_text: response.status_text,
            });
        }

        let output =
            serde_json::from_str(&response.body).unwrap_or_else(|_| Value::String(response.body));
        Ok(NodeEval {
            outcome: NodeOutcome::Value(output),
            logs,
        })
    }
}
