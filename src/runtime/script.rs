/// Embedded Lua script evaluation
///
/// SCRIPT node bodies and CONDITION expressions are Lua chunks evaluated
/// against an `input` binding. The interpreter sits behind the narrow
/// `ScriptEngine` trait so a host can swap in a different expression language
/// without touching the executor. Each evaluation gets a fresh Lua state:
/// scripts cannot observe each other and nothing leaks across nodes or runs.
///
/// This is exception isolation, not a security boundary: workflow authors
/// run arbitrary code on purpose. The dangerous stdlib tables (os, io,
/// package, debug) are still removed to keep scripts honest.

use mlua::{Lua, MultiValue, Value as LuaValue};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Failure raised by script or condition evaluation
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ScriptError(pub String);

/// Result of evaluating a SCRIPT chunk
#[derive(Debug)]
pub struct ScriptEval {
    /// The chunk's return value; None when the chunk returned nothing,
    /// which callers treat as pass-through
    pub value: Option<Value>,
    /// Lines captured from `print` during evaluation
    pub logs: Vec<String>,
}

/// Narrow capability interface over the embedded interpreter
pub trait ScriptEngine: Send + Sync {
    /// Evaluate a script chunk with `input` bound; captures printed lines
    fn eval_script(&self, source: &str, input: &Value) -> Result<ScriptEval, ScriptError>;

    /// Evaluate a boolean expression with `input` bound
    fn eval_condition(&self, source: &str, input: &Value) -> Result<bool, ScriptError>;
}

/// mlua-backed `ScriptEngine`
#[derive(Debug, Default)]
pub struct LuaScriptEngine;

impl LuaScriptEngine {
    pub fn new() -> Self {
        Self
    }

    /// Build a fresh Lua state with `input` bound and `print` captured
    fn prepare(
        &self,
        lua: &Lua,
        input: &Value,
        sink: Arc<Mutex<Vec<String>>>,
    ) -> mlua::Result<()> {
        let globals = lua.globals();

        for table in ["os", "io", "package", "debug"] {
            globals.set(table, LuaValue::Nil)?;
        }

        globals.set("input", json_to_lua(lua, input)?)?;

        let print = lua.create_function(move |_, args: MultiValue| {
            let line = args
                .iter()
                .map(format_lua_value)
                .collect::<Vec<_>>()
                .join(" ");
            if let Ok(mut lines) = sink.lock() {
                lines.push(line);
            }
            Ok(())
        })?;
        globals.set("print", print)?;

        Ok(())
    }
}

impl ScriptEngine for LuaScriptEngine {
    fn eval_script(&self, source: &str, input: &Value) -> Result<ScriptEval, ScriptError> {
        let lua = Lua::new();
        let captured: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        self.prepare(&lua, input, Arc::clone(&captured))
            .map_err(|e| ScriptError(e.to_string()))?;

        let result: LuaValue = lua
            .load(source)
            .eval()
            .map_err(|e| ScriptError(e.to_string()))?;

        let logs = captured.lock().map(|lines| lines.clone()).unwrap_or_default();
        let value = match result {
            LuaValue::Nil => None,
            other => Some(lua_to_json(&other)?),
        };

        Ok(ScriptEval { value, logs })
    }

    fn eval_condition(&self, source: &str, input: &Value) -> Result<bool, ScriptError> {
        let lua = Lua::new();
        self.prepare(&lua, input, Arc::new(Mutex::new(Vec::new())))
            .map_err(|e| ScriptError(e.to_string()))?;

        let result: LuaValue = lua
            .load(source)
            .eval()
            .map_err(|e| ScriptError(e.to_string()))?;

        // Lua truthiness: nil and false are falsy, everything else is truthy
        Ok(!matches!(result, LuaValue::Nil | LuaValue::Boolean(false)))
    }
}

/// Convert a JSON value into a Lua value, building tables through the API
fn json_to_lua(lua: &Lua, value: &Value) -> mlua::Result<LuaValue> {
    match value {
        Value::Null => Ok(LuaValue::Nil),
        Value::Bool(b) => Ok(LuaValue::Boolean(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(LuaValue::Integer(i))
            } else {
                Ok(LuaValue::Number(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Value::String(s) => Ok(LuaValue::String(lua.create_string(s)?)),
        Value::Array(items) => {
            let table = lua.create_table_with_capacity(items.len(), 0)?;
            for (i, item) in items.iter().enumerate() {
                table.set(i + 1, json_to_lua(lua, item)?)?;
            }
            Ok(LuaValue::Table(table))
        }
        Value::Object(map) => {
            let table = lua.create_table_with_capacity(0, map.len())?;
            for (key, item) in map {
                table.set(key.as_str(), json_to_lua(lua, item)?)?;
            }
            Ok(LuaValue::Table(table))
        }
    }
}

/// Convert a Lua value back into JSON
///
/// Tables whose keys are exactly 1..=n become arrays; everything else becomes
/// an object with stringified keys. Unrepresentable values (functions,
/// userdata, non-finite numbers) become null.
fn lua_to_json(value: &LuaValue) -> Result<Value, ScriptError> {
    match value {
        LuaValue::Nil => Ok(Value::Null),
        LuaValue::Boolean(b) => Ok(Value::Bool(*b)),
        LuaValue::Integer(i) => Ok(Value::Number((*i).into())),
        LuaValue::Number(f) => Ok(serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null)),
        LuaValue::String(s) => {
            let text = s.to_str().map_err(|e| ScriptError(e.to_string()))?;
            Ok(Value::String(text.to_string()))
        }
        LuaValue::Table(table) => {
            let mut count: usize = 0;
            let mut max_index: usize = 0;
            let mut is_sequence = true;

            for pair in table.clone().pairs::<LuaValue, LuaValue>() {
                let (key, _) = pair.map_err(|e| ScriptError(e.to_string()))?;
                count += 1;
                match key {
                    LuaValue::Integer(i) if i > 0 => {
                        max_index = max_index.max(i as usize);
                    }
                    _ => {
                        is_sequence = false;
                        break;
                    }
                }
            }

            if is_sequence && count > 0 && count == max_index {
                let mut items = Vec::with_capacity(count);
                for i in 1..=max_index {
                    let item: LuaValue =
                        table.get(i).map_err(|e| ScriptError(e.to_string()))?;
                    items.push(lua_to_json(&item)?);
                }
                Ok(Value::Array(items))
            } else {
                let mut object = serde_json::Map::new();
                for pair in table.clone().pairs::<LuaValue, LuaValue>() {
                    let (key, item) = pair.map_err(|e| ScriptError(e.to_string()))?;
                    let key = match key {
                        LuaValue::String(s) => s
                            .to_str()
                            .map_err(|e| ScriptError(e.to_string()))?
                            .to_string(),
                        LuaValue::Integer(i) => i.to_string(),
                        LuaValue::Number(f) => f.to_string(),
                        // Skip unsupported key types
                        _ => continue,
                    };
                    object.insert(key, lua_to_json(&item)?);
                }
                Ok(Value::Object(object))
            }
        }
        _ => Ok(Value::Null),
    }
}

/// Render one printed argument the way the editor's log panel expects:
/// JSON-encoded, arguments joined by a space
fn format_lua_value(value: &LuaValue) -> String {
    match lua_to_json(value) {
        Ok(json) => serde_json::to_string(&json).unwrap_or_else(|_| "null".to_string()),
        Err(_) => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> LuaScriptEngine {
        LuaScriptEngine::new()
    }

    #[test]
    fn script_reads_input_and_returns_table() {
        let eval = engine()
            .eval_script("return {value = input.value + 1}", &json!({"value": 5}))
            .unwrap();
        assert_eq!(eval.value, Some(json!({"value": 6})));
        assert!(eval.logs.is_empty());
    }

    #[test]
    fn script_without_return_yields_no_value() {
        let eval = engine()
            .eval_script("local x = 1 + 1", &json!({}))
            .unwrap();
        assert!(eval.value.is_none());
    }

    #[test]
    fn script_print_is_captured_not_emitted() {
        let eval = engine()
            .eval_script("print('checkpoint', input.n) return input.n", &json!({"n": 2}))
            .unwrap();
        assert_eq!(eval.value, Some(json!(2)));
        assert_eq!(eval.logs, ["\"checkpoint\" 2"]);
    }

    #[test]
    fn script_sequences_become_arrays() {
        let eval = engine()
            .eval_script("return {10, 20, 30}", &json!(null))
            .unwrap();
        assert_eq!(eval.value, Some(json!([10, 20, 30])));
    }

    #[test]
    fn script_error_propagates() {
        let err = engine()
            .eval_script("error('boom')", &json!({}))
            .unwrap_err();
        assert!(err.0.contains("boom"));
    }

    #[test]
    fn dangerous_tables_are_removed() {
        assert!(engine().eval_script("return os.time()", &json!({})).is_err());
        let eval = engine().eval_script("return os", &json!({})).unwrap();
        assert!(eval.value.is_none());
    }

    #[test]
    fn condition_uses_lua_truthiness() {
        let engine = engine();
        assert!(engine
            .eval_condition("input.value > 3", &json!({"value": 5}))
            .unwrap());
        assert!(!engine
            .eval_condition("input.value > 3", &json!({"value": 2}))
            .unwrap());
        assert!(!engine.eval_condition("nil", &json!({})).unwrap());
        assert!(engine.eval_condition("0", &json!({})).unwrap());
    }

    #[test]
    fn condition_on_malformed_expression_fails() {
        assert!(engine().eval_condition("input.value >", &json!({})).is_err());
    }
}
