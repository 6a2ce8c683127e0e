//! Command bus — one handler per command-type tag, wrapped in middleware.
//!
//! Handlers for plugin-contributed command types appear and disappear at
//! runtime, so an unknown-type dispatch reports the currently known types.
//! Duplicate registration, by contrast, is a wiring defect and fails
//! immediately.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A command as it travels the bus: a type tag plus a JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    #[serde(rename = "type")]
    pub name: String,
    #[serde(default)]
    pub payload: Value,
}

impl CommandEnvelope {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// The innermost stage of a dispatch.
pub type Handler =
    Arc<dyn Fn(CommandEnvelope) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Continuation a middleware calls to pass the command further in.
pub type Next =
    Box<dyn FnOnce(CommandEnvelope) -> BoxFuture<'static, anyhow::Result<Value>> + Send>;

/// A middleware stage: `(cmd, next) -> result`. Composed in registration
/// order, with the handler innermost; each stage observes every dispatch
/// exactly once, on success and failure paths alike.
pub type Middleware = Arc<
    dyn Fn(CommandEnvelope, Next) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync,
>;

/// Bus failures. The first two are programming errors in wiring and are
/// surfaced loudly; `Handler` wraps a runtime failure from the command
/// itself.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("handler already registered for command type '{0}'")]
    DuplicateHandler(String),

    #[error("no handler for command type '{requested}'; known types: [{}]", .known.join(", "))]
    UnknownCommand {
        requested: String,
        known: Vec<String>,
    },

    #[error("command '{command}' failed: {source}")]
    Handler {
        command: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Maps command-type tags to handlers and threads every dispatch through
/// the middleware chain.
#[derive(Default)]
pub struct CommandBus {
    handlers: RwLock<HashMap<String, Handler>>,
    middleware: RwLock<Vec<Middleware>>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a command type. Exactly one handler per
    /// type: a duplicate is rejected immediately.
    pub fn register(&self, name: impl Into<String>, handler: Handler) -> Result<(), BusError> {
        let name = name.into();
        let mut handlers = self.handlers.write();
        if handlers.contains_key(&name) {
            return Err(BusError::DuplicateHandler(name));
        }
        handlers.insert(name, handler);
        Ok(())
    }

    /// Remove a handler. Returns whether one was present; used during
    /// capability teardown, where a second removal is not a fault.
    pub fn unregister(&self, name: &str) -> bool {
        self.handlers.write().remove(name).is_some()
    }

    /// Append a middleware stage to the chain.
    pub fn use_middleware(&self, middleware: Middleware) {
        self.middleware.write().push(middleware);
    }

    /// Command types with a handler right now, sorted.
    pub fn known_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// Dispatch a command through the middleware chain into its handler.
    pub async fn dispatch(&self, command: CommandEnvelope) -> Result<Value, BusError> {
        let handler = self.handlers.read().get(&command.name).cloned();
        let Some(handler) = handler else {
            return Err(BusError::UnknownCommand {
                requested: command.name,
                known: self.known_types(),
            });
        };
        let middleware: Vec<Middleware> = self.middleware.read().clone();
        let name = command.name.clone();

        let mut next: Next = Box::new(move |cmd| handler(cmd));
        for stage in middleware.into_iter().rev() {
            let inner = next;
            next = Box::new(move |cmd| stage(cmd, inner));
        }

        next(command).await.map_err(|source| BusError::Handler {
            command: name,
            source,
        })
    }
}

/// Middleware logging every dispatch with its outcome and duration.
pub fn logging_middleware() -> Middleware {
    Arc::new(|cmd: CommandEnvelope, next: Next| {
        Box::pin(async move {
            let name = cmd.name.clone();
            let started = Instant::now();
            let result = next(cmd).await;
            let elapsed = started.elapsed().as_millis();
            match &result {
                Ok(_) => log::debug!("[bus] '{name}' completed in {elapsed}ms"),
                Err(err) => log::warn!("[bus] '{name}' failed after {elapsed}ms: {err:#}"),
            }
            result
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn echo_handler() -> Handler {
        Arc::new(|cmd| Box::pin(async move { Ok(cmd.payload) }))
    }

    fn failing_handler(message: &'static str) -> Handler {
        Arc::new(move |_cmd| Box::pin(async move { anyhow::bail!(message) }))
    }

    #[tokio::test]
    async fn test_dispatch_reaches_the_handler() {
        let bus = CommandBus::new();
        bus.register("echo", echo_handler()).unwrap();

        let out = bus
            .dispatch(CommandEnvelope::new("echo", json!({ "x": 1 })))
            .await
            .unwrap();
        assert_eq!(out, json!({ "x": 1 }));
    }

    #[tokio::test]
    async fn test_unknown_type_lists_known_types() {
        let bus = CommandBus::new();
        bus.register("send_message", echo_handler()).unwrap();
        bus.register("clear_chat", echo_handler()).unwrap();

        let err = bus
            .dispatch(CommandEnvelope::new("browse", Value::Null))
            .await
            .unwrap_err();
        match &err {
            BusError::UnknownCommand { requested, known } => {
                assert_eq!(requested, "browse");
                assert_eq!(known, &vec!["clear_chat".to_string(), "send_message".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        let rendered = err.to_string();
        assert!(rendered.contains("clear_chat, send_message"));
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails_loudly() {
        let bus = CommandBus::new();
        bus.register("echo", echo_handler()).unwrap();
        let err = bus.register("echo", echo_handler()).unwrap_err();
        assert!(matches!(err, BusError::DuplicateHandler(name) if name == "echo"));
    }

    #[tokio::test]
    async fn test_unregister_then_reregister() {
        let bus = CommandBus::new();
        bus.register("echo", echo_handler()).unwrap();
        assert!(bus.unregister("echo"));
        assert!(!bus.unregister("echo"));
        bus.register("echo", echo_handler()).unwrap();
    }

    #[tokio::test]
    async fn test_middleware_runs_in_registration_order_handler_innermost() {
        let bus = CommandBus::new();
        let trace = Arc::new(Mutex::new(Vec::new()));

        for tag in ["outer", "inner"] {
            let trace = trace.clone();
            bus.use_middleware(Arc::new(move |cmd: CommandEnvelope, next: Next| {
                let trace = trace.clone();
                Box::pin(async move {
                    trace.lock().push(format!("{tag}:before"));
                    let result = next(cmd).await;
                    trace.lock().push(format!("{tag}:after"));
                    result
                })
            }));
        }
        {
            let trace = trace.clone();
            bus.register(
                "echo",
                Arc::new(move |cmd| {
                    let trace = trace.clone();
                    Box::pin(async move {
                        trace.lock().push("handler".to_string());
                        Ok(cmd.payload)
                    })
                }),
            )
            .unwrap();
        }

        bus.dispatch(CommandEnvelope::new("echo", Value::Null))
            .await
            .unwrap();
        assert_eq!(
            *trace.lock(),
            vec!["outer:before", "inner:before", "handler", "inner:after", "outer:after"]
        );
    }

    #[tokio::test]
    async fn test_middleware_observes_failures_exactly_once() {
        let bus = CommandBus::new();
        let observed = Arc::new(Mutex::new(Vec::new()));
        {
            let observed = observed.clone();
            bus.use_middleware(Arc::new(move |cmd: CommandEnvelope, next: Next| {
                let observed = observed.clone();
                Box::pin(async move {
                    let result = next(cmd).await;
                    observed.lock().push(result.is_err());
                    result
                })
            }));
        }
        bus.register("ok", echo_handler()).unwrap();
        bus.register("broken", failing_handler("pipe burst")).unwrap();

        bus.dispatch(CommandEnvelope::new("ok", Value::Null)).await.unwrap();
        let err = bus
            .dispatch(CommandEnvelope::new("broken", Value::Null))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("pipe burst"));
        assert_eq!(*observed.lock(), vec![false, true]);
    }
}
