//! Composition root: one explicitly constructed instance of everything,
//! wired together and injected; no process-wide singletons anywhere.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::bus::{logging_middleware, BusError, CommandBus, CommandEnvelope, Handler};
use crate::capabilities::{Capability, CapabilityError, CapabilityRegistry, RegistryError};
use crate::commands::{
    BrowseCommand, ClearChatCommand, CopyContextCommand, DevicePresenceCommand,
    MessageIdAllocator, SendMessageCommand, UpdateSettingsCommand, CMD_BROWSE, CMD_CLEAR_CHAT,
    CMD_COPY_CONTEXT, CMD_DEVICE_PRESENCE, CMD_SEND_MESSAGE, CMD_UPDATE_SETTINGS,
};
use crate::config::AssistantConfig;
use crate::context::{noop_invoker, ExecutionContext, PrivilegedInvoker};
use crate::dispatch::Dispatcher;
use crate::events::{ConversationAggregate, EventStore};
use crate::queries::{GetMessagesQuery, GetTranscriptQuery};

/// Owns the core's long-lived components and exposes the handles the host
/// embeds: the command bus for writes, the queries for reads, the registry
/// for extension wiring.
pub struct AssistantRuntime {
    settings: Arc<RwLock<AssistantConfig>>,
    registry: Arc<CapabilityRegistry>,
    store: Arc<EventStore>,
    aggregate: Arc<ConversationAggregate>,
    dispatcher: Arc<Dispatcher>,
    bus: Arc<CommandBus>,
    ids: Arc<MessageIdAllocator>,
    invoker: PrivilegedInvoker,
    hosted: bool,
}

impl AssistantRuntime {
    /// Build a runtime with no privileged host attached (tests, demos,
    /// browser-only deployments).
    pub fn new(config: AssistantConfig) -> Result<Self, BusError> {
        Self::with_host(config, noop_invoker(), false)
    }

    /// Build a runtime wired to a privileged host process.
    pub fn with_host(
        config: AssistantConfig,
        invoker: PrivilegedInvoker,
        hosted: bool,
    ) -> Result<Self, BusError> {
        let settings = Arc::new(RwLock::new(config));
        let registry = Arc::new(CapabilityRegistry::new());
        let store = Arc::new(EventStore::new());
        let aggregate = Arc::new(ConversationAggregate::new());
        let dispatcher = Arc::new(Dispatcher::new(registry.clone()));
        let bus = Arc::new(CommandBus::new());
        let ids = Arc::new(MessageIdAllocator::new());

        // The aggregate tracks the store for as long as the runtime lives.
        {
            let aggregate = aggregate.clone();
            store.on_all(move |event| aggregate.apply(event));
        }

        bus.use_middleware(logging_middleware());

        let runtime = Self {
            settings,
            registry,
            store,
            aggregate,
            dispatcher,
            bus,
            ids,
            invoker,
            hosted,
        };
        runtime.register_core_commands()?;
        Ok(runtime)
    }

    /// A fresh per-invocation context reflecting the current settings.
    pub fn context(&self) -> ExecutionContext {
        let config = Arc::new(self.settings.read().clone());
        let scope = config.default_scope;
        ExecutionContext::new(
            self.hosted,
            self.invoker.clone(),
            config,
            self.store.clone(),
            scope,
        )
    }

    pub fn bus(&self) -> &Arc<CommandBus> {
        &self.bus
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    pub fn aggregate(&self) -> &Arc<ConversationAggregate> {
        &self.aggregate
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Snapshot of the live settings.
    pub fn settings(&self) -> AssistantConfig {
        self.settings.read().clone()
    }

    pub fn messages_query(&self) -> GetMessagesQuery {
        GetMessagesQuery::new(self.aggregate.clone())
    }

    pub fn transcript_query(&self) -> GetTranscriptQuery {
        GetTranscriptQuery::new(self.aggregate.clone())
    }

    pub fn register_capability(&self, capability: Arc<dyn Capability>) -> Result<(), RegistryError> {
        self.registry.register(capability)
    }

    /// Walk every registered capability's optional `initialize` hook.
    pub async fn initialize_capabilities(&self) -> Result<(), CapabilityError> {
        let ctx = self.context();
        self.registry.initialize_all(&ctx).await
    }

    /// Dispose all capabilities and tear the store down.
    pub async fn shutdown(&self) {
        log::debug!("[runtime] shutting down");
        self.registry.dispose_all().await;
        self.store.clear();
    }

    // -----------------------------------------------------------------------
    // Core command wiring
    // -----------------------------------------------------------------------

    fn register_core_commands(&self) -> Result<(), BusError> {
        self.bus.register(CMD_SEND_MESSAGE, self.send_message_handler())?;
        self.bus.register(CMD_BROWSE, self.browse_handler())?;
        self.bus.register(CMD_CLEAR_CHAT, self.clear_chat_handler())?;
        self.bus.register(CMD_COPY_CONTEXT, self.copy_context_handler())?;
        self.bus
            .register(CMD_UPDATE_SETTINGS, self.update_settings_handler())?;
        self.bus
            .register(CMD_DEVICE_PRESENCE, self.device_presence_handler())?;
        Ok(())
    }

    fn context_factory(&self) -> impl Fn() -> ExecutionContext + Send + Sync + 'static {
        let settings = self.settings.clone();
        let store = self.store.clone();
        let invoker = self.invoker.clone();
        let hosted = self.hosted;
        move || {
            let config = Arc::new(settings.read().clone());
            let scope = config.default_scope;
            ExecutionContext::new(hosted, invoker.clone(), config, store.clone(), scope)
        }
    }

    fn send_message_handler(&self) -> Handler {
        let command = Arc::new(SendMessageCommand::new(
            self.store.clone(),
            self.dispatcher.clone(),
            self.ids.clone(),
        ));
        let make_ctx = self.context_factory();
        Arc::new(move |envelope: CommandEnvelope| {
            let command = command.clone();
            let ctx = make_ctx();
            Box::pin(async move {
                let text = require_str(&envelope, "text")?;
                let id = command.execute(&text, &ctx).await?;
                Ok(json!({ "message_id": id }))
            })
        })
    }

    fn browse_handler(&self) -> Handler {
        let command = Arc::new(BrowseCommand::new(
            self.store.clone(),
            self.dispatcher.clone(),
            self.ids.clone(),
        ));
        let make_ctx = self.context_factory();
        Arc::new(move |envelope: CommandEnvelope| {
            let command = command.clone();
            let ctx = make_ctx();
            Box::pin(async move {
                let url = require_str(&envelope, "url")?;
                let id = command.execute(&url, &ctx).await?;
                Ok(json!({ "message_id": id }))
            })
        })
    }

    fn clear_chat_handler(&self) -> Handler {
        let command = Arc::new(ClearChatCommand::new(self.store.clone()));
        Arc::new(move |_envelope| {
            let command = command.clone();
            Box::pin(async move {
                command.execute();
                Ok(Value::Null)
            })
        })
    }

    fn copy_context_handler(&self) -> Handler {
        let command = Arc::new(CopyContextCommand::new(GetTranscriptQuery::new(
            self.aggregate.clone(),
        )));
        Arc::new(move |_envelope| {
            let command = command.clone();
            Box::pin(async move { Ok(Value::String(command.execute())) })
        })
    }

    fn update_settings_handler(&self) -> Handler {
        let command = Arc::new(UpdateSettingsCommand::new(
            self.store.clone(),
            self.settings.clone(),
        ));
        Arc::new(move |envelope: CommandEnvelope| {
            let command = command.clone();
            Box::pin(async move {
                command.execute(envelope.payload)?;
                Ok(Value::Null)
            })
        })
    }

    fn device_presence_handler(&self) -> Handler {
        let command = Arc::new(DevicePresenceCommand::new(self.store.clone()));
        Arc::new(move |envelope: CommandEnvelope| {
            let command = command.clone();
            Box::pin(async move {
                let device = require_str(&envelope, "device")?;
                let connected = envelope
                    .payload
                    .get("connected")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| {
                        anyhow::anyhow!("payload field 'connected' must be a boolean")
                    })?;
                command.execute(&device, connected)?;
                Ok(Value::Null)
            })
        })
    }
}

fn require_str(envelope: &CommandEnvelope, field: &str) -> anyhow::Result<String> {
    envelope
        .payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("payload field '{field}' must be a string"))
}
