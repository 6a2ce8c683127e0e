//! Settings and device-presence orchestrations.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::config::AssistantConfig;
use crate::events::{DomainEvent, EventStore};

use super::{CommandError, CMD_UPDATE_SETTINGS};

/// Merges a settings patch into the live configuration and records the
/// change as a `settings_changed` fact carrying the applied patch.
pub struct UpdateSettingsCommand {
    store: Arc<EventStore>,
    settings: Arc<RwLock<AssistantConfig>>,
}

impl UpdateSettingsCommand {
    pub fn new(store: Arc<EventStore>, settings: Arc<RwLock<AssistantConfig>>) -> Self {
        Self { store, settings }
    }

    /// Apply a partial update. `patch` is an object whose top-level keys
    /// overwrite the corresponding settings fields; unknown keys are
    /// rejected before anything is touched.
    pub fn execute(&self, patch: Value) -> Result<(), CommandError> {
        let Value::Object(ref fields) = patch else {
            return Err(CommandError::invalid(
                CMD_UPDATE_SETTINGS,
                "patch must be an object",
            ));
        };
        if fields.is_empty() {
            return Err(CommandError::invalid(CMD_UPDATE_SETTINGS, "empty patch"));
        }

        let merged = {
            let current = self.settings.read().clone();
            let mut value = serde_json::to_value(&current).map_err(|e| {
                CommandError::invalid(CMD_UPDATE_SETTINGS, e.to_string())
            })?;
            let Value::Object(ref mut base) = value else {
                unreachable!("settings always serialize to an object");
            };
            for (key, patch_value) in fields {
                if !base.contains_key(key) {
                    return Err(CommandError::invalid(
                        CMD_UPDATE_SETTINGS,
                        format!("unknown settings field '{key}'"),
                    ));
                }
                base.insert(key.clone(), patch_value.clone());
            }
            serde_json::from_value::<AssistantConfig>(value)
                .map_err(|e| CommandError::invalid(CMD_UPDATE_SETTINGS, e.to_string()))?
        };

        *self.settings.write() = merged;
        self.store.append(DomainEvent::settings_changed(patch));
        Ok(())
    }
}

/// Records a device (camera, peripheral) appearing or vanishing, as
/// reported by the host's message broker.
pub struct DevicePresenceCommand {
    store: Arc<EventStore>,
}

impl DevicePresenceCommand {
    pub fn new(store: Arc<EventStore>) -> Self {
        Self { store }
    }

    pub fn execute(&self, device: &str, connected: bool) -> Result<(), CommandError> {
        if device.trim().is_empty() {
            return Err(CommandError::invalid(
                super::CMD_DEVICE_PRESENCE,
                "empty device name",
            ));
        }
        log::debug!(
            "[devices] '{device}' {}",
            if connected { "connected" } else { "disconnected" }
        );
        self.store
            .append(DomainEvent::device_presence(device, connected));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_settings_merges_and_records() {
        let store = Arc::new(EventStore::new());
        let settings = Arc::new(RwLock::new(AssistantConfig::default()));
        let command = UpdateSettingsCommand::new(store.clone(), settings.clone());

        command
            .execute(json!({ "assistant_name": "hestia", "default_scope": "internet" }))
            .unwrap();

        assert_eq!(settings.read().assistant_name, "hestia");
        assert_eq!(
            settings.read().default_scope,
            crate::context::Scope::Internet
        );
        assert_eq!(store.events()[0].event_type(), "settings_changed");
    }

    #[test]
    fn test_unknown_field_is_rejected_without_side_effects() {
        let store = Arc::new(EventStore::new());
        let settings = Arc::new(RwLock::new(AssistantConfig::default()));
        let command = UpdateSettingsCommand::new(store.clone(), settings.clone());

        let err = command.execute(json!({ "warp_drive": true })).unwrap_err();
        assert!(err.to_string().contains("warp_drive"));
        assert!(store.is_empty());
        assert_eq!(*settings.read(), AssistantConfig::default());
    }

    #[test]
    fn test_malformed_value_is_rejected_without_side_effects() {
        let store = Arc::new(EventStore::new());
        let settings = Arc::new(RwLock::new(AssistantConfig::default()));
        let command = UpdateSettingsCommand::new(store.clone(), settings.clone());

        // Right key, wrong shape.
        assert!(command.execute(json!({ "cameras": "not a list" })).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_device_presence_appends_lifecycle_facts() {
        let store = Arc::new(EventStore::new());
        let command = DevicePresenceCommand::new(store.clone());
        command.execute("garage-cam", true).unwrap();
        command.execute("garage-cam", false).unwrap();

        let types: Vec<String> = store
            .events()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect();
        assert_eq!(types, vec!["device_connected", "device_disconnected"]);
    }
}
