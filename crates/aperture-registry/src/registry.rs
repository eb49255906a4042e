//! Capability-to-server bindings (spec §4.14).
//!
//! Registration occurs once the Supervisor reports `ready` and `tools/list`
//! has completed; unregistration occurs the moment a server leaves `ready`.
//! A capability is routable iff at least one server is currently bound to
//! it — the [`aperture_events::ApertureEvent::CapabilityRegistered`] and
//! `CapabilityUnregistered` events fire only on that 0-to-1 and 1-to-0
//! transition, not on every individual server add/remove.

use aperture_core::{CapabilityName, ServerId, Timestamp};
use aperture_events::{ApertureEvent, EventBus};
use aperture_mcp::ToolDescriptor;
use dashmap::DashMap;

use crate::error::{RegistryError, RegistryResult};
use crate::types::RegisteredServer;

/// The Capability Registry: `capability -> [server_id]`, `server_id ->
/// summary`, and `server_id -> [tool]` (spec §4.14).
pub struct Registry {
    events: EventBus,
    bindings: DashMap<CapabilityName, Vec<ServerId>>,
    servers: DashMap<ServerId, RegisteredServer>,
}

impl Registry {
    /// Create an empty registry publishing binding transitions on `events`.
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        Self { events, bindings: DashMap::new(), servers: DashMap::new() }
    }

    /// Bind `server_id` to every capability in `capabilities`, recording
    /// `tools` as what it advertises. Idempotent: re-registering a server
    /// already bound to a capability is a no-op for that capability.
    pub fn register(&self, server_id: ServerId, capabilities: Vec<CapabilityName>, tools: Vec<ToolDescriptor>) {
        for capability in &capabilities {
            let mut entry = self.bindings.entry(capability.clone()).or_default();
            let became_routable = entry.is_empty();
            if !entry.contains(&server_id) {
                entry.push(server_id);
            }
            drop(entry);
            if became_routable {
                self.events.publish(ApertureEvent::CapabilityRegistered {
                    at: Timestamp::now(),
                    capability: capability.clone(),
                    server_id,
                });
            }
        }
        self.servers.insert(server_id, RegisteredServer { server_id, capabilities, tools });
    }

    /// Remove `server_id` from every capability it was bound to. Each
    /// capability that drops to zero bound servers publishes
    /// `CapabilityUnregistered` exactly once.
    pub fn unregister(&self, server_id: ServerId) {
        let Some((_, removed)) = self.servers.remove(&server_id) else { return };
        for capability in removed.capabilities {
            let became_unroutable = {
                let Some(mut entry) = self.bindings.get_mut(&capability) else { continue };
                entry.retain(|id| *id != server_id);
                entry.is_empty()
            };
            if became_unroutable {
                self.bindings.remove(&capability);
                self.events.publish(ApertureEvent::CapabilityUnregistered {
                    at: Timestamp::now(),
                    capability,
                    server_id,
                });
            }
        }
    }

    /// Servers currently bound to `capability`, in no particular order.
    #[must_use]
    pub fn servers_for(&self, capability: &CapabilityName) -> Vec<ServerId> {
        self.bindings.get(capability).map(|v| v.clone()).unwrap_or_default()
    }

    /// Whether at least one server is bound to `capability`.
    #[must_use]
    pub fn is_routable(&self, capability: &CapabilityName) -> bool {
        self.bindings.get(capability).is_some_and(|v| !v.is_empty())
    }

    /// The tools advertised by `server_id`.
    ///
    /// # Errors
    /// Returns [`RegistryError::ServerNotRegistered`] if the server is not
    /// currently registered.
    pub fn tools_for(&self, server_id: ServerId) -> RegistryResult<Vec<ToolDescriptor>> {
        self.servers
            .get(&server_id)
            .map(|s| s.tools.clone())
            .ok_or(RegistryError::ServerNotRegistered(server_id))
    }

    /// A snapshot of every currently registered server.
    #[must_use]
    pub fn list_servers(&self) -> Vec<RegisteredServer> {
        self.servers.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Number of distinct capabilities currently routable.
    #[must_use]
    pub fn capability_count(&self) -> usize {
        self.bindings.len()
    }

    /// Number of distinct servers currently registered.
    #[must_use]
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }
}

#[cfg(test)]
mod tests {
    use aperture_core::CapabilityName;
    use serde_json::json;

    use super::*;

    fn tool(server_id: ServerId, name: &str) -> ToolDescriptor {
        ToolDescriptor {
            server_id,
            tool_name: name.to_string(),
            input_schema: json!({"type": "object"}),
            output_hint: None,
        }
    }

    #[test]
    fn first_registration_makes_capability_routable() {
        let registry = Registry::new(EventBus::new());
        let server = ServerId::new();
        let capability = CapabilityName::new("filesystem");
        assert!(!registry.is_routable(&capability));
        registry.register(server, vec![capability.clone()], vec![tool(server, "read_file")]);
        assert!(registry.is_routable(&capability));
        assert_eq!(registry.servers_for(&capability), vec![server]);
    }

    #[test]
    fn unregistering_last_server_makes_capability_unroutable() {
        let registry = Registry::new(EventBus::new());
        let server = ServerId::new();
        let capability = CapabilityName::new("filesystem");
        registry.register(server, vec![capability.clone()], vec![tool(server, "read_file")]);
        registry.unregister(server);
        assert!(!registry.is_routable(&capability));
        assert!(registry.tools_for(server).is_err());
    }

    #[test]
    fn second_server_does_not_duplicate_binding() {
        let registry = Registry::new(EventBus::new());
        let capability = CapabilityName::new("filesystem");
        let first = ServerId::new();
        let second = ServerId::new();
        registry.register(first, vec![capability.clone()], vec![tool(first, "read_file")]);
        registry.register(second, vec![capability.clone()], vec![tool(second, "read_file")]);
        assert_eq!(registry.servers_for(&capability).len(), 2);

        registry.unregister(first);
        assert!(registry.is_routable(&capability));
        assert_eq!(registry.servers_for(&capability), vec![second]);
    }
}
