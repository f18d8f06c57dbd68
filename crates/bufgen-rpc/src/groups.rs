//! Routing groups and command buffer addresses.
//!
//! Groups are small sequential ids starting at 0. Command buffers are named
//! shared-buffer instances, numbered sequentially from 0 per rendering surface.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::error::{Result, RpcError};

/// Logical routing channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupAddress(pub u64);

impl fmt::Display for GroupAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// General engine traffic.
pub const MAIN: GroupAddress = GroupAddress(0);

/// Render command traffic for the main surface.
pub const MAIN_RENDER: GroupAddress = GroupAddress(1);

/// Asynchronous RPC methods.
pub const RPC: GroupAddress = GroupAddress(2);

/// Synchronous RPC methods.
pub const RPC_SYNC: GroupAddress = GroupAddress(3);

/// Stream producers (`read` methods).
pub const RPC_READ: GroupAddress = GroupAddress(4);

pub use bufgen_wire::routing::STANDARD_GROUPS;

/// Returns a human-readable name for a group address.
pub fn group_name(addr: GroupAddress) -> &'static str {
    usize::try_from(addr.0)
        .ok()
        .and_then(|index| STANDARD_GROUPS.get(index).copied())
        .unwrap_or("USER")
}

/// Named shared-buffer instance, scoped to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandsBufferAddress(pub u64);

impl fmt::Display for CommandsBufferAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocates command buffer addresses per surface.
#[derive(Debug, Default, Clone)]
pub struct CommandBufferRegistry {
    surfaces: BTreeMap<String, Vec<String>>,
}

impl CommandBufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next address on `surface` for buffer `name`.
    pub fn allocate(&mut self, surface: &str, name: &str) -> Result<CommandsBufferAddress> {
        let buffers = self.surfaces.entry(surface.to_string()).or_default();
        if buffers.iter().any(|existing| existing == name) {
            return Err(RpcError::AlreadyRegistered(format!(
                "command buffer {surface}.{name}"
            )));
        }
        let addr = CommandsBufferAddress(buffers.len() as u64);
        buffers.push(name.to_string());
        debug!(surface, name, %addr, "allocated command buffer");
        Ok(addr)
    }

    pub fn lookup(&self, surface: &str, name: &str) -> Option<CommandsBufferAddress> {
        self.surfaces
            .get(surface)?
            .iter()
            .position(|existing| existing == name)
            .map(|index| CommandsBufferAddress(index as u64))
    }

    /// Buffer names on `surface`, in address order.
    pub fn buffers(&self, surface: &str) -> &[String] {
        self.surfaces
            .get(surface)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_group_addresses() {
        assert_eq!(group_name(MAIN), "MAIN");
        assert_eq!(group_name(RPC_READ), "RPC_READ");
        assert_eq!(group_name(GroupAddress(17)), "USER");
        assert_eq!(STANDARD_GROUPS[RPC_SYNC.0 as usize], "RPC_SYNC");
    }

    #[test]
    fn buffers_are_numbered_per_surface() {
        let mut registry = CommandBufferRegistry::new();
        assert_eq!(
            registry.allocate("win1", "main_render").unwrap(),
            CommandsBufferAddress(0)
        );
        assert_eq!(
            registry.allocate("win1", "overlay").unwrap(),
            CommandsBufferAddress(1)
        );
        assert_eq!(
            registry.allocate("win2", "main_render").unwrap(),
            CommandsBufferAddress(0)
        );
        assert_eq!(
            registry.lookup("win1", "overlay"),
            Some(CommandsBufferAddress(1))
        );
        assert_eq!(registry.buffers("win1"), &["main_render", "overlay"]);
        assert!(registry.buffers("missing").is_empty());
    }

    #[test]
    fn duplicate_buffer_on_surface_is_rejected() {
        let mut registry = CommandBufferRegistry::new();
        registry.allocate("win1", "main_render").unwrap();
        assert!(matches!(
            registry.allocate("win1", "main_render"),
            Err(RpcError::AlreadyRegistered(_))
        ));
    }
}
