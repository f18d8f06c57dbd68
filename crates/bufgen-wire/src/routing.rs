//! Address namespaces shared by schemas and the routing runtime.
//!
//! These values appear on the wire (opcodes) or in generated constants
//! (group addresses), so the resolver and the runtime must agree on them.

/// Base of the command opcode namespace. The first command is `COMMANDS_BASE + 1`.
pub const COMMANDS_BASE: u64 = 0x2_0000;

/// Names of the standard routing groups, in address order.
pub const STANDARD_GROUPS: [&str; 5] = ["MAIN", "MAIN_RENDER", "RPC", "RPC_SYNC", "RPC_READ"];

/// Opcode of the command declared at `index`.
pub fn command_opcode(index: usize) -> u64 {
    COMMANDS_BASE + 1 + index as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_opcode_follows_base() {
        assert_eq!(command_opcode(0), 131073);
        assert_eq!(command_opcode(2), 131075);
    }
}
