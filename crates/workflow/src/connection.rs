//! Connections between nodes (spec §3: "Connection").

use flowcore_core::Key;
use serde::{Deserialize, Serialize};

/// Reserved output names used by conditional nodes (spec §3, §4.7).
pub mod outputs {
    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";
    pub const FALLBACK: &str = "fallback";
}

/// A directed edge from one node's named output to another node's named
/// input. Outputs of conditional nodes use the reserved names in
/// [`outputs`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Connection {
    pub source_node_id: Key,
    pub source_output: String,
    pub target_node_id: Key,
    pub target_input: String,
}

impl Connection {
    pub fn new(
        source_node_id: Key,
        source_output: impl Into<String>,
        target_node_id: Key,
        target_input: impl Into<String>,
    ) -> Self {
        Self {
            source_node_id,
            source_output: source_output.into(),
            target_node_id,
            target_input: target_input.into(),
        }
    }

    /// A plain, unconditional edge on the default `"main"` output/input.
    pub fn main(source_node_id: Key, target_node_id: Key) -> Self {
        Self::new(source_node_id, "main", target_node_id, "main")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_connection_uses_default_ports() {
        let a = Key::new("a").unwrap();
        let b = Key::new("b").unwrap();
        let conn = Connection::main(a, b);
        assert_eq!(conn.source_output, "main");
        assert_eq!(conn.target_input, "main");
    }

    #[test]
    fn serde_roundtrip() {
        let conn = Connection::new(
            Key::new("if_node").unwrap(),
            outputs::TRUE,
            Key::new("set_true").unwrap(),
            "main",
        );
        let json = serde_json::to_string(&conn).unwrap();
        let back: Connection = serde_json::from_str(&json).unwrap();
        assert_eq!(conn, back);
    }
}
