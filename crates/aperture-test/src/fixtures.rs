//! Constructors for commonly needed test values.

use aperture_core::{CapabilityName, ServerId};
use serde_json::{Value, json};

/// A capability name for use in tests where the exact value is incidental.
#[must_use]
pub fn test_capability(name: &str) -> CapabilityName {
    CapabilityName::new(name)
}

/// A fresh server id.
#[must_use]
pub fn test_server_id() -> ServerId {
    ServerId::new()
}

/// A minimal, valid `tools/list` result payload with one tool.
#[must_use]
pub fn tools_list_result(tool_name: &str) -> Value {
    json!({
        "tools": [
            { "name": tool_name, "description": "test tool", "inputSchema": { "type": "object" } }
        ]
    })
}

/// A minimal, valid `initialize` result payload.
#[must_use]
pub fn initialize_result(server_name: &str) -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "serverInfo": { "name": server_name, "version": "0.0.0-test" },
        "capabilities": {}
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_list_result_carries_the_requested_tool_name() {
        let value = tools_list_result("read_file");
        assert_eq!(value["tools"][0]["name"], "read_file");
    }
}
