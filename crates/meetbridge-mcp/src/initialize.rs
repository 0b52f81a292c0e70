use meetbridge_protocol::mcp::MCP_PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SERVER_NAME: &str = "meetbridge-mcp";

const INSTRUCTIONS: &str = "meetbridge exposes Google Meet, Calendar, Gmail and Docs as tools. \
Call auth_status first; if it reports no credentials, call authenticate once. \
Conference, transcript, message and document ids returned by list tools are the inputs \
of the matching get tools. Confirm with the user before sending email, trashing messages \
or replacing document text.";

/// Client handshake. Every field is optional; the server answers with its
/// own protocol version whatever the client asks for.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: Value,
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
    pub instructions: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapabilities,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapabilities {
    pub list_changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

pub fn handle_initialize(request: InitializeRequest) -> InitializeResponse {
    if let Some(client) = &request.client_info {
        tracing::info!(
            "Client connected: {} {} (protocol {})",
            client.name,
            client.version.as_deref().unwrap_or("?"),
            request.protocol_version.as_deref().unwrap_or("unspecified")
        );
    }

    InitializeResponse {
        protocol_version: MCP_PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: ToolsCapabilities { list_changed: false },
        },
        server_info: ServerInfo {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        instructions: INSTRUCTIONS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_params() {
        let request: InitializeRequest = serde_json::from_value(json!({})).unwrap();
        let value = serde_json::to_value(handle_initialize(request)).unwrap();
        assert_eq!(value["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(value["serverInfo"]["name"], "meetbridge-mcp");
        assert_eq!(value["capabilities"]["tools"]["listChanged"], false);
    }
}
