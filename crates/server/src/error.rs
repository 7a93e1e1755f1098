//! Tool-level errors for the shellcache server.
//!
//! Engine and store failures use `shellcache_core::Error`; these cover
//! malformed tool arguments only.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., an empty method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Output could not be rendered as JSON.
    #[error("SERIALIZE_FAILED: {0}")]
    SerializeFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::SerializeFailed(msg) => (-32000, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::SerializeFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_maps_to_invalid_params() {
        let err: McpError = ToolError::InvalidInput("method must not be empty".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert_eq!(err.message, "method must not be empty");
    }
}
