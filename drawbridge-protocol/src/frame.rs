//! Protocol frame definitions

use drawbridge_common::BridgeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire protocol frame
///
/// Serialised untagged: the shape of the JSON object tells the frames apart
/// (see [`FrameCodec::decode`](crate::codec::FrameCodec::decode)).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Frame {
    /// Request from the bridge to the client
    Command(CommandFrame),
    /// Reply from the client, correlated by id
    Response(ResponseFrame),
    /// Keepalive, never correlated
    Heartbeat(Heartbeat),
}

impl Frame {
    pub fn ping() -> Self {
        Frame::Heartbeat(Heartbeat::Ping)
    }

    pub fn pong() -> Self {
        Frame::Heartbeat(Heartbeat::Pong)
    }
}

/// Named operation with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    pub id: String,
    pub command: String,
    #[serde(default = "empty_params")]
    pub params: Value,
}

fn empty_params() -> Value {
    Value::Object(Map::new())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseFrame {
    /// Successful reply carrying optional data and a human-readable message
    pub fn ok(id: impl Into<String>, data: Option<Value>, message: Option<String>) -> Self {
        Self {
            id: id.into(),
            success: true,
            data,
            message,
            error: None,
        }
    }

    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Resolve the reply into the caller's outcome.
    ///
    /// Success yields `data` (or `null`); failure yields
    /// [`BridgeError::CommandFailed`] with `error`, else `message`, else a
    /// generic text.
    pub fn into_result(self) -> Result<Value, BridgeError> {
        if self.success {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            let reason = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            Err(BridgeError::CommandFailed(reason))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Heartbeat {
    Ping,
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_heartbeat_shape() {
        assert_eq!(
            serde_json::to_value(Frame::ping()).unwrap(),
            json!({"type": "ping"})
        );
        assert_eq!(
            serde_json::to_value(Frame::pong()).unwrap(),
            json!({"type": "pong"})
        );
    }

    #[test]
    fn test_response_omits_absent_fields() {
        let frame = Frame::Response(ResponseFrame::ok("c1", None, Some("Table added".into())));
        assert_eq!(
            serde_json::to_value(frame).unwrap(),
            json!({"id": "c1", "success": true, "message": "Table added"})
        );
    }

    #[test]
    fn test_command_params_default_to_empty_object() {
        let frame: CommandFrame =
            serde_json::from_value(json!({"id": "c1", "command": "getTables"})).unwrap();
        assert_eq!(frame.params, json!({}));
    }

    #[test]
    fn test_into_result_success_without_data_is_null() {
        let value = ResponseFrame::ok("c1", None, None).into_result().unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_into_result_failure_prefers_error_then_message() {
        let err = ResponseFrame::failure("c1", "Field not found")
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "Command failed: Field not found");

        let frame = ResponseFrame {
            id: "c2".into(),
            success: false,
            message: Some("rejected".into()),
            ..Default::default()
        };
        assert!(frame.into_result().unwrap_err().to_string().contains("rejected"));

        let frame = ResponseFrame {
            id: "c3".into(),
            ..Default::default()
        };
        assert!(frame
            .into_result()
            .unwrap_err()
            .to_string()
            .contains("Unknown error"));
    }
}
