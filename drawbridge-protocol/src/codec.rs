//! Codec for encoding and decoding protocol frames
//!
//! Frames travel as one JSON object per WebSocket text message. There is no
//! envelope: the decoder classifies each object by the keys it carries.
//!
//! ```text
//! {"type": "ping" | "pong"}                       -> Heartbeat
//! {"id": .., "command": .., "params": {..}}       -> Command
//! {"id": .., "success": .., "data"?, "error"?}    -> Response
//! ```

use crate::constants::{COMMAND_KEY, MAX_FRAME_SIZE, SUCCESS_KEY, TYPE_KEY};
use crate::frame::{CommandFrame, Frame, Heartbeat, ResponseFrame};
use drawbridge_common::{BridgeError, Result};
use serde_json::Value;

/// Text frame codec
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl FrameCodec {
    /// Create a new codec instance with default max frame size
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new codec instance with a custom max frame size
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Get the configured max frame size
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    pub fn encode(&self, frame: &Frame) -> Result<String> {
        let text = serde_json::to_string(frame)?;
        self.check_size(text.len())?;
        Ok(text)
    }

    pub fn decode(&self, text: &str) -> Result<Frame> {
        self.check_size(text.len())?;

        let value: Value = serde_json::from_str(text)
            .map_err(|e| BridgeError::MalformedFrame(format!("invalid JSON: {e}")))?;
        let Value::Object(map) = &value else {
            return Err(BridgeError::MalformedFrame(
                "frame is not a JSON object".into(),
            ));
        };

        if map.contains_key(TYPE_KEY) {
            let heartbeat: Heartbeat = serde_json::from_value(value)
                .map_err(|e| BridgeError::MalformedFrame(format!("bad heartbeat: {e}")))?;
            return Ok(Frame::Heartbeat(heartbeat));
        }
        if map.contains_key(COMMAND_KEY) {
            let command: CommandFrame = serde_json::from_value(value)
                .map_err(|e| BridgeError::MalformedFrame(format!("bad command frame: {e}")))?;
            return Ok(Frame::Command(command));
        }
        if map.contains_key(SUCCESS_KEY) {
            let response: ResponseFrame = serde_json::from_value(value)
                .map_err(|e| BridgeError::MalformedFrame(format!("bad response frame: {e}")))?;
            return Ok(Frame::Response(response));
        }

        Err(BridgeError::MalformedFrame(
            "unrecognised frame shape".into(),
        ))
    }

    fn check_size(&self, len: usize) -> Result<()> {
        if len > self.max_frame_size {
            return Err(BridgeError::MalformedFrame(format!(
                "Frame too large: {len} bytes (max: {})",
                self.max_frame_size
            )));
        }
        Ok(())
    }
}

/// Best-effort recovery of the `id` of a frame that failed to decode.
pub fn recover_id(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    value.get("id")?.as_str().map(str::to_owned)
}
