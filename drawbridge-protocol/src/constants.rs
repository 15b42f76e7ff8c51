//! Protocol constants

/// Maximum text frame size (16MB)
pub const MAX_FRAME_SIZE: usize = drawbridge_common::constants::MAX_FRAME_BYTES;

/// Key identifying heartbeat frames
pub const TYPE_KEY: &str = "type";

/// Key identifying command frames
pub const COMMAND_KEY: &str = "command";

/// Key identifying response frames
pub const SUCCESS_KEY: &str = "success";
