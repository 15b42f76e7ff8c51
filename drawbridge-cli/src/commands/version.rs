//! Version subcommand implementation

use drawbridge_common::DEFAULT_REMOTE_CONTROL_PATH;
use drawbridge_protocol::COMMAND_NAMES;

pub fn run() {
    println!("drawbridge {}", env!("CARGO_PKG_VERSION"));
    println!("endpoint: {DEFAULT_REMOTE_CONTROL_PATH}");
    println!("commands: {}", COMMAND_NAMES.len());

    #[cfg(target_os = "linux")]
    println!("target: linux");
    #[cfg(target_os = "macos")]
    println!("target: macos");
    #[cfg(target_os = "windows")]
    println!("target: windows");
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    println!("target: unknown");
}
