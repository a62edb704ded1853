// Process-level fault handling
// Any uncaught panic is logged and ends the process with status 1.

use std::any::Any;

use tracing::error;

pub const FAULT_EXIT_CODE: i32 = 1;

/// Installs a panic hook that logs the fault and exits immediately.
///
/// Tokio would otherwise contain a panic inside the task serving the
/// request. Here the process terminates instead: no graceful drain, no
/// completion of in-flight requests.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());

        error!(location = %location, "Error: {}", panic_message(info.payload()));
        error!("Shutting down the server due to uncaught panic");

        std::process::exit(FAULT_EXIT_CODE);
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
