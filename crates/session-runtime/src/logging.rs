/// Centralized logging macros for the session system
///
/// These macros provide consistent logging across all components with:
/// - Debug-only compilation for debug/info/warn (stripped from release builds)
/// - Consistent formatting with component context
///
/// Log debug-level message (only in debug builds)
///
/// # Example
/// ```
/// use session_runtime::session_debug;
/// session_debug!("SessionActor: {:?} → {:?}", "Disconnected", "Connected");
/// ```
#[macro_export]
macro_rules! session_debug {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            eprintln!("[DEBUG] {}", format!($($arg)*));
        }
    };
}

/// Log info-level message (only in debug builds)
///
/// Use for important state changes and user-facing events
#[macro_export]
macro_rules! session_info {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            eprintln!("[INFO] {}", format!($($arg)*));
        }
    };
}

/// Log warning-level message (only in debug builds)
///
/// Use for recoverable errors and unexpected conditions
#[macro_export]
macro_rules! session_warn {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            eprintln!("[WARN] {}", format!($($arg)*));
        }
    };
}

/// Log error-level message (always compiled, even in release)
///
/// Use for critical errors that should always be visible
#[macro_export]
macro_rules! session_error {
    ($($arg:tt)*) => {
        {
            eprintln!("[ERROR] {}", format!($($arg)*));
        }
    };
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    #[test]
    fn test_logging_macros_compile() {
        session_debug!("test debug");
        session_info!("test info");
        session_warn!("test warn");
        session_error!("test error");
    }

    #[test]
    fn test_logging_with_format_args() {
        session_debug!("SessionActor: {} → {}", "Connected", "Ready");
        session_info!("Port opened at {} baud", 115200);
        session_warn!("Dropping write after close: {}", "0103255");
        session_error!("Failed to open port: {}", "Access denied");
    }
}
