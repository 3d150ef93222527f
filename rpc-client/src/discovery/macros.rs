//! log macro's for service discovery logging

/// Writes an info! message to the app::discovery logger
#[macro_export]
macro_rules! discovery_info {
    ($($arg:tt)+) => {
        log::info!(target: "app::discovery", $($arg)+);
    };
}

/// Writes an error! message to the app::discovery logger
#[macro_export]
macro_rules! discovery_error {
    ($($arg:tt)+) => {
        log::error!(target: "app::discovery", $($arg)+);
    };
}

/// Writes a warn! message to the app::discovery logger
#[macro_export]
macro_rules! discovery_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "app::discovery", $($arg)+);
    };
}

/// Writes a debug! message to the app::discovery logger
#[macro_export]
macro_rules! discovery_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "app::discovery", $($arg)+);
    };
}
