//! log macro's for resolver logging

/// Writes an info! message to the app::resolver logger
#[macro_export]
macro_rules! resolver_info {
    ($($arg:tt)+) => {
        log::info!(target: "app::resolver", $($arg)+);
    };
}

/// Writes an error! message to the app::resolver logger
#[macro_export]
macro_rules! resolver_error {
    ($($arg:tt)+) => {
        log::error!(target: "app::resolver", $($arg)+);
    };
}

/// Writes a warn! message to the app::resolver logger
#[macro_export]
macro_rules! resolver_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "app::resolver", $($arg)+);
    };
}

/// Writes a debug! message to the app::resolver logger
#[macro_export]
macro_rules! resolver_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "app::resolver", $($arg)+);
    };
}
