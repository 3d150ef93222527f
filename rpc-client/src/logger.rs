//! # Logger
//!
//! log4rs initialisation

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use snafu::prelude::*;

/// Pattern of the console fallback
const CONSOLE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} | {h({l}):5.5} | {t} | {m}{n}";

/// Errors raised while starting the logger
#[derive(Debug, Snafu)]
pub enum LoggerError {
    /// The fallback configuration is invalid
    #[snafu(display("Could not build console logger configuration: {source}"))]
    Configure {
        source: log4rs::config::runtime::ConfigErrors,
    },

    /// A logger is already installed
    #[snafu(display("Could not install logger: {source}"))]
    Install { source: log::SetLoggerError },
}

/// Starts log4rs from `log_cfg`, or a console logger when the file can not be
/// used.
pub fn init_logger(log_cfg: &str) -> Result<(), LoggerError> {
    match log4rs::init_file(log_cfg, Default::default()) {
        Ok(()) => Ok(()),
        Err(e) => {
            init_console_logger(LevelFilter::Info)?;
            log::warn!(
                "(init_logger) could not parse {}: {}, logging to console.",
                log_cfg,
                e
            );
            Ok(())
        }
    }
}

/// Starts a logger writing everything at `level` and above to stdout.
pub fn init_console_logger(level: LevelFilter) -> Result<(), LoggerError> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .context(ConfigureSnafu)?;

    log4rs::init_config(config).context(InstallSnafu)?;
    Ok(())
}
