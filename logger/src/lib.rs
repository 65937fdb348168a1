// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

const LOG_LEVEL_ENV_VAR: &str = "KEYGEND_LOG";

/// Initializes the process-wide logger.
///
/// Records are prefixed with their syslog priority so that output captured by
/// journald keeps the right severity.
pub fn try_init() -> Result<(), log::SetLoggerError> {
    env_logger::Builder::new()
        .format(|fmt, record| {
            use std::io::Write;

            let (priority, level) = match record.level() {
                log::Level::Error => (3, "ERR!"),
                log::Level::Warn => (4, "WARN"),
                log::Level::Info => (6, "INFO"),
                log::Level::Debug => (7, "DBUG"),
                log::Level::Trace => (7, "TRCE"),
            };
            let timestamp = fmt.timestamp();

            if record.level() >= log::Level::Debug {
                writeln!(
                    fmt,
                    "<{}>{} [{}] - [{}] {}",
                    priority,
                    timestamp,
                    level,
                    record.target(),
                    record.args()
                )
            } else {
                writeln!(
                    fmt,
                    "<{}>{} [{}] - {}",
                    priority,
                    timestamp,
                    level,
                    record.args()
                )
            }
        })
        .filter_level(log::LevelFilter::Info)
        .parse_env(LOG_LEVEL_ENV_VAR)
        .try_init()
}
