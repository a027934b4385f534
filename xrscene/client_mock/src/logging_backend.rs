use chrono::Local;
use fern::Dispatch;
use std::fs;
use xrscene_common::{anyhow::Result, log::LevelFilter};
use xrscene_session::LoggingConfig;

pub const SESSION_LOG_FNAME: &str = "session_log.txt";
pub const CRASH_LOG_FNAME: &str = "crash_log.txt";

pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level = match config.level {
        Some(severity) => severity.into_level_filter(),
        None if cfg!(debug_assertions) => LevelFilter::Debug,
        None => LevelFilter::Info,
    };

    let mut log_dispatch = Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {message}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if config.log_to_disk {
        log_dispatch = log_dispatch
            .chain(
                fs::OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(SESSION_LOG_FNAME)?,
            )
            .chain(
                Dispatch::new()
                    .level(LevelFilter::Error)
                    .chain(fern::log_file(CRASH_LOG_FNAME)?),
            );
    }

    log_dispatch.apply()?;

    xrscene_common::set_panic_hook();

    Ok(())
}
