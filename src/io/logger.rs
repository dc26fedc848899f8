use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Level from `level`, then `RUST_LOG`, then `info`. Later calls are no-ops.
pub fn init_logging(level: Option<&str>) {
    let log_level = level
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .or_else(|| {
            std::env::var("RUST_LOG")
                .ok()
                .and_then(|v| v.parse::<LevelFilter>().ok())
        })
        .unwrap_or(LevelFilter::Info);

    let initialized = Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:5} {}] {}",
                buf.timestamp_seconds(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
        .is_ok();
    if initialized {
        log::info!("logger initialized (level: {})", log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_logging(Some("debug"));
        init_logging(Some("not-a-level"));
        log::debug!("still logging");
    }
}
