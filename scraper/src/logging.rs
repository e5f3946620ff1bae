use anyhow::{Context, Result};
use env_logger::Env;
use log::LevelFilter;

/// Level for a `-v` count: info by default, debug for one, trace beyond.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the process logger. Entry points call this once, before any
/// other work. `RUST_LOG` still wins over the verbosity flag.
pub fn init(verbosity: u8) -> Result<()> {
    let env = Env::default().default_filter_or(level_for(verbosity).as_str());
    env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .try_init()
        .context("Failed to initialise logging")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for(0), LevelFilter::Info);
        assert_eq!(level_for(1), LevelFilter::Debug);
        assert_eq!(level_for(5), LevelFilter::Trace);
    }
}
