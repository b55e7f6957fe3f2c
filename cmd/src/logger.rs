use crate::config::{CliConfigLog, ConfigError};

/// Install the global fmt subscriber. Events go to stderr so stdout only carries results.
pub fn setup_logger(config: &CliConfigLog) -> Result<(), ConfigError> {
    let level = config.max_level()?;
    tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_file(config.with_file)
        .with_line_number(config.with_file)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
