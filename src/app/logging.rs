use tracing::Level;

use crate::config::Settings;

/// Install the process-wide stderr subscriber
///
/// INFO by default, DEBUG when the debug toggle is set. A second call is a no-op.
pub fn init_logging(settings: &Settings) {
    let level = if settings.debug { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        let settings = Settings {
            concurrency: 1,
            debug: true,
        };
        init_logging(&settings);
        init_logging(&settings);
    }
}
