use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the global `env_logger`. `RUST_LOG` wins when set, otherwise
/// `info`. Safe to call more than once, and from tests.
pub fn init_logger() {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        match std::env::var("RUST_LOG") {
            Ok(filter) => {
                builder.parse_filters(&filter);
            }
            Err(_) => {
                builder
                    .filter_level(log::LevelFilter::Info)
                    .filter_module("wgpu_core", log::LevelFilter::Warn)
                    .filter_module("wgpu_hal", log::LevelFilter::Warn)
                    .filter_module("naga", log::LevelFilter::Warn);
            }
        }
        // another logger may already be installed, e.g. by a test harness
        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}
