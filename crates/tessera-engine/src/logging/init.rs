use std::sync::Once;

/// Filter used when neither the config nor `RUST_LOG` names one. GPU stack internals are
/// chatty at `info`.
const QUIET_GPU: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Options for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` directives such as `"tessera_engine=debug,naga=warn"`. Takes precedence
    /// over `RUST_LOG`.
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

fn directives(explicit: Option<String>, from_env: Option<String>) -> String {
    explicit
        .or(from_env)
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| QUIET_GPU.to_string())
}

static INIT: Once = Once::new();

/// Installs the `env_logger` backend for the `log` facade. Only the first call does anything.
///
/// A logger installed beforehand (a test harness, an embedding host) is left in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = directives(config.env_filter, std::env::var("RUST_LOG").ok());
        let installed = env_logger::Builder::new()
            .parse_filters(&filter)
            .write_style(config.write_style)
            .try_init();

        match installed {
            Ok(()) => log::debug!("logging initialized with `{filter}`"),
            Err(_) => log::debug!("logger already installed, keeping it"),
        }
    });
}
