use std::sync::Once;

/// Filter used when neither `--log` nor `RUST_LOG` says otherwise.
pub const DEFAULT_FILTER: &str = "info";

/// How the viewer's log output is set up.
///
/// Records go out under four targets: `level` for level text parsing, `asset`
/// for H2B imports, `gpu` for uploads and driver messages, and `frame` for
/// per-frame drawing. `filter` takes `env_logger` directives, so
/// `"info,gpu=trace"` keeps the defaults and opens up the GPU side.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directives from the `--log` flag. They win over `RUST_LOG`.
    pub filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

/// Picks the directives to apply: the command line first, then the environment.
pub fn resolve_filter<'a>(flag: Option<&'a str>, env: Option<&'a str>) -> &'a str {
    flag.or(env)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_FILTER)
}

static INIT: Once = Once::new();

/// Installs the viewer's logger. Only the first call has any effect, and a logger
/// installed by someone else is left alone.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let env = std::env::var("RUST_LOG").ok();
        let filter = resolve_filter(config.filter.as_deref(), env.as_deref());

        let mut builder = env_logger::Builder::new();
        builder
            .parse_filters(filter)
            .write_style(config.write_style)
            .format_target(true);

        if builder.try_init().is_ok() {
            log::debug!("log filter {filter:?}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_environment() {
        assert_eq!(resolve_filter(Some("gpu=trace"), Some("warn")), "gpu=trace");
        assert_eq!(resolve_filter(None, Some("level=debug")), "level=debug");
    }

    #[test]
    fn falls_back_to_info() {
        assert_eq!(resolve_filter(None, None), DEFAULT_FILTER);
        assert_eq!(resolve_filter(Some("  "), None), DEFAULT_FILTER);
    }
}
