use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ROAM_LOG";

const DEFAULT_FILTER: &str = "warn";
const DEBUG_FILTER: &str = "roam=debug";

/// Filter directives: `ROAM_LOG` when set, otherwise the default for the
/// `--debug` setting.
pub(crate) fn filter_directives(from_env: Option<String>, debug: bool) -> String {
    match from_env.filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => raw,
        None if debug => DEBUG_FILTER.to_string(),
        None => DEFAULT_FILTER.to_string(),
    }
}

/// Installs the stderr subscriber. Safe to call once per process; later
/// calls are ignored.
pub fn init(debug: bool) {
    let directives = filter_directives(std::env::var(LOG_ENV).ok(), debug);
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::filter_directives;

    #[test]
    fn env_filter_wins_over_debug_flag() {
        assert_eq!(filter_directives(Some("roam=trace".to_string()), false), "roam=trace");
        assert_eq!(filter_directives(Some("info".to_string()), true), "info");
    }

    #[test]
    fn defaults_depend_on_debug_flag() {
        assert_eq!(filter_directives(None, false), "warn");
        assert_eq!(filter_directives(None, true), "roam=debug");
        assert_eq!(filter_directives(Some("  ".to_string()), true), "roam=debug");
    }
}
