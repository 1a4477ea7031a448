use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "shared=info";

/// Install the process-wide `tracing` subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with_target(true)
        .try_init();
}
