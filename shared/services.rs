use std::sync::OnceLock;

use crate::config::Config;
use crate::error::ConfigError;
use crate::middleware::AuthGate;
use crate::store::RecordStore;

/// Everything a function needs to serve a request.
pub struct Services {
    pub gate: AuthGate,
    pub store: RecordStore,
}

impl Services {
    pub fn new(gate: AuthGate, store: RecordStore) -> Self {
        Self { gate, store }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(
            AuthGate::from_config(&config.verification)?,
            RecordStore::from_config(&config.database),
        ))
    }
}

static SERVICES: OnceLock<Result<Services, ConfigError>> = OnceLock::new();

/// Process-wide services, built from the environment on first call.
///
/// A configuration error is remembered, so every later call reports the
/// same failure instead of retrying.
pub fn services() -> Result<&'static Services, ConfigError> {
    SERVICES
        .get_or_init(|| {
            let services = Config::from_env().and_then(|config| Services::from_config(&config));
            if let Err(err) = &services {
                tracing::error!(error = %err, "refusing to serve: configuration incomplete");
            }
            services
        })
        .as_ref()
        .map_err(Clone::clone)
}
