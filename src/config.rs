use crate::error::{PerdinError, Result};

/// Runtime configuration, resolved from the environment with development
/// defaults. The step catalog itself lives in the database (see
/// `models::StepConfiguration`), not here.
#[derive(Debug, Clone)]
pub struct PerdinConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub environment: String,
}

impl Default for PerdinConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/perdin_development".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            environment: "development".to_string(),
        }
    }
}

impl PerdinConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.database_url = db_url;
        }

        if let Ok(max_connections) = std::env::var("PERDIN_MAX_CONNECTIONS") {
            config.max_connections = max_connections.parse().map_err(|e| {
                PerdinError::Configuration(format!("Invalid max_connections: {e}"))
            })?;
        }

        if let Ok(timeout) = std::env::var("PERDIN_ACQUIRE_TIMEOUT_SECS") {
            config.acquire_timeout_secs = timeout.parse().map_err(|e| {
                PerdinError::Configuration(format!("Invalid acquire_timeout_secs: {e}"))
            })?;
        }

        if let Ok(environment) = std::env::var("PERDIN_ENV") {
            config.environment = environment;
        }

        Ok(config)
    }
}
