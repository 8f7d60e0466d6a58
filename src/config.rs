use std::env;
use anyhow::{bail, Context, Result};

/// Which `ItemStore` implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Spanner,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "spanner" => Ok(StoreBackend::Spanner),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("STORE_BACKEND must be one of: spanner, memory, got '{}'", other),
        }
    }
}

/// Connection settings for the Spanner backend
#[derive(Debug, Clone)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub items_table: String,
    pub spanner: Option<SpannerConfig>,
    pub service_port: u16,
    pub service_host: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let store_backend = StoreBackend::parse(
            &env::var("STORE_BACKEND").unwrap_or_else(|_| "spanner".to_string()),
        )?;

        let items_table = env::var("ITEMS_TABLE").unwrap_or_else(|_| "items".to_string());
        if !is_valid_table_name(&items_table) {
            bail!(
                "ITEMS_TABLE must be a plain identifier (letters, digits, underscore), got '{}'",
                items_table
            );
        }

        let spanner = match store_backend {
            StoreBackend::Spanner => Some(SpannerConfig::from_env()?),
            StoreBackend::Memory => None,
        };

        let service_port = env::var("SERVICE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = env::var("SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(Config {
            store_backend,
            items_table,
            spanner,
            service_port,
            service_host,
        })
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Store backend: {:?}", self.store_backend);
        tracing::info!("  Items table: {}", self.items_table);
        if let Some(spanner) = &self.spanner {
            tracing::info!("  Spanner emulator: {}",
                spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
            tracing::info!("  Spanner project: {}", spanner.project);
            tracing::info!("  Spanner instance: {}", spanner.instance);
            tracing::info!("  Spanner database: {}", spanner.database);
        }
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}

impl SpannerConfig {
    pub fn from_env() -> Result<Self> {
        let emulator_host = env::var("SPANNER_EMULATOR_HOST").ok();

        let project = env::var("SPANNER_PROJECT")
            .context("SPANNER_PROJECT environment variable is required")?;

        let instance = env::var("SPANNER_INSTANCE")
            .context("SPANNER_INSTANCE environment variable is required")?;

        let database = env::var("SPANNER_DATABASE")
            .context("SPANNER_DATABASE environment variable is required")?;

        Ok(SpannerConfig {
            emulator_host,
            project,
            instance,
            database,
        })
    }

    /// Fully qualified database path
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

// The table name ends up inside DDL and SQL text, so only bare identifiers are accepted.
fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env_vars() {
        unsafe {
            env::remove_var("STORE_BACKEND");
            env::remove_var("ITEMS_TABLE");
            env::remove_var("SPANNER_EMULATOR_HOST");
            env::remove_var("SPANNER_PROJECT");
            env::remove_var("SPANNER_INSTANCE");
            env::remove_var("SPANNER_DATABASE");
            env::remove_var("SERVICE_PORT");
            env::remove_var("SERVICE_HOST");
        }
    }

    fn set_required_vars() {
        unsafe {
            env::set_var("SPANNER_PROJECT", "test-project");
            env::set_var("SPANNER_INSTANCE", "test-instance");
            env::set_var("SPANNER_DATABASE", "test-database");
        }
    }

    #[test]
    fn test_config_with_all_vars() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        set_required_vars();
        unsafe {
            env::set_var("STORE_BACKEND", "spanner");
            env::set_var("ITEMS_TABLE", "crud_items");
            env::set_var("SPANNER_EMULATOR_HOST", "localhost:9010");
            env::set_var("SERVICE_PORT", "8080");
            env::set_var("SERVICE_HOST", "127.0.0.1");
        }

        let config = Config::from_env().unwrap();
        clear_env_vars();

        assert_eq!(config.store_backend, StoreBackend::Spanner);
        assert_eq!(config.items_table, "crud_items");
        let spanner = config.spanner.expect("spanner settings");
        assert_eq!(spanner.emulator_host, Some("localhost:9010".to_string()));
        assert_eq!(spanner.project, "test-project");
        assert_eq!(spanner.instance, "test-instance");
        assert_eq!(spanner.database, "test-database");
        assert_eq!(
            spanner.database_path(),
            "projects/test-project/instances/test-instance/databases/test-database"
        );
        assert_eq!(config.service_port, 8080);
        assert_eq!(config.service_host, "127.0.0.1");
    }

    #[test]
    fn test_config_with_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        set_required_vars();

        let config = Config::from_env().unwrap();
        clear_env_vars();

        assert_eq!(config.store_backend, StoreBackend::Spanner);
        assert_eq!(config.items_table, "items");
        assert_eq!(config.spanner.unwrap().emulator_host, None);
        assert_eq!(config.service_port, 3000);
        assert_eq!(config.service_host, "0.0.0.0");
    }

    #[test]
    fn test_memory_backend_needs_no_spanner_vars() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        unsafe {
            env::set_var("STORE_BACKEND", "memory");
        }

        let config = Config::from_env().unwrap();
        clear_env_vars();

        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.spanner.is_none());
    }

    #[test]
    fn test_missing_required_var() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        unsafe {
            env::set_var("SPANNER_PROJECT", "test-project");
            env::set_var("SPANNER_INSTANCE", "test-instance");
        }
        // Missing SPANNER_DATABASE

        let result = Config::from_env();
        clear_env_vars();
        assert!(result.is_err());
        let error = result.unwrap_err();
        assert!(error.to_string().contains("SPANNER_DATABASE"));
    }

    #[test]
    fn test_unknown_backend() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        unsafe {
            env::set_var("STORE_BACKEND", "dynamo");
        }

        let result = Config::from_env();
        clear_env_vars();
        let error = result.unwrap_err();
        assert!(error.to_string().contains("STORE_BACKEND"));
    }

    #[test]
    fn test_invalid_table_name() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        set_required_vars();
        unsafe {
            env::set_var("ITEMS_TABLE", "items; DROP TABLE items");
        }

        let result = Config::from_env();
        clear_env_vars();
        let error = result.unwrap_err();
        assert!(error.to_string().contains("ITEMS_TABLE"));
    }

    #[test]
    fn test_invalid_port() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        set_required_vars();
        unsafe {
            env::set_var("SERVICE_PORT", "not-a-number");
        }

        let result = Config::from_env();
        clear_env_vars();
        assert!(result.is_err());
        let error = result.unwrap_err();
        assert!(error.to_string().contains("SERVICE_PORT"));
    }

    #[test]
    fn test_port_out_of_range() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        set_required_vars();
        unsafe {
            env::set_var("SERVICE_PORT", "99999");
        }

        let result = Config::from_env();
        clear_env_vars();
        assert!(result.is_err());
    }

    #[test]
    fn test_table_name_validation() {
        assert!(is_valid_table_name("items"));
        assert!(is_valid_table_name("_items_2"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("2items"));
        assert!(!is_valid_table_name("items-table"));
    }
}
