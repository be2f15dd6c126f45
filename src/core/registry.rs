use crate::config::Configuration;
use crate::domain::ports::FaxBackend;
use crate::utils::error::{FaxError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// 以有效配置建立後端（即後端的初始化）
pub type BackendFactory = fn(&Configuration) -> Result<Arc<dyn FaxBackend>>;

/// 後端名稱到建構函式的對應
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 內建 `process` 與 `http` 後端
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            crate::adapters::process::BACKEND_KEY.to_string(),
            crate::adapters::process::create_backend,
        );
        registry.factories.insert(
            crate::adapters::http::BACKEND_KEY.to_string(),
            crate::adapters::http::create_backend,
        );
        registry
    }

    pub fn register(&mut self, key: &str, factory: BackendFactory) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(FaxError::ConfigError {
                message: "Backend key cannot be empty".to_string(),
            });
        }
        if self.factories.contains_key(key) {
            return Err(FaxError::ConfigError {
                message: format!("Backend '{}' is already registered", key),
            });
        }
        self.factories.insert(key.to_string(), factory);
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, key: &str, config: &Configuration) -> Result<Arc<dyn FaxBackend>> {
        let factory = self.factories.get(key).ok_or_else(|| FaxError::ConfigError {
            message: format!(
                "Unknown backend '{}'. Registered backends: {}",
                key,
                self.keys().collect::<Vec<_>>().join(", ")
            ),
        })?;
        tracing::debug!("🔧 Creating backend '{}'", key);
        factory(config)
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Capabilities;

    struct NullBackend;

    impl FaxBackend for NullBackend {
        fn name(&self) -> &str {
            "null"
        }

        fn property_part(&self) -> &str {
            "null"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::none()
        }
    }

    fn create_null(_config: &Configuration) -> Result<Arc<dyn FaxBackend>> {
        Ok(Arc::new(NullBackend))
    }

    #[test]
    fn test_builtins_registered() {
        let registry = BackendRegistry::with_builtins();
        assert!(registry.contains("process"));
        assert!(registry.contains("http"));
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = BackendRegistry::new();
        registry.register("null", create_null).unwrap();

        let backend = registry
            .create("null", &Configuration::default())
            .unwrap();
        assert_eq!(backend.name(), "null");
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut registry = BackendRegistry::new();
        registry.register("null", create_null).unwrap();
        assert!(matches!(
            registry.register("null", create_null),
            Err(FaxError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_unknown_key_is_configuration_error() {
        let registry = BackendRegistry::with_builtins();
        let err = registry
            .create("carrier-pigeon", &Configuration::default())
            .err()
            .unwrap();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
