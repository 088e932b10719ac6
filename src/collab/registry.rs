use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::RegistryError;

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// Validated key-value store. Must be initialized before use.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<Option<HashMap<String, Entry>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn initialize(&self) {
        let mut entries = self.write();
        if entries.is_none() {
            *entries = Some(HashMap::new());
            debug!("Registry initialized");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.read().is_some()
    }

    pub fn register<T: Any + Send + Sync>(&self, key: &str, value: T) -> Result<(), RegistryError> {
        let mut guard = self.write();
        let entries = guard.as_mut().ok_or(RegistryError::NotInitialized)?;
        validate_key(key)?;
        if entries.contains_key(key) {
            return Err(RegistryError::DuplicateKey(key.to_string()));
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: Arc::new(value),
                type_name: type_name::<T>(),
            },
        );
        Ok(())
    }

    pub fn retrieve<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>, RegistryError> {
        let guard = self.read();
        let entries = guard.as_ref().ok_or(RegistryError::NotInitialized)?;
        validate_key(key)?;
        let entry = entries
            .get(key)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))?;
        Arc::clone(&entry.value)
            .downcast::<T>()
            .map_err(|_| RegistryError::TypeMismatch {
                key: key.to_string(),
                stored: entry.type_name,
            })
    }

    pub fn deregister(&self, key: &str) -> Result<(), RegistryError> {
        let mut guard = self.write();
        let entries = guard.as_mut().ok_or(RegistryError::NotInitialized)?;
        validate_key(key)?;
        entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    /// Name of the type stored under `key`.
    pub fn type_of(&self, key: &str) -> Result<&'static str, RegistryError> {
        let guard = self.read();
        let entries = guard.as_ref().ok_or(RegistryError::NotInitialized)?;
        validate_key(key)?;
        entries
            .get(key)
            .map(|e| e.type_name)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<HashMap<String, Entry>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<HashMap<String, Entry>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn validate_key(key: &str) -> Result<(), RegistryError> {
    if key.trim().is_empty() {
        Err(RegistryError::EmptyKey)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_fails_before_initialize() {
        let registry = Registry::new();
        assert_eq!(registry.register("a", 1u32), Err(RegistryError::NotInitialized));
        assert_eq!(
            registry.retrieve::<u32>("a").unwrap_err(),
            RegistryError::NotInitialized
        );
        assert_eq!(registry.deregister("a"), Err(RegistryError::NotInitialized));
        assert_eq!(registry.type_of("a"), Err(RegistryError::NotInitialized));
    }

    #[test]
    fn initialize_is_idempotent() {
        let registry = Registry::new();
        registry.initialize();
        registry.register("fps", 30u32).unwrap();
        registry.initialize();
        assert_eq!(*registry.retrieve::<u32>("fps").unwrap(), 30);
    }

    #[test]
    fn register_retrieve_deregister() {
        let registry = Registry::new();
        registry.initialize();

        registry.register("name", String::from("cam0")).unwrap();
        assert_eq!(
            registry.register("name", String::from("cam1")),
            Err(RegistryError::DuplicateKey("name".into()))
        );
        assert_eq!(registry.type_of("name").unwrap(), type_name::<String>());
        assert_eq!(registry.retrieve::<String>("name").unwrap().as_str(), "cam0");
        assert!(matches!(
            registry.retrieve::<u32>("name"),
            Err(RegistryError::TypeMismatch { .. })
        ));

        registry.deregister("name").unwrap();
        assert_eq!(
            registry.retrieve::<String>("name").unwrap_err(),
            RegistryError::NotFound("name".into())
        );
        assert_eq!(registry.register(" ", 1u8), Err(RegistryError::EmptyKey));
    }
}
