//! Named application instances (browsers, stopwatches, connections) a script keeps alive

use crate::error::{BotflowError, ErrorCode, Result};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

pub type AppInstance = Arc<dyn Any + Send + Sync>;

/// Instances owned by one engine run
#[derive(Clone, Default)]
pub struct AppInstances {
    instances: HashMap<String, AppInstance>,
}

impl fmt::Debug for AppInstances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppInstances")
            .field("names", &self.names())
            .finish()
    }
}

impl AppInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    /// Sorted instance names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.instances.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register `instance` under `name`.
    ///
    /// Returns `true` when an existing instance was replaced. Without
    /// `override_existing` a name clash is an error.
    pub fn add(
        &mut self,
        name: &str,
        instance: AppInstance,
        override_existing: bool,
    ) -> Result<bool> {
        if self.instances.contains_key(name) && !override_existing {
            return Err(BotflowError::domain_with_code(
                ErrorCode::DOMAIN_APP_INSTANCE_EXISTS,
                format!(
                    "App instance '{}' already exists; enable overriding existing instances to replace it",
                    name
                ),
                None,
            ));
        }
        Ok(self.instances.insert(name.to_string(), instance).is_some())
    }

    pub fn get(&self, name: &str) -> Result<AppInstance> {
        self.instances.get(name).cloned().ok_or_else(|| missing(name))
    }

    /// Fetch an instance as a concrete type
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.get(name)?.downcast::<T>().map_err(|_| {
            BotflowError::domain_with_code(
                ErrorCode::DOMAIN_UNSUPPORTED_TYPE,
                format!(
                    "App instance '{}' is not a {}",
                    name,
                    std::any::type_name::<T>()
                ),
                None,
            )
        })
    }

    pub fn remove(&mut self, name: &str) -> Result<AppInstance> {
        self.instances.remove(name).ok_or_else(|| missing(name))
    }

    /// Copy in every instance not already registered here
    pub fn seed_from(&mut self, shared: &SharedInstances) {
        for (name, instance) in shared.snapshot() {
            self.instances.entry(name).or_insert(instance);
        }
    }
}

fn missing(name: &str) -> BotflowError {
    BotflowError::lookup_with_code(
        ErrorCode::LOOKUP_APP_INSTANCE,
        name,
        "App instance not found",
    )
}

/// Instances a host shares with every run that opts in
#[derive(Clone, Default)]
pub struct SharedInstances {
    inner: Arc<RwLock<HashMap<String, AppInstance>>>,
}

impl fmt::Debug for SharedInstances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedInstances")
            .field("len", &self.snapshot().len())
            .finish()
    }
}

impl SharedInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, instance: AppInstance) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), instance);
    }

    pub fn remove(&self, name: &str) -> Option<AppInstance> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn snapshot(&self) -> HashMap<String, AppInstance> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_without_override() {
        let mut instances = AppInstances::new();
        instances.add("browser", Arc::new(1u32), false).unwrap();
        let err = instances.add("browser", Arc::new(2u32), false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DOMAIN_APP_INSTANCE_EXISTS);
        assert_eq!(*instances.get_as::<u32>("browser").unwrap(), 1);
    }

    #[test]
    fn test_override_replaces() {
        let mut instances = AppInstances::new();
        assert!(!instances.add("browser", Arc::new(1u32), true).unwrap());
        assert!(instances.add("browser", Arc::new(2u32), true).unwrap());
        assert_eq!(*instances.get_as::<u32>("browser").unwrap(), 2);
    }

    #[test]
    fn test_wrong_type_and_missing() {
        let mut instances = AppInstances::new();
        instances
            .add("conn", Arc::new(String::from("db")), false)
            .unwrap();
        assert_eq!(
            instances.get_as::<u32>("conn").unwrap_err().kind_name(),
            "DomainError"
        );
        assert_eq!(
            instances.remove("nope").unwrap_err().kind_name(),
            "LookupError"
        );
        assert!(instances.remove("conn").is_ok());
        assert!(instances.is_empty());
    }

    #[test]
    fn test_seed_from_shared_keeps_local() {
        let shared = SharedInstances::new();
        shared.insert("a", Arc::new(1u8));
        shared.insert("b", Arc::new(2u8));
        let mut instances = AppInstances::new();
        instances.add("a", Arc::new(9u8), false).unwrap();
        instances.seed_from(&shared);
        assert_eq!(instances.names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(*instances.get_as::<u8>("a").unwrap(), 9);
    }
}
