//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Host container contract.
//!
//! The wiring processor runs inside a host container that instantiates
//! components. From the container it needs named lookup of configuration
//! objects and, optionally, a way to register additional classes before
//! instantiation starts.

use crate::WiringError;
use parking_lot::{Mutex, RwLock};
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::Arc;

/// Services the host container offers to the wiring processor.
pub trait Container: Send + Sync {
    /// Returns the object registered under `name`.
    fn lookup(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>>;

    /// Returns the registry of class definitions, if the container lets
    /// classes be added before instantiation.
    fn definition_registry(&self) -> Option<&dyn DefinitionRegistry> {
        None
    }
}

/// Accepts class definitions for later instantiation.
pub trait DefinitionRegistry: Send + Sync {
    /// Registers a class by name. Returns `false` if it was already known.
    fn register_class(&self, class_name: &str) -> bool;
}

/// Looks up `name` in `container` and downcasts it to `T`.
///
/// # Errors
///
/// Returns [`WiringError::NamedLookupFailed`] if nothing is registered under
/// `name` or the object is not a `T`.
pub fn lookup_named<T: Any + Send + Sync>(
    container: &dyn Container,
    name: &str,
) -> Result<Arc<T>, WiringError> {
    container
        .lookup(name)
        .and_then(|object| object.downcast::<T>().ok())
        .ok_or_else(|| WiringError::NamedLookupFailed {
            name: name.to_string(),
            expected: short_type_name::<T>(),
        })
}

fn short_type_name<T>() -> &'static str {
    let name = type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

/// In-memory container with named objects and a class definition list.
///
/// # Examples
///
/// ```rust
/// use rpcwire::config::RegistryConfig;
/// use rpcwire::container::{SimpleContainer, lookup_named};
///
/// let container = SimpleContainer::new().with_object("zk", RegistryConfig::new("10.0.0.2:2181"));
/// let registry = lookup_named::<RegistryConfig>(&container, "zk").unwrap();
/// assert_eq!(registry.address, "10.0.0.2:2181");
/// assert!(lookup_named::<RegistryConfig>(&container, "etcd").is_err());
/// ```
pub struct SimpleContainer {
    objects: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    definitions: Option<ClassList>,
}

impl SimpleContainer {
    /// Creates an empty container that accepts class definitions.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            definitions: Some(ClassList::default()),
        }
    }

    /// Creates an empty container without a definition registry.
    pub fn without_definitions() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            definitions: None,
        }
    }

    /// Adds an object under `name`.
    #[must_use]
    pub fn with_object<T: Any + Send + Sync>(self, name: impl Into<String>, object: T) -> Self {
        self.insert(name, Arc::new(object));
        self
    }

    /// Adds a shared object under `name`, replacing any previous one.
    pub fn insert<T: Any + Send + Sync>(&self, name: impl Into<String>, object: Arc<T>) {
        self.objects.write().insert(name.into(), object);
    }

    /// Returns the class names registered so far, in registration order.
    pub fn registered_classes(&self) -> Vec<String> {
        self.definitions
            .as_ref()
            .map(|list| list.classes.lock().clone())
            .unwrap_or_default()
    }
}

impl Default for SimpleContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Container for SimpleContainer {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.objects.read().get(name).cloned()
    }

    fn definition_registry(&self) -> Option<&dyn DefinitionRegistry> {
        self.definitions
            .as_ref()
            .map(|list| list as &dyn DefinitionRegistry)
    }
}

impl std::fmt::Debug for SimpleContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.objects.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("SimpleContainer")
            .field("objects", &names)
            .field("definitions", &self.registered_classes())
            .finish()
    }
}

#[derive(Default)]
struct ClassList {
    classes: Mutex<Vec<String>>,
}

impl DefinitionRegistry for ClassList {
    fn register_class(&self, class_name: &str) -> bool {
        let mut classes = self.classes.lock();
        if classes.iter().any(|known| known == class_name) {
            return false;
        }
        classes.push(class_name.to_string());
        true
    }
}
