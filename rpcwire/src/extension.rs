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

//! Named, activatable extensions.
//!
//! An [`ExtensionLoader`] holds the registered implementations of one
//! extension point (for example all exporter listeners). Extensions are looked
//! up by name, or selected for a URL with
//! [`ExtensionLoader::activate_extensions`]:
//!
//! 1. The URL parameter named by `key` lists extension names explicitly,
//!    comma separated.
//! 2. Unless the list contains `-default`, every extension registered with
//!    [`Activate`] metadata whose group matches and whose keys are present on
//!    the URL is selected automatically, ordered by [`Activate::order`].
//!    `-name` removes one of them.
//! 3. Explicit names follow the automatic set. Names listed before the
//!    `default` marker are placed ahead of it instead.
//!
//! # Examples
//!
//! ```rust
//! use rpcwire::extension::{Activate, ExtensionLoader};
//! use rpcwire::url::Url;
//! use std::sync::Arc;
//!
//! let loader: ExtensionLoader<str> = ExtensionLoader::new("demo");
//! loader.register_activate("audit", Arc::from("audit"), Activate::new().with_order(10));
//! loader.register_activate("trace", Arc::from("trace"), Activate::new().with_order(-10));
//! loader.register("custom", Arc::from("custom"));
//!
//! let url = Url::new("dubbo", "127.0.0.1", 20880, "Greeter").with_parameter("demo", "custom,-audit");
//! let selected = loader.activate_extensions(&url, "demo", None).unwrap();
//! let names: Vec<&str> = selected.iter().map(|ext| &**ext).collect();
//! assert_eq!(names, ["trace", "custom"]);
//! ```

use crate::rpc::RpcError;
use crate::url::Url;
use parking_lot::RwLock;
use std::sync::Arc;

/// Name of the marker that stands for the automatically activated set.
pub const DEFAULT_KEY: &str = "default";

/// Prefix that removes an extension from the selection.
pub const REMOVE_PREFIX: char = '-';

/// Activation metadata for an extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activate {
    /// Groups the extension is active in. Empty matches every group.
    pub group: Vec<String>,
    /// URL parameter keys that activate the extension. Empty is always active.
    pub keys: Vec<String>,
    /// Sort order; lower runs first.
    pub order: i32,
}

impl Activate {
    /// Creates metadata that is active for every URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts activation to a group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group.push(group.into());
        self
    }

    /// Requires a URL parameter for activation.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    fn matches_group(&self, group: Option<&str>) -> bool {
        match group {
            None | Some("") => true,
            Some(group) => self.group.iter().any(|candidate| candidate == group),
        }
    }

    fn is_active(&self, url: &Url) -> bool {
        if self.keys.is_empty() {
            return true;
        }
        self.keys.iter().any(|key| {
            url.parameters().iter().any(|(name, value)| {
                (name == key || name.ends_with(&format!(".{}", key))) && !value.is_empty()
            })
        })
    }
}

struct Extension<T: ?Sized> {
    name: String,
    instance: Arc<T>,
    activate: Option<Activate>,
}

/// Registry of the implementations of one extension point.
pub struct ExtensionLoader<T: ?Sized> {
    kind: String,
    extensions: RwLock<Vec<Extension<T>>>,
}

impl<T: ?Sized + Send + Sync> ExtensionLoader<T> {
    /// Creates an empty loader; `kind` names the extension point in errors.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            extensions: RwLock::new(Vec::new()),
        }
    }

    /// Returns the extension point name.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Registers an extension that is only selected by name.
    ///
    /// Registering a name twice replaces the earlier extension.
    pub fn register(&self, name: impl Into<String>, instance: Arc<T>) {
        self.insert(name.into(), instance, None);
    }

    /// Registers an automatically activated extension.
    pub fn register_activate(&self, name: impl Into<String>, instance: Arc<T>, activate: Activate) {
        self.insert(name.into(), instance, Some(activate));
    }

    fn insert(&self, name: String, instance: Arc<T>, activate: Option<Activate>) {
        let mut extensions = self.extensions.write();
        extensions.retain(|extension| extension.name != name);
        extensions.push(Extension {
            name,
            instance,
            activate,
        });
    }

    /// Returns the extension registered under `name`.
    pub fn extension(&self, name: &str) -> Option<Arc<T>> {
        self.extensions
            .read()
            .iter()
            .find(|extension| extension.name == name)
            .map(|extension| Arc::clone(&extension.instance))
    }

    /// Returns the registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.extensions
            .read()
            .iter()
            .map(|extension| extension.name.clone())
            .collect()
    }

    /// Selects the extensions active for `url`.
    ///
    /// `key` names the URL parameter listing explicit extensions and `group`
    /// restricts the automatic set.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::ExtensionNotFound`] if the URL names an extension
    /// that was never registered.
    pub fn activate_extensions(
        &self,
        url: &Url,
        key: &str,
        group: Option<&str>,
    ) -> Result<Vec<Arc<T>>, RpcError> {
        let names: Vec<&str> = url
            .parameter(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let removed = |name: &str| names.iter().any(|n| n.strip_prefix(REMOVE_PREFIX) == Some(name));

        let extensions = self.extensions.read();
        let mut selected: Vec<Arc<T>> = Vec::new();

        if !removed(DEFAULT_KEY) {
            let mut automatic: Vec<(&Activate, &Extension<T>)> = extensions
                .iter()
                .filter_map(|extension| extension.activate.as_ref().map(|a| (a, extension)))
                .filter(|(activate, extension)| {
                    activate.matches_group(group)
                        && !names.contains(&extension.name.as_str())
                        && !removed(&extension.name)
                        && activate.is_active(url)
                })
                .collect();
            automatic.sort_by_key(|(activate, _)| activate.order);
            selected.extend(automatic.into_iter().map(|(_, e)| Arc::clone(&e.instance)));
        }

        let mut explicit: Vec<Arc<T>> = Vec::new();
        for name in &names {
            if name.starts_with(REMOVE_PREFIX) || removed(name) {
                continue;
            }
            if *name == DEFAULT_KEY {
                if !explicit.is_empty() {
                    selected.splice(0..0, explicit.drain(..));
                }
                continue;
            }
            let extension = extensions
                .iter()
                .find(|extension| extension.name == *name)
                .ok_or_else(|| RpcError::ExtensionNotFound {
                    kind: self.kind.clone(),
                    name: name.to_string(),
                })?;
            explicit.push(Arc::clone(&extension.instance));
        }
        selected.extend(explicit);

        Ok(selected)
    }
}

impl<T: ?Sized> std::fmt::Debug for ExtensionLoader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .extensions
            .read()
            .iter()
            .map(|extension| extension.name.clone())
            .collect();
        f.debug_struct("ExtensionLoader")
            .field("kind", &self.kind)
            .field("extensions", &names)
            .finish()
    }
}
