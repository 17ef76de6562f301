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

//! The registry meta-protocol.
//!
//! A registry URL carries the concrete endpoint URL as a nested parameter:
//!
//! ```text
//! registry://10.0.0.2:2181/RegistryService?registry=memory&export=dubbo%3A%2F%2F...
//! registry://10.0.0.2:2181/RegistryService?registry=memory&refer=consumer%3A%2F%2F...
//! ```
//!
//! [`RegistryProtocol`] unwraps the nested URL, re-enters the
//! [`ProtocolSelector`] with it and records the endpoint in the [`Registry`]
//! found at the registry address.

use crate::protocol::{AvailableInvoker, Protocol, ProtocolSelector};
use crate::rpc::{Exporter, InterfaceType, Invocation, Invoker, RpcError};
use crate::url::{PROVIDER_SIDE, Url, keys};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Registry type used when a registry URL names none.
pub const MEMORY_REGISTRY: &str = "memory";

/// Client surface of a service registry.
pub trait Registry: Send + Sync + 'static {
    /// Records an endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be reached.
    fn register(&self, url: &Url) -> Result<(), RpcError>;

    /// Removes an endpoint recorded by [`Registry::register`].
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be reached.
    fn unregister(&self, url: &Url) -> Result<(), RpcError>;

    /// Returns the providers matching the service key of `consumer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be reached.
    fn lookup(&self, consumer: &Url) -> Result<Vec<Url>, RpcError>;

    /// Drops every endpoint recorded through this client.
    fn destroy(&self);
}

/// A registry held in process memory.
///
/// # Examples
///
/// ```rust
/// use rpcwire::protocol::{MemoryRegistry, Registry};
/// use rpcwire::url::Url;
///
/// let registry = MemoryRegistry::new();
/// let provider = Url::new("injvm", "127.0.0.1", 0, "Greeter").with_parameter("side", "provider");
/// registry.register(&provider).unwrap();
///
/// let consumer = Url::new("consumer", "127.0.0.1", 0, "Greeter").with_parameter("side", "consumer");
/// assert_eq!(registry.lookup(&consumer).unwrap(), vec![provider]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    registered: RwLock<Vec<Url>>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded endpoint.
    pub fn registered(&self) -> Vec<Url> {
        self.registered.read().clone()
    }
}

impl Registry for MemoryRegistry {
    fn register(&self, url: &Url) -> Result<(), RpcError> {
        let mut registered = self.registered.write();
        if !registered.contains(url) {
            registered.push(url.clone());
        }
        Ok(())
    }

    fn unregister(&self, url: &Url) -> Result<(), RpcError> {
        self.registered.write().retain(|candidate| candidate != url);
        Ok(())
    }

    fn lookup(&self, consumer: &Url) -> Result<Vec<Url>, RpcError> {
        let key = consumer.service_key();
        Ok(self
            .registered
            .read()
            .iter()
            .filter(|url| url.parameter(keys::SIDE) == Some(PROVIDER_SIDE))
            .filter(|url| url.service_key() == key)
            .cloned()
            .collect())
    }

    fn destroy(&self) {
        self.registered.write().clear();
    }
}

/// Publishes endpoints to registries and refers providers found there.
///
/// Holds a weak handle to the selector it is registered in, so the selector
/// can own it without a reference cycle.
pub struct RegistryProtocol {
    selector: Weak<ProtocolSelector>,
    registries: RwLock<HashMap<String, Arc<dyn Registry>>>,
    exporters: Mutex<Vec<Weak<RegistryExporter>>>,
    invokers: Mutex<Vec<Weak<RegistryInvoker>>>,
}

impl RegistryProtocol {
    /// Creates a protocol re-entering `selector`.
    pub fn new(selector: Weak<ProtocolSelector>) -> Self {
        Self {
            selector,
            registries: RwLock::new(HashMap::new()),
            exporters: Mutex::new(Vec::new()),
            invokers: Mutex::new(Vec::new()),
        }
    }

    /// Installs the registry client for `address` (`host:port`).
    pub fn add_registry(&self, address: impl Into<String>, registry: Arc<dyn Registry>) {
        self.registries.write().insert(address.into(), registry);
    }

    /// Returns the registry client for a registry URL.
    ///
    /// Clients for the `memory` type are created on first use; other types
    /// must be installed with [`RegistryProtocol::add_registry`].
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::ExtensionNotFound`] for an unknown registry type.
    pub fn registry(&self, url: &Url) -> Result<Arc<dyn Registry>, RpcError> {
        let address = url.address();
        if let Some(registry) = self.registries.read().get(&address) {
            return Ok(Arc::clone(registry));
        }
        let kind = url.parameter_or(keys::REGISTRY, MEMORY_REGISTRY);
        if kind != MEMORY_REGISTRY {
            return Err(RpcError::ExtensionNotFound {
                kind: keys::REGISTRY.to_string(),
                name: kind.to_string(),
            });
        }
        let mut registries = self.registries.write();
        let registry = registries
            .entry(address)
            .or_insert_with(|| Arc::new(MemoryRegistry::new()));
        Ok(Arc::clone(registry))
    }

    fn selector(&self, url: &Url) -> Result<Arc<ProtocolSelector>, RpcError> {
        self.selector.upgrade().ok_or_else(|| RpcError::Destroyed {
            url: url.to_string(),
        })
    }
}

fn nested_url(url: &Url, key: &str) -> Result<Url, RpcError> {
    url.parameter_url(key)?.ok_or_else(|| RpcError::InvalidUrl {
        url: url.to_string(),
        reason: format!("missing '{}' parameter", key),
    })
}

impl Protocol for RegistryProtocol {
    fn default_port(&self) -> u16 {
        9090
    }

    fn export(&self, invoker: Arc<dyn Invoker>) -> Result<Arc<dyn Exporter>, RpcError> {
        let registry_url = invoker.url().clone();
        let provider_url = nested_url(&registry_url, keys::EXPORT)?;
        let registry = self.registry(&registry_url)?;

        let delegate: Arc<dyn Invoker> = Arc::new(UrlOverride {
            url: provider_url.clone(),
            inner: Arc::clone(&invoker),
        });
        let exporter = self.selector(&registry_url)?.export(delegate)?;
        if let Err(e) = registry.register(&provider_url) {
            if let Err(unexport_error) = exporter.unexport() {
                warn!(error = %unexport_error, "failed to withdraw unregistered export");
            }
            return Err(e);
        }
        info!(registry = %registry_url.address(), provider = %provider_url, "registered provider");

        let exporter = Arc::new(RegistryExporter {
            invoker,
            exporter,
            registry,
            provider_url,
            unexported: AtomicBool::new(false),
        });
        let mut exporters = self.exporters.lock();
        exporters.retain(|weak| weak.strong_count() > 0);
        exporters.push(Arc::downgrade(&exporter));
        Ok(exporter)
    }

    fn refer(&self, interface: InterfaceType, url: &Url) -> Result<Arc<dyn Invoker>, RpcError> {
        let consumer_url = nested_url(url, keys::REFER)?;
        let registry = self.registry(url)?;
        registry.register(&consumer_url)?;
        debug!(registry = %url.address(), consumer = %consumer_url, "registered consumer");

        let invoker = Arc::new(RegistryInvoker {
            interface,
            url: url.clone(),
            consumer_url,
            registry,
            selector: self.selector.clone(),
            members: RwLock::new(None),
            destroyed: AtomicBool::new(false),
        });
        let mut invokers = self.invokers.lock();
        invokers.retain(|weak| weak.strong_count() > 0);
        invokers.push(Arc::downgrade(&invoker));
        Ok(invoker)
    }

    fn destroy(&self) {
        for exporter in self.exporters.lock().drain(..) {
            let Some(exporter) = exporter.upgrade() else {
                continue;
            };
            if let Err(e) = exporter.unexport() {
                warn!(error = %e, "failed to unexport during registry shutdown");
            }
        }
        for invoker in self.invokers.lock().drain(..) {
            if let Some(invoker) = invoker.upgrade() {
                invoker.destroy();
            }
        }
        for (_, registry) in self.registries.write().drain() {
            registry.destroy();
        }
    }
}

/// Presents an invoker under a different URL.
struct UrlOverride {
    url: Url,
    inner: Arc<dyn Invoker>,
}

#[async_trait::async_trait]
impl Invoker for UrlOverride {
    fn interface(&self) -> InterfaceType {
        self.inner.interface()
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    async fn invoke(&self, invocation: Invocation) -> Result<Value, RpcError> {
        self.inner.invoke(invocation).await
    }

    fn destroy(&self) {
        self.inner.destroy();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct RegistryExporter {
    invoker: Arc<dyn Invoker>,
    exporter: Arc<dyn Exporter>,
    registry: Arc<dyn Registry>,
    provider_url: Url,
    unexported: AtomicBool,
}

impl Exporter for RegistryExporter {
    fn invoker(&self) -> Arc<dyn Invoker> {
        Arc::clone(&self.invoker)
    }

    fn unexport(&self) -> Result<(), RpcError> {
        if self.unexported.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let unregistered = self.registry.unregister(&self.provider_url);
        let unexported = self.exporter.unexport();
        info!(provider = %self.provider_url, "unregistered provider");
        unregistered.and(unexported)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Refers the providers a registry knows for the consumer URL.
///
/// Providers are looked up on first use and again while none could be
/// referred.
struct RegistryInvoker {
    interface: InterfaceType,
    url: Url,
    consumer_url: Url,
    registry: Arc<dyn Registry>,
    selector: Weak<ProtocolSelector>,
    members: RwLock<Option<Arc<AvailableInvoker>>>,
    destroyed: AtomicBool,
}

impl RegistryInvoker {
    fn members(&self) -> Result<Option<Arc<AvailableInvoker>>, RpcError> {
        if let Some(members) = self.members.read().as_ref() {
            return Ok(Some(Arc::clone(members)));
        }
        let providers = self.registry.lookup(&self.consumer_url)?;
        if providers.is_empty() {
            return Ok(None);
        }
        let selector = self.selector.upgrade().ok_or_else(|| RpcError::Destroyed {
            url: self.url.to_string(),
        })?;

        let mut members = self.members.write();
        if self.destroyed.load(Ordering::Acquire) {
            return Err(RpcError::Destroyed {
                url: self.url.to_string(),
            });
        }
        if let Some(members) = members.as_ref() {
            return Ok(Some(Arc::clone(members)));
        }
        let mut invokers = Vec::with_capacity(providers.len());
        for provider in &providers {
            match selector.refer(self.interface, provider) {
                Ok(invoker) => invokers.push(invoker),
                Err(e) => warn!(provider = %provider, error = %e, "failed to refer provider"),
            }
        }
        // Nothing referable yet, look up again on the next call.
        if invokers.is_empty() {
            return Ok(None);
        }
        let joined = Arc::new(AvailableInvoker::new(
            self.interface,
            self.consumer_url.clone(),
            invokers,
        ));
        *members = Some(Arc::clone(&joined));
        Ok(Some(joined))
    }
}

#[async_trait::async_trait]
impl Invoker for RegistryInvoker {
    fn interface(&self) -> InterfaceType {
        self.interface
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn is_available(&self) -> bool {
        if self.destroyed.load(Ordering::Acquire) {
            return false;
        }
        matches!(self.members(), Ok(Some(members)) if members.is_available())
    }

    async fn invoke(&self, invocation: Invocation) -> Result<Value, RpcError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(RpcError::Destroyed {
                url: self.url.to_string(),
            });
        }
        match self.members()? {
            Some(members) => members.invoke(invocation).await,
            None => Err(RpcError::NoProvider {
                service_key: self.consumer_url.service_key(),
            }),
        }
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.registry.unregister(&self.consumer_url) {
            warn!(consumer = %self.consumer_url, error = %e, "failed to unregister consumer");
        }
        if let Some(members) = self.members.write().take() {
            members.destroy();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
