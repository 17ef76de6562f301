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

//! Scheme-based protocol selection.

use crate::extension::ExtensionLoader;
use crate::protocol::{
    ExporterListener, InjvmProtocol, InvokerListener, ListenerProtocolDecorator, Protocol,
    RegistryProtocol,
};
use crate::rpc::{Exporter, InterfaceType, Invoker, RpcError};
use crate::url::{DEFAULT_PROTOCOL, INJVM_SCHEME, REGISTRY_SCHEME, Url, keys};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The entry point of the protocol stack.
///
/// Holds one decorated protocol per URL scheme and dispatches `export` and
/// `refer` on the scheme of the URL. The in-process protocol is always
/// registered under `injvm`.
///
/// # Examples
///
/// ```rust
/// use rpcwire::protocol::{Protocol, ProtocolSelector};
///
/// let selector = ProtocolSelector::standard();
/// assert!(selector.protocol("injvm").is_ok());
/// assert!(selector.protocol("registry").is_ok());
/// assert!(selector.protocol("grpc").is_err());
/// ```
pub struct ProtocolSelector {
    protocols: RwLock<HashMap<String, Arc<dyn Protocol>>>,
    injvm: Arc<InjvmProtocol>,
    exporter_listeners: Arc<ExtensionLoader<dyn ExporterListener>>,
    invoker_listeners: Arc<ExtensionLoader<dyn InvokerListener>>,
}

impl ProtocolSelector {
    /// Creates a selector holding only the in-process protocol.
    pub fn new() -> Self {
        let selector = Self {
            protocols: RwLock::new(HashMap::new()),
            injvm: Arc::new(InjvmProtocol::new()),
            exporter_listeners: Arc::new(ExtensionLoader::new(keys::EXPORTER_LISTENER)),
            invoker_listeners: Arc::new(ExtensionLoader::new(keys::INVOKER_LISTENER)),
        };
        selector.register(INJVM_SCHEME, selector.injvm.clone());
        selector
    }

    /// Creates a selector holding the in-process and the registry protocol.
    pub fn standard() -> Arc<Self> {
        Arc::new_cyclic(|selector| {
            let this = Self::new();
            this.register(
                REGISTRY_SCHEME,
                Arc::new(RegistryProtocol::new(selector.clone())),
            );
            this
        })
    }

    /// Registers `protocol` for `scheme`, wrapped in a
    /// [`ListenerProtocolDecorator`].
    ///
    /// A later registration for the same scheme replaces the earlier one.
    pub fn register(&self, scheme: impl Into<String>, protocol: Arc<dyn Protocol>) {
        let scheme = scheme.into();
        debug!(scheme = %scheme, "registering protocol");
        let decorated = ListenerProtocolDecorator::new(
            protocol,
            self.exporter_listeners.clone(),
            self.invoker_listeners.clone(),
        );
        self.protocols.write().insert(scheme, Arc::new(decorated));
    }

    /// Returns the decorated protocol for `scheme`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::ProtocolNotFound`] if none is registered.
    pub fn protocol(&self, scheme: &str) -> Result<Arc<dyn Protocol>, RpcError> {
        self.protocols
            .read()
            .get(scheme)
            .cloned()
            .ok_or_else(|| RpcError::ProtocolNotFound {
                scheme: scheme.to_string(),
            })
    }

    /// Returns the registered schemes, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.protocols.read().keys().cloned().collect();
        schemes.sort();
        schemes
    }

    /// Returns the in-process protocol.
    pub fn injvm(&self) -> &Arc<InjvmProtocol> {
        &self.injvm
    }

    /// Returns the exporter listener extensions.
    pub fn exporter_listeners(&self) -> &Arc<ExtensionLoader<dyn ExporterListener>> {
        &self.exporter_listeners
    }

    /// Returns the invoker listener extensions.
    pub fn invoker_listeners(&self) -> &Arc<ExtensionLoader<dyn InvokerListener>> {
        &self.invoker_listeners
    }
}

impl Default for ProtocolSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for ProtocolSelector {
    /// The default port of the `dubbo` protocol, `0` when it is not registered.
    fn default_port(&self) -> u16 {
        self.protocol(DEFAULT_PROTOCOL)
            .map(|protocol| protocol.default_port())
            .unwrap_or(0)
    }

    fn export(&self, invoker: Arc<dyn Invoker>) -> Result<Arc<dyn Exporter>, RpcError> {
        self.protocol(invoker.url().protocol())?.export(invoker)
    }

    fn refer(&self, interface: InterfaceType, url: &Url) -> Result<Arc<dyn Invoker>, RpcError> {
        self.protocol(url.protocol())?.refer(interface, url)
    }

    fn destroy(&self) {
        let protocols: Vec<(String, Arc<dyn Protocol>)> = self.protocols.write().drain().collect();
        for (scheme, protocol) in protocols {
            debug!(scheme = %scheme, "destroying protocol");
            protocol.destroy();
        }
    }
}

impl std::fmt::Debug for ProtocolSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolSelector")
            .field("schemes", &self.schemes())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::LOCALHOST;

    #[crate::interface(name = "test.Ping")]
    trait Ping {
        async fn ping(&self) -> Result<(), RpcError>;
    }

    #[test]
    fn test_unknown_scheme() {
        let selector = ProtocolSelector::new();
        let url = Url::new("grpc", LOCALHOST, 50051, "test.Ping");
        let error = selector
            .refer(InterfaceType::of::<dyn Ping>(), &url)
            .unwrap_err();
        assert_eq!(
            error,
            RpcError::ProtocolNotFound {
                scheme: "grpc".to_string()
            }
        );
    }

    #[test]
    fn test_registered_protocols_are_decorated() {
        let selector = ProtocolSelector::new();
        let url = Url::new(INJVM_SCHEME, LOCALHOST, 0, "test.Ping");
        let invoker = selector
            .refer(InterfaceType::of::<dyn Ping>(), &url)
            .unwrap();
        assert!(
            invoker
                .as_any()
                .is::<crate::protocol::ListenerInvokerWrapper>()
        );
    }

    #[test]
    fn test_standard_schemes() {
        let selector = ProtocolSelector::standard();
        assert_eq!(selector.schemes(), ["injvm", "registry"]);
        assert_eq!(selector.default_port(), 0);
    }

    #[test]
    fn test_destroy_drains() {
        let selector = ProtocolSelector::standard();
        selector.destroy();
        assert!(selector.schemes().is_empty());
    }
}
