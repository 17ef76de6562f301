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

use crate::WiringError;
use crate::config::ReferenceConfig;
use crate::protocol::{AvailableInvoker, Protocol, ProtocolSelector};
use crate::proxy::{Proxy, ProxyFactory};
use crate::rpc::{InterfaceObject, InterfaceType, Invoker, RpcError};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Lifecycle state of a [`ReferenceEndpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceState {
    /// Created, nothing referred yet.
    New,
    /// Referred; the stub is available.
    Initialised,
    /// Released; the stub can no longer be acquired.
    Destroyed,
}

enum Lifecycle {
    New,
    Initialised { invoker: Arc<dyn Invoker>, proxy: Proxy },
    Destroyed,
}

/// A remote reference shared by every injection site with the same key.
pub struct ReferenceEndpoint {
    key: String,
    config: ReferenceConfig,
    interface: InterfaceType,
    selector: Arc<ProtocolSelector>,
    proxy_factory: Arc<dyn ProxyFactory>,
    lifecycle: Mutex<Lifecycle>,
}

impl ReferenceEndpoint {
    /// Creates an endpoint under `key` from a finalised configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::MissingInterface`] if the configured interface
    /// does not resolve.
    pub fn new(
        key: impl Into<String>,
        config: ReferenceConfig,
        selector: Arc<ProtocolSelector>,
        proxy_factory: Arc<dyn ProxyFactory>,
    ) -> Result<Self, WiringError> {
        let interface = config.interface_type()?;
        Ok(Self {
            key: key.into(),
            config,
            interface,
            selector,
            proxy_factory,
            lifecycle: Mutex::new(Lifecycle::New),
        })
    }

    /// Returns the dedup key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ReferenceConfig {
        &self.config
    }

    /// Returns the referenced interface.
    pub fn interface(&self) -> InterfaceType {
        self.interface
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> ReferenceState {
        match &*self.lifecycle.lock() {
            Lifecycle::New => ReferenceState::New,
            Lifecycle::Initialised { .. } => ReferenceState::Initialised,
            Lifecycle::Destroyed => ReferenceState::Destroyed,
        }
    }

    /// Returns the invoker behind the stub once initialised.
    pub fn invoker(&self) -> Option<Arc<dyn Invoker>> {
        match &*self.lifecycle.lock() {
            Lifecycle::Initialised { invoker, .. } => Some(invoker.clone()),
            _ => None,
        }
    }

    /// Returns the client stub, referring the service on first use.
    ///
    /// Every call after the first returns a handle to the same stub object.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::ReferFailed`] if the protocol stack fails or
    /// `check` is set and no provider is available,
    /// [`WiringError::EndpointDestroyed`] after `destroy` and
    /// [`WiringError::InvalidConfiguration`] for unparsable addresses.
    pub fn acquire_stub(&self) -> Result<InterfaceObject, WiringError> {
        let mut lifecycle = self.lifecycle.lock();
        match &*lifecycle {
            Lifecycle::New => {}
            Lifecycle::Initialised { proxy, .. } => return Ok(proxy.primary().clone()),
            Lifecycle::Destroyed => {
                return Err(WiringError::EndpointDestroyed {
                    key: self.key.clone(),
                });
            }
        }

        let invoker = self.refer()?;
        if self.config.check() && !invoker.is_available() {
            invoker.destroy();
            return Err(self.refer_failed(RpcError::NoProvider {
                service_key: self.config.service_key(),
            }));
        }
        let proxy = match self.proxy_factory.get_proxy(invoker.clone(), &[self.interface]) {
            Ok(proxy) => proxy,
            Err(error) => {
                invoker.destroy();
                return Err(self.refer_failed(error));
            }
        };
        let stub = proxy.primary().clone();
        info!(key = %self.key, url = %invoker.url(), "reference initialised");
        *lifecycle = Lifecycle::Initialised { invoker, proxy };
        Ok(stub)
    }

    /// Returns the typed client stub.
    ///
    /// # Errors
    ///
    /// As for [`acquire_stub`](Self::acquire_stub).
    pub fn get<I: ?Sized + crate::rpc::RemoteInterface>(&self) -> Result<Option<Arc<I>>, WiringError> {
        Ok(self.acquire_stub()?.downcast::<I>())
    }

    /// Releases the invoker. Repeated calls are no-ops.
    pub fn destroy(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Destroyed);
        if let Lifecycle::Initialised { invoker, .. } = previous {
            invoker.destroy();
            info!(key = %self.key, "reference destroyed");
        }
    }

    fn refer(&self) -> Result<Arc<dyn Invoker>, WiringError> {
        let urls = self.config.refer_urls(&self.selector)?;
        let mut invokers = Vec::with_capacity(urls.len());
        for url in &urls {
            debug!(key = %self.key, url = %url, "referring service");
            match self.selector.refer(self.interface, url) {
                Ok(invoker) => invokers.push(invoker),
                Err(error) => {
                    invokers.iter().for_each(|invoker| invoker.destroy());
                    return Err(self.refer_failed(error));
                }
            }
        }
        if invokers.len() == 1 {
            return Ok(invokers.remove(0));
        }
        // refer_urls never returns an empty list
        let url = urls[0].clone();
        Ok(Arc::new(AvailableInvoker::new(self.interface, url, invokers)))
    }

    fn refer_failed(&self, source: RpcError) -> WiringError {
        WiringError::ReferFailed {
            interface: self.interface.name().to_string(),
            source,
        }
    }
}

impl std::fmt::Debug for ReferenceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceEndpoint")
            .field("key", &self.key)
            .field("interface", &self.interface)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::DispatchProxyFactory;

    #[crate::interface(name = "test.Quote")]
    trait Quote {
        async fn price(&self, symbol: String) -> Result<f64, RpcError>;
    }

    fn endpoint(config: ReferenceConfig) -> ReferenceEndpoint {
        let mut config = config.with_interface(InterfaceType::of::<dyn Quote>());
        config.finalise().unwrap();
        ReferenceEndpoint::new(
            "/test.Quote:",
            config,
            Arc::new(ProtocolSelector::new()),
            Arc::new(DispatchProxyFactory::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_stub_is_shared() {
        let endpoint = endpoint(ReferenceConfig::new("site"));
        assert_eq!(endpoint.state(), ReferenceState::New);
        assert!(endpoint.invoker().is_none());

        let first = endpoint.acquire_stub().unwrap();
        let second = endpoint.acquire_stub().unwrap();
        assert!(first.same_object(&second));
        assert_eq!(endpoint.state(), ReferenceState::Initialised);

        let typed = endpoint.get::<dyn Quote>().unwrap().unwrap();
        let again = endpoint.get::<dyn Quote>().unwrap().unwrap();
        assert!(Arc::ptr_eq(&typed, &again));
    }

    #[test]
    fn test_destroyed_endpoint_refuses() {
        let endpoint = endpoint(ReferenceConfig::new("site"));
        endpoint.acquire_stub().unwrap();
        let invoker = endpoint.invoker().unwrap();

        endpoint.destroy();
        endpoint.destroy();
        assert_eq!(endpoint.state(), ReferenceState::Destroyed);
        assert!(!invoker.is_available());
        assert_eq!(
            endpoint.acquire_stub().unwrap_err(),
            WiringError::EndpointDestroyed {
                key: "/test.Quote:".to_string()
            }
        );
    }

    #[test]
    fn test_check_without_provider() {
        let endpoint = endpoint(ReferenceConfig::new("site").with_check(true));
        let error = endpoint.acquire_stub().unwrap_err();
        assert!(matches!(
            error,
            WiringError::ReferFailed {
                source: RpcError::NoProvider { .. },
                ..
            }
        ));
        assert_eq!(endpoint.state(), ReferenceState::New);
    }

    #[test]
    fn test_unknown_scheme() {
        let endpoint = endpoint(ReferenceConfig::new("site").with_url("grpc://10.0.0.5:9000"));
        assert!(matches!(
            endpoint.acquire_stub(),
            Err(WiringError::ReferFailed {
                source: RpcError::ProtocolNotFound { .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_stub_without_provider() {
        let endpoint = endpoint(ReferenceConfig::new("site"));
        let quote = endpoint.get::<dyn Quote>().unwrap().unwrap();
        assert!(matches!(
            quote.price("ACME".to_string()).await,
            Err(RpcError::NoProvider { .. })
        ));
    }
}
