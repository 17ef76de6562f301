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
use crate::config::ServiceConfig;
use crate::protocol::{Protocol, ProtocolSelector};
use crate::proxy::{ProxyFactory, ServiceRef};
use crate::rpc::{Exporter, InterfaceType};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle state of a [`ServiceEndpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    /// Created, not yet exported.
    New,
    /// Exported through the protocol stack.
    Exported,
    /// Withdrawn; cannot be exported again.
    Unexported,
}

enum Lifecycle {
    New,
    Exported(Vec<Arc<dyn Exporter>>),
    Unexported,
}

/// An exported service object.
pub struct ServiceEndpoint {
    config: ServiceConfig,
    interface: InterfaceType,
    service: ServiceRef,
    selector: Arc<ProtocolSelector>,
    proxy_factory: Arc<dyn ProxyFactory>,
    lifecycle: Mutex<Lifecycle>,
}

impl ServiceEndpoint {
    /// Creates an endpoint for `service` from a finalised configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::MissingInterface`] if the configured interface
    /// does not resolve.
    pub fn new(
        config: ServiceConfig,
        service: ServiceRef,
        selector: Arc<ProtocolSelector>,
        proxy_factory: Arc<dyn ProxyFactory>,
    ) -> Result<Self, WiringError> {
        let interface = config
            .interface_identity()?
            .resolve()
            .ok_or_else(|| WiringError::MissingInterface {
                target: config.id.clone(),
            })?;
        Ok(Self {
            config,
            interface,
            service,
            selector,
            proxy_factory,
            lifecycle: Mutex::new(Lifecycle::New),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the exported interface.
    pub fn interface(&self) -> InterfaceType {
        self.interface
    }

    /// Returns the service object.
    pub fn service(&self) -> &ServiceRef {
        &self.service
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> ServiceState {
        match &*self.lifecycle.lock() {
            Lifecycle::New => ServiceState::New,
            Lifecycle::Exported(_) => ServiceState::Exported,
            Lifecycle::Unexported => ServiceState::Unexported,
        }
    }

    /// Returns the live exporters, empty unless exported.
    pub fn exporters(&self) -> Vec<Arc<dyn Exporter>> {
        match &*self.lifecycle.lock() {
            Lifecycle::Exported(exporters) => exporters.clone(),
            _ => Vec::new(),
        }
    }

    /// Exports the service at every configured URL.
    ///
    /// Only the first call exports; later calls return `Ok(())` without
    /// touching the protocol stack. If any URL fails, the exporters created
    /// so far are withdrawn and the endpoint stays `New`.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::ExportFailed`] if the protocol stack fails,
    /// [`WiringError::EndpointDestroyed`] after `unexport` and
    /// [`WiringError::InvalidConfiguration`] for unparsable addresses.
    pub fn export(&self) -> Result<(), WiringError> {
        let mut lifecycle = self.lifecycle.lock();
        match &*lifecycle {
            Lifecycle::New => {}
            Lifecycle::Exported(_) => return Ok(()),
            Lifecycle::Unexported => {
                return Err(WiringError::EndpointDestroyed {
                    key: self.config.service_key(),
                });
            }
        }

        let urls = self.config.export_urls(&self.selector)?;
        let mut exporters = Vec::with_capacity(urls.len());
        for url in urls {
            debug!(class = %self.service.class_name(), url = %url, "exporting service");
            let exported = self
                .proxy_factory
                .get_invoker(self.service.clone(), self.interface, url)
                .and_then(|invoker| self.selector.export(invoker));
            match exported {
                Ok(exporter) => exporters.push(exporter),
                Err(source) => {
                    for exporter in exporters {
                        if let Err(error) = exporter.unexport() {
                            warn!(error = %error, "failed to withdraw partial export");
                        }
                    }
                    return Err(WiringError::ExportFailed {
                        interface: self.interface.name().to_string(),
                        source,
                    });
                }
            }
        }

        info!(
            class = %self.service.class_name(),
            service = %self.config.service_key(),
            urls = exporters.len(),
            "service exported"
        );
        *lifecycle = Lifecycle::Exported(exporters);
        Ok(())
    }

    /// Withdraws the service.
    ///
    /// Every exporter is attempted even if an earlier one fails. Repeated
    /// calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::ExportFailed`] carrying the first failure. The
    /// endpoint is `Unexported` regardless.
    pub fn unexport(&self) -> Result<(), WiringError> {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Unexported);
        let Lifecycle::Exported(exporters) = previous else {
            return Ok(());
        };

        let mut first = None;
        for exporter in exporters {
            if let Err(error) = exporter.unexport() {
                warn!(
                    service = %self.config.service_key(),
                    url = %exporter.invoker().url(),
                    error = %error,
                    "unexport failed"
                );
                first.get_or_insert(error);
            }
        }
        info!(service = %self.config.service_key(), "service unexported");
        match first {
            Some(source) => Err(WiringError::ExportFailed {
                interface: self.interface.name().to_string(),
                source,
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ServiceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEndpoint")
            .field("class", &self.service.class_name())
            .field("interface", &self.interface)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RpcError;
    use crate::config::ProtocolConfig;
    use crate::proxy::DispatchProxyFactory;
    use crate::rpc::Invoker;
    use crate::url::{SCOPE_LOCAL, Url};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[crate::interface(name = "test.Counter")]
    trait Counter {
        async fn count(&self) -> Result<u32, RpcError>;
    }

    struct Fixed;

    #[async_trait::async_trait]
    impl Counter for Fixed {
        async fn count(&self) -> Result<u32, RpcError> {
            Ok(3)
        }
    }

    #[derive(Default)]
    struct Refusing {
        exports: AtomicUsize,
    }

    impl Protocol for Refusing {
        fn default_port(&self) -> u16 {
            7000
        }

        fn export(&self, _invoker: Arc<dyn Invoker>) -> Result<Arc<dyn Exporter>, RpcError> {
            self.exports.fetch_add(1, Ordering::SeqCst);
            Err(RpcError::ProtocolNotFound {
                scheme: "refusing".to_string(),
            })
        }

        fn refer(&self, _interface: InterfaceType, url: &Url) -> Result<Arc<dyn Invoker>, RpcError> {
            Err(RpcError::ProtocolNotFound {
                scheme: url.protocol().to_string(),
            })
        }

        fn destroy(&self) {}
    }

    fn endpoint(config: ServiceConfig, selector: Arc<ProtocolSelector>) -> ServiceEndpoint {
        let mut config = config.with_interface(InterfaceType::of::<dyn Counter>());
        config.finalise().unwrap();
        ServiceEndpoint::new(
            config,
            ServiceRef::of::<dyn Counter>("test.Fixed", Arc::new(Fixed)),
            selector,
            Arc::new(DispatchProxyFactory::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_export_once() {
        let selector = Arc::new(ProtocolSelector::new());
        let endpoint = endpoint(ServiceConfig::new("test.Fixed").with_scope(SCOPE_LOCAL), selector.clone());
        assert_eq!(endpoint.state(), ServiceState::New);

        endpoint.export().unwrap();
        endpoint.export().unwrap();
        assert_eq!(endpoint.state(), ServiceState::Exported);
        assert_eq!(endpoint.exporters().len(), 1);
        assert_eq!(selector.injvm().exported_count(), 1);

        endpoint.unexport().unwrap();
        endpoint.unexport().unwrap();
        assert_eq!(endpoint.state(), ServiceState::Unexported);
        assert_eq!(selector.injvm().exported_count(), 0);
        assert!(matches!(
            endpoint.export(),
            Err(WiringError::EndpointDestroyed { .. })
        ));
    }

    #[test]
    fn test_failed_export_rolls_back() {
        let selector = Arc::new(ProtocolSelector::new());
        let refusing = Arc::new(Refusing::default());
        selector.register("refusing", refusing.clone());
        let endpoint = endpoint(
            ServiceConfig::new("test.Fixed").with_protocol(Arc::new(ProtocolConfig::new("refusing"))),
            selector.clone(),
        );

        let error = endpoint.export().unwrap_err();
        assert!(matches!(error, WiringError::ExportFailed { ref interface, .. } if interface == "test.Counter"));
        assert_eq!(refusing.exports.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint.state(), ServiceState::New);
        assert_eq!(selector.injvm().exported_count(), 0);
    }

    #[test]
    fn test_unexport_before_export() {
        let endpoint = endpoint(ServiceConfig::new("test.Fixed"), Arc::new(ProtocolSelector::new()));
        endpoint.unexport().unwrap();
        assert_eq!(endpoint.state(), ServiceState::Unexported);
    }

    #[test]
    fn test_unresolvable_interface() {
        let result = ServiceEndpoint::new(
            ServiceConfig::new("test.Fixed").with_interface_name("no.such.Api"),
            ServiceRef::of::<dyn Counter>("test.Fixed", Arc::new(Fixed)),
            Arc::new(ProtocolSelector::new()),
            Arc::new(DispatchProxyFactory::new()),
        );
        assert!(matches!(result, Err(WiringError::MissingInterface { .. })));
    }
}
