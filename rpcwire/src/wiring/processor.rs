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
use crate::component::{
    ClassDescriptor, Component, MemberKind, ReferenceAnnotation, ServiceAnnotation, SiteType,
    registered_classes,
};
use crate::config::{
    ApplicationConfig, ConsumerConfig, InterfaceIdentity, ModuleConfig, MonitorConfig,
    ProcessorConfig, ProtocolConfig, ProviderConfig, ReferenceConfig, RegistryConfig,
    ServiceConfig,
};
use crate::container::{Container, lookup_named};
use crate::endpoint::{ReferenceEndpoint, ServiceEndpoint};
use crate::protocol::ProtocolSelector;
use crate::proxy::{ProxyFactory, ServiceRef};
use crate::rpc::InterfaceObject;
use crate::wiring::{WiringProcessorBuilder, WiringRegistry};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Wires container-produced components into the RPC runtime.
///
/// The host container calls the hooks in this order for every component:
///
/// 1. [`pre_process`](Self::pre_process) injects client stubs into the
///    component's reference sites;
/// 2. [`post_process`](Self::post_process) exports the component if its
///    class is a service.
///
/// [`shutdown`](Self::shutdown) releases every endpoint when the container
/// closes. [`register`](Self::register) runs both hooks for containers that
/// hand over finished objects.
///
/// # Examples
///
/// ```rust
/// use rpcwire::Component;
/// use rpcwire::container::SimpleContainer;
/// use rpcwire::wiring::WiringProcessor;
/// use std::sync::Arc;
///
/// #[rpcwire::interface(name = "com.acme.Greeter")]
/// pub trait Greeter {
///     async fn greet(&self, name: String) -> Result<String, rpcwire::RpcError>;
/// }
///
/// #[derive(Component)]
/// #[component(class = "com.acme.EnglishGreeter", implements(Greeter))]
/// #[service(scope = "local")]
/// struct EnglishGreeter;
///
/// #[rpcwire::async_trait]
/// impl Greeter for EnglishGreeter {
///     async fn greet(&self, name: String) -> Result<String, rpcwire::RpcError> {
///         Ok(format!("Hello, {name}"))
///     }
/// }
///
/// #[derive(Component, Default)]
/// #[component(class = "com.acme.Frontend")]
/// struct Frontend {
///     #[reference]
///     greeter: Option<Arc<dyn Greeter>>,
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let processor = WiringProcessor::builder(Arc::new(SimpleContainer::new())).build();
/// processor.register(EnglishGreeter)?;
/// let frontend = processor.register(Frontend::default())?;
///
/// let greeter = frontend.greeter.as_ref().expect("injected");
/// assert_eq!(greeter.greet("Ada".to_string()).await?, "Hello, Ada");
///
/// processor.shutdown();
/// assert!(processor.registry().is_empty());
/// # Ok(())
/// # }
/// ```
pub struct WiringProcessor {
    config: ProcessorConfig,
    container: Arc<dyn Container>,
    selector: Arc<ProtocolSelector>,
    proxy_factory: Arc<dyn ProxyFactory>,
    registry: WiringRegistry,
}

impl WiringProcessor {
    /// Starts building a processor running inside `container`.
    pub fn builder(container: Arc<dyn Container>) -> WiringProcessorBuilder {
        WiringProcessorBuilder::new(container)
    }

    pub(crate) fn from_parts(
        config: ProcessorConfig,
        container: Arc<dyn Container>,
        selector: Arc<ProtocolSelector>,
        proxy_factory: Arc<dyn ProxyFactory>,
    ) -> Self {
        Self {
            config,
            container,
            selector,
            proxy_factory,
            registry: WiringRegistry::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Returns the protocol stack endpoints are exported and referred with.
    pub fn selector(&self) -> &Arc<ProtocolSelector> {
        &self.selector
    }

    /// Returns the proxy factory.
    pub fn proxy_factory(&self) -> &Arc<dyn ProxyFactory> {
        &self.proxy_factory
    }

    /// Returns the endpoints built so far.
    pub fn registry(&self) -> &WiringRegistry {
        &self.registry
    }

    /// Registers every linked service class within the configured packages
    /// with the container's definition registry.
    ///
    /// Does nothing when no packages are configured or the container has no
    /// definition registry. Returns the number of newly registered classes.
    pub fn scan_definitions(&self) -> usize {
        if self.config.packages.is_empty() {
            return 0;
        }
        let Some(definitions) = self.container.definition_registry() else {
            debug!("container has no definition registry, skipping package scan");
            return 0;
        };

        let mut registered = 0;
        for class in registered_classes() {
            if class.service().is_none() || !self.config.matches(class.name()) {
                continue;
            }
            if definitions.register_class(class.name()) {
                debug!(class = %class.name(), "registered service class");
                registered += 1;
            }
        }
        registered
    }

    /// Injects client stubs into every reference site of `component`.
    ///
    /// A site that cannot be wired is logged and skipped. Returns the number
    /// of sites injected.
    pub fn pre_process(&self, component: &mut dyn Component) -> usize {
        let class = component.class();
        if !self.config.matches(class.name()) {
            debug!(class = %class.name(), "outside configured packages, not wired");
            return 0;
        }

        let mut injected = 0;
        for member in class.members() {
            let Some(annotation) = member.reference() else {
                continue;
            };
            if !member.is_injection_site() {
                debug!(
                    class = %class.name(),
                    member = %member.name(),
                    "annotated method is not a public single-argument setter, ignored"
                );
                continue;
            }

            let result = self
                .resolve_reference(annotation, member.site_type())
                .and_then(|stub| {
                    member
                        .inject(component.as_any_mut(), &stub)
                        .map_err(|reason| WiringError::InvalidConfiguration {
                            property: "reference",
                            value: member.site_type().name().to_string(),
                            reason,
                        })
                });
            match result {
                Ok(()) => {
                    let kind = match member.kind() {
                        MemberKind::Field => "field",
                        MemberKind::Method => "setter",
                    };
                    debug!(class = %class.name(), member = %member.name(), kind, "reference injected");
                    injected += 1;
                }
                Err(e) => {
                    let e = e.at_site(class.name(), member.name());
                    error!(error = %e, "reference injection failed");
                }
            }
        }
        injected
    }

    /// Exports `component` if its class is a service.
    ///
    /// The component is handed back unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::MissingInterface`] if no interface can be
    /// determined, [`WiringError::NamedLookupFailed`] if a collaborator id
    /// does not resolve, [`WiringError::InvalidConfiguration`] for malformed
    /// configuration and [`WiringError::ExportFailed`] if the protocol stack
    /// fails.
    pub fn post_process(
        &self,
        component: Arc<dyn Component>,
    ) -> Result<Arc<dyn Component>, WiringError> {
        let class = component.class();
        self.export_service(class, || component.clone().into_any())?;
        Ok(component)
    }

    /// Runs both hooks on `component` and returns it shared.
    ///
    /// # Errors
    ///
    /// As for [`post_process`](Self::post_process).
    pub fn register<C: Component>(&self, mut component: C) -> Result<Arc<C>, WiringError> {
        self.pre_process(&mut component);
        let component = Arc::new(component);
        let object = component.clone() as Arc<dyn Any + Send + Sync>;
        self.export_service(component.class(), || object)?;
        Ok(component)
    }

    /// Returns the client stub for a reference, building and registering the
    /// endpoint on first use.
    ///
    /// The interface is taken from the annotation's name, then its interface
    /// token, then the site type. Resolutions with equal
    /// `group/interface:version` share one endpoint and one stub.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::MissingInterface`] if no interface can be
    /// determined, [`WiringError::NamedLookupFailed`] if a collaborator id
    /// does not resolve and [`WiringError::ReferFailed`] if the protocol
    /// stack fails.
    pub fn resolve_reference(
        &self,
        annotation: &ReferenceAnnotation,
        site: &SiteType,
    ) -> Result<InterfaceObject, WiringError> {
        let identity = if !annotation.interface_name.is_empty() {
            InterfaceIdentity::Name(annotation.interface_name.clone())
        } else if let Some(interface) = annotation.interface_class {
            InterfaceIdentity::Type(interface)
        } else if let Some(interface) = site.interface() {
            InterfaceIdentity::Type(interface)
        } else {
            return Err(WiringError::MissingInterface {
                target: site.name().to_string(),
            });
        };

        let key = annotation.key(identity.name());
        if let Some(endpoint) = self.registry.reference(&key) {
            return endpoint.acquire_stub();
        }

        let mut config = self.reference_config(&key, annotation, identity)?;
        config.finalise()?;
        let candidate = Arc::new(ReferenceEndpoint::new(
            key.clone(),
            config,
            self.selector.clone(),
            self.proxy_factory.clone(),
        )?);
        self.registry
            .insert_reference(key, candidate)
            .acquire_stub()
    }

    /// Unexports every service and destroys every reference.
    ///
    /// Failures are logged; every endpoint is attempted. The registry is
    /// empty afterwards.
    pub fn shutdown(&self) {
        let (services, references) = self.registry.drain();
        let (service_count, reference_count) = (services.len(), references.len());
        for service in services {
            if let Err(e) = service.unexport() {
                error!(
                    class = %service.service().class_name(),
                    error = %e,
                    "failed to unexport service during shutdown"
                );
            }
        }
        for reference in references {
            reference.destroy();
        }
        info!(
            services = service_count,
            references = reference_count,
            "wiring shut down"
        );
    }

    fn export_service(
        &self,
        class: &ClassDescriptor,
        object: impl FnOnce() -> Arc<dyn Any + Send + Sync>,
    ) -> Result<(), WiringError> {
        if !self.config.matches(class.name()) {
            debug!(class = %class.name(), "outside configured packages, not exported");
            return Ok(());
        }
        let Some(annotation) = class.service() else {
            return Ok(());
        };

        let identity = if let Some(interface) = annotation.interface_class {
            InterfaceIdentity::Type(interface)
        } else if !annotation.interface_name.is_empty() {
            InterfaceIdentity::Name(annotation.interface_name.clone())
        } else {
            let interface = class.interfaces().first().copied().ok_or_else(|| {
                WiringError::MissingInterface {
                    target: class.name().to_string(),
                }
            })?;
            InterfaceIdentity::Type(interface)
        };

        let mut config = self.service_config(class.name(), annotation, identity)?;
        config.finalise()?;
        let service = ServiceRef::new(class.name(), class.interface_objects(object()));
        let endpoint = Arc::new(ServiceEndpoint::new(
            config,
            service,
            self.selector.clone(),
            self.proxy_factory.clone(),
        )?);
        endpoint.export()?;
        info!(
            class = %class.name(),
            interface = %endpoint.interface(),
            "service wired"
        );
        self.registry.add_service(endpoint);
        Ok(())
    }

    fn service_config(
        &self,
        class_name: &str,
        annotation: &ServiceAnnotation,
        identity: InterfaceIdentity,
    ) -> Result<ServiceConfig, WiringError> {
        let mut config = ServiceConfig::new(class_name)
            .with_interface(identity)
            .with_group(annotation.group.as_str())
            .with_version(annotation.version.as_str());
        config.provider = self.lookup_optional::<ProviderConfig>(&annotation.provider)?;
        config.application = self.lookup_optional::<ApplicationConfig>(&annotation.application)?;
        config.module = self.lookup_optional::<ModuleConfig>(&annotation.module)?;
        config.monitor = self.lookup_optional::<MonitorConfig>(&annotation.monitor)?;
        config.registries = self.lookup_all::<RegistryConfig>(&annotation.registries)?;
        config.protocols = self.lookup_all::<ProtocolConfig>(&annotation.protocols)?;
        config.scope = annotation.scope.clone();
        config.listener = annotation.listener.clone();
        config.parameters = annotation.parameters.clone();
        Ok(config)
    }

    fn reference_config(
        &self,
        key: &str,
        annotation: &ReferenceAnnotation,
        identity: InterfaceIdentity,
    ) -> Result<ReferenceConfig, WiringError> {
        let mut config = ReferenceConfig::new(key)
            .with_interface(identity)
            .with_group(annotation.group.as_str())
            .with_version(annotation.version.as_str());
        config.consumer = self.lookup_optional::<ConsumerConfig>(&annotation.consumer)?;
        config.application = self.lookup_optional::<ApplicationConfig>(&annotation.application)?;
        config.module = self.lookup_optional::<ModuleConfig>(&annotation.module)?;
        config.monitor = self.lookup_optional::<MonitorConfig>(&annotation.monitor)?;
        config.registries = self.lookup_all::<RegistryConfig>(&annotation.registries)?;
        config.url = annotation.url.clone();
        config.check = annotation.check;
        config.timeout = annotation.timeout;
        config.scope = annotation.scope.clone();
        config.injvm = annotation.injvm;
        config.listener = annotation.listener.clone();
        config.parameters = annotation.parameters.clone();
        Ok(config)
    }

    fn lookup_optional<T: Any + Send + Sync>(
        &self,
        name: &Option<String>,
    ) -> Result<Option<Arc<T>>, WiringError> {
        name.as_deref()
            .map(|name| lookup_named::<T>(self.container.as_ref(), name))
            .transpose()
    }

    fn lookup_all<T: Any + Send + Sync>(&self, names: &[String]) -> Result<Vec<Arc<T>>, WiringError> {
        names
            .iter()
            .map(|name| lookup_named::<T>(self.container.as_ref(), name))
            .collect()
    }
}

impl std::fmt::Debug for WiringProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WiringProcessor")
            .field("config", &self.config)
            .field("selector", &self.selector)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
