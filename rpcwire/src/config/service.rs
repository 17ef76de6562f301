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
use crate::config::{
    ApplicationConfig, InterfaceIdentity, ModuleConfig, MonitorConfig, ProtocolConfig,
    ProviderConfig, RegistryConfig, check_multi_name, check_name, with_identity,
};
use crate::protocol::ProtocolSelector;
use crate::url::{
    INJVM_SCHEME, LOCALHOST, PROVIDER_SIDE, SCOPE_LOCAL, SCOPE_REMOTE, Url, keys, service_key,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Configuration of an exported service.
///
/// # Examples
///
/// ```rust
/// use rpcwire::config::{ApplicationConfig, ProtocolConfig, ServiceConfig};
/// use rpcwire::protocol::ProtocolSelector;
/// use rpcwire::rpc::InterfaceType;
/// use rpcwire::RpcError;
/// use std::sync::Arc;
///
/// #[rpcwire::interface(name = "com.acme.Greeter")]
/// pub trait Greeter {
///     async fn greet(&self, name: String) -> Result<String, RpcError>;
/// }
///
/// # fn main() {
/// let mut config = ServiceConfig::new("greeter")
///     .with_interface(InterfaceType::of::<dyn Greeter>())
///     .with_version("1.0")
///     .with_application(Arc::new(ApplicationConfig::new("demo")))
///     .with_protocol(Arc::new(ProtocolConfig::new("injvm")));
/// config.finalise().unwrap();
///
/// let urls = config.export_urls(&ProtocolSelector::new()).unwrap();
/// assert_eq!(
///     urls[0].to_string(),
///     "injvm://127.0.0.1/com.acme.Greeter?application=demo&interface=com.acme.Greeter&methods=greet&side=provider&version=1.0"
/// );
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Identifier used in diagnostics, usually the implementing class.
    pub id: String,
    /// The exported interface.
    pub interface: Option<InterfaceIdentity>,
    /// Service group.
    pub group: String,
    /// Service version.
    pub version: String,
    /// Owning application.
    pub application: Option<Arc<ApplicationConfig>>,
    /// Owning module.
    pub module: Option<Arc<ModuleConfig>>,
    /// Provider defaults.
    pub provider: Option<Arc<ProviderConfig>>,
    /// Registries to publish to.
    pub registries: Vec<Arc<RegistryConfig>>,
    /// Monitor to report to.
    pub monitor: Option<Arc<MonitorConfig>>,
    /// Protocols to export with.
    pub protocols: Vec<Arc<ProtocolConfig>>,
    /// `local` exports in-process only, `remote` skips the in-process export.
    pub scope: Option<String>,
    /// Exporter listener selection, as for the `exporter.listener` parameter.
    pub listener: Option<String>,
    /// Extra URL parameters.
    pub parameters: BTreeMap<String, String>,
}

impl ServiceConfig {
    /// Creates an empty configuration identified by `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the interface.
    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<InterfaceIdentity>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Sets the interface by name.
    #[must_use]
    pub fn with_interface_name(mut self, name: impl Into<String>) -> Self {
        self.interface = Some(InterfaceIdentity::Name(name.into()));
        self
    }

    /// Sets the group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the application.
    #[must_use]
    pub fn with_application(mut self, application: Arc<ApplicationConfig>) -> Self {
        self.application = Some(application);
        self
    }

    /// Sets the provider defaults.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<ProviderConfig>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Adds a registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<RegistryConfig>) -> Self {
        self.registries.push(registry);
        self
    }

    /// Adds a protocol.
    #[must_use]
    pub fn with_protocol(mut self, protocol: Arc<ProtocolConfig>) -> Self {
        self.protocols.push(protocol);
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Adds a URL parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns the interface, failing if none is set.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::MissingInterface`] when no interface is set.
    pub fn interface_identity(&self) -> Result<&InterfaceIdentity, WiringError> {
        self.interface
            .as_ref()
            .ok_or_else(|| WiringError::MissingInterface {
                target: self.id.clone(),
            })
    }

    /// Returns the service key `group/interface:version`.
    pub fn service_key(&self) -> String {
        let name = self.interface.as_ref().map(InterfaceIdentity::name);
        service_key(&self.group, name.unwrap_or_default(), &self.version)
    }

    /// Applies inheritance and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::MissingInterface`] without an interface and
    /// [`WiringError::InvalidConfiguration`] for malformed names or scope.
    pub fn finalise(&mut self) -> Result<(), WiringError> {
        self.interface_identity()?;

        if let Some(provider) = self.provider.clone() {
            if self.group.is_empty() {
                self.group = provider.group.clone();
            }
            if self.version.is_empty() {
                self.version = provider.version.clone();
            }
            if self.application.is_none() {
                self.application = provider.application.clone();
            }
            if self.module.is_none() {
                self.module = provider.module.clone();
            }
            if self.registries.is_empty() {
                self.registries = provider.registries.clone();
            }
            if self.monitor.is_none() {
                self.monitor = provider.monitor.clone();
            }
            if self.protocols.is_empty() {
                self.protocols = provider.protocols.clone();
            }
            for (key, value) in &provider.parameters {
                self.parameters
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
        if let Some(module) = self.module.clone() {
            if self.registries.is_empty() {
                self.registries = module.registries.clone();
            }
            if self.monitor.is_none() {
                self.monitor = module.monitor.clone();
            }
        }
        if let Some(application) = self.application.clone() {
            if self.registries.is_empty() {
                self.registries = application.registries.clone();
            }
            if self.monitor.is_none() {
                self.monitor = application.monitor.clone();
            }
        }
        if self.protocols.is_empty() {
            self.protocols.push(Arc::new(ProtocolConfig::default()));
        }

        check_multi_name("group", &self.group)?;
        check_name("version", &self.version)?;
        if let Some(application) = &self.application {
            application.validate()?;
        }
        if let Some(module) = &self.module {
            module.validate()?;
        }
        for protocol in &self.protocols {
            protocol.validate()?;
        }
        match self.scope.as_deref() {
            None | Some(SCOPE_LOCAL) | Some(SCOPE_REMOTE) => Ok(()),
            Some(other) => Err(WiringError::InvalidConfiguration {
                property: "scope",
                value: other.to_string(),
                reason: "expected 'local' or 'remote'".to_string(),
            }),
        }
    }

    /// Builds the provider URL for one protocol.
    ///
    /// A missing port is filled from the protocol registered in `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::MissingInterface`] without an interface.
    pub fn provider_url(
        &self,
        protocol: &ProtocolConfig,
        selector: &ProtocolSelector,
    ) -> Result<Url, WiringError> {
        let interface = self.interface_identity()?;
        let port = protocol.port.unwrap_or_else(|| {
            selector
                .protocol(&protocol.name)
                .map(|protocol| protocol.default_port())
                .unwrap_or(0)
        });
        let host = protocol.host.as_deref().unwrap_or(LOCALHOST);
        let mut url = Url::new(protocol.name.as_str(), host, port, interface.name())
            .with_parameters(protocol.parameters.clone())
            .with_parameters(self.parameters.clone())
            .with_parameter(
                keys::APPLICATION,
                self.application.as_ref().map(|a| a.name.clone()).unwrap_or_default(),
            )
            .with_parameter(
                keys::MODULE,
                self.module.as_ref().map(|m| m.name.clone()).unwrap_or_default(),
            )
            .with_parameter(keys::EXPORTER_LISTENER, self.listener.clone().unwrap_or_default());
        let monitor = match &self.monitor {
            Some(monitor) => monitor.to_url()?,
            None => None,
        };
        if let Some(monitor) = monitor {
            url = url.with_parameter_encoded(keys::MONITOR, &monitor);
        }
        Ok(with_identity(
            url,
            interface,
            &self.group,
            &self.version,
            PROVIDER_SIDE,
        ))
    }

    /// Builds every URL the service is exported at.
    ///
    /// Unless the scope is `remote`, the service is first exported in-process.
    /// Unless the scope is `local`, it is then exported with every protocol,
    /// through every enabled registry when any is configured.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::MissingInterface`] without an interface and
    /// [`WiringError::InvalidConfiguration`] for unparsable addresses.
    pub fn export_urls(&self, selector: &ProtocolSelector) -> Result<Vec<Url>, WiringError> {
        let scope = self.scope.as_deref();
        let mut registries = Vec::with_capacity(self.registries.len());
        for registry in &self.registries {
            if let Some(url) = registry.to_url()? {
                registries.push(url);
            }
        }

        let mut urls = Vec::new();
        let exports_injvm = self.protocols.iter().any(|p| p.name == INJVM_SCHEME);
        if scope != Some(SCOPE_REMOTE) && (!exports_injvm || scope == Some(SCOPE_LOCAL)) {
            let local = ProtocolConfig::new(INJVM_SCHEME).with_port(0);
            urls.push(self.provider_url(&local, selector)?);
        }
        if scope == Some(SCOPE_LOCAL) {
            return Ok(urls);
        }
        for protocol in &self.protocols {
            let provider_url = self.provider_url(protocol, selector)?;
            if protocol.name == INJVM_SCHEME || registries.is_empty() {
                urls.push(provider_url);
            } else {
                urls.extend(registries.iter().map(|registry| {
                    registry
                        .clone()
                        .with_parameter_encoded(keys::EXPORT, &provider_url)
                }));
            }
        }
        Ok(urls)
    }
}
