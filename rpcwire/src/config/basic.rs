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

//! Collaborator configurations shared between endpoints.

use crate::WiringError;
use crate::config::check_name;
use crate::protocol::MEMORY_REGISTRY;
use crate::url::{DEFAULT_PROTOCOL, NO_AVAILABLE, REGISTRY_SCHEME, REGISTRY_SERVICE_PATH, Url, keys};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The application an endpoint belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationConfig {
    /// Application name, carried by every URL as `application`.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Responsible person or team.
    pub owner: String,
    /// Registries inherited by every endpoint of the application.
    pub registries: Vec<Arc<RegistryConfig>>,
    /// Monitor inherited by every endpoint of the application.
    pub monitor: Option<Arc<MonitorConfig>>,
}

impl ApplicationConfig {
    /// Creates an application configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<RegistryConfig>) -> Self {
        self.registries.push(registry);
        self
    }

    /// Sets the monitor.
    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<MonitorConfig>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), WiringError> {
        check_name("application", &self.name)?;
        check_name("application.version", &self.version)
    }
}

/// A module inside an application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleConfig {
    /// Module name, carried by every URL as `module`.
    pub name: String,
    /// Module version.
    pub version: String,
    /// Registries inherited by every endpoint of the module.
    pub registries: Vec<Arc<RegistryConfig>>,
    /// Monitor inherited by every endpoint of the module.
    pub monitor: Option<Arc<MonitorConfig>>,
}

impl ModuleConfig {
    /// Creates a module configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<RegistryConfig>) -> Self {
        self.registries.push(registry);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), WiringError> {
        check_name("module", &self.name)?;
        check_name("module.version", &self.version)
    }
}

/// A service registry.
///
/// # Examples
///
/// ```rust
/// use rpcwire::config::RegistryConfig;
///
/// let registry = RegistryConfig::new("10.0.0.2:2181");
/// let url = registry.to_url().unwrap().unwrap();
/// assert_eq!(url.to_string(), "registry://10.0.0.2:2181/RegistryService?registry=memory");
///
/// assert!(RegistryConfig::new("N/A").to_url().unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    /// `host:port`, `type://host:port`, or `N/A` to disable the registry.
    pub address: String,
    /// Registry type, used when the address carries no scheme.
    ///
    /// Default: `memory`
    pub protocol: Option<String>,
    /// Credentials.
    pub username: Option<String>,
    /// Credentials.
    pub password: Option<String>,
    /// Extra URL parameters.
    pub parameters: BTreeMap<String, String>,
}

impl RegistryConfig {
    /// Creates a registry configuration for `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Sets the registry type.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Sets credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Adds a URL parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns `true` if the address disables the registry.
    pub fn is_disabled(&self) -> bool {
        self.address.trim().is_empty() || self.address.trim().eq_ignore_ascii_case(NO_AVAILABLE)
    }

    /// Builds the `registry://` URL, `None` when the registry is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::InvalidConfiguration`] if the address cannot
    /// be parsed.
    pub fn to_url(&self) -> Result<Option<Url>, WiringError> {
        if self.is_disabled() {
            return Ok(None);
        }
        let address = self.address.trim();
        let text = if address.contains("://") {
            address.to_string()
        } else {
            format!(
                "{}://{}",
                self.protocol.as_deref().unwrap_or(MEMORY_REGISTRY),
                address
            )
        };
        let parsed = Url::parse(&text).map_err(|e| WiringError::InvalidConfiguration {
            property: "registry.address",
            value: self.address.clone(),
            reason: e.to_string(),
        })?;
        let url = Url::new(REGISTRY_SCHEME, parsed.host(), parsed.port(), REGISTRY_SERVICE_PATH)
            .with_credentials(
                self.username.clone().or_else(|| parsed.username().map(str::to_string)),
                self.password.clone().or_else(|| parsed.password().map(str::to_string)),
            )
            .with_parameters(parsed.parameters().clone())
            .with_parameters(self.parameters.clone())
            .with_parameter(keys::REGISTRY, parsed.protocol());
        Ok(Some(url))
    }
}

/// A monitoring centre.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorConfig {
    /// `host:port` of the monitor.
    pub address: String,
    /// Monitor protocol.
    ///
    /// Default: `dubbo`
    pub protocol: Option<String>,
}

impl MonitorConfig {
    /// Creates a monitor configuration for `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            protocol: None,
        }
    }

    /// Builds the monitor URL, `None` when no address is set.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::InvalidConfiguration`] if the address cannot
    /// be parsed.
    pub fn to_url(&self) -> Result<Option<Url>, WiringError> {
        if self.address.trim().is_empty() || self.address.trim() == NO_AVAILABLE {
            return Ok(None);
        }
        let text = format!(
            "{}://{}",
            self.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL),
            self.address.trim()
        );
        Url::parse(&text)
            .map(Some)
            .map_err(|e| WiringError::InvalidConfiguration {
                property: "monitor.address",
                value: self.address.clone(),
                reason: e.to_string(),
            })
    }
}

/// A protocol a service is exported with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Protocol name, the URL scheme.
    ///
    /// Default: `dubbo`
    pub name: String,
    /// Bind host.
    ///
    /// Default: `127.0.0.1`
    pub host: Option<String>,
    /// Bind port; the protocol's default port when unset.
    pub port: Option<u16>,
    /// Extra URL parameters.
    pub parameters: BTreeMap<String, String>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROTOCOL.to_string(),
            host: None,
            port: None,
            parameters: BTreeMap::new(),
        }
    }
}

impl ProtocolConfig {
    /// Creates a protocol configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the bind host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the bind port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Adds a URL parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), WiringError> {
        check_name("protocol", &self.name)
    }
}

/// Defaults for every service of a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Default service group.
    pub group: String,
    /// Default service version.
    pub version: String,
    /// Default application.
    pub application: Option<Arc<ApplicationConfig>>,
    /// Default module.
    pub module: Option<Arc<ModuleConfig>>,
    /// Default registries.
    pub registries: Vec<Arc<RegistryConfig>>,
    /// Default monitor.
    pub monitor: Option<Arc<MonitorConfig>>,
    /// Default protocols.
    pub protocols: Vec<Arc<ProtocolConfig>>,
    /// Extra URL parameters.
    pub parameters: BTreeMap<String, String>,
}

impl ProviderConfig {
    /// Creates an empty provider configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Sets the default version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the default application.
    #[must_use]
    pub fn with_application(mut self, application: Arc<ApplicationConfig>) -> Self {
        self.application = Some(application);
        self
    }

    /// Adds a default protocol.
    #[must_use]
    pub fn with_protocol(mut self, protocol: Arc<ProtocolConfig>) -> Self {
        self.protocols.push(protocol);
        self
    }

    /// Adds a default registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<RegistryConfig>) -> Self {
        self.registries.push(registry);
        self
    }
}

/// Defaults for every reference of a consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Default reference group.
    pub group: String,
    /// Default reference version.
    pub version: String,
    /// Default application.
    pub application: Option<Arc<ApplicationConfig>>,
    /// Default module.
    pub module: Option<Arc<ModuleConfig>>,
    /// Default registries.
    pub registries: Vec<Arc<RegistryConfig>>,
    /// Default monitor.
    pub monitor: Option<Arc<MonitorConfig>>,
    /// Default for failing a reference without providers.
    pub check: Option<bool>,
    /// Default invocation timeout in milliseconds.
    pub timeout: Option<u64>,
    /// Extra URL parameters.
    pub parameters: BTreeMap<String, String>,
}

impl ConsumerConfig {
    /// Creates an empty consumer configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Sets the default version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the default check flag.
    #[must_use]
    pub fn with_check(mut self, check: bool) -> Self {
        self.check = Some(check);
        self
    }

    /// Adds a default registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<RegistryConfig>) -> Self {
        self.registries.push(registry);
        self
    }
}
