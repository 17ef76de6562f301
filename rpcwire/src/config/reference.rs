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
    ApplicationConfig, ConsumerConfig, InterfaceIdentity, ModuleConfig, MonitorConfig,
    RegistryConfig, check_multi_name, check_name, with_identity,
};
use crate::protocol::ProtocolSelector;
use crate::rpc::InterfaceType;
use crate::url::{
    CONSUMER_SIDE, INJVM_SCHEME, LOCALHOST, REGISTRY_SCHEME, SCOPE_LOCAL, SCOPE_REMOTE, Url,
    keys, service_key,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Scheme of consumer URLs recorded in registries.
pub const CONSUMER_SCHEME: &str = "consumer";

/// Configuration of a remote reference.
///
/// Where the reference is resolved:
///
/// 1. in-process, when the scope is `local`, `injvm` is set, or neither
///    scope nor `url` is set and a matching service is exported in-process;
/// 2. at the `url` addresses (`;`-separated) when set;
/// 3. through every enabled registry;
/// 4. in-process otherwise, so a provider exported later is still found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceConfig {
    /// Identifier used in diagnostics, usually the injection site.
    pub id: String,
    /// The referenced interface.
    pub interface: Option<InterfaceIdentity>,
    /// Service group.
    pub group: String,
    /// Service version.
    pub version: String,
    /// Owning application.
    pub application: Option<Arc<ApplicationConfig>>,
    /// Owning module.
    pub module: Option<Arc<ModuleConfig>>,
    /// Consumer defaults.
    pub consumer: Option<Arc<ConsumerConfig>>,
    /// Registries to look providers up in.
    pub registries: Vec<Arc<RegistryConfig>>,
    /// Monitor to report to.
    pub monitor: Option<Arc<MonitorConfig>>,
    /// Direct provider addresses bypassing the registries.
    pub url: Option<String>,
    /// Fail when no provider is available at refer time.
    pub check: Option<bool>,
    /// Invocation timeout in milliseconds.
    pub timeout: Option<u64>,
    /// `local` or `remote`.
    pub scope: Option<String>,
    /// Force or forbid in-process resolution.
    pub injvm: Option<bool>,
    /// Invoker listener selection, as for the `invoker.listener` parameter.
    pub listener: Option<String>,
    /// Extra URL parameters.
    pub parameters: BTreeMap<String, String>,
}

impl ReferenceConfig {
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

    /// Sets the consumer defaults.
    #[must_use]
    pub fn with_consumer(mut self, consumer: Arc<ConsumerConfig>) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// Adds a registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<RegistryConfig>) -> Self {
        self.registries.push(registry);
        self
    }

    /// Sets direct provider addresses.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the check flag.
    #[must_use]
    pub fn with_check(mut self, check: bool) -> Self {
        self.check = Some(check);
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Returns the interface name, empty when unset.
    pub fn interface_name(&self) -> &str {
        self.interface
            .as_ref()
            .map(InterfaceIdentity::name)
            .unwrap_or_default()
    }

    /// Returns the interface token.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::MissingInterface`] if no interface is set or
    /// the name denotes no interface declared in the program.
    pub fn interface_type(&self) -> Result<InterfaceType, WiringError> {
        self.interface
            .as_ref()
            .and_then(InterfaceIdentity::resolve)
            .ok_or_else(|| WiringError::MissingInterface {
                target: self.id.clone(),
            })
    }

    /// Returns the service key `group/interface:version`.
    pub fn service_key(&self) -> String {
        service_key(&self.group, self.interface_name(), &self.version)
    }

    /// Returns `true` if a provider must be available at refer time.
    ///
    /// Default: `false`
    pub fn check(&self) -> bool {
        self.check.unwrap_or(false)
    }

    /// Applies inheritance and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::MissingInterface`] without a resolvable
    /// interface and [`WiringError::InvalidConfiguration`] for malformed names
    /// or scope.
    pub fn finalise(&mut self) -> Result<(), WiringError> {
        self.interface_type()?;

        if let Some(consumer) = self.consumer.clone() {
            if self.group.is_empty() {
                self.group = consumer.group.clone();
            }
            if self.version.is_empty() {
                self.version = consumer.version.clone();
            }
            if self.application.is_none() {
                self.application = consumer.application.clone();
            }
            if self.module.is_none() {
                self.module = consumer.module.clone();
            }
            if self.registries.is_empty() {
                self.registries = consumer.registries.clone();
            }
            if self.monitor.is_none() {
                self.monitor = consumer.monitor.clone();
            }
            self.check = self.check.or(consumer.check);
            self.timeout = self.timeout.or(consumer.timeout);
            for (key, value) in &consumer.parameters {
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

        check_multi_name("group", &self.group)?;
        check_name("version", &self.version)?;
        if let Some(application) = &self.application {
            application.validate()?;
        }
        if let Some(module) = &self.module {
            module.validate()?;
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

    /// Builds the consumer URL recorded in registries.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::MissingInterface`] without an interface.
    pub fn consumer_url(&self) -> Result<Url, WiringError> {
        let interface = self
            .interface
            .as_ref()
            .ok_or_else(|| WiringError::MissingInterface {
                target: self.id.clone(),
            })?;
        let mut url = Url::new(CONSUMER_SCHEME, LOCALHOST, 0, interface.name())
            .with_parameters(self.parameters.clone())
            .with_parameter(
                keys::APPLICATION,
                self.application.as_ref().map(|a| a.name.clone()).unwrap_or_default(),
            )
            .with_parameter(
                keys::MODULE,
                self.module.as_ref().map(|m| m.name.clone()).unwrap_or_default(),
            )
            .with_parameter(keys::INVOKER_LISTENER, self.listener.clone().unwrap_or_default())
            .with_parameter(keys::CHECK, self.check().to_string());
        if let Some(timeout) = self.timeout {
            url = url.with_parameter(keys::TIMEOUT, timeout.to_string());
        }
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
            CONSUMER_SIDE,
        ))
    }

    /// Returns `true` if the reference resolves in-process.
    pub fn is_injvm(&self, selector: &ProtocolSelector, local: &Url) -> bool {
        if self.scope.as_deref() == Some(SCOPE_LOCAL) || self.injvm == Some(true) {
            return true;
        }
        if self.scope.as_deref() == Some(SCOPE_REMOTE) || self.injvm == Some(false) {
            return false;
        }
        self.url.is_none() && selector.injvm().is_exported(local)
    }

    /// Builds every URL the reference is resolved at.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError::InvalidConfiguration`] if a direct URL or a
    /// registry address cannot be parsed.
    pub fn refer_urls(&self, selector: &ProtocolSelector) -> Result<Vec<Url>, WiringError> {
        let consumer = self.consumer_url()?;
        let local = consumer.clone().with_protocol(INJVM_SCHEME);
        if self.is_injvm(selector, &local) {
            return Ok(vec![local]);
        }

        let mut urls = Vec::new();
        if let Some(direct) = &self.url {
            for part in direct.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                let url = Url::parse(part).map_err(|e| WiringError::InvalidConfiguration {
                    property: "url",
                    value: part.to_string(),
                    reason: e.to_string(),
                })?;
                if url.protocol() == REGISTRY_SCHEME {
                    urls.push(url.with_parameter_encoded(keys::REFER, &consumer));
                    continue;
                }
                let mut url = if url.path().is_empty() {
                    url.with_path(consumer.path())
                } else {
                    url
                };
                for (key, value) in consumer.parameters() {
                    if url.parameter(key).is_none() {
                        url = url.with_parameter(key.as_str(), value.as_str());
                    }
                }
                urls.push(url.with_parameter(keys::SIDE, CONSUMER_SIDE));
            }
        } else {
            for registry in &self.registries {
                if let Some(registry) = registry.to_url()? {
                    urls.push(registry.with_parameter_encoded(keys::REFER, &consumer));
                }
            }
        }
        if urls.is_empty() {
            urls.push(local);
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RpcError;
    use crate::config::{ProtocolConfig, ServiceConfig};
    use crate::protocol::Protocol;
    use crate::proxy::{DispatchProxyFactory, ProxyFactory, ServiceRef};

    #[crate::interface(name = "test.Weather")]
    trait Weather {
        async fn forecast(&self, city: String) -> Result<String, RpcError>;
    }

    struct Sunny;

    #[async_trait::async_trait]
    impl Weather for Sunny {
        async fn forecast(&self, _city: String) -> Result<String, RpcError> {
            Ok("sunny".to_string())
        }
    }

    fn config() -> ReferenceConfig {
        ReferenceConfig::new("test.Consumer.weather")
            .with_interface(InterfaceType::of::<dyn Weather>())
            .with_group("g")
            .with_version("1")
    }

    #[test]
    fn test_unknown_interface_name() {
        let mut config = ReferenceConfig::new("site")
            .with_interface(InterfaceIdentity::Name("no.such.Api".to_string()));
        assert!(matches!(
            config.finalise(),
            Err(WiringError::MissingInterface { .. })
        ));
    }

    #[test]
    fn test_inherits_from_consumer() {
        let consumer = Arc::new(
            ConsumerConfig::new()
                .with_group("blue")
                .with_check(true)
                .with_registry(Arc::new(RegistryConfig::new("10.0.0.2:2181"))),
        );
        let mut config = ReferenceConfig::new("site")
            .with_interface(InterfaceType::of::<dyn Weather>())
            .with_consumer(consumer);
        config.finalise().unwrap();
        assert_eq!(config.group, "blue");
        assert!(config.check());
        assert_eq!(config.registries.len(), 1);
        assert_eq!(config.service_key(), "blue/test.Weather");
    }

    #[test]
    fn test_consumer_url() {
        let url = config().consumer_url().unwrap();
        assert_eq!(url.protocol(), CONSUMER_SCHEME);
        assert_eq!(url.service_key(), "g/test.Weather:1");
        assert_eq!(url.parameter(keys::SIDE), Some(CONSUMER_SIDE));
        assert_eq!(url.parameter(keys::METHODS), Some("forecast"));
        assert_eq!(url.parameter(keys::CHECK), Some("false"));
    }

    #[test]
    fn test_falls_back_to_injvm() {
        let urls = config().refer_urls(&ProtocolSelector::new()).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].protocol(), INJVM_SCHEME);
    }

    #[test]
    fn test_prefers_local_export() {
        let selector = ProtocolSelector::new();
        let mut service = ServiceConfig::new("test.LocalWeather")
            .with_interface(InterfaceType::of::<dyn Weather>())
            .with_group("g")
            .with_version("1")
            .with_protocol(Arc::new(ProtocolConfig::new(INJVM_SCHEME)));
        service.finalise().unwrap();
        let export_url = service.export_urls(&selector).unwrap().remove(0);
        let invoker = DispatchProxyFactory::new()
            .get_invoker(
                ServiceRef::of::<dyn Weather>("test.LocalWeather", Arc::new(Sunny)),
                InterfaceType::of::<dyn Weather>(),
                export_url,
            )
            .unwrap();
        let _exporter = selector.export(invoker).unwrap();

        let config = config().with_registry(Arc::new(RegistryConfig::new("10.0.0.2:2181")));
        let urls = config.refer_urls(&selector).unwrap();
        assert_eq!(urls[0].protocol(), INJVM_SCHEME);

        let urls = config.with_scope(SCOPE_REMOTE).refer_urls(&selector).unwrap();
        assert_eq!(urls[0].protocol(), REGISTRY_SCHEME);
    }

    #[test]
    fn test_direct_urls() {
        let config = config().with_url("dubbo://10.0.0.5:20880;registry://10.0.0.2:2181/RegistryService");
        let urls = config.refer_urls(&ProtocolSelector::new()).unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].path(), "test.Weather");
        assert_eq!(urls[0].parameter(keys::GROUP), Some("g"));
        assert_eq!(urls[0].parameter(keys::SIDE), Some(CONSUMER_SIDE));
        let consumer = urls[1].parameter_url(keys::REFER).unwrap().unwrap();
        assert_eq!(consumer.protocol(), CONSUMER_SCHEME);
    }

    #[test]
    fn test_bad_direct_url() {
        let config = config().with_url("not a url");
        assert!(matches!(
            config.refer_urls(&ProtocolSelector::new()),
            Err(WiringError::InvalidConfiguration { property: "url", .. })
        ));
    }
}
