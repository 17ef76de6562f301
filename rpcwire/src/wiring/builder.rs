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

//! Builder pattern for wiring processor configuration.

use crate::config::ProcessorConfig;
use crate::container::Container;
use crate::protocol::ProtocolSelector;
use crate::proxy::{DispatchProxyFactory, ProxyFactory};
use crate::wiring::WiringProcessor;
use std::sync::Arc;

/// Builder for [`WiringProcessor`].
///
/// Unless overridden, the processor wires every component, exports and
/// refers through [`ProtocolSelector::standard`] and dispatches with a fresh
/// [`DispatchProxyFactory`].
///
/// # Examples
///
/// ## Package Gating
///
/// ```rust
/// use rpcwire::container::SimpleContainer;
/// use rpcwire::wiring::WiringProcessor;
/// use std::sync::Arc;
///
/// let processor = WiringProcessor::builder(Arc::new(SimpleContainer::new()))
///     .with_packages("com.acme.billing, com.acme.orders")
///     .build();
/// assert!(processor.config().matches("com.acme.orders.OrderDesk"));
/// assert!(!processor.config().matches("com.other.Svc"));
/// ```
///
/// ## Shared Protocol Stack
///
/// ```rust
/// use rpcwire::container::SimpleContainer;
/// use rpcwire::protocol::ProtocolSelector;
/// use rpcwire::wiring::WiringProcessor;
/// use std::sync::Arc;
///
/// let selector = ProtocolSelector::standard();
/// let processor = WiringProcessor::builder(Arc::new(SimpleContainer::new()))
///     .with_selector(selector.clone())
///     .build();
/// assert!(Arc::ptr_eq(processor.selector(), &selector));
/// ```
pub struct WiringProcessorBuilder {
    container: Arc<dyn Container>,
    config: ProcessorConfig,
    selector: Option<Arc<ProtocolSelector>>,
    proxy_factory: Option<Arc<dyn ProxyFactory>>,
}

impl WiringProcessorBuilder {
    /// Creates a builder for a processor running inside `container`.
    pub fn new(container: Arc<dyn Container>) -> Self {
        Self {
            container,
            config: ProcessorConfig::default(),
            selector: None,
            proxy_factory: None,
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the package prefixes from a comma-separated list.
    #[must_use]
    pub fn with_packages(mut self, packages: &str) -> Self {
        self.config = self.config.with_packages(packages);
        self
    }

    /// Uses `selector` as the protocol stack.
    #[must_use]
    pub fn with_selector(mut self, selector: Arc<ProtocolSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Uses `proxy_factory` for stubs and dispatchers.
    #[must_use]
    pub fn with_proxy_factory(mut self, proxy_factory: Arc<dyn ProxyFactory>) -> Self {
        self.proxy_factory = Some(proxy_factory);
        self
    }

    /// Builds the processor.
    pub fn build(self) -> WiringProcessor {
        let selector = self.selector.unwrap_or_else(ProtocolSelector::standard);
        let proxy_factory: Arc<dyn ProxyFactory> = match self.proxy_factory {
            Some(proxy_factory) => proxy_factory,
            None => Arc::new(DispatchProxyFactory::new()),
        };
        WiringProcessor::from_parts(self.config, self.container, selector, proxy_factory)
    }
}

impl std::fmt::Debug for WiringProcessorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WiringProcessorBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
