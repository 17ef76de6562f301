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

use crate::rpc::{InterfaceType, RemoteInterface};
use std::collections::BTreeMap;

/// Marks a class as a remotely callable service.
///
/// Collaborator fields hold ids resolved against the container's named
/// lookup when the service is exported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceAnnotation {
    /// Explicit interface token.
    pub interface_class: Option<InterfaceType>,
    /// Explicit interface name, used when `interface_class` is unset.
    pub interface_name: String,
    /// Service version.
    pub version: String,
    /// Service group.
    pub group: String,
    /// Registry ids.
    pub registries: Vec<String>,
    /// Protocol ids.
    pub protocols: Vec<String>,
    /// Application id.
    pub application: Option<String>,
    /// Module id.
    pub module: Option<String>,
    /// Provider id.
    pub provider: Option<String>,
    /// Monitor id.
    pub monitor: Option<String>,
    /// `local` or `remote`.
    pub scope: Option<String>,
    /// Exporter listener selection.
    pub listener: Option<String>,
    /// Extra URL parameters.
    pub parameters: BTreeMap<String, String>,
}

impl ServiceAnnotation {
    /// Creates an annotation with every attribute unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interface token.
    #[must_use]
    pub fn with_interface<I: ?Sized + RemoteInterface>(mut self) -> Self {
        self.interface_class = Some(InterfaceType::of::<I>());
        self
    }

    /// Sets the interface name.
    #[must_use]
    pub fn with_interface_name(mut self, name: impl Into<String>) -> Self {
        self.interface_name = name.into();
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

    /// Adds a registry id.
    #[must_use]
    pub fn with_registry(mut self, id: impl Into<String>) -> Self {
        self.registries.push(id.into());
        self
    }

    /// Adds a protocol id.
    #[must_use]
    pub fn with_protocol(mut self, id: impl Into<String>) -> Self {
        self.protocols.push(id.into());
        self
    }

    /// Sets the provider id.
    #[must_use]
    pub fn with_provider(mut self, id: impl Into<String>) -> Self {
        self.provider = Some(id.into());
        self
    }

    /// Sets the application id.
    #[must_use]
    pub fn with_application(mut self, id: impl Into<String>) -> Self {
        self.application = Some(id.into());
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

/// Marks a field or setter as a reference injection site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceAnnotation {
    /// Explicit interface token.
    pub interface_class: Option<InterfaceType>,
    /// Explicit interface name; takes precedence over `interface_class`.
    pub interface_name: String,
    /// Service version.
    pub version: String,
    /// Service group.
    pub group: String,
    /// Registry ids.
    pub registries: Vec<String>,
    /// Consumer id.
    pub consumer: Option<String>,
    /// Application id.
    pub application: Option<String>,
    /// Module id.
    pub module: Option<String>,
    /// Monitor id.
    pub monitor: Option<String>,
    /// Direct provider addresses, `;`-separated.
    pub url: Option<String>,
    /// Fail when no provider is available at refer time.
    pub check: Option<bool>,
    /// Invocation timeout in milliseconds.
    pub timeout: Option<u64>,
    /// `local` or `remote`.
    pub scope: Option<String>,
    /// Force or forbid in-process resolution.
    pub injvm: Option<bool>,
    /// Invoker listener selection.
    pub listener: Option<String>,
    /// Extra URL parameters.
    pub parameters: BTreeMap<String, String>,
}

impl ReferenceAnnotation {
    /// Creates an annotation with every attribute unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interface token.
    #[must_use]
    pub fn with_interface<I: ?Sized + RemoteInterface>(mut self) -> Self {
        self.interface_class = Some(InterfaceType::of::<I>());
        self
    }

    /// Sets the interface name.
    #[must_use]
    pub fn with_interface_name(mut self, name: impl Into<String>) -> Self {
        self.interface_name = name.into();
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

    /// Adds a registry id.
    #[must_use]
    pub fn with_registry(mut self, id: impl Into<String>) -> Self {
        self.registries.push(id.into());
        self
    }

    /// Sets the consumer id.
    #[must_use]
    pub fn with_consumer(mut self, id: impl Into<String>) -> Self {
        self.consumer = Some(id.into());
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

    /// Sets the invocation timeout in milliseconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Forces or forbids in-process resolution.
    #[must_use]
    pub fn with_injvm(mut self, injvm: bool) -> Self {
        self.injvm = Some(injvm);
        self
    }

    /// Returns the dedup key `group/interface:version` for `interface`.
    ///
    /// Empty parts are kept, so `"/com.acme.Greeter:"` is a distinct key
    /// from `"g/com.acme.Greeter:1"`.
    pub fn key(&self, interface: &str) -> String {
        format!("{}/{}:{}", self.group, interface, self.version)
    }
}
