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

//! Endpoint configuration model.
//!
//! Collaborator configurations ([`ApplicationConfig`], [`ModuleConfig`],
//! [`RegistryConfig`], [`MonitorConfig`], [`ProtocolConfig`],
//! [`ProviderConfig`], [`ConsumerConfig`]) are shared through `Arc` and are
//! usually looked up in the container by id. A [`ServiceConfig`] or
//! [`ReferenceConfig`] combines them with an interface identity.
//!
//! `finalise` fills unset values by inheritance and validates names:
//!
//! - `group` and `version` inherit from the provider (consumer);
//! - application, module, registries and monitor inherit from the provider
//!   (consumer), then from the module, then from the application;
//! - services without protocols inherit the provider's, else a default
//!   `dubbo` protocol.
//!
//! After `finalise` the configuration is only read.

mod basic;
mod processor;
mod reference;
mod service;

pub use basic::{
    ApplicationConfig, ConsumerConfig, ModuleConfig, MonitorConfig, ProtocolConfig,
    ProviderConfig, RegistryConfig,
};
pub use processor::ProcessorConfig;
pub use reference::ReferenceConfig;
pub use service::ServiceConfig;

use crate::WiringError;
use crate::rpc::InterfaceType;
use crate::url::{Url, keys};
use std::fmt;

/// The remote interface of an endpoint: a type token or a textual name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceIdentity {
    /// A remote interface known to the program.
    Type(InterfaceType),
    /// A textual interface name.
    Name(String),
}

impl InterfaceIdentity {
    /// Returns the interface name.
    pub fn name(&self) -> &str {
        match self {
            Self::Type(interface) => interface.name(),
            Self::Name(name) => name,
        }
    }

    /// Returns the interface token, resolving a name against the interfaces
    /// declared in the program.
    pub fn resolve(&self) -> Option<InterfaceType> {
        match self {
            Self::Type(interface) => Some(*interface),
            Self::Name(name) => InterfaceType::by_name(name),
        }
    }
}

impl From<InterfaceType> for InterfaceIdentity {
    fn from(interface: InterfaceType) -> Self {
        Self::Type(interface)
    }
}

impl fmt::Display for InterfaceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_')
}

/// Validates a single name: `[-._0-9a-zA-Z]*`.
pub(crate) fn check_name(property: &'static str, value: &str) -> Result<(), WiringError> {
    if value.chars().all(is_name_char) {
        Ok(())
    } else {
        Err(WiringError::InvalidConfiguration {
            property,
            value: value.to_string(),
            reason: "only letters, digits, '-', '.' and '_' are allowed".to_string(),
        })
    }
}

/// Validates a comma-separated list of names.
pub(crate) fn check_multi_name(property: &'static str, value: &str) -> Result<(), WiringError> {
    if value.chars().all(|c| is_name_char(c) || c == ',') {
        Ok(())
    } else {
        Err(WiringError::InvalidConfiguration {
            property,
            value: value.to_string(),
            reason: "only comma-separated letters, digits, '-', '.' and '_' are allowed"
                .to_string(),
        })
    }
}

/// Adds the parameters shared by provider and consumer URLs.
pub(crate) fn with_identity(
    url: Url,
    interface: &InterfaceIdentity,
    group: &str,
    version: &str,
    side: &str,
) -> Url {
    let methods = interface
        .resolve()
        .map(|interface| interface.method_names().join(","))
        .unwrap_or_default();
    url.with_parameter(keys::INTERFACE, interface.name())
        .with_parameter(keys::METHODS, methods)
        .with_parameter(keys::GROUP, group)
        .with_parameter(keys::VERSION, version)
        .with_parameter(keys::SIDE, side)
}
