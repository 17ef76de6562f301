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

//! Endpoint URLs.
//!
//! Every exported service and every remote reference is described by a URL of
//! the form `scheme://[user[:password]@]host[:port]/path?key=value&...`. The
//! scheme selects the protocol, the path carries the interface name and the
//! query parameters carry the rest of the endpoint configuration.
//!
//! Parameters are kept in a sorted map so the textual form of a URL is
//! canonical: two URLs built from the same configuration render identically.
//!
//! # Examples
//!
//! ```rust
//! use rpcwire::url::Url;
//!
//! let url = Url::parse("dubbo://10.0.0.1:20880/com.acme.Greeter?group=blue&version=1.0").unwrap();
//! assert_eq!(url.protocol(), "dubbo");
//! assert_eq!(url.port(), 20880);
//! assert_eq!(url.service_key(), "blue/com.acme.Greeter:1.0");
//! ```

use crate::rpc::RpcError;
use std::collections::BTreeMap;
use std::fmt;
use ::url::form_urlencoded;

/// Scheme of the meta-protocol that publishes endpoints to a service registry.
pub const REGISTRY_SCHEME: &str = "registry";

/// Scheme of the in-process protocol.
pub const INJVM_SCHEME: &str = "injvm";

/// Protocol used when a service names none.
pub const DEFAULT_PROTOCOL: &str = "dubbo";

/// Host used when a protocol configuration names none.
pub const LOCALHOST: &str = "127.0.0.1";

/// Registry address value that disables the registry.
pub const NO_AVAILABLE: &str = "N/A";

/// Path used for registry URLs.
pub const REGISTRY_SERVICE_PATH: &str = "RegistryService";

/// Well-known URL parameter keys.
pub mod keys {
    /// Interface name of the endpoint.
    pub const INTERFACE: &str = "interface";
    /// Additional interfaces a client stub should implement.
    pub const INTERFACES: &str = "interfaces";
    /// Service group.
    pub const GROUP: &str = "group";
    /// Service version.
    pub const VERSION: &str = "version";
    /// `provider` or `consumer`.
    pub const SIDE: &str = "side";
    /// Comma-separated method names.
    pub const METHODS: &str = "methods";
    /// Owning application.
    pub const APPLICATION: &str = "application";
    /// Owning module.
    pub const MODULE: &str = "module";
    /// Encoded provider URL carried by a registry URL.
    pub const EXPORT: &str = "export";
    /// Encoded consumer URL carried by a registry URL.
    pub const REFER: &str = "refer";
    /// Encoded monitor URL.
    pub const MONITOR: &str = "monitor";
    /// Registry implementation type carried by a registry URL.
    pub const REGISTRY: &str = "registry";
    /// `local` or `remote`.
    pub const SCOPE: &str = "scope";
    /// Force in-process references.
    pub const INJVM: &str = "injvm";
    /// Exporter listener selection.
    pub const EXPORTER_LISTENER: &str = "exporter.listener";
    /// Invoker listener selection.
    pub const INVOKER_LISTENER: &str = "invoker.listener";
    /// Fail a reference when no provider is available.
    pub const CHECK: &str = "check";
    /// Invocation timeout in milliseconds.
    pub const TIMEOUT: &str = "timeout";
}

/// Value of the `side` parameter for exported services.
pub const PROVIDER_SIDE: &str = "provider";

/// Value of the `side` parameter for references.
pub const CONSUMER_SIDE: &str = "consumer";

/// Value of the `scope` parameter restricting an endpoint to the process.
pub const SCOPE_LOCAL: &str = "local";

/// Value of the `scope` parameter restricting an endpoint to remote protocols.
pub const SCOPE_REMOTE: &str = "remote";

/// An endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Url {
    protocol: String,
    username: Option<String>,
    password: Option<String>,
    host: String,
    port: u16,
    path: String,
    parameters: BTreeMap<String, String>,
}

impl Url {
    /// Creates a URL without parameters.
    pub fn new(
        protocol: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            username: None,
            password: None,
            host: host.into(),
            port,
            path: path.into().trim_start_matches('/').to_string(),
            parameters: BTreeMap::new(),
        }
    }

    /// Parses a URL from its textual form.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::InvalidUrl`] if the text is not an absolute URL with
    /// a scheme and an authority.
    pub fn parse(text: &str) -> Result<Self, RpcError> {
        let parsed = ::url::Url::parse(text).map_err(|e| RpcError::InvalidUrl {
            url: text.to_string(),
            reason: e.to_string(),
        })?;
        let host = parsed.host_str().ok_or_else(|| RpcError::InvalidUrl {
            url: text.to_string(),
            reason: "missing host".to_string(),
        })?;

        let username = Some(parsed.username())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let parameters = parsed
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        Ok(Self {
            protocol: parsed.scheme().to_string(),
            username,
            password: parsed.password().map(str::to_string),
            host: host.to_string(),
            port: parsed.port().unwrap_or(0),
            path: parsed.path().trim_start_matches('/').to_string(),
            parameters,
        })
    }

    /// Returns the scheme.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Returns the host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port, `0` when the URL carries none.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the path without its leading slash.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the username, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the password, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns `host:port`, or only the host when the port is unset.
    pub fn address(&self) -> String {
        if self.port == 0 {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Returns all parameters.
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Returns a parameter value, treating empty values as absent.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Returns a parameter value or `default`.
    pub fn parameter_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.parameter(key).unwrap_or(default)
    }

    /// Returns a boolean parameter, `default` when absent or unparsable.
    pub fn bool_parameter(&self, key: &str, default: bool) -> bool {
        self.parameter(key)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    /// Returns a parameter that was stored with [`Url::with_parameter_encoded`].
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::InvalidUrl`] if the decoded value is not a URL.
    pub fn parameter_url(&self, key: &str) -> Result<Option<Url>, RpcError> {
        self.parameter(key).map(Url::parse).transpose()
    }

    /// Returns a copy with the parameter set. Empty values are skipped.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.parameters.insert(key.into(), value);
        }
        self
    }

    /// Returns a copy carrying `url` as a nested parameter.
    ///
    /// The nested URL is stored in its textual form; percent-encoding is applied
    /// when the outer URL is rendered.
    #[must_use]
    pub fn with_parameter_encoded(self, key: impl Into<String>, url: &Url) -> Self {
        self.with_parameter(key, url.to_string())
    }

    /// Returns a copy with every parameter of `parameters` added.
    #[must_use]
    pub fn with_parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in parameters {
            self = self.with_parameter(key, value);
        }
        self
    }

    /// Returns a copy without the parameter.
    #[must_use]
    pub fn without_parameter(mut self, key: &str) -> Self {
        self.parameters.remove(key);
        self
    }

    /// Returns a copy with a different scheme.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Returns a copy with a different host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Returns a copy with a different port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Returns a copy with a different path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into().trim_start_matches('/').to_string();
        self
    }

    /// Returns a copy with credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username.filter(|name| !name.is_empty());
        self.password = password.filter(|pass| !pass.is_empty());
        self
    }

    /// Returns the interface name: the `interface` parameter, else the path.
    pub fn service_interface(&self) -> &str {
        self.parameter(keys::INTERFACE).unwrap_or(&self.path)
    }

    /// Returns the service key `group/path:version`, omitting empty parts.
    ///
    /// The in-process protocol and the registry match providers to consumers
    /// on this key.
    pub fn service_key(&self) -> String {
        service_key(
            self.parameter(keys::GROUP).unwrap_or_default(),
            self.service_interface(),
            self.parameter(keys::VERSION).unwrap_or_default(),
        )
    }
}

/// Builds a service key `group/interface:version`, omitting empty parts.
pub fn service_key(group: &str, interface: &str, version: &str) -> String {
    let mut key = String::with_capacity(group.len() + interface.len() + version.len() + 2);
    if !group.is_empty() {
        key.push_str(group);
        key.push('/');
    }
    key.push_str(interface);
    if !version.is_empty() {
        key.push(':');
        key.push_str(version);
    }
    key
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.protocol)?;
        if let Some(username) = &self.username {
            write!(f, "{}", username)?;
            if let Some(password) = &self.password {
                write!(f, ":{}", password)?;
            }
            write!(f, "@")?;
        }
        write!(f, "{}", self.address())?;
        if !self.path.is_empty() {
            write!(f, "/{}", self.path)?;
        }
        if !self.parameters.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.parameters.iter())
                .finish();
            write!(f, "?{}", query)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Url {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
