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

//! Invocation and protocol layer error types.
//!
//! [`RpcError`] is the lowest layer of the error hierarchy. It is raised by
//! protocols, invokers, exporters, listeners and generated stubs, and it is the
//! error type remote interface methods return. The wiring layer wraps it into
//! [`WiringError`](crate::WiringError) together with the endpoint it failed for.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while exporting, referring or invoking a service.
///
/// # Examples
///
/// ```rust
/// use rpcwire::RpcError;
///
/// let error = RpcError::NoProvider {
///     service_key: "g/com.acme.Greeter:1".to_string(),
/// };
/// assert!(error.is_recoverable());
/// assert!(!RpcError::application("boom").is_recoverable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RpcError {
    /// No exported service matches the requested service key.
    #[error("no provider available for service {service_key}")]
    NoProvider {
        /// The service key that was looked up
        service_key: String,
    },

    /// The target interface has no method with the requested name and
    /// parameter types.
    #[error("no method {method} on interface {interface}")]
    MethodNotFound {
        /// The interface name
        interface: String,
        /// The method name
        method: String,
    },

    /// Arguments or results could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the codec failure
        message: String,
    },

    /// The service implementation reported a failure.
    #[error("{message}")]
    Application {
        /// The failure reported by the service
        message: String,
    },

    /// No protocol is registered for the URL scheme.
    #[error("no protocol registered for scheme '{scheme}'")]
    ProtocolNotFound {
        /// The URL scheme
        scheme: String,
    },

    /// An extension was requested by name but never registered.
    #[error("no {kind} extension named '{name}'")]
    ExtensionNotFound {
        /// The extension kind (for example `exporter.listener`)
        kind: String,
        /// The requested name
        name: String,
    },

    /// The invoker or exporter was already released.
    #[error("{url} has been destroyed")]
    Destroyed {
        /// URL of the released endpoint
        url: String,
    },

    /// A listener rejected an exporter or invoker notification.
    #[error("listener failed: {message}")]
    Listener {
        /// Description of the listener failure
        message: String,
    },

    /// A URL could not be parsed or lacks a required part.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl {
        /// The offending text
        url: String,
        /// Why it was rejected
        reason: String,
    },
}

impl RpcError {
    /// Creates an application error.
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Returns `true` if the call may succeed when retried later.
    ///
    /// Only a missing provider is transient: providers come and go. All other
    /// errors are deterministic for the same input.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoProvider { .. })
    }

    /// Returns `true` if this error was raised by the service implementation.
    #[must_use]
    pub fn is_application_error(&self) -> bool {
        matches!(self, Self::Application { .. })
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(error: serde_json::Error) -> Self {
        Self::codec(error.to_string())
    }
}
