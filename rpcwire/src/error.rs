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

//! Top-level error type for service wiring.
//!
//! Errors come in two layers:
//!
//! 1. **Protocol layer**: failures raised while exporting, referring or
//!    invoking ([`RpcError`]).
//! 2. **Wiring layer**: failures of an endpoint or of an injection site
//!    ([`WiringError`]), optionally carrying the protocol error that caused
//!    them.
//!
//! # Error Handling Strategy
//!
//! - **Fatal endpoint errors** (missing interface, failed named lookup, failed
//!   export or refer, invalid configuration) are returned to the caller of the
//!   hook that built the endpoint.
//! - **Injection errors** are logged by the wiring processor and the site is
//!   skipped; the object is still handed back to the container.
//! - **Destroyed endpoints** report access after shutdown and are not fatal.
//!
//! # Examples
//!
//! ```rust
//! use rpcwire::{RpcError, WiringError};
//!
//! let error = WiringError::ExportFailed {
//!     interface: "com.acme.Greeter".to_string(),
//!     source: RpcError::ProtocolNotFound { scheme: "grpc".to_string() },
//! };
//! assert!(error.is_fatal());
//! assert!(error.rpc_error().is_some());
//! ```

use crate::rpc::RpcError;
use std::error::Error as StdError;
use std::fmt;

/// Errors raised by the wiring processor and by endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WiringError {
    /// The remote interface of an endpoint could not be determined.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rpcwire::WiringError;
    ///
    /// let error = WiringError::MissingInterface {
    ///     target: "com.acme.Greeter".to_string(),
    /// };
    /// assert!(error.is_fatal());
    /// ```
    MissingInterface {
        /// Class or injection site whose interface was looked for
        target: String,
    },

    /// A collaborator id named by an annotation did not resolve against the
    /// container.
    NamedLookupFailed {
        /// The id that was looked up
        name: String,
        /// The configuration kind that was expected under the id
        expected: &'static str,
    },

    /// The protocol stack failed to export a service.
    ExportFailed {
        /// Interface of the service
        interface: String,
        /// The protocol error
        source: RpcError,
    },

    /// The protocol stack failed to refer a remote service.
    ReferFailed {
        /// Interface of the reference
        interface: String,
        /// The protocol error
        source: RpcError,
    },

    /// An endpoint was used after it had been destroyed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rpcwire::WiringError;
    ///
    /// let error = WiringError::EndpointDestroyed {
    ///     key: "g/com.acme.Greeter:1".to_string(),
    /// };
    /// assert!(!error.is_fatal());
    /// ```
    EndpointDestroyed {
        /// Key or interface of the endpoint
        key: String,
    },

    /// A single injection site could not be wired.
    InjectionFailed {
        /// Class that declares the site
        class: String,
        /// Field or setter name
        member: String,
        /// Why the site failed
        reason: Box<WiringError>,
    },

    /// A configuration value is malformed.
    InvalidConfiguration {
        /// Name of the offending property
        property: &'static str,
        /// The rejected value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

impl WiringError {
    /// Returns `true` if the error is fatal for the affected endpoint.
    ///
    /// Fatal errors abort the export or reference being built. Injection
    /// failures and access to destroyed endpoints are not fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::EndpointDestroyed { .. } | Self::InjectionFailed { .. }
        )
    }

    /// Returns `true` if this is a per-site injection failure.
    #[must_use]
    pub const fn is_injection_error(&self) -> bool {
        matches!(self, Self::InjectionFailed { .. })
    }

    /// Returns the protocol error behind an export or refer failure.
    pub fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            Self::ExportFailed { source, .. } | Self::ReferFailed { source, .. } => Some(source),
            Self::InjectionFailed { reason, .. } => reason.rpc_error(),
            _ => None,
        }
    }

    /// Wraps `self` as the failure of an injection site.
    #[must_use]
    pub fn at_site(self, class: impl Into<String>, member: impl Into<String>) -> Self {
        Self::InjectionFailed {
            class: class.into(),
            member: member.into(),
            reason: Box::new(self),
        }
    }
}

impl fmt::Display for WiringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInterface { target } => {
                write!(f, "cannot determine the remote interface of {}", target)
            }
            Self::NamedLookupFailed { name, expected } => {
                write!(f, "no {} named '{}' in the container", expected, name)
            }
            Self::ExportFailed { interface, source } => {
                write!(f, "failed to export {}: {}", interface, source)
            }
            Self::ReferFailed { interface, source } => {
                write!(f, "failed to refer {}: {}", interface, source)
            }
            Self::EndpointDestroyed { key } => {
                write!(f, "reference {} has already been destroyed", key)
            }
            Self::InjectionFailed {
                class,
                member,
                reason,
            } => write!(f, "failed to inject {}.{}: {}", class, member, reason),
            Self::InvalidConfiguration {
                property,
                value,
                reason,
            } => write!(f, "invalid {} '{}': {}", property, value, reason),
        }
    }
}

impl StdError for WiringError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::ExportFailed { source, .. } | Self::ReferFailed { source, .. } => Some(source),
            Self::InjectionFailed { reason, .. } => Some(reason.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export_failed() -> WiringError {
        WiringError::ExportFailed {
            interface: "Greeter".to_string(),
            source: RpcError::ProtocolNotFound {
                scheme: "grpc".to_string(),
            },
        }
    }

    #[test]
    fn test_is_fatal() {
        assert!(export_failed().is_fatal());
        assert!(
            WiringError::MissingInterface {
                target: "Svc".to_string()
            }
            .is_fatal()
        );
        assert!(
            !WiringError::EndpointDestroyed {
                key: "/Greeter:".to_string()
            }
            .is_fatal()
        );
        assert!(!export_failed().at_site("Consumer", "greeter").is_fatal());
    }

    #[test]
    fn test_injection_error_keeps_cause() {
        let error = export_failed().at_site("Consumer", "greeter");
        assert!(error.is_injection_error());
        assert_eq!(
            error.rpc_error(),
            Some(&RpcError::ProtocolNotFound {
                scheme: "grpc".to_string()
            })
        );
        assert!(error.source().is_some());
    }

    #[test]
    fn test_display() {
        let error = WiringError::NamedLookupFailed {
            name: "zk".to_string(),
            expected: "registry",
        };
        assert_eq!(error.to_string(), "no registry named 'zk' in the container");

        let error = export_failed().at_site("Consumer", "greeter");
        assert_eq!(
            error.to_string(),
            "failed to inject Consumer.greeter: failed to export Greeter: \
             no protocol registered for scheme 'grpc'"
        );
    }

    #[test]
    fn test_source() {
        assert!(export_failed().source().is_some());
        let error = WiringError::InvalidConfiguration {
            property: "version",
            value: "1 0".to_string(),
            reason: "contains illegal characters".to_string(),
        };
        assert!(error.source().is_none());
    }
}
