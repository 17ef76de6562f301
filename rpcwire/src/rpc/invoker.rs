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

//! Invoker and exporter abstractions.

use crate::rpc::{InterfaceType, Invocation, RpcError};
use crate::url::Url;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// Executes invocations against a local service or a remote endpoint.
///
/// Invokers are the unit every protocol deals in: a provider-side invoker
/// wraps a service object and is handed to [`Protocol::export`], a
/// consumer-side invoker is returned by [`Protocol::refer`] and wrapped into a
/// client stub by the [`ProxyFactory`].
///
/// [`Protocol::export`]: crate::protocol::Protocol::export
/// [`Protocol::refer`]: crate::protocol::Protocol::refer
/// [`ProxyFactory`]: crate::proxy::ProxyFactory
///
/// # Examples
///
/// ```rust
/// use rpcwire::rpc::{Invoker, InterfaceType, Invocation, RpcError};
/// use rpcwire::url::Url;
/// use serde_json::{Value, json};
/// use std::any::Any;
///
/// #[rpcwire::interface]
/// pub trait Clock {
///     async fn now(&self) -> Result<u64, RpcError>;
/// }
///
/// struct FixedClock {
///     url: Url,
/// }
///
/// #[rpcwire::async_trait]
/// impl Invoker for FixedClock {
///     fn interface(&self) -> InterfaceType {
///         InterfaceType::of::<dyn Clock>()
///     }
///
///     fn url(&self) -> &Url {
///         &self.url
///     }
///
///     async fn invoke(&self, _invocation: Invocation) -> Result<Value, RpcError> {
///         Ok(json!(42))
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Invoker: Send + Sync + 'static {
    /// Returns the interface this invoker serves.
    fn interface(&self) -> InterfaceType;

    /// Returns the endpoint URL.
    fn url(&self) -> &Url;

    /// Returns `true` while the invoker can accept calls.
    fn is_available(&self) -> bool {
        true
    }

    /// Executes one call.
    async fn invoke(&self, invocation: Invocation) -> Result<Value, RpcError>;

    /// Releases the invoker. Repeated calls are no-ops.
    fn destroy(&self) {}

    /// Returns `self` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Handle to a published service.
pub trait Exporter: Send + Sync + 'static {
    /// Returns the invoker this exporter publishes.
    fn invoker(&self) -> Arc<dyn Invoker>;

    /// Withdraws the service. Repeated calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns an error if the protocol or a listener failed while releasing.
    /// The exporter is considered unexported regardless.
    fn unexport(&self) -> Result<(), RpcError>;

    /// Returns `self` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl std::fmt::Debug for dyn Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("interface", &self.interface())
            .field("url", &self.url().to_string())
            .finish()
    }
}

impl std::fmt::Debug for dyn Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("url", &self.invoker().url().to_string())
            .finish()
    }
}
