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

//! Protocols and the decorator stack.
//!
//! A [`Protocol`] makes services reachable ([`Protocol::export`]) and produces
//! callers for remote services ([`Protocol::refer`]). Protocols compose by
//! explicit construction:
//!
//! ```text
//! ProtocolSelector ── scheme ──▶ ListenerProtocolDecorator ──▶ concrete protocol
//!                                 (injvm, registry, ...)
//! ```
//!
//! The [`ProtocolSelector`] picks a protocol by URL scheme. Every protocol it
//! holds is wrapped in a [`ListenerProtocolDecorator`], which attaches the
//! activated exporter and invoker listeners except on the registry layer. The
//! [`RegistryProtocol`] re-enters the selector with the concrete provider URL,
//! so listeners fire exactly once per endpoint.

mod cluster;
mod injvm;
mod listener;
mod registry;
mod selector;

pub use cluster::AvailableInvoker;
pub use injvm::InjvmProtocol;
pub use listener::{
    ExporterListener, InvokerListener, ListenerExporterWrapper, ListenerInvokerWrapper,
    ListenerProtocolDecorator,
};
pub use registry::{MEMORY_REGISTRY, MemoryRegistry, Registry, RegistryProtocol};
pub use selector::ProtocolSelector;

use crate::rpc::{Exporter, InterfaceType, Invoker, RpcError};
use crate::url::Url;
use std::sync::Arc;

/// Publishes services and refers remote ones.
///
/// `export` and `refer` may block while they contact a registry or a
/// transport; they are called from the wiring hooks, never from inside an
/// invocation.
pub trait Protocol: Send + Sync + 'static {
    /// Port used when a URL names none.
    fn default_port(&self) -> u16;

    /// Publishes `invoker` at its URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be made reachable.
    fn export(&self, invoker: Arc<dyn Invoker>) -> Result<Arc<dyn Exporter>, RpcError>;

    /// Returns an invoker that forwards calls of `interface` to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if no caller can be built for the URL.
    fn refer(&self, interface: InterfaceType, url: &Url) -> Result<Arc<dyn Invoker>, RpcError>;

    /// Releases every exporter and invoker this protocol still holds.
    fn destroy(&self);
}

impl std::fmt::Debug for dyn Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Protocol")
            .field("default_port", &self.default_port())
            .finish_non_exhaustive()
    }
}
