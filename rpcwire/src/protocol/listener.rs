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

//! Exporter and invoker lifecycle listeners.

use crate::extension::ExtensionLoader;
use crate::protocol::Protocol;
use crate::rpc::{Exporter, InterfaceType, Invocation, Invoker, RpcError};
use crate::url::{REGISTRY_SCHEME, Url, keys};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Observes services being exported and unexported.
///
/// Both callbacks default to no-ops so a listener only implements the events
/// it cares about.
pub trait ExporterListener: Send + Sync + 'static {
    /// Called after `exporter` was published.
    ///
    /// # Errors
    ///
    /// A failure aborts the export: the exporter is withdrawn again and the
    /// first listener error is returned.
    fn exported(&self, _exporter: &Arc<dyn Exporter>) -> Result<(), RpcError> {
        Ok(())
    }

    /// Called after `exporter` was withdrawn.
    ///
    /// # Errors
    ///
    /// The first listener error is returned from
    /// [`Exporter::unexport`]; the remaining listeners are still notified.
    fn unexported(&self, _exporter: &Arc<dyn Exporter>) -> Result<(), RpcError> {
        Ok(())
    }
}

/// Observes invokers being referred and destroyed.
pub trait InvokerListener: Send + Sync + 'static {
    /// Called after `invoker` was referred.
    ///
    /// # Errors
    ///
    /// A failure aborts the refer: the invoker is destroyed again and the
    /// first listener error is returned.
    fn referred(&self, _invoker: &Arc<dyn Invoker>) -> Result<(), RpcError> {
        Ok(())
    }

    /// Called after `invoker` was destroyed. Failures are logged.
    fn destroyed(&self, _invoker: &Arc<dyn Invoker>) -> Result<(), RpcError> {
        Ok(())
    }
}

/// Notifies every listener, returning the first failure.
fn notify_all<L: ?Sized>(
    listeners: &[Arc<L>],
    mut notify: impl FnMut(&L) -> Result<(), RpcError>,
) -> Result<(), RpcError> {
    let mut first_error = None;
    for listener in listeners {
        if let Err(e) = notify(listener.as_ref()) {
            warn!(error = %e, "listener failed");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// An exporter that notifies listeners about its lifecycle.
///
/// The listener list is fixed at construction.
pub struct ListenerExporterWrapper {
    exporter: Arc<dyn Exporter>,
    listeners: Arc<[Arc<dyn ExporterListener>]>,
    unexported: AtomicBool,
}

impl ListenerExporterWrapper {
    /// Wraps `exporter` and notifies `exported` on every listener.
    ///
    /// # Errors
    ///
    /// If any listener fails, the inner exporter is unexported and the first
    /// listener error is returned.
    pub fn new(
        exporter: Arc<dyn Exporter>,
        listeners: Vec<Arc<dyn ExporterListener>>,
    ) -> Result<Self, RpcError> {
        let listeners: Arc<[Arc<dyn ExporterListener>]> = listeners.into();
        if let Err(e) = notify_all(&listeners, |listener| listener.exported(&exporter)) {
            if let Err(unexport_error) = exporter.unexport() {
                warn!(error = %unexport_error, "failed to withdraw exporter after listener failure");
            }
            return Err(e);
        }
        Ok(Self {
            exporter,
            listeners,
            unexported: AtomicBool::new(false),
        })
    }

    /// Returns the wrapped exporter.
    pub fn inner(&self) -> &Arc<dyn Exporter> {
        &self.exporter
    }

    /// Returns the listeners in notification order.
    pub fn listeners(&self) -> &[Arc<dyn ExporterListener>] {
        &self.listeners
    }
}

impl Exporter for ListenerExporterWrapper {
    fn invoker(&self) -> Arc<dyn Invoker> {
        self.exporter.invoker()
    }

    fn unexport(&self) -> Result<(), RpcError> {
        if self.unexported.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let result = self.exporter.unexport();
        let notified = notify_all(&self.listeners, |listener| {
            listener.unexported(&self.exporter)
        });
        result.and(notified)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An invoker that notifies listeners about its lifecycle.
pub struct ListenerInvokerWrapper {
    invoker: Arc<dyn Invoker>,
    listeners: Arc<[Arc<dyn InvokerListener>]>,
    destroyed: AtomicBool,
}

impl ListenerInvokerWrapper {
    /// Wraps `invoker` and notifies `referred` on every listener.
    ///
    /// # Errors
    ///
    /// If any listener fails, the inner invoker is destroyed and the first
    /// listener error is returned.
    pub fn new(
        invoker: Arc<dyn Invoker>,
        listeners: Vec<Arc<dyn InvokerListener>>,
    ) -> Result<Self, RpcError> {
        let listeners: Arc<[Arc<dyn InvokerListener>]> = listeners.into();
        if let Err(e) = notify_all(&listeners, |listener| listener.referred(&invoker)) {
            invoker.destroy();
            return Err(e);
        }
        Ok(Self {
            invoker,
            listeners,
            destroyed: AtomicBool::new(false),
        })
    }

    /// Returns the wrapped invoker.
    pub fn inner(&self) -> &Arc<dyn Invoker> {
        &self.invoker
    }

    /// Returns the listeners in notification order.
    pub fn listeners(&self) -> &[Arc<dyn InvokerListener>] {
        &self.listeners
    }
}

#[async_trait::async_trait]
impl Invoker for ListenerInvokerWrapper {
    fn interface(&self) -> InterfaceType {
        self.invoker.interface()
    }

    fn url(&self) -> &Url {
        self.invoker.url()
    }

    fn is_available(&self) -> bool {
        self.invoker.is_available()
    }

    async fn invoke(&self, invocation: Invocation) -> Result<Value, RpcError> {
        self.invoker.invoke(invocation).await
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.invoker.destroy();
        // destroyed() failures are only logged by notify_all
        let _ = notify_all(&self.listeners, |listener| {
            listener.destroyed(&self.invoker)
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Attaches activated listeners to every exporter and invoker of the inner
/// protocol.
///
/// URLs with the registry scheme pass through unchanged: the registry
/// protocol re-enters the stack with the concrete endpoint URL, where the
/// listeners fire.
///
/// # Examples
///
/// ```rust
/// use rpcwire::extension::ExtensionLoader;
/// use rpcwire::protocol::{InjvmProtocol, ListenerProtocolDecorator, Protocol};
/// use std::sync::Arc;
///
/// let decorated = ListenerProtocolDecorator::new(
///     Arc::new(InjvmProtocol::new()),
///     Arc::new(ExtensionLoader::new("exporter.listener")),
///     Arc::new(ExtensionLoader::new("invoker.listener")),
/// );
/// assert_eq!(decorated.default_port(), 0);
/// ```
pub struct ListenerProtocolDecorator {
    inner: Arc<dyn Protocol>,
    exporter_listeners: Arc<ExtensionLoader<dyn ExporterListener>>,
    invoker_listeners: Arc<ExtensionLoader<dyn InvokerListener>>,
}

impl ListenerProtocolDecorator {
    /// Decorates `inner`, drawing listeners from the two loaders.
    pub fn new(
        inner: Arc<dyn Protocol>,
        exporter_listeners: Arc<ExtensionLoader<dyn ExporterListener>>,
        invoker_listeners: Arc<ExtensionLoader<dyn InvokerListener>>,
    ) -> Self {
        Self {
            inner,
            exporter_listeners,
            invoker_listeners,
        }
    }

    /// Returns the decorated protocol.
    pub fn inner(&self) -> &Arc<dyn Protocol> {
        &self.inner
    }
}

impl Protocol for ListenerProtocolDecorator {
    fn default_port(&self) -> u16 {
        self.inner.default_port()
    }

    fn export(&self, invoker: Arc<dyn Invoker>) -> Result<Arc<dyn Exporter>, RpcError> {
        if invoker.url().protocol() == REGISTRY_SCHEME {
            return self.inner.export(invoker);
        }
        let url = invoker.url().clone();
        let exporter = self.inner.export(invoker)?;
        let listeners =
            match self
                .exporter_listeners
                .activate_extensions(&url, keys::EXPORTER_LISTENER, None)
            {
                Ok(listeners) => listeners,
                Err(e) => {
                    if let Err(unexport_error) = exporter.unexport() {
                        warn!(error = %unexport_error, "failed to withdraw exporter");
                    }
                    return Err(e);
                }
            };
        debug!(url = %url, listeners = listeners.len(), "attaching exporter listeners");
        Ok(Arc::new(ListenerExporterWrapper::new(exporter, listeners)?))
    }

    fn refer(&self, interface: InterfaceType, url: &Url) -> Result<Arc<dyn Invoker>, RpcError> {
        if url.protocol() == REGISTRY_SCHEME {
            return self.inner.refer(interface, url);
        }
        let invoker = self.inner.refer(interface, url)?;
        let listeners =
            match self
                .invoker_listeners
                .activate_extensions(url, keys::INVOKER_LISTENER, None)
            {
                Ok(listeners) => listeners,
                Err(e) => {
                    invoker.destroy();
                    return Err(e);
                }
            };
        debug!(url = %url, listeners = listeners.len(), "attaching invoker listeners");
        Ok(Arc::new(ListenerInvokerWrapper::new(invoker, listeners)?))
    }

    fn destroy(&self) {
        self.inner.destroy();
    }
}
