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


//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use rpcwire::RpcError;
use rpcwire::protocol::{ExporterListener, Protocol, ProtocolSelector};
use rpcwire::rpc::{Exporter, InterfaceType, Invocation, Invoker};
use rpcwire::url::Url;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Scheme the recording protocol is installed under.
pub const RECORDING_SCHEME: &str = "dubbo";

/// A protocol that records exports and refers instead of opening sockets.
#[derive(Default)]
pub struct RecordingProtocol {
    exports: Mutex<Vec<Url>>,
    refers: Mutex<Vec<Url>>,
    unexports: Arc<AtomicUsize>,
    failing_group: Mutex<Option<String>>,
    reply: Mutex<Option<Value>>,
}

impl RecordingProtocol {
    /// Creates the protocol and registers it in `selector` under `dubbo`.
    pub fn install(selector: &ProtocolSelector) -> Arc<Self> {
        let protocol = Arc::new(Self::default());
        selector.register(RECORDING_SCHEME, protocol.clone());
        protocol
    }

    /// Makes `unexport` fail for exporters whose URL carries `group`.
    pub fn fail_unexport_for(&self, group: &str) {
        *self.failing_group.lock() = Some(group.to_string());
    }

    /// Sets the value referred invokers answer every call with.
    pub fn reply_with(&self, value: Value) {
        *self.reply.lock() = Some(value);
    }

    /// Returns the exported URLs in export order.
    pub fn exports(&self) -> Vec<Url> {
        self.exports.lock().clone()
    }

    /// Returns the referred URLs in refer order.
    pub fn refers(&self) -> Vec<Url> {
        self.refers.lock().clone()
    }

    /// Returns the number of `unexport` calls seen.
    pub fn unexport_attempts(&self) -> usize {
        self.unexports.load(Ordering::SeqCst)
    }
}

impl Protocol for RecordingProtocol {
    fn default_port(&self) -> u16 {
        20880
    }

    fn export(&self, invoker: Arc<dyn Invoker>) -> Result<Arc<dyn Exporter>, RpcError> {
        let url = invoker.url().clone();
        let fails = match (self.failing_group.lock().as_deref(), url.parameter("group")) {
            (Some(failing), Some(group)) => failing == group,
            _ => false,
        };
        self.exports.lock().push(url);
        Ok(Arc::new(RecordingExporter {
            invoker,
            fails,
            attempts: self.unexports.clone(),
            unexported: AtomicBool::new(false),
        }))
    }

    fn refer(&self, interface: InterfaceType, url: &Url) -> Result<Arc<dyn Invoker>, RpcError> {
        self.refers.lock().push(url.clone());
        let reply = self.reply.lock().clone().unwrap_or(Value::Null);
        Ok(Arc::new(RecordingInvoker::new(interface, url.clone(), reply)))
    }

    fn destroy(&self) {}
}

/// Exporter handed out by [`RecordingProtocol`].
pub struct RecordingExporter {
    invoker: Arc<dyn Invoker>,
    fails: bool,
    attempts: Arc<AtomicUsize>,
    unexported: AtomicBool,
}

impl RecordingExporter {
    /// Returns `true` once `unexport` was called.
    pub fn is_unexported(&self) -> bool {
        self.unexported.load(Ordering::SeqCst)
    }
}

impl Exporter for RecordingExporter {
    fn invoker(&self) -> Arc<dyn Invoker> {
        self.invoker.clone()
    }

    fn unexport(&self) -> Result<(), RpcError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.unexported.store(true, Ordering::SeqCst);
        if self.fails {
            return Err(RpcError::application(format!(
                "refusing to unexport {}",
                self.invoker.url()
            )));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An invoker that records invocations and answers with a fixed value.
pub struct RecordingInvoker {
    interface: InterfaceType,
    url: Url,
    reply: Value,
    calls: Mutex<Vec<Invocation>>,
    destroyed: AtomicBool,
}

impl RecordingInvoker {
    /// Creates an invoker answering every call with `reply`.
    pub fn new(interface: InterfaceType, url: Url, reply: Value) -> Self {
        Self {
            interface,
            url,
            reply,
            calls: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Returns the invocations seen so far.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    /// Returns `true` once destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[rpcwire::async_trait]
impl Invoker for RecordingInvoker {
    fn interface(&self) -> InterfaceType {
        self.interface
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn is_available(&self) -> bool {
        !self.destroyed.load(Ordering::SeqCst)
    }

    async fn invoke(&self, invocation: Invocation) -> Result<Value, RpcError> {
        self.calls.lock().push(invocation);
        Ok(self.reply.clone())
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An exporter listener counting its notifications.
#[derive(Default)]
pub struct CountingListener {
    exported: Mutex<Vec<String>>,
    unexported: AtomicUsize,
}

impl CountingListener {
    /// Returns the protocols of the exporters seen, in notification order.
    pub fn exported_protocols(&self) -> Vec<String> {
        self.exported.lock().clone()
    }

    /// Returns the number of `unexported` notifications.
    pub fn unexported(&self) -> usize {
        self.unexported.load(Ordering::SeqCst)
    }
}

impl ExporterListener for CountingListener {
    fn exported(&self, exporter: &Arc<dyn Exporter>) -> Result<(), RpcError> {
        let protocol = exporter.invoker().url().protocol().to_string();
        self.exported.lock().push(protocol);
        Ok(())
    }

    fn unexported(&self, _exporter: &Arc<dyn Exporter>) -> Result<(), RpcError> {
        self.unexported.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
