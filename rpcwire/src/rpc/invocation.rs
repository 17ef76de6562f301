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

//! A single method call travelling through the invoker chain.

use crate::rpc::RpcError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A method call: name, parameter type tokens, argument values and
/// out-of-band attachments.
///
/// Arguments are carried as JSON values so an invocation can be handed to any
/// transport without knowing the interface it belongs to.
///
/// # Examples
///
/// ```rust
/// use rpcwire::rpc::Invocation;
/// use serde_json::json;
///
/// let invocation = Invocation::new("add", &["i32", "i32"], vec![json!(2), json!(3)])
///     .with_attachment("trace-id", "abc");
/// assert_eq!(invocation.method_name(), "add");
/// assert_eq!(invocation.parameter_types(), ["i32", "i32"]);
/// assert_eq!(invocation.attachment("trace-id"), Some("abc"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    method_name: String,
    parameter_types: Vec<String>,
    arguments: Vec<Value>,
    #[serde(default)]
    attachments: BTreeMap<String, String>,
}

impl Invocation {
    /// Creates an invocation.
    pub fn new(method_name: impl Into<String>, parameter_types: &[&str], arguments: Vec<Value>) -> Self {
        Self {
            method_name: method_name.into(),
            parameter_types: parameter_types.iter().map(|ty| ty.to_string()).collect(),
            arguments,
            attachments: BTreeMap::new(),
        }
    }

    /// Returns a copy carrying an attachment.
    #[must_use]
    pub fn with_attachment(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attachments.insert(key.into(), value.into());
        self
    }

    /// Sets an attachment in place.
    pub fn set_attachment(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attachments.insert(key.into(), value.into());
    }

    /// Returns the method name.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Returns the parameter type tokens.
    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }

    /// Returns the argument values.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Returns an attachment.
    pub fn attachment(&self, key: &str) -> Option<&str> {
        self.attachments.get(key).map(String::as_str)
    }

    /// Returns all attachments.
    pub fn attachments(&self) -> &BTreeMap<String, String> {
        &self.attachments
    }

    /// Splits the invocation into method name and arguments.
    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.method_name, self.arguments)
    }
}

/// Encodes an argument or a result.
///
/// # Errors
///
/// Returns [`RpcError::Codec`] if the value cannot be represented as JSON.
pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::codec(e.to_string()))
}

/// Decodes the argument at `index` of `method`.
///
/// A missing argument decodes from `null`, so trailing `Option` parameters may
/// be omitted by older callers.
///
/// # Errors
///
/// Returns [`RpcError::Codec`] naming the method and position on failure.
pub fn decode_argument<T: DeserializeOwned>(
    value: Option<Value>,
    method: &str,
    index: usize,
) -> Result<T, RpcError> {
    serde_json::from_value(value.unwrap_or(Value::Null)).map_err(|e| {
        RpcError::codec(format!("argument {} of {}: {}", index, method, e))
    })
}

/// Decodes an invocation result.
///
/// Unit results are encoded as `null`, so `()` decodes from an empty reply.
///
/// # Errors
///
/// Returns [`RpcError::Codec`] if the value does not match `T`.
pub fn decode_result<T: DeserializeOwned>(value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::codec(format!("result: {}", e)))
}
