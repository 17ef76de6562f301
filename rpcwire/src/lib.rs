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

#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! rpcwire is organized into layers, leaves first:
//!
//! - **[`rpc`]**: Interfaces, invocations, invokers and exporters
//! - **[`url`]**: Endpoint URLs and parameter keys
//! - **[`extension`]**: Named extensions with URL-driven activation
//! - **[`proxy`]**: Client stubs and cached server-side dispatchers
//! - **[`protocol`]**: The protocol contract and its decorator stack
//! - **[`config`]**: Deployment configuration and URL assembly
//! - **[`component`]** and **[`container`]**: What the host container provides
//! - **[`endpoint`]**: Lifecycle-managed service and reference endpoints
//! - **[`wiring`]**: The processor the host container drives
//!
//! ## Error Handling
//!
//! rpcwire uses a two-layer error hierarchy:
//!
//! - [`RpcError`]: Protocol, invocation and codec failures
//! - [`WiringError`]: Endpoint and injection site failures
//!
//! ## Safety
//!
//! rpcwire is written in 100% safe Rust with `#![deny(unsafe_code)]`.

// Generated code names this crate by its absolute path.
extern crate self as rpcwire;

pub mod component;
pub mod config;
pub mod container;
pub mod endpoint;
pub mod error;
pub mod extension;
pub mod protocol;
pub mod proxy;
pub mod rpc;
pub mod url;
pub mod wiring;

pub use async_trait::async_trait;
pub use rpcwire_macros::{Component, interface};

pub use error::WiringError;
pub use rpc::RpcError;
pub use wiring::{WiringProcessor, WiringProcessorBuilder};

/// Re-exports used by generated code. Not part of the public API.
#[doc(hidden)]
pub mod __private {
    pub use async_trait;
    pub use futures_util;
    pub use inventory;
    pub use serde_json;
}
