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

//! Invocation layer: interfaces, invocations, invokers and exporters.
//!
//! This is the vocabulary every other layer speaks. A call made on a client
//! stub becomes an [`Invocation`], travels through an [`Invoker`] chain and is
//! finally routed into the service object by the dispatcher generated for its
//! [`RemoteInterface`].

mod error;
mod interface;
mod invocation;
mod invoker;

pub use error::RpcError;
pub use interface::{
    InterfaceObject, InterfaceRegistration, InterfaceType, MethodDescriptor, RemoteInterface,
};
pub use invocation::{Invocation, decode_argument, decode_result, encode_value};
pub use invoker::{Exporter, Invoker};
