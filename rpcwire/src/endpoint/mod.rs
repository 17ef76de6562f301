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

//! Lifecycle-managed endpoints.
//!
//! An endpoint binds a finalised configuration to a live protocol object:
//!
//! - **[`ServiceEndpoint`]** owns the exporters of one service object. It is
//!   exported at most once and unexported at most once.
//! - **[`ReferenceEndpoint`]** owns the invoker and the client stub of one
//!   remote reference. The stub is created on first use and shared by every
//!   injection site with the same key.
//!
//! # Lifecycle
//!
//! ```text
//! ServiceEndpoint:    New ──export()──▶ Exported ──unexport()──▶ Unexported
//! ReferenceEndpoint:  New ──acquire_stub()──▶ Initialised ──destroy()──▶ Destroyed
//! ```
//!
//! Both `unexport` and `destroy` are also valid from `New` and are no-ops
//! once the final state is reached. State transitions are serialised per
//! endpoint; distinct endpoints never contend.

mod reference;
mod service;

pub use reference::{ReferenceEndpoint, ReferenceState};
pub use service::{ServiceEndpoint, ServiceState};
