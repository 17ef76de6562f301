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

//! Service wiring.
//!
//! The [`WiringProcessor`] is the piece a host container talks to. For every
//! component it produces, the container calls the pre- and post-processing
//! hooks; at close it calls shutdown.
//!
//! ```text
//! container ── pre_process ──▶ resolve_reference ──▶ ReferenceEndpoint ──▶ stub ──▶ field/setter
//!           ── post_process ─▶ ServiceConfig ──▶ ServiceEndpoint ──▶ ProtocolSelector.export
//!           ── shutdown ─────▶ unexport / destroy every endpoint
//! ```
//!
//! All endpoints are owned by the processor's [`WiringRegistry`]. References
//! are deduplicated by `group/interface:version`, so every injection site
//! asking for the same service receives the same stub object.

mod builder;
mod processor;
mod registry;

pub use builder::WiringProcessorBuilder;
pub use processor::WiringProcessor;
pub use registry::WiringRegistry;
