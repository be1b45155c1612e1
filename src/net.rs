// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Group-communication boundary.
//!
//! The shuffle core talks to its transport through the [`Communicator`]
//! trait only. The crate bundles a single backend, [`local::LocalCluster`],
//! which wires several workers inside one process; cluster transports (MPI
//! and friends) implement the trait out of tree.

pub mod communicator;
pub mod local;
pub mod schema;

pub use communicator::{Communicator, WorkerId};
pub use local::LocalCluster;
pub use schema::schema_consistent;
