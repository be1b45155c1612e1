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

//! Plexar: distributed shuffle primitives for property-graph loading
//!
//! Given a columnar table partitioned arbitrarily across a group of peer
//! workers, plexar redistributes its rows so that every row lands on the
//! worker owning it. Vertex tables route by a key column through a
//! [`Partitioner`]; edge tables route to the owners of both endpoints
//! through an [`IdParser`]. Apache Arrow is the underlying data format;
//! the group-communication transport is pluggable behind the
//! [`net::Communicator`] trait.

pub mod error;
pub mod net;
pub mod partition;
pub mod shuffle;
pub mod table;
pub mod util;

// Re-export commonly used types
pub use crate::error::{Code, PlexarError, PlexarResult};
pub use crate::partition::{BitIdParser, FragmentId, HashPartitioner, IdParser, KeyRef, Partitioner};
pub use crate::shuffle::{shuffle_edge_table, shuffle_vertex_table};
pub use crate::table::Table;

/// The main entry point and version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
