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

//! Communicator trait: the contract every transport backend must satisfy.

use crate::error::PlexarResult;
use crate::partition::FragmentId;

/// A zero-based peer process id within the collective.
pub type WorkerId = i32;

/// Main interface for distributed operations.
///
/// All methods take `&self`: a communicator is shared between the send,
/// receive and worker threads of one collective call. Implementations must
/// preserve per-pair message ordering and match receives by source, the way
/// message-passing transports do.
pub trait Communicator: Send + Sync {
    /// This worker's id.
    fn worker_id(&self) -> WorkerId;

    /// Number of peer workers in the collective.
    fn worker_num(&self) -> i32;

    /// Number of graph fragments. Typically equals the worker count.
    fn fragment_num(&self) -> i32;

    /// The fragment owned by this worker.
    fn fragment_id(&self) -> FragmentId;

    /// The fragment owned by a worker.
    fn worker_to_fragment(&self, worker: WorkerId) -> FragmentId;

    /// The worker owning a fragment.
    fn fragment_to_worker(&self, fragment: FragmentId) -> WorkerId;

    /// Workers co-tenanted on this host. Used to split the hardware thread
    /// budget so co-located peers do not oversubscribe cores.
    fn local_worker_num(&self) -> i32;

    /// Point-to-point send to a specific worker.
    fn send(&self, data: &[u8], dst: WorkerId) -> PlexarResult<()>;

    /// Point-to-point receive from a specific worker.
    fn recv(&self, src: WorkerId) -> PlexarResult<Vec<u8>>;

    /// Receive the next message from any source.
    fn recv_any(&self) -> PlexarResult<(WorkerId, Vec<u8>)>;

    /// All-reduce (sum) of a 32-bit integer across the collective.
    fn all_reduce_i32(&self, value: i32) -> PlexarResult<i32>;

    /// All-reduce (sum) of a 64-bit integer across the collective.
    fn all_reduce_i64(&self, value: i64) -> PlexarResult<i64>;

    /// Block until every worker has entered the barrier.
    fn barrier(&self) -> PlexarResult<()>;
}
