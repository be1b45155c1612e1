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

//! In-process communicator backend.
//!
//! Wires `W` workers living in one OS process (one thread per worker)
//! through per-worker mailboxes, a shared reduction cell and a reusable
//! barrier. This is the crate's testing transport and the single-process
//! degenerate deployment; the fragment/worker mapping is the identity.

use std::collections::VecDeque;
use std::sync::{Arc, Barrier, Condvar, Mutex};

use crate::error::PlexarResult;
use crate::net::communicator::{Communicator, WorkerId};
use crate::partition::FragmentId;

/// One worker's inbox. Messages are tagged with the sender and matched by
/// source on `recv`, preserving per-pair FIFO order.
struct Mailbox {
    queue: Mutex<VecDeque<(WorkerId, Vec<u8>)>>,
    available: Condvar,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    fn push(&self, src: WorkerId, data: Vec<u8>) {
        let mut queue = self.queue.lock().unwrap();
        queue.push_back((src, data));
        self.available.notify_all();
    }

    fn pop_from(&self, src: WorkerId) -> Vec<u8> {
        let mut queue = self.queue.lock().unwrap();
        loop {
            if let Some(pos) = queue.iter().position(|(s, _)| *s == src) {
                return queue.remove(pos).map(|(_, data)| data).unwrap();
            }
            queue = self.available.wait(queue).unwrap();
        }
    }

    fn pop_any(&self) -> (WorkerId, Vec<u8>) {
        let mut queue = self.queue.lock().unwrap();
        loop {
            if let Some(item) = queue.pop_front() {
                return item;
            }
            queue = self.available.wait(queue).unwrap();
        }
    }
}

struct ReduceState {
    epoch: u64,
    arrived: i32,
    acc: i64,
    result: i64,
}

/// Generation-counted sum reduction. Workers of one collective call invoke
/// the same reductions in the same order, so a single cell serves them all.
struct ReduceCell {
    state: Mutex<ReduceState>,
    complete: Condvar,
}

impl ReduceCell {
    fn new() -> Self {
        Self {
            state: Mutex::new(ReduceState {
                epoch: 0,
                arrived: 0,
                acc: 0,
                result: 0,
            }),
            complete: Condvar::new(),
        }
    }

    fn reduce_sum(&self, worker_num: i32, value: i64) -> i64 {
        let mut state = self.state.lock().unwrap();
        let my_epoch = state.epoch;
        state.acc += value;
        state.arrived += 1;
        if state.arrived == worker_num {
            state.result = state.acc;
            state.acc = 0;
            state.arrived = 0;
            state.epoch += 1;
            self.complete.notify_all();
            return state.result;
        }
        while state.epoch == my_epoch {
            state = self.complete.wait(state).unwrap();
        }
        state.result
    }
}

/// Shared state of an in-process worker group.
pub struct LocalCluster {
    worker_num: i32,
    mailboxes: Vec<Mailbox>,
    reduce: ReduceCell,
    barrier: Barrier,
}

impl LocalCluster {
    pub fn new(worker_num: i32) -> Arc<Self> {
        assert!(worker_num > 0, "worker count must be positive");
        let mailboxes = (0..worker_num).map(|_| Mailbox::new()).collect();
        Arc::new(Self {
            worker_num,
            mailboxes,
            reduce: ReduceCell::new(),
            barrier: Barrier::new(worker_num as usize),
        })
    }

    /// The communicator handle of one worker.
    pub fn communicator(self: &Arc<Self>, worker_id: WorkerId) -> LocalCommunicator {
        assert!(
            (0..self.worker_num).contains(&worker_id),
            "worker id {} out of range",
            worker_id
        );
        LocalCommunicator {
            cluster: Arc::clone(self),
            worker_id,
        }
    }

    /// Convenience: one handle per worker, indexed by worker id.
    pub fn communicators(worker_num: i32) -> Vec<LocalCommunicator> {
        let cluster = Self::new(worker_num);
        (0..worker_num).map(|w| cluster.communicator(w)).collect()
    }
}

/// One worker's handle onto a [`LocalCluster`].
pub struct LocalCommunicator {
    cluster: Arc<LocalCluster>,
    worker_id: WorkerId,
}

impl Communicator for LocalCommunicator {
    fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    fn worker_num(&self) -> i32 {
        self.cluster.worker_num
    }

    fn fragment_num(&self) -> i32 {
        self.cluster.worker_num
    }

    fn fragment_id(&self) -> FragmentId {
        self.worker_id as FragmentId
    }

    fn worker_to_fragment(&self, worker: WorkerId) -> FragmentId {
        worker as FragmentId
    }

    fn fragment_to_worker(&self, fragment: FragmentId) -> WorkerId {
        fragment as WorkerId
    }

    fn local_worker_num(&self) -> i32 {
        self.cluster.worker_num
    }

    fn send(&self, data: &[u8], dst: WorkerId) -> PlexarResult<()> {
        self.cluster.mailboxes[dst as usize].push(self.worker_id, data.to_vec());
        Ok(())
    }

    fn recv(&self, src: WorkerId) -> PlexarResult<Vec<u8>> {
        Ok(self.cluster.mailboxes[self.worker_id as usize].pop_from(src))
    }

    fn recv_any(&self) -> PlexarResult<(WorkerId, Vec<u8>)> {
        Ok(self.cluster.mailboxes[self.worker_id as usize].pop_any())
    }

    fn all_reduce_i32(&self, value: i32) -> PlexarResult<i32> {
        let sum = self
            .cluster
            .reduce
            .reduce_sum(self.cluster.worker_num, value as i64);
        Ok(sum as i32)
    }

    fn all_reduce_i64(&self, value: i64) -> PlexarResult<i64> {
        Ok(self.cluster.reduce.reduce_sum(self.cluster.worker_num, value))
    }

    fn barrier(&self) -> PlexarResult<()> {
        self.cluster.barrier.wait();
        Ok(())
    }
}
