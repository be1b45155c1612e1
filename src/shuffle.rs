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

//! Distributed table shuffle: routers, all-to-all engine and columnar codec.

use std::sync::atomic::{AtomicUsize, Ordering};

use arrow::record_batch::RecordBatch;

pub mod codec;
pub mod edge;
pub mod engine;
pub mod vertex;
pub(crate) mod wire;

pub use codec::{deserialize_selected_rows, select_rows, serialize_selected_rows};
pub use edge::shuffle_edge_table;
pub use engine::shuffle_table_by_offset_lists;
pub use vertex::shuffle_vertex_table;

/// Threads this worker may use inside one collective call. Co-tenanted
/// workers split the host's cores between them.
pub(crate) fn thread_budget(local_worker_num: i32) -> usize {
    let local = local_worker_num.max(1) as usize;
    (num_cpus::get() + local - 1) / local
}

/// Build per-batch, per-fragment row-offset lists in parallel.
///
/// Scan workers claim batch indices through an atomic counter; each batch's
/// offset lists are written by exactly the worker that claimed it and merged
/// back in batch order after the join.
pub(crate) fn scan_offset_lists<F>(
    batches: &[RecordBatch],
    fragment_num: usize,
    local_worker_num: i32,
    scan: F,
) -> Vec<Vec<Vec<i64>>>
where
    F: Fn(&RecordBatch, &mut [Vec<i64>]) + Sync,
{
    let batch_num = batches.len();
    let thread_num = thread_budget(local_worker_num).min(batch_num).max(1);
    let next_batch = AtomicUsize::new(0);

    let scanned = std::thread::scope(|s| {
        let handles: Vec<_> = (0..thread_num)
            .map(|_| {
                s.spawn(|| {
                    let mut claimed = Vec::new();
                    loop {
                        let got = next_batch.fetch_add(1, Ordering::Relaxed);
                        if got >= batch_num {
                            break;
                        }
                        let mut offset_list = vec![Vec::new(); fragment_num];
                        scan(&batches[got], &mut offset_list);
                        claimed.push((got, offset_list));
                    }
                    claimed
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().expect("scan worker panicked"))
            .collect::<Vec<_>>()
    });

    let mut offset_lists = vec![Vec::new(); batch_num];
    for (batch_id, offset_list) in scanned {
        offset_lists[batch_id] = offset_list;
    }
    offset_lists
}
