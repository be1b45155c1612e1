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

//! All-to-all shuffle engine.
//!
//! A four-stage pipeline per collective call: a serializer pool encodes
//! per-destination row selections, a send thread drains the outbound queue,
//! a receive thread pulls exactly the pre-computed number of wire batches
//! from any source, and a deserializer pool rebuilds record batches into
//! atomically claimed output slots. Self-destined rows bypass the pipeline
//! entirely and are appended through the in-process row selector.

use std::sync::atomic::{AtomicUsize, Ordering};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use crossbeam_channel::bounded;
use log::debug;

use crate::error::PlexarResult;
use crate::net::communicator::Communicator;
use crate::partition::FragmentId;
use crate::shuffle::codec::{deserialize_selected_rows, select_rows, serialize_selected_rows};
use crate::shuffle::thread_budget;

/// Bound on both pipeline queues; producers block when the consumer lags.
const PIPELINE_QUEUE_CAPACITY: usize = 64;

/// Exchange record batches so that the rows listed in
/// `offset_lists[batch][fragment]` reach the worker owning that fragment.
///
/// Returns every wire batch received from peers followed by the
/// locally-selected slice of each input batch. Empty batches are retained
/// here; callers prune them. Row order within one (source, batch) message is
/// the sender's offset order; nothing more is promised.
pub fn shuffle_table_by_offset_lists(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    offset_lists: &[Vec<Vec<i64>>],
    comm: &dyn Communicator,
) -> PlexarResult<Vec<RecordBatch>> {
    debug_assert_eq!(batches.len(), offset_lists.len());

    let worker_id = comm.worker_id();
    let worker_num = comm.worker_num();
    let batch_num = batches.len();

    // Two dedicated I/O threads; the rest of the budget splits between the
    // serializer and deserializer pools.
    let thread_num = thread_budget(comm.local_worker_num()).max(3);
    let serialize_thread_num = ((thread_num - 2) / 2).max(1);
    let deserialize_thread_num = (thread_num - 2 - serialize_thread_num).max(1);

    // The receive count is known before anything flows: the self slice never
    // enters the pipeline, so each peer owes us exactly its batch count.
    let to_send = batch_num as i64;
    let total = comm.all_reduce_i64(to_send)?;
    let to_recv = (total - to_send) as usize;

    debug!(
        "shuffling {} batches on worker {}: {} serializer / {} deserializer workers, {} inbound",
        batch_num, worker_id, serialize_thread_num, deserialize_thread_num, to_recv
    );

    let (out_tx, out_rx) = bounded::<(FragmentId, Vec<u8>)>(PIPELINE_QUEUE_CAPACITY);
    let (in_tx, in_rx) = bounded::<Vec<u8>>(PIPELINE_QUEUE_CAPACITY);

    let next_batch = AtomicUsize::new(0);
    let next_slot = AtomicUsize::new(0);

    type Decoded = PlexarResult<Vec<(usize, RecordBatch)>>;

    let (send_result, recv_result, decoded) = std::thread::scope(|s| {
        let next_batch = &next_batch;
        let next_slot = &next_slot;

        let serializers: Vec<_> = (0..serialize_thread_num)
            .map(|_| {
                let out_tx = out_tx.clone();
                s.spawn(move || loop {
                    let got = next_batch.fetch_add(1, Ordering::Relaxed);
                    if got >= batch_num {
                        break;
                    }
                    let batch = &batches[got];
                    let lists = &offset_lists[got];
                    for i in 1..worker_num {
                        let dst_worker = (worker_id + i) % worker_num;
                        let dst_fid = comm.worker_to_fragment(dst_worker);
                        let mut payload = Vec::new();
                        serialize_selected_rows(&mut payload, batch, &lists[dst_fid as usize]);
                        if out_tx.send((dst_fid, payload)).is_err() {
                            // send thread is gone; the collective is aborting
                            return;
                        }
                    }
                })
            })
            .collect();
        drop(out_tx);

        let send_thread = s.spawn(move || -> PlexarResult<()> {
            let mut result = Ok(());
            for (dst_fid, payload) in out_rx.iter() {
                // keep draining on failure so serializers never block on a
                // full queue with no consumer
                if result.is_ok() {
                    result = comm.send(&payload, comm.fragment_to_worker(dst_fid));
                }
            }
            result
        });

        let recv_thread = s.spawn(move || -> PlexarResult<()> {
            for _ in 0..to_recv {
                let (_src, payload) = comm.recv_any()?;
                if in_tx.send(payload).is_err() {
                    break;
                }
            }
            Ok(())
        });

        let deserializers: Vec<_> = (0..deserialize_thread_num)
            .map(|_| {
                let in_rx = in_rx.clone();
                s.spawn(move || -> Decoded {
                    let mut decoded = Vec::new();
                    let mut failure = None;
                    for payload in in_rx.iter() {
                        if failure.is_some() {
                            continue;
                        }
                        let slot = next_slot.fetch_add(1, Ordering::Relaxed);
                        match deserialize_selected_rows(&payload, schema) {
                            Ok(batch) => decoded.push((slot, batch)),
                            Err(e) => failure = Some(e),
                        }
                    }
                    match failure {
                        Some(e) => Err(e),
                        None => Ok(decoded),
                    }
                })
            })
            .collect();
        drop(in_rx);

        for handle in serializers {
            handle.join().expect("serializer worker panicked");
        }
        let send_result = send_thread.join().expect("send thread panicked");
        let recv_result = recv_thread.join().expect("receive thread panicked");
        let decoded: Vec<Decoded> = deserializers
            .into_iter()
            .map(|h| h.join().expect("deserializer worker panicked"))
            .collect();
        (send_result, recv_result, decoded)
    });

    send_result?;
    recv_result?;

    let mut received: Vec<Option<RecordBatch>> = (0..to_recv).map(|_| None).collect();
    for worker_decoded in decoded {
        for (slot, batch) in worker_decoded? {
            received[slot] = Some(batch);
        }
    }
    let mut output: Vec<RecordBatch> = received
        .into_iter()
        .map(|slot| slot.expect("every receive slot is filled once the pipeline joins"))
        .collect();

    // Self slice: selected in process, appended after all received batches.
    let self_fid = comm.fragment_id() as usize;
    for (batch, lists) in batches.iter().zip(offset_lists) {
        output.push(select_rows(batch, &lists[self_fid])?);
    }

    comm.barrier()?;
    Ok(output)
}
