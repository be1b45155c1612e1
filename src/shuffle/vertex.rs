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

//! Vertex table shuffle.

use crate::error::PlexarResult;
use crate::net::communicator::Communicator;
use crate::net::schema::schema_consistent;
use crate::partition::{key_at, Partitioner};
use crate::shuffle::engine::shuffle_table_by_offset_lists;
use crate::shuffle::scan_offset_lists;
use crate::table::Table;
use crate::util::arrow_utils::prune_empty_batches;

/// Redistribute a vertex table so every row lands on the worker owning
/// `partitioner.partition_of(key)`, where the key is column 0.
///
/// Returns a freshly-built single-chunk table with the input schema holding
/// exactly the rows assigned to the local fragment.
pub fn shuffle_vertex_table(
    comm: &dyn Communicator,
    partitioner: &dyn Partitioner,
    table_in: &Table,
) -> PlexarResult<Table> {
    let schema = table_in.schema();
    schema_consistent(&schema, comm)?;

    let batches = table_in.batches();
    let fragment_num = comm.fragment_num() as usize;

    let offset_lists = scan_offset_lists(
        batches,
        fragment_num,
        comm.local_worker_num(),
        |batch, offset_list| {
            let key_column = batch.column(0);
            for row in 0..batch.num_rows() {
                let fid = partitioner.partition_of(key_at(key_column.as_ref(), row));
                offset_list[fid as usize].push(row as i64);
            }
        },
    );

    let received = shuffle_table_by_offset_lists(&schema, batches, &offset_lists, comm)?;

    let kept = prune_empty_batches(received);
    if kept.is_empty() {
        return Ok(Table::empty(schema));
    }
    Table::try_new(schema, kept)?.combine_chunks()
}
