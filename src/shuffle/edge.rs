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

//! Edge table shuffle.

use crate::error::PlexarResult;
use crate::net::communicator::Communicator;
use crate::net::schema::schema_consistent;
use crate::partition::{gid_at, IdParser};
use crate::shuffle::engine::shuffle_table_by_offset_lists;
use crate::shuffle::scan_offset_lists;
use crate::table::Table;
use crate::util::arrow_utils::prune_empty_batches;

/// Redistribute an edge table to the owners of both endpoints.
///
/// Each row goes to the fragment owning its source vertex and, when the
/// destination vertex lives on a different fragment, to that one as well.
/// The duplication is intentional: both owners need the edge to build their
/// local graph.
pub fn shuffle_edge_table(
    comm: &dyn Communicator,
    id_parser: &dyn IdParser,
    src_col_id: usize,
    dst_col_id: usize,
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
            let src_column = batch.column(src_col_id);
            let dst_column = batch.column(dst_col_id);
            for row in 0..batch.num_rows() {
                let src_fid = id_parser.fragment_of(gid_at(src_column.as_ref(), row));
                let dst_fid = id_parser.fragment_of(gid_at(dst_column.as_ref(), row));
                offset_list[src_fid as usize].push(row as i64);
                if dst_fid != src_fid {
                    offset_list[dst_fid as usize].push(row as i64);
                }
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
