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

//! Tests for the edge table shuffle

use std::sync::Arc;

use arrow::array::{Array, Int32Builder, LargeListBuilder, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use plexar::net::local::LocalCommunicator;
use plexar::net::{Communicator, LocalCluster};
use plexar::{shuffle_edge_table, BitIdParser, Table};

/// Global ids with the fragment in the high 32 bits.
fn gid(fid: u64, local: u64) -> u64 {
    (fid << 32) | local
}

fn edge_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("src", DataType::UInt64, false),
        Field::new("dst", DataType::UInt64, false),
    ]))
}

fn edge_batch(schema: &SchemaRef, edges: &[(u64, u64)]) -> RecordBatch {
    let srcs: Vec<u64> = edges.iter().map(|(s, _)| *s).collect();
    let dsts: Vec<u64> = edges.iter().map(|(_, d)| *d).collect();
    RecordBatch::try_new(
        Arc::clone(schema),
        vec![
            Arc::new(UInt64Array::from(srcs)),
            Arc::new(UInt64Array::from(dsts)),
        ],
    )
    .unwrap()
}

fn table_edges(table: &Table) -> Vec<(u64, u64)> {
    let mut edges = Vec::new();
    for batch in table.batches() {
        let srcs = batch
            .column(0)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        let dsts = batch
            .column(1)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        for i in 0..batch.num_rows() {
            edges.push((srcs.value(i), dsts.value(i)));
        }
    }
    edges
}

fn run_workers<F>(worker_num: i32, run: F) -> Vec<Table>
where
    F: Fn(&LocalCommunicator) -> Table + Sync,
{
    let comms = LocalCluster::communicators(worker_num);
    let run = &run;
    std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .iter()
            .map(|comm| s.spawn(move || run(comm)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect()
    })
}

#[test]
fn test_edge_with_distinct_owners_lands_on_both() {
    let schema = edge_schema();
    let edge = (gid(0, 1), gid(1, 2));
    let parser = BitIdParser::with_offset(32);

    let outputs = run_workers(2, |comm| {
        let table = if comm.worker_id() == 0 {
            Table::try_new(Arc::clone(&schema), vec![edge_batch(&schema, &[edge])]).unwrap()
        } else {
            Table::empty(Arc::clone(&schema))
        };
        shuffle_edge_table(comm, &parser, 0, 1, &table).unwrap()
    });

    assert_eq!(table_edges(&outputs[0]), vec![edge]);
    assert_eq!(table_edges(&outputs[1]), vec![edge]);
}

#[test]
fn test_edge_with_one_owner_lands_once() {
    let schema = edge_schema();
    let parser = BitIdParser::with_offset(32);
    let e_cross = (gid(0, 1), gid(1, 1)); // owners 0 and 1
    let e_zero = (gid(0, 2), gid(0, 3)); // owner 0 only
    let e_one = (gid(1, 4), gid(1, 5)); // owner 1 only

    let outputs = run_workers(2, |comm| {
        let table = if comm.worker_id() == 0 {
            Table::try_new(
                Arc::clone(&schema),
                vec![edge_batch(&schema, &[e_cross, e_zero, e_one])],
            )
            .unwrap()
        } else {
            Table::empty(Arc::clone(&schema))
        };
        shuffle_edge_table(comm, &parser, 0, 1, &table).unwrap()
    });

    let mut on_zero = table_edges(&outputs[0]);
    let mut on_one = table_edges(&outputs[1]);
    on_zero.sort();
    on_one.sort();
    assert_eq!(on_zero, vec![e_cross, e_zero]);
    assert_eq!(on_one, vec![e_cross, e_one]);

    // one duplicated edge: 3 input rows become 4 output rows
    let total: usize = outputs.iter().map(|t| t.num_rows()).sum();
    assert_eq!(total, 4);
}

#[test]
fn test_list_property_survives_the_wire() {
    let mut lists = LargeListBuilder::new(Int32Builder::new());
    lists.values().append_value(7);
    lists.values().append_value(8);
    lists.values().append_value(9);
    lists.append(true);
    let lists = lists.finish();

    let schema: SchemaRef = Arc::new(Schema::new(vec![
        Field::new("src", DataType::UInt64, false),
        Field::new("dst", DataType::UInt64, false),
        Field::new("weights", lists.data_type().clone(), true),
    ]));

    // both endpoints live on fragment 1, so the row leaves worker 0 entirely
    let batch = RecordBatch::try_new(
        Arc::clone(&schema),
        vec![
            Arc::new(UInt64Array::from(vec![gid(1, 1)])),
            Arc::new(UInt64Array::from(vec![gid(1, 2)])),
            Arc::new(lists),
        ],
    )
    .unwrap();
    let parser = BitIdParser::with_offset(32);

    let outputs = run_workers(2, |comm| {
        let table = if comm.worker_id() == 0 {
            Table::try_new(Arc::clone(&schema), vec![batch.clone()]).unwrap()
        } else {
            Table::empty(Arc::clone(&schema))
        };
        shuffle_edge_table(comm, &parser, 0, 1, &table).unwrap()
    });

    assert_eq!(outputs[0].num_rows(), 0);
    assert_eq!(outputs[1].num_rows(), 1);
    assert_eq!(outputs[1].batch(0).unwrap(), &batch);
}
