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

//! Tests for the columnar shuffle codec

use std::sync::Arc;

use arrow::array::{
    Array, Float32Array, Float64Array, Int32Array, Int32Builder, Int64Array, LargeListBuilder,
    LargeStringArray, NullArray, UInt32Array, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use plexar::shuffle::{deserialize_selected_rows, select_rows, serialize_selected_rows};

fn all_types_batch() -> RecordBatch {
    let mut lists = LargeListBuilder::new(Int32Builder::new());
    lists.values().append_value(7);
    lists.values().append_value(8);
    lists.append(true);
    lists.append(true); // empty list
    lists.values().append_value(9);
    lists.append(true);
    let lists = lists.finish();

    let schema = Schema::new(vec![
        Field::new("f64", DataType::Float64, false),
        Field::new("f32", DataType::Float32, false),
        Field::new("i64", DataType::Int64, false),
        Field::new("i32", DataType::Int32, false),
        Field::new("u64", DataType::UInt64, false),
        Field::new("u32", DataType::UInt32, false),
        Field::new("name", DataType::LargeUtf8, false),
        Field::new("nothing", DataType::Null, true),
        Field::new("weights", lists.data_type().clone(), true),
    ]);

    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Float64Array::from(vec![1.5, -2.25, f64::MAX])),
            Arc::new(Float32Array::from(vec![0.5f32, -1.0, f32::MIN])),
            Arc::new(Int64Array::from(vec![10, -20, i64::MAX])),
            Arc::new(Int32Array::from(vec![1, -2, i32::MIN])),
            Arc::new(UInt64Array::from(vec![0u64, 42, u64::MAX])),
            Arc::new(UInt32Array::from(vec![0u32, 7, u32::MAX])),
            Arc::new(LargeStringArray::from(vec!["alpha", "", "gamma"])),
            Arc::new(NullArray::new(3)),
            Arc::new(lists),
        ],
    )
    .unwrap()
}

fn round_trip(batch: &RecordBatch, offsets: &[i64]) -> RecordBatch {
    let mut payload = Vec::new();
    serialize_selected_rows(&mut payload, batch, offsets);
    deserialize_selected_rows(&payload, &batch.schema()).unwrap()
}

#[test]
fn test_round_trip_all_rows() {
    let batch = all_types_batch();
    let offsets: Vec<i64> = (0..batch.num_rows() as i64).collect();
    let result = round_trip(&batch, &offsets);
    assert_eq!(result, batch);
}

#[test]
fn test_round_trip_subset_preserves_offset_order() {
    let batch = all_types_batch();
    let result = round_trip(&batch, &[2, 0]);

    assert_eq!(result.num_rows(), 2);
    let ids = result
        .column(2)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(ids.value(0), i64::MAX);
    assert_eq!(ids.value(1), 10);
    let names = result
        .column(6)
        .as_any()
        .downcast_ref::<LargeStringArray>()
        .unwrap();
    assert_eq!(names.value(0), "gamma");
    assert_eq!(names.value(1), "alpha");
}

#[test]
fn test_round_trip_empty_selection() {
    let batch = all_types_batch();
    let result = round_trip(&batch, &[]);
    assert_eq!(result.num_rows(), 0);
    assert_eq!(result.schema(), batch.schema());
}

#[test]
fn test_select_rows_matches_wire_path() {
    let batch = all_types_batch();
    for offsets in [vec![], vec![1], vec![2, 0, 1], vec![0, 0, 2]] {
        let selected = select_rows(&batch, &offsets).unwrap();
        let shipped = round_trip(&batch, &offsets);
        assert_eq!(selected, shipped);
    }
}

#[test]
fn test_select_rows_duplicate_offsets() {
    let batch = all_types_batch();
    let selected = select_rows(&batch, &[1, 1]).unwrap();
    assert_eq!(selected.num_rows(), 2);
    let f = selected
        .column(0)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(f.value(0), -2.25);
    assert_eq!(f.value(1), -2.25);
}

#[test]
fn test_truncated_payload_is_an_error() {
    let batch = all_types_batch();
    let mut payload = Vec::new();
    serialize_selected_rows(&mut payload, &batch, &[0, 1, 2]);
    payload.truncate(payload.len() - 1);
    assert!(deserialize_selected_rows(&payload, &batch.schema()).is_err());
}

#[test]
fn test_zero_column_schema_keeps_row_count() {
    let schema: SchemaRef = Arc::new(Schema::empty());
    let batch = RecordBatch::try_new_with_options(
        Arc::clone(&schema),
        vec![],
        &arrow::record_batch::RecordBatchOptions::new().with_row_count(Some(4)),
    )
    .unwrap();
    let result = round_trip(&batch, &[0, 3]);
    assert_eq!(result.num_rows(), 2);
    assert_eq!(result.num_columns(), 0);
}
