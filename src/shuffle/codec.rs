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

//! Type-dispatched columnar codec.
//!
//! Three operations share one total function over the supported logical
//! types: serialize a row selection to bytes, rebuild a record batch from
//! bytes, and select rows into a fresh batch in process. The type switch is
//! centralized once per direction; a column type outside the closed set is a
//! programmer error, since schemas are agreed upon before any of this runs.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, LargeListBuilder, LargeStringBuilder, NullArray, PrimitiveBuilder,
};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, FieldRef, Float32Type, Float64Type, Int32Type, Int64Type,
    SchemaRef, UInt32Type, UInt64Type,
};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use crate::error::{PlexarError, PlexarResult};
use crate::shuffle::wire::{put_bytes, WireReader, WireValue};

fn unsupported_type(data_type: &DataType) -> ! {
    panic!("unsupported data type for table shuffle - {data_type}")
}

/// Serialize the rows at `offsets`: an i64 row count, then each column's
/// values in schema order.
pub fn serialize_selected_rows(buf: &mut Vec<u8>, batch: &RecordBatch, offsets: &[i64]) {
    (offsets.len() as i64).put(buf);
    for column in batch.columns() {
        serialize_column(buf, column, offsets);
    }
}

fn serialize_column(buf: &mut Vec<u8>, array: &ArrayRef, offsets: &[i64]) {
    match array.data_type() {
        DataType::Float64 => serialize_primitive::<Float64Type>(buf, array, offsets),
        DataType::Float32 => serialize_primitive::<Float32Type>(buf, array, offsets),
        DataType::Int64 => serialize_primitive::<Int64Type>(buf, array, offsets),
        DataType::Int32 => serialize_primitive::<Int32Type>(buf, array, offsets),
        DataType::UInt64 => serialize_primitive::<UInt64Type>(buf, array, offsets),
        DataType::UInt32 => serialize_primitive::<UInt32Type>(buf, array, offsets),
        DataType::LargeUtf8 => {
            let strings = array.as_string::<i64>();
            for &x in offsets {
                put_bytes(buf, strings.value(x as usize).as_bytes());
            }
        }
        DataType::Null => {}
        DataType::LargeList(field) => serialize_list(buf, array, field.data_type(), offsets),
        dt => unsupported_type(dt),
    }
}

fn serialize_primitive<T>(buf: &mut Vec<u8>, array: &ArrayRef, offsets: &[i64])
where
    T: ArrowPrimitiveType,
    T::Native: WireValue,
{
    let values = array.as_primitive::<T>();
    for &x in offsets {
        values.value(x as usize).put(buf);
    }
}

fn serialize_list(buf: &mut Vec<u8>, array: &ArrayRef, value_type: &DataType, offsets: &[i64]) {
    match value_type {
        DataType::Float64 => serialize_list_values::<Float64Type>(buf, array, offsets),
        DataType::Float32 => serialize_list_values::<Float32Type>(buf, array, offsets),
        DataType::Int64 => serialize_list_values::<Int64Type>(buf, array, offsets),
        DataType::Int32 => serialize_list_values::<Int32Type>(buf, array, offsets),
        DataType::UInt64 => serialize_list_values::<UInt64Type>(buf, array, offsets),
        DataType::UInt32 => serialize_list_values::<UInt32Type>(buf, array, offsets),
        dt => unsupported_type(dt),
    }
}

fn serialize_list_values<T>(buf: &mut Vec<u8>, array: &ArrayRef, offsets: &[i64])
where
    T: ArrowPrimitiveType,
    T::Native: WireValue,
{
    let lists = array.as_list::<i64>();
    for &x in offsets {
        let x = x as usize;
        lists.value_length(x).put(buf);
        let values = lists.value(x);
        let values = values.as_primitive::<T>();
        for i in 0..values.len() {
            values.value(i).put(buf);
        }
    }
}

/// Rebuild a record batch from a wire payload: read the i64 row count, then
/// consume each column's values through builders sized for it.
pub fn deserialize_selected_rows(
    payload: &[u8],
    schema: &SchemaRef,
) -> PlexarResult<RecordBatch> {
    let reader = &mut WireReader::new(payload);
    let row_num: i64 = reader.get()?;
    if row_num < 0 {
        return Err(PlexarError::Serialization(format!(
            "negative row count {row_num} in wire payload"
        )));
    }
    let row_num = row_num as usize;

    let mut columns = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        columns.push(deserialize_column(reader, field, row_num)?);
    }
    let options = RecordBatchOptions::new().with_row_count(Some(row_num));
    RecordBatch::try_new_with_options(Arc::clone(schema), columns, &options)
        .map_err(PlexarError::Arrow)
}

fn deserialize_column(
    reader: &mut WireReader<'_>,
    field: &FieldRef,
    row_num: usize,
) -> PlexarResult<ArrayRef> {
    match field.data_type() {
        DataType::Float64 => deserialize_primitive::<Float64Type>(reader, row_num),
        DataType::Float32 => deserialize_primitive::<Float32Type>(reader, row_num),
        DataType::Int64 => deserialize_primitive::<Int64Type>(reader, row_num),
        DataType::Int32 => deserialize_primitive::<Int32Type>(reader, row_num),
        DataType::UInt64 => deserialize_primitive::<UInt64Type>(reader, row_num),
        DataType::UInt32 => deserialize_primitive::<UInt32Type>(reader, row_num),
        DataType::LargeUtf8 => {
            let mut builder = LargeStringBuilder::with_capacity(row_num, 0);
            for _ in 0..row_num {
                let len: u64 = reader.get()?;
                let bytes = reader.take(len as usize)?;
                let value = std::str::from_utf8(bytes).map_err(|e| {
                    PlexarError::Serialization(format!("invalid utf-8 string on the wire: {e}"))
                })?;
                builder.append_value(value);
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Null => Ok(Arc::new(NullArray::new(row_num))),
        DataType::LargeList(child) => deserialize_list(reader, child, row_num),
        dt => unsupported_type(dt),
    }
}

fn deserialize_primitive<T>(reader: &mut WireReader<'_>, row_num: usize) -> PlexarResult<ArrayRef>
where
    T: ArrowPrimitiveType,
    T::Native: WireValue,
{
    let mut builder = PrimitiveBuilder::<T>::with_capacity(row_num);
    for _ in 0..row_num {
        builder.append_value(reader.get()?);
    }
    Ok(Arc::new(builder.finish()))
}

fn deserialize_list(
    reader: &mut WireReader<'_>,
    child: &FieldRef,
    row_num: usize,
) -> PlexarResult<ArrayRef> {
    match child.data_type() {
        DataType::Float64 => deserialize_list_values::<Float64Type>(reader, child, row_num),
        DataType::Float32 => deserialize_list_values::<Float32Type>(reader, child, row_num),
        DataType::Int64 => deserialize_list_values::<Int64Type>(reader, child, row_num),
        DataType::Int32 => deserialize_list_values::<Int32Type>(reader, child, row_num),
        DataType::UInt64 => deserialize_list_values::<UInt64Type>(reader, child, row_num),
        DataType::UInt32 => deserialize_list_values::<UInt32Type>(reader, child, row_num),
        dt => unsupported_type(dt),
    }
}

fn deserialize_list_values<T>(
    reader: &mut WireReader<'_>,
    child: &FieldRef,
    row_num: usize,
) -> PlexarResult<ArrayRef>
where
    T: ArrowPrimitiveType,
    T::Native: WireValue,
{
    // The child field from the agreed schema keeps the rebuilt type identical
    // to the sender's, name and nullability included.
    let mut builder =
        LargeListBuilder::new(PrimitiveBuilder::<T>::new()).with_field(Arc::clone(child));
    for _ in 0..row_num {
        let len: i64 = reader.get()?;
        if len < 0 {
            return Err(PlexarError::Serialization(format!(
                "negative list length {len} in wire payload"
            )));
        }
        for _ in 0..len {
            builder.values().append_value(reader.get()?);
        }
        builder.append(true);
    }
    Ok(Arc::new(builder.finish()))
}

/// In-process row selection: append the rows at `offsets` to fresh typed
/// builders and flush. Used for the self-destined slice of each batch so
/// those rows never pay the serialize/deserialize cost.
pub fn select_rows(batch: &RecordBatch, offsets: &[i64]) -> PlexarResult<RecordBatch> {
    let mut columns = Vec::with_capacity(batch.num_columns());
    for column in batch.columns() {
        columns.push(select_column(column, offsets));
    }
    let options = RecordBatchOptions::new().with_row_count(Some(offsets.len()));
    RecordBatch::try_new_with_options(batch.schema(), columns, &options).map_err(PlexarError::Arrow)
}

fn select_column(array: &ArrayRef, offsets: &[i64]) -> ArrayRef {
    match array.data_type() {
        DataType::Float64 => select_primitive::<Float64Type>(array, offsets),
        DataType::Float32 => select_primitive::<Float32Type>(array, offsets),
        DataType::Int64 => select_primitive::<Int64Type>(array, offsets),
        DataType::Int32 => select_primitive::<Int32Type>(array, offsets),
        DataType::UInt64 => select_primitive::<UInt64Type>(array, offsets),
        DataType::UInt32 => select_primitive::<UInt32Type>(array, offsets),
        DataType::LargeUtf8 => {
            let strings = array.as_string::<i64>();
            let mut builder = LargeStringBuilder::with_capacity(offsets.len(), 0);
            for &x in offsets {
                builder.append_value(strings.value(x as usize));
            }
            Arc::new(builder.finish())
        }
        DataType::Null => Arc::new(NullArray::new(offsets.len())),
        DataType::LargeList(field) => select_list(array, field, offsets),
        dt => unsupported_type(dt),
    }
}

fn select_primitive<T>(array: &ArrayRef, offsets: &[i64]) -> ArrayRef
where
    T: ArrowPrimitiveType,
{
    let values = array.as_primitive::<T>();
    let mut builder = PrimitiveBuilder::<T>::with_capacity(offsets.len());
    for &x in offsets {
        builder.append_value(values.value(x as usize));
    }
    Arc::new(builder.finish())
}

fn select_list(array: &ArrayRef, field: &FieldRef, offsets: &[i64]) -> ArrayRef {
    match field.data_type() {
        DataType::Float64 => select_list_values::<Float64Type>(array, field, offsets),
        DataType::Float32 => select_list_values::<Float32Type>(array, field, offsets),
        DataType::Int64 => select_list_values::<Int64Type>(array, field, offsets),
        DataType::Int32 => select_list_values::<Int32Type>(array, field, offsets),
        DataType::UInt64 => select_list_values::<UInt64Type>(array, field, offsets),
        DataType::UInt32 => select_list_values::<UInt32Type>(array, field, offsets),
        dt => unsupported_type(dt),
    }
}

fn select_list_values<T>(array: &ArrayRef, field: &FieldRef, offsets: &[i64]) -> ArrayRef
where
    T: ArrowPrimitiveType,
{
    let lists = array.as_list::<i64>();
    let mut builder =
        LargeListBuilder::new(PrimitiveBuilder::<T>::new()).with_field(Arc::clone(field));
    for &x in offsets {
        let values = lists.value(x as usize);
        let values = values.as_primitive::<T>();
        for i in 0..values.len() {
            builder.values().append_value(values.value(i));
        }
        builder.append(true);
    }
    Arc::new(builder.finish())
}
