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

//! A chunked columnar table: an ordered sequence of record batches bound to
//! one schema.

use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use crate::error::{PlexarError, PlexarResult};

/// An immutable table made of record batches sharing a schema.
///
/// This is the unit the shuffle operations consume and produce. Input tables
/// are only borrowed for the duration of a call; output tables are freshly
/// built and owned by the caller.
#[derive(Debug, Clone)]
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    /// Create a table from batches, validating that every batch carries the
    /// given schema.
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> PlexarResult<Self> {
        for (i, batch) in batches.iter().enumerate() {
            if batch.schema() != schema {
                return Err(PlexarError::InvalidOperation(format!(
                    "schema of batch {} does not match the table schema",
                    i
                )));
            }
        }
        Ok(Self { schema, batches })
    }

    /// Create a table from a non-empty batch vector, taking the schema from
    /// the first batch.
    pub fn from_record_batches(batches: Vec<RecordBatch>) -> PlexarResult<Self> {
        let schema = batches
            .first()
            .map(|b| b.schema())
            .ok_or_else(|| {
                PlexarError::InvalidOperation(
                    "cannot infer a schema from an empty batch vector".to_string(),
                )
            })?;
        Self::try_new(schema, batches)
    }

    /// A valid zero-row table that retains the schema. Workers that receive
    /// no rows for a label still hand a typed empty table back to the loader.
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            batches: Vec::new(),
        }
    }

    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn batch(&self, i: usize) -> Option<&RecordBatch> {
        self.batches.get(i)
    }

    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    /// Concatenate all batches into a single chunk.
    pub fn combine_chunks(&self) -> PlexarResult<Table> {
        if self.batches.len() <= 1 {
            return Ok(self.clone());
        }
        let combined = concat_batches(&self.schema, &self.batches)?;
        Ok(Self {
            schema: Arc::clone(&self.schema),
            batches: vec![combined],
        })
    }

    /// Consume the table, returning its batches.
    pub fn into_batches(self) -> Vec<RecordBatch> {
        self.batches
    }
}
