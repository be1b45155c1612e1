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

//! Tests for the schema-equality barrier

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

use plexar::error::PlexarError;
use plexar::net::{schema_consistent, Communicator, LocalCluster};

fn schema_of(fields: Vec<Field>) -> SchemaRef {
    Arc::new(Schema::new(fields))
}

#[test]
fn test_single_worker_agrees_with_itself() {
    let comms = LocalCluster::communicators(1);
    let schema = schema_of(vec![Field::new("id", DataType::Int64, false)]);
    schema_consistent(&schema, &comms[0]).unwrap();
}

#[test]
fn test_consistent_schemas_pass_and_the_barrier_is_idempotent() {
    let comms = LocalCluster::communicators(3);
    std::thread::scope(|s| {
        for comm in &comms {
            s.spawn(move || {
                let schema = schema_of(vec![
                    Field::new("id", DataType::Int64, false),
                    Field::new("name", DataType::LargeUtf8, false),
                ]);
                schema_consistent(&schema, comm).unwrap();
                // same inputs, same outcome
                schema_consistent(&schema, comm).unwrap();
            });
        }
    });
}

#[test]
fn test_mismatched_schemas_fail_on_every_worker() {
    let comms = LocalCluster::communicators(2);
    let results = std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .iter()
            .map(|comm| {
                s.spawn(move || {
                    let data_type = if comm.worker_id() == 0 {
                        DataType::Int64
                    } else {
                        DataType::Int32
                    };
                    let schema = schema_of(vec![Field::new("id", data_type, false)]);
                    schema_consistent(&schema, comm)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    for result in results {
        assert!(matches!(result, Err(PlexarError::InvalidOperation(_))));
    }
}

#[test]
fn test_field_name_mismatch_is_detected() {
    let comms = LocalCluster::communicators(2);
    let results = std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .iter()
            .map(|comm| {
                s.spawn(move || {
                    let name = if comm.worker_id() == 0 { "id" } else { "vid" };
                    let schema = schema_of(vec![Field::new(name, DataType::Int64, false)]);
                    schema_consistent(&schema, comm)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    for result in results {
        assert!(result.is_err());
    }
}
