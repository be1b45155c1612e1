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

//! Schema-equality barrier.
//!
//! Every peer must present an identical schema before the all-to-all row
//! exchange starts. Each worker serializes its schema to canonical Arrow IPC
//! bytes, exchanges the buffer with every peer over an opposing-stride ring
//! (sender walks ascending, receiver descending, so each pair exchanges
//! exactly once without deadlocking on symmetric ordering), compares, and
//! the collective agrees on the outcome via all-reduce.

use std::io::Cursor;

use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;

use crate::error::{PlexarError, PlexarResult};
use crate::net::communicator::{Communicator, WorkerId};

/// Canonical schema bytes: an IPC stream holding only the schema message.
fn serialize_schema(schema: &SchemaRef) -> Result<Vec<u8>, ArrowError> {
    let mut buffer = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut buffer, schema)?;
        writer.finish()?;
    }
    Ok(buffer)
}

fn deserialize_schema(bytes: &[u8]) -> Result<SchemaRef, ArrowError> {
    let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
    Ok(reader.schema())
}

/// Barrier payload format: a 64-bit byte length, then that many bytes.
/// Zero-length buffers send the length message only.
fn send_length_prefixed(
    comm: &dyn Communicator,
    buffer: &[u8],
    dst: WorkerId,
) -> PlexarResult<()> {
    let size = buffer.len() as i64;
    comm.send(&size.to_ne_bytes(), dst)?;
    if size != 0 {
        comm.send(buffer, dst)?;
    }
    Ok(())
}

fn recv_length_prefixed(comm: &dyn Communicator, src: WorkerId) -> PlexarResult<Vec<u8>> {
    let header = comm.recv(src)?;
    let header: [u8; 8] = header.try_into().map_err(|_| {
        PlexarError::Communication(format!("malformed length header from worker {src}"))
    })?;
    let size = i64::from_ne_bytes(header);
    if size == 0 {
        return Ok(Vec::new());
    }
    let payload = comm.recv(src)?;
    if payload.len() as i64 != size {
        return Err(PlexarError::Communication(format!(
            "payload from worker {} is {} bytes, expected {}",
            src,
            payload.len(),
            size
        )));
    }
    Ok(payload)
}

/// Verify that every worker's schema equals this one.
///
/// Returns an arrow-error result on every peer if any peer fails to
/// serialize its schema, and an invalid-operation result on every peer if
/// any pair of schemas differs. Succeeds only when the whole collective
/// agrees; no peer is left hanging on a partner that already bailed.
pub fn schema_consistent(schema: &SchemaRef, comm: &dyn Communicator) -> PlexarResult<()> {
    let serialized = serialize_schema(schema);
    let failed = comm.all_reduce_i32(i32::from(serialized.is_err()))?;
    if failed != 0 {
        return Err(match serialized {
            Err(e) => PlexarError::Arrow(e),
            Ok(_) => {
                PlexarError::Serialization("schema serialization failed on a peer".to_string())
            }
        });
    }
    let buffer = serialized.map_err(PlexarError::Arrow)?;

    let worker_id = comm.worker_id();
    let worker_num = comm.worker_num();

    let (send_result, consistent) = std::thread::scope(|s| {
        let sender = s.spawn(|| -> PlexarResult<()> {
            for i in 1..worker_num {
                let dst = (worker_id + i) % worker_num;
                send_length_prefixed(comm, &buffer, dst)?;
            }
            Ok(())
        });
        let receiver = s.spawn(|| -> PlexarResult<bool> {
            let mut consistent = true;
            for i in 1..worker_num {
                let src = (worker_id + worker_num - i) % worker_num;
                let bytes = recv_length_prefixed(comm, src)?;
                match deserialize_schema(&bytes) {
                    Ok(got) => consistent &= got.as_ref() == schema.as_ref(),
                    Err(_) => consistent = false,
                }
            }
            Ok(consistent)
        });
        (
            sender.join().expect("schema sender thread panicked"),
            receiver.join().expect("schema receiver thread panicked"),
        )
    });
    send_result?;
    let consistent = consistent?;

    comm.barrier()?;

    let mismatches = comm.all_reduce_i32(i32::from(!consistent))?;
    if mismatches != 0 {
        return Err(PlexarError::InvalidOperation(
            "schemas of shuffled tables are not consistent across workers".to_string(),
        ));
    }
    Ok(())
}
