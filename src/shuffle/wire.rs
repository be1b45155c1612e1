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

//! Native-endian value encoding shared by the shuffle codec.
//!
//! The wire format is self-describing only down to the row count; column
//! layout is dictated by the schema the barrier already agreed on. Clusters
//! are assumed homogeneous, so values travel in platform endianness.

use crate::error::{PlexarError, PlexarResult};

/// A fixed-width value the codec can put on and take off the wire.
pub(crate) trait WireValue: Copy {
    fn put(self, buf: &mut Vec<u8>);
    fn get(reader: &mut WireReader<'_>) -> PlexarResult<Self>;
}

macro_rules! impl_wire_value {
    ($($t:ty),* $(,)?) => {$(
        impl WireValue for $t {
            fn put(self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_ne_bytes());
            }

            fn get(reader: &mut WireReader<'_>) -> PlexarResult<Self> {
                let bytes = reader.take(std::mem::size_of::<$t>())?;
                Ok(<$t>::from_ne_bytes(bytes.try_into().unwrap()))
            }
        }
    )*};
}

impl_wire_value!(f64, f32, i64, i32, u64, u32);

/// Write a length-prefixed byte run (u64 count, then the bytes).
pub(crate) fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    (bytes.len() as u64).put(buf);
    buf.extend_from_slice(bytes);
}

/// Borrowing cursor over a received payload.
pub(crate) struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn get<T: WireValue>(&mut self) -> PlexarResult<T> {
        T::get(self)
    }

    pub fn take(&mut self, len: usize) -> PlexarResult<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&e| e <= self.buf.len());
        match end {
            Some(end) => {
                let slice = &self.buf[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(PlexarError::Serialization(format!(
                "wire buffer underflow: need {} bytes at offset {}, payload is {} bytes",
                len,
                self.pos,
                self.buf.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_values() {
        let mut buf = Vec::new();
        42i64.put(&mut buf);
        (-7i32).put(&mut buf);
        1.5f64.put(&mut buf);
        u32::MAX.put(&mut buf);

        let mut reader = WireReader::new(&buf);
        assert_eq!(reader.get::<i64>().unwrap(), 42);
        assert_eq!(reader.get::<i32>().unwrap(), -7);
        assert_eq!(reader.get::<f64>().unwrap(), 1.5);
        assert_eq!(reader.get::<u32>().unwrap(), u32::MAX);
    }

    #[test]
    fn underflow_is_an_error() {
        let mut buf = Vec::new();
        1u32.put(&mut buf);
        let mut reader = WireReader::new(&buf);
        assert!(reader.get::<u64>().is_err());
    }
}
