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

//! Partitioning contracts: vertex-key partitioners and global-id parsers.
//!
//! Both are pure per-row functions supplied by the graph loader. Blanket
//! implementations for closures keep call sites and tests lightweight.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Int32Type, Int64Type, UInt32Type, UInt64Type};

/// A logical partition of the graph. Each fragment belongs to one worker.
pub type FragmentId = u32;

/// A borrowed view of a vertex-key value, tagged by column type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyRef<'a> {
    Int64(i64),
    Int32(i32),
    UInt64(u64),
    UInt32(u32),
    Utf8(&'a str),
}

/// Maps a vertex key to the fragment owning it. Stateless per row.
pub trait Partitioner: Send + Sync {
    fn partition_of(&self, key: KeyRef<'_>) -> FragmentId;
}

impl<F> Partitioner for F
where
    F: Fn(KeyRef<'_>) -> FragmentId + Send + Sync,
{
    fn partition_of(&self, key: KeyRef<'_>) -> FragmentId {
        self(key)
    }
}

/// Hash partitioner over the supported key types.
///
/// Integer keys partition by value modulo the fragment count; string keys go
/// through the default hasher first.
#[derive(Debug, Clone, Copy)]
pub struct HashPartitioner {
    fragment_num: u32,
}

impl HashPartitioner {
    pub fn new(fragment_num: u32) -> Self {
        assert!(fragment_num > 0, "fragment count must be positive");
        Self { fragment_num }
    }
}

impl Partitioner for HashPartitioner {
    fn partition_of(&self, key: KeyRef<'_>) -> FragmentId {
        let h = match key {
            KeyRef::Int64(v) => v as u64,
            KeyRef::Int32(v) => v as u32 as u64,
            KeyRef::UInt64(v) => v,
            KeyRef::UInt32(v) => v as u64,
            KeyRef::Utf8(s) => {
                let mut hasher = DefaultHasher::new();
                s.hash(&mut hasher);
                hasher.finish()
            }
        };
        (h % self.fragment_num as u64) as FragmentId
    }
}

/// Extracts the owning fragment from a global vertex identifier.
pub trait IdParser: Send + Sync {
    fn fragment_of(&self, gid: u64) -> FragmentId;
}

impl<F> IdParser for F
where
    F: Fn(u64) -> FragmentId + Send + Sync,
{
    fn fragment_of(&self, gid: u64) -> FragmentId {
        self(gid)
    }
}

/// Id parser for global ids whose high bits encode the fragment.
#[derive(Debug, Clone, Copy)]
pub struct BitIdParser {
    fid_offset: u32,
}

impl BitIdParser {
    /// Derive the offset from the fragment count: the fragment field is just
    /// wide enough to represent `fragment_num - 1`.
    pub fn new(fragment_num: u32) -> Self {
        assert!(fragment_num > 0, "fragment count must be positive");
        let fid_width = 32 - (fragment_num - 1).leading_zeros();
        Self {
            fid_offset: 64 - fid_width,
        }
    }

    /// Pin the fragment field to the bits above `offset`.
    pub fn with_offset(fid_offset: u32) -> Self {
        assert!(fid_offset <= 64, "offset exceeds the id width");
        Self { fid_offset }
    }
}

impl IdParser for BitIdParser {
    fn fragment_of(&self, gid: u64) -> FragmentId {
        if self.fid_offset == 64 {
            0
        } else {
            (gid >> self.fid_offset) as FragmentId
        }
    }
}

/// Read one vertex-key value out of a key column.
///
/// The supported key types are the integral and large-string members of the
/// shuffle type set; anything else is a programmer error.
pub(crate) fn key_at(column: &dyn Array, row: usize) -> KeyRef<'_> {
    match column.data_type() {
        DataType::Int64 => KeyRef::Int64(column.as_primitive::<Int64Type>().value(row)),
        DataType::Int32 => KeyRef::Int32(column.as_primitive::<Int32Type>().value(row)),
        DataType::UInt64 => KeyRef::UInt64(column.as_primitive::<UInt64Type>().value(row)),
        DataType::UInt32 => KeyRef::UInt32(column.as_primitive::<UInt32Type>().value(row)),
        DataType::LargeUtf8 => KeyRef::Utf8(column.as_string::<i64>().value(row)),
        dt => panic!("unsupported vertex key type - {dt}"),
    }
}

/// Read one global vertex id out of an endpoint column.
pub(crate) fn gid_at(column: &dyn Array, row: usize) -> u64 {
    match column.data_type() {
        DataType::UInt64 => column.as_primitive::<UInt64Type>().value(row),
        DataType::Int64 => column.as_primitive::<Int64Type>().value(row) as u64,
        DataType::UInt32 => column.as_primitive::<UInt32Type>().value(row) as u64,
        DataType::Int32 => column.as_primitive::<Int32Type>().value(row) as u32 as u64,
        dt => panic!("unsupported global id type - {dt}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_id_parser_offset_from_fragment_count() {
        // 4 fragments need 2 bits, leaving the low 62 for the local id
        let parser = BitIdParser::new(4);
        assert_eq!(parser.fragment_of(0), 0);
        assert_eq!(parser.fragment_of(3 << 62), 3);
        assert_eq!(parser.fragment_of((1 << 62) | 12345), 1);
    }

    #[test]
    fn bit_id_parser_single_fragment() {
        let parser = BitIdParser::new(1);
        assert_eq!(parser.fragment_of(u64::MAX), 0);
    }

    #[test]
    fn bit_id_parser_pinned_offset() {
        let parser = BitIdParser::with_offset(32);
        assert_eq!(parser.fragment_of(0x0000_0001_0000_0002), 1);
    }

    #[test]
    fn hash_partitioner_integer_is_modulo() {
        let p = HashPartitioner::new(3);
        assert_eq!(p.partition_of(KeyRef::Int64(7)), 1);
        assert_eq!(p.partition_of(KeyRef::UInt32(9)), 0);
    }

    #[test]
    fn closure_partitioner() {
        let p = |key: KeyRef<'_>| match key {
            KeyRef::Int64(v) => (v % 2) as FragmentId,
            _ => 0,
        };
        assert_eq!(p.partition_of(KeyRef::Int64(5)), 1);
    }
}
