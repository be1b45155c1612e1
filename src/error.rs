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

//! Error handling for plexar operations

use std::fmt;

/// Error codes surfaced to graph-load clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Ok = 0,
    ArrowError = 1,
    InvalidOperation = 2,
    SerializationError = 3,
    IoError = 4,
    UnknownError = 9,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Ok => write!(f, "OK"),
            Code::ArrowError => write!(f, "Arrow error"),
            Code::InvalidOperation => write!(f, "Invalid operation"),
            Code::SerializationError => write!(f, "Serialization error"),
            Code::IoError => write!(f, "IO error"),
            Code::UnknownError => write!(f, "Unknown error"),
        }
    }
}

/// Main error type for plexar operations.
///
/// Recoverable failures are propagated as values. A column type outside the
/// supported set or an impossible downcast is a programmer error and aborts
/// the process instead: schemas are agreed upon before any data moves, so
/// such a mismatch cannot be handled meaningfully at runtime.
#[derive(thiserror::Error, Debug)]
pub enum PlexarError {
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Communication error: {0}")]
    Communication(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlexarError {
    /// Get the error code
    pub fn code(&self) -> Code {
        match self {
            PlexarError::Arrow(_) => Code::ArrowError,
            PlexarError::InvalidOperation(_) => Code::InvalidOperation,
            PlexarError::Serialization(_) => Code::SerializationError,
            PlexarError::Communication(_) => Code::IoError,
            PlexarError::Io(_) => Code::IoError,
        }
    }
}

/// Type alias for Results using PlexarError
pub type PlexarResult<T> = Result<T, PlexarError>;
