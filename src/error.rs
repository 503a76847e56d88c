use std::io;
use std::path::PathBuf;

/// Errors raised while building, writing or reading checkpoints.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("failed to decode protobuf: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("corrupt table: {0}")]
    CorruptTable(String),

    #[error("checksum mismatch for {what}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        what: String,
        expected: u32,
        actual: u32,
    },

    #[error("key {0:?} not found in checkpoint")]
    TensorNotFound(String),

    #[error("table keys must be strictly increasing: {key:?} follows {last:?}")]
    UnsortedKey { key: String, last: String },

    #[error("duplicate tensor name {0:?}")]
    DuplicateName(String),

    #[error("invalid tensor name {0:?}")]
    InvalidName(String),

    #[error("data type mismatch: expected {expected}, found {found}")]
    DataTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("no variables to save")]
    NoVariables,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid checkpoint state: {0}")]
    InvalidState(String),

    #[error("parent directory of {} does not exist, can't save", .0.display())]
    MissingDirectory(PathBuf),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
