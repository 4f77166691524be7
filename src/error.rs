//! Error taxonomy. Every fallible path returns a typed `BpressError` built
//! with `thiserror` rather than panicking.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BpressError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown delimiter mode: {0}")]
    UnknownMode(String),

    #[error("buffer size must be positive")]
    ZeroBufferSize,
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("scan did not complete: read {bytes_read} of {expected} expected bytes")]
    Incomplete { bytes_read: u64, expected: u64 },
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("delimiter not found in stream")]
    DelimiterNotFound,

    #[error("delimiter not found in first buffer")]
    DelimiterNotFoundInFirstBuffer,

    #[error("double stuffing: a synthetic delimiter was already appended")]
    DoubleStuffing,
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("token length must be positive, got {0}")]
    NonPositiveLength(i64),
}

#[derive(Error, Debug)]
pub enum ConsistencyError {
    #[error("bytes_read_pass_one ({pass_one}) != bytes_read_pass_two ({pass_two})")]
    ReadSizeMismatch { pass_one: u64, pass_two: u64 },

    #[error("bytes_read_pass_two ({read}) != bytes_compressed ({compressed})")]
    CompressedSizeMismatch { read: u64, compressed: u64 },

    #[error("protocol header too short: {0} bits")]
    HeaderTooShort(usize),

    #[error("protocol header delimiter bit mismatch")]
    HeaderDelimiterMismatch,

    #[error("protocol header bit-stuffing flag mismatch")]
    HeaderBitStuffingMismatch,

    #[error("padding's last bit matches the delimiter bit")]
    PaddingMatchesDelimiter,
}
