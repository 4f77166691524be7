//! bpress: a single-pass streaming bit-level compressor built around a
//! delimiter-bit split and a self-extending prefix-free digest code.
//!
//! The public surface is [`Compressor`] plus [`CompressorConfig`] and
//! [`DelimiterMode`] to configure it. Everything else (`bitstream`,
//! `stats`, `digest`, `token`, `scanner`) is exposed for testing and for
//! callers who want the pieces rather than the whole pipeline.

pub mod bitstream;
pub mod bufio;
pub mod compressor;
pub mod config;
pub mod delimiter;
pub mod digest;
pub mod error;
pub mod scanner;
pub mod stats;
pub mod token;

pub use bitstream::BitVec;
pub use compressor::{CompressionReport, Compressor};
pub use config::CompressorConfig;
pub use delimiter::DelimiterMode;
pub use error::{BpressError, CodecError, ConfigError, ConsistencyError, ProtocolError, ScanError};
pub use scanner::Scanner;
pub use stats::ScannedData;
