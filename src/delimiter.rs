//! Delimiter selector: picks the bit value used to terminate tokens, either
//! by frequency (minority/majority, ties resolving to 0) or via a
//! caller-supplied callback.

use crate::error::ConfigError;
use crate::stats::ScannedData;
use std::fmt;
use std::sync::Arc;

/// How the delimiter bit is chosen from scanned statistics.
#[derive(Clone)]
pub enum DelimiterMode {
    /// The bit value with the smaller frequency; ties resolve to 0.
    Low,
    /// The bit value with the larger frequency; ties resolve to 0.
    High,
    /// Caller-supplied selection.
    Custom(Arc<dyn Fn(&ScannedData) -> u8 + Send + Sync>),
}

impl fmt::Debug for DelimiterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelimiterMode::Low => write!(f, "DelimiterMode::Low"),
            DelimiterMode::High => write!(f, "DelimiterMode::High"),
            DelimiterMode::Custom(_) => write!(f, "DelimiterMode::Custom(..)"),
        }
    }
}

impl DelimiterMode {
    /// Parses the CLI's string form. The library's own `select_delimiter`
    /// never needs this -- the enum is already exhaustive -- but the CLI
    /// binary accepts `low`/`high` as text, which can still name an
    /// unrecognized mode.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "low" => Ok(DelimiterMode::Low),
            "high" => Ok(DelimiterMode::High),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

pub fn select_delimiter(data: &ScannedData, mode: &DelimiterMode) -> u8 {
    match mode {
        DelimiterMode::Low => {
            if data.bit_freqs[1] < data.bit_freqs[0] {
                1
            } else {
                0
            }
        }
        DelimiterMode::High => {
            if data.bit_freqs[1] > data.bit_freqs[0] {
                1
            } else {
                0
            }
        }
        DelimiterMode::Custom(f) => f(data),
    }
}
